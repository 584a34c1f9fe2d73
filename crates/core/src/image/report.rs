//! Notifications about discovered modules for an external console.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Address, Language};

/// What a reporting sink learns about one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub image: String,
    pub name: String,
    pub full_name: String,
    pub language: Language,
    pub addr: Address,
    pub functions: usize,
}

/// One-way receiver of module definitions. No acknowledgment is expected and
/// the same module may be reported more than once.
pub trait ReportSink {
    fn define_module(&mut self, report: &ModuleReport);
}

/// Keeps the first report for each (image, module) pair.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Vec<ModuleReport>,
    seen: HashSet<(String, String)>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[ModuleReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<ModuleReport> {
        self.reports
    }
}

impl ReportSink for CollectingSink {
    fn define_module(&mut self, report: &ModuleReport) {
        if self.seen.insert((report.image.clone(), report.full_name.clone())) {
            self.reports.push(report.clone());
        }
    }
}

/// Writes each report to the log at info level.
#[derive(Debug, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn define_module(&mut self, report: &ModuleReport) {
        log::info!(
            "module {} ({:?}) in {} at 0x{:X}: {} functions",
            report.full_name,
            report.language,
            report.image,
            report.addr,
            report.functions
        );
    }
}
