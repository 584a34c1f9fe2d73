use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::image::report::{ModuleReport, ReportSink};
use crate::model::{Address, FuncId, Function, Language, ModuleId};

/// Source line to starting address association for one module.
///
/// Line tables are best-effort; a line that was never recorded is simply
/// absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineTable {
    lines: BTreeMap<u32, Address>,
}

impl LineTable {
    /// Last writer wins when a line is recorded twice.
    pub fn set_line_addr(&mut self, line: u32, addr: Address) {
        self.lines.insert(line, addr);
    }

    pub fn get_line_addr(&self, line: u32) -> Option<Address> {
        self.lines.get(&line).copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A named grouping of functions: a source file or a pseudo-module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub(crate) id: ModuleId,
    pub(crate) file_name: String,
    pub(crate) full_name: String,
    pub(crate) language: Language,
    pub(crate) addr: Address,
    pub(crate) functions: Vec<FuncId>,
    pub(crate) by_name: HashMap<String, FuncId>,
    pub(crate) lines: LineTable,
}

impl Module {
    pub(crate) fn new(id: ModuleId, full_name: &str, addr: Address) -> Self {
        let file_name = full_name.rsplit('/').next().unwrap_or(full_name).to_string();
        Self {
            id,
            language: Language::from_file_name(&file_name),
            file_name,
            full_name: full_name.to_string(),
            addr,
            functions: Vec::new(),
            by_name: HashMap::new(),
            lines: LineTable::default(),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Short file name (no directories).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Lowest function address seen for this module.
    pub fn addr(&self) -> Address {
        self.addr
    }

    /// Owned functions in ingestion order, siblings included.
    pub fn functions(&self) -> &[FuncId] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Exact lookup within this module. Siblings hang off the returned function.
    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.by_name.get(name).copied()
    }

    pub fn get_line_addr(&self, line: u32) -> Option<Address> {
        self.lines.get_line_addr(line)
    }

    pub fn set_line_addr(&mut self, line: u32, addr: Address) {
        self.lines.set_line_addr(line, addr);
    }

    pub fn lines(&self) -> &LineTable {
        &self.lines
    }

    /// Flip the library tag on every function this module owns.
    ///
    /// `functions` is the owning image's function arena. Returns the number of
    /// functions touched; an empty module is a no-op.
    pub fn change_lib_flag(&self, functions: &mut [Function], set_suppress: bool) -> usize {
        let mut touched = 0;
        for id in &self.functions {
            let Some(func) = functions.get_mut(id.index()) else { continue };
            if set_suppress {
                func.tag_as_lib();
            } else {
                func.untag_as_lib();
            }
            touched += 1;
        }
        touched
    }

    /// Describe this module to a reporting sink.
    pub fn define(&self, image: &str, sink: &mut dyn ReportSink) {
        sink.define_module(&ModuleReport {
            image: image.to_string(),
            name: self.file_name.clone(),
            full_name: self.full_name.clone(),
            language: self.language,
            addr: self.addr,
            functions: self.functions.len(),
        });
    }

    pub(crate) fn add_function(&mut self, func: &Function) -> Option<FuncId> {
        self.functions.push(func.id());
        if func.addr() < self.addr {
            self.addr = func.addr();
        }
        match self.by_name.get(func.sym_tab_name()) {
            Some(first) => Some(*first),
            None => {
                self.by_name.insert(func.sym_tab_name().to_string(), func.id());
                None
            }
        }
    }
}
