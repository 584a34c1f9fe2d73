use anyhow::{anyhow, Result};
use serde::Serialize;
use symtab_core::{Image, InstPoint, PointKind, SymtabConfig};

use crate::{hex, open_image, write_image};

#[derive(Debug, Serialize)]
pub struct PointInfo {
    pub kind: PointKind,
    pub addr: u64,
    pub callee: Option<String>,
    pub indirect: bool,
    pub aggregate: bool,
    pub delayed: bool,
    pub delay_slot: Option<u64>,
}

impl PointInfo {
    fn from_point(image: &Image, point: &InstPoint) -> Self {
        Self {
            kind: point.kind,
            addr: point.addr,
            callee: point.callee.map(|id| image.function(id).sym_tab_name().to_string()),
            indirect: point.call_indirect,
            aggregate: point.call_aggregate,
            delayed: point.is_delayed,
            delay_slot: point.delay_slot.as_ref().map(|i| i.addr),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CallPointsReport {
    pub function: String,
    pub addr: u64,
    pub entry: Option<PointInfo>,
    pub returns: Vec<PointInfo>,
    pub calls: Vec<PointInfo>,
}

fn describe(p: &PointInfo) -> String {
    let mut line = format!("{} {:?}", hex(p.addr), p.kind);
    if p.kind == PointKind::Call {
        match (&p.callee, p.indirect) {
            (_, true) => line.push_str(" -> (indirect)"),
            (Some(name), false) => line.push_str(&format!(" -> {name}")),
            (None, false) => line.push_str(" -> (outside image)"),
        }
        if p.aggregate {
            line.push_str(" [aggregate]");
        }
    }
    if let Some(slot) = p.delay_slot {
        line.push_str(&format!(" [delay slot {}]", hex(slot)));
    }
    line
}

/// Discover and print a function's entry, return and call points.
pub fn calls_command(path: &str, config: &SymtabConfig, function: &str, json: bool) -> Result<()> {
    let shared = open_image(path, config)?;
    let mut image = write_image(&shared);
    let id = image
        .find_one_function(function)
        .map(|f| f.id())
        .ok_or_else(|| anyhow!("Unknown function '{}'", function))?;
    image.check_call_points(id);

    let func = image.function(id);
    let report = CallPointsReport {
        function: func.sym_tab_name().to_string(),
        addr: func.addr(),
        entry: func.func_entry().map(|p| PointInfo::from_point(&image, p)),
        returns: func.func_returns().iter().map(|p| PointInfo::from_point(&image, p)).collect(),
        calls: func.calls().iter().map(|p| PointInfo::from_point(&image, p)).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("Function: {} at {}", report.function, hex(report.addr));
    match &report.entry {
        Some(entry) => println!("  Entry: {}", describe(entry)),
        None => println!("  Entry: (none)"),
    }
    println!("  Returns ({}):", report.returns.len());
    for p in &report.returns {
        println!("    - {}", describe(p));
    }
    println!("  Calls ({}):", report.calls.len());
    for p in &report.calls {
        println!("    - {}", describe(p));
    }
    Ok(())
}
