use anyhow::{anyhow, Result};
use serde::Serialize;
use symtab_core::image::report::{CollectingSink, ModuleReport};
use symtab_core::{Function, Image, SymtabConfig};

use crate::{hex, open_image, parse_address, read_image};

#[derive(Debug, Serialize)]
pub struct ImageInfo {
    pub name: String,
    pub path: String,
    pub arch: String,
    pub code_start: u64,
    pub code_end: u64,
    pub data_start: u64,
    pub data_end: u64,
    pub modules: usize,
    pub functions: usize,
    pub skipped_symbols: usize,
    pub heap_ok: bool,
    pub internal_symbols: usize,
    pub digest: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub pretty_name: String,
    pub module: String,
    pub addr: u64,
    pub size: u64,
    pub line: u32,
    pub tags: u32,
    pub library: bool,
}

impl FunctionInfo {
    pub fn from_function(image: &Image, func: &Function) -> Self {
        Self {
            name: func.sym_tab_name().to_string(),
            pretty_name: func.pretty_name().to_string(),
            module: image.module(func.file()).full_name().to_string(),
            addr: func.addr(),
            size: func.size(),
            line: func.line(),
            tags: func.tags().bits(),
            library: func.is_lib_tag(),
        }
    }
}

fn print_functions(functions: &[FunctionInfo], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(functions)?);
        return Ok(());
    }
    println!("Functions ({}):", functions.len());
    if functions.is_empty() {
        println!("  (none)");
    }
    for f in functions {
        let lib = if f.library { " [lib]" } else { "" };
        if f.pretty_name != f.name {
            println!("  - {} {} ({}) in {}{}", hex(f.addr), f.name, f.pretty_name, f.module, lib);
        } else {
            println!("  - {} {} in {}{}", hex(f.addr), f.name, f.module, lib);
        }
    }
    Ok(())
}

/// Summarize one image: layout, counts and ingestion health.
pub fn info_command(path: &str, config: &SymtabConfig, json: bool) -> Result<()> {
    let shared = open_image(path, config)?;
    let image = read_image(&shared);
    let report = image.ingest_report();
    let (code, data) = (image.space().code_range(), image.space().data_range());
    let info = ImageInfo {
        name: image.name().to_string(),
        path: image.file().display().to_string(),
        arch: format!("{:?}", image.arch()),
        code_start: code.start,
        code_end: code.end,
        data_start: data.start,
        data_end: data.end,
        modules: image.modules().len(),
        functions: image.functions().len(),
        skipped_symbols: report.error_count(),
        heap_ok: report.heap_ok,
        internal_symbols: image.internal_symbols().len(),
        digest: image.digest().map(str::to_string),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("Image: {}", info.name);
    println!("  Path: {}", info.path);
    println!("  Arch: {}", info.arch);
    println!("  Code: {}..{}", hex(info.code_start), hex(info.code_end));
    println!("  Data: {}..{}", hex(info.data_start), hex(info.data_end));
    println!("  Modules: {}", info.modules);
    println!("  Functions: {}", info.functions);
    println!("  Skipped symbols: {}", info.skipped_symbols);
    println!("  Heap check: {}", if info.heap_ok { "OK" } else { "FAILED" });
    println!("  Internal symbols: {}", info.internal_symbols);
    println!("  Digest: {}", info.digest.as_deref().unwrap_or("-"));
    Ok(())
}

/// List modules the way a reporting console would receive them.
pub fn modules_command(path: &str, config: &SymtabConfig, json: bool) -> Result<()> {
    let shared = open_image(path, config)?;
    let image = read_image(&shared);
    let mut sink = CollectingSink::new();
    image.define_modules(&mut sink);
    let mut reports: Vec<ModuleReport> = sink.into_reports();
    reports.sort_by(|a, b| a.full_name.cmp(&b.full_name));

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }
    println!("Modules ({}):", reports.len());
    for m in reports {
        println!(
            "  - {} [{:?}] {} at {} ({} functions)",
            m.name,
            m.language,
            m.full_name,
            hex(m.addr),
            m.functions
        );
    }
    Ok(())
}

/// List functions in address order, optionally restricted to one module.
pub fn functions_command(
    path: &str,
    config: &SymtabConfig,
    module: Option<&str>,
    json: bool,
) -> Result<()> {
    let shared = open_image(path, config)?;
    let image = read_image(&shared);
    let module_id = match module {
        Some(name) => Some(
            image.find_module(name).map(|m| m.id()).ok_or_else(|| anyhow!("Unknown module '{}'", name))?,
        ),
        None => None,
    };
    let functions: Vec<FunctionInfo> = image
        .functions_by_addr()
        .filter(|f| module_id.map_or(true, |id| f.file() == id))
        .map(|f| FunctionInfo::from_function(&image, f))
        .collect();
    print_functions(&functions, json)
}

/// Find functions by symbol name, demangled name or start address.
pub fn lookup_command(
    path: &str,
    config: &SymtabConfig,
    name: Option<&str>,
    addr: Option<&str>,
    json: bool,
) -> Result<()> {
    let shared = open_image(path, config)?;
    let image = read_image(&shared);
    let found: Vec<&Function> = match (name, addr) {
        (Some(name), None) => {
            let mut found = image.find_functions(name);
            if found.is_empty() {
                found = image.find_functions_by_pretty(name);
            }
            found
        }
        (None, Some(addr)) => image.find_function_at(parse_address(addr)?).into_iter().collect(),
        _ => return Err(anyhow!("Pass exactly one of --name or --addr")),
    };
    if found.is_empty() {
        return Err(anyhow!("No function matches {}", name.or(addr).unwrap_or("")));
    }
    let functions: Vec<FunctionInfo> =
        found.into_iter().map(|f| FunctionInfo::from_function(&image, f)).collect();
    print_functions(&functions, json)
}

/// Resolve a runtime helper symbol to its address.
pub fn internal_command(path: &str, config: &SymtabConfig, name: &str) -> Result<()> {
    let shared = open_image(path, config)?;
    let image = read_image(&shared);
    match image.find_internal_address(name, true) {
        Some(addr) => {
            println!("{} {}", name, hex(addr));
            Ok(())
        }
        None => Err(anyhow!("Internal symbol '{}' not found in {}", name, image.name())),
    }
}
