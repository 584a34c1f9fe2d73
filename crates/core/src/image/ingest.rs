use serde::{Deserialize, Serialize};

use super::Image;
use crate::backends::reader::{RawSymbol, SymbolKind};
use crate::catalog::LibraryCatalog;
use crate::config::{RequiredSymbol, SymtabConfig};
use crate::error::IngestError;
use crate::model::{
    Address, FuncId, Function, Module, ModuleId, Tags, DYN_MODULE, EXTRA_MODULE, LIBRARY_MODULE,
    USER_MODULE,
};

/// Outcome of ingesting one image's symbol records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Functions created.
    pub functions: usize,
    /// Records that were dropped, in symbol-table order.
    #[serde(skip)]
    pub skipped: Vec<IngestError>,
    /// Result of the heap/layout sanity check.
    pub heap_ok: bool,
}

impl IngestReport {
    pub fn had_errors(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.skipped.len()
    }
}

impl Image {
    /// Turn raw symbol records into modules and functions.
    ///
    /// A bad record is dropped and noted in the report; it never stops the
    /// batch.
    pub(crate) fn ingest(&mut self, symbols: &[RawSymbol], config: &SymtabConfig) -> IngestReport {
        let catalog = LibraryCatalog::global();
        let mut report = IngestReport::default();
        let mut objects = Vec::new();

        for sym in symbols {
            if !sym.name.is_empty() {
                self.symbol_names.insert(sym.name.clone());
            }
            if config.is_internal(&sym.name) {
                self.internal.add(&sym.name, sym.address);
            }
            match sym.kind {
                SymbolKind::Function => {}
                SymbolKind::Object => {
                    objects.push(sym);
                    continue;
                }
                SymbolKind::Other => continue,
            }

            if let Some(existing) = self.funcs_by_addr.get(&sym.address) {
                log::debug!(
                    "{} at 0x{:X} aliases {}; keeping the first definition",
                    sym.name,
                    sym.address,
                    self.function(*existing).sym_tab_name()
                );
                continue;
            }

            let module = match self.resolve_module(sym, config) {
                Ok(module) => module,
                Err(err) => {
                    log::warn!("skipping symbol: {err}");
                    report.skipped.push(err);
                    continue;
                }
            };

            let tags = catalog.tags_for(&sym.name);
            self.new_func(module, sym, tags);
            report.functions += 1;
        }

        report.heap_ok = self.heap_is_ok(&objects, &config.required_symbols);
        if !report.heap_ok {
            log::warn!("layout check failed for {}; continuing", self.name);
        }
        report
    }

    /// Decide which module a function record belongs to.
    ///
    /// An explicit module annotation wins. Otherwise the dynamic-runtime
    /// range, then the declared user range, then data-segment residency
    /// decide; everything left goes to the library pseudo-module.
    fn resolve_module(
        &mut self,
        sym: &RawSymbol,
        config: &SymtabConfig,
    ) -> Result<ModuleId, IngestError> {
        if sym.name.is_empty() {
            return Err(IngestError::EmptyName { address: sym.address });
        }
        let in_code = self.space.is_code(sym.address);
        let in_data = self.space.is_data(sym.address);
        if !in_code && !in_data {
            return Err(IngestError::InvalidAddress { name: sym.name.clone(), address: sym.address });
        }

        if let Some(name) = &sym.module {
            if name.trim().is_empty() {
                return Err(IngestError::UnresolvedModule {
                    name: sym.name.clone(),
                    module: name.clone(),
                });
            }
            return Ok(self.get_or_create_module(name, sym.address));
        }

        let pseudo = if config.runtime_range.is_some_and(|r| r.contains(sym.address)) {
            DYN_MODULE
        } else if config.user_range.is_some_and(|r| r.contains(sym.address)) {
            USER_MODULE
        } else if in_data {
            EXTRA_MODULE
        } else {
            LIBRARY_MODULE
        };
        Ok(self.get_or_create_module(pseudo, sym.address))
    }

    /// Find a module by full name, creating it on first sight.
    pub(crate) fn get_or_create_module(&mut self, name: &str, addr: Address) -> ModuleId {
        if let Some(id) = self.mods_by_full_name.get(name) {
            return *id;
        }
        let id = ModuleId(self.modules.len() as u32);
        let module = Module::new(id, name, addr);
        self.mods_by_file_name.entry(module.file_name().to_string()).or_insert(id);
        self.mods_by_full_name.insert(name.to_string(), id);
        self.modules.push(module);
        id
    }

    /// Create a function and hang it off every index.
    fn new_func(&mut self, module: ModuleId, sym: &RawSymbol, tags: Tags) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        let func = Function::new(id, &sym.name, module, sym.address, sym.size, tags);

        if let Some(first) = self.modules[module.index()].add_function(&func) {
            let mut last = first;
            while let Some(next) = self.functions[last.index()].sibling {
                last = next;
            }
            self.functions[last.index()].sibling = Some(id);
        }

        self.funcs_by_addr.insert(func.addr(), id);
        self.funcs_by_name.entry(func.sym_tab_name().to_string()).or_default().push(id);
        self.funcs_by_pretty.entry(func.pretty_name().to_string()).or_default().push(id);
        self.functions.push(func);
        id
    }

    /// Compare declared symbol data against the data segment.
    ///
    /// Every required symbol marked `must_exist` has to be present, and every
    /// object symbol that starts inside the data segment has to end inside
    /// it. Mismatches are logged; the caller decides what to do with the
    /// verdict.
    pub(crate) fn heap_is_ok(&self, objects: &[&RawSymbol], required: &[RequiredSymbol]) -> bool {
        let mut ok = true;
        for req in required.iter().filter(|r| r.must_exist) {
            if !self.symbol_names.contains(&req.name) {
                log::warn!("required symbol {} missing from {}", req.name, self.name);
                ok = false;
            }
        }

        let data = self.space.data_range();
        for sym in objects {
            if data.contains(sym.address) && !data.contains_span(sym.address, sym.size) {
                log::warn!(
                    "data symbol {} (0x{:X}, {} bytes) runs past the data segment end 0x{:X}",
                    sym.name,
                    sym.address,
                    sym.size,
                    data.end
                );
                ok = false;
            }
        }
        ok
    }
}
