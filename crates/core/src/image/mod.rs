//! Per-file function/module registry.
//!
//! An `Image` owns every module and function recovered from one object file.
//! Modules and functions sit in arenas; the name, address and pretty-name
//! maps are secondary indices into those arenas. Entries are appended during
//! ingestion and never removed.

mod ingest;
mod internal;
mod points;
pub mod registry;
pub mod report;
mod space;
pub mod state;

pub use ingest::IngestReport;
pub use internal::{InternalSym, InternalSymbols};
pub use registry::Resource;
pub use space::AddressSpace;
pub use state::{SavedState, TagRecord, STATE_FORMAT_VERSION};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::backends::reader::{Arch, ObjectFile, WORD_SIZE};
use crate::config::SymtabConfig;
use crate::error::SymtabError;
use crate::image::report::ReportSink;
use crate::model::{Address, FuncId, Function, Module, ModuleId, UNKNOWN_LINE};

/// One parsed executable or shared library and its symbol model.
#[derive(Debug)]
pub struct Image {
    file: PathBuf,
    name: String,
    arch: Arch,
    little_endian: bool,
    space: AddressSpace,
    code: Vec<u8>,
    data: Vec<u8>,
    digest: Option<String>,
    config: SymtabConfig,

    modules: Vec<Module>,
    functions: Vec<Function>,

    mods_by_file_name: HashMap<String, ModuleId>,
    mods_by_full_name: HashMap<String, ModuleId>,
    funcs_by_addr: BTreeMap<Address, FuncId>,
    funcs_by_name: HashMap<String, Vec<FuncId>>,
    funcs_by_pretty: HashMap<String, Vec<FuncId>>,
    symbol_names: HashSet<String>,
    internal: InternalSymbols,

    report: IngestReport,
}

impl Image {
    /// Build an image from an already decoded object file.
    ///
    /// Fails if code and data overlap or if no function survives ingestion.
    /// The result is not registered in the process-wide table; use
    /// `registry::parse_image` for that.
    pub fn from_object(
        path: impl AsRef<Path>,
        object: ObjectFile,
        config: &SymtabConfig,
    ) -> Result<Self, SymtabError> {
        let path = path.as_ref();
        let space = AddressSpace::from_object(&object)?;
        let name = path
            .file_name()
            .and_then(|os| os.to_str())
            .unwrap_or_else(|| path.to_str().unwrap_or(""))
            .to_string();

        let mut image = Image {
            file: path.to_path_buf(),
            name,
            arch: object.arch,
            little_endian: object.little_endian,
            space,
            code: object.code,
            data: object.data,
            digest: None,
            config: config.clone(),
            modules: Vec::new(),
            functions: Vec::new(),
            mods_by_file_name: HashMap::new(),
            mods_by_full_name: HashMap::new(),
            funcs_by_addr: BTreeMap::new(),
            funcs_by_name: HashMap::new(),
            funcs_by_pretty: HashMap::new(),
            symbol_names: HashSet::new(),
            internal: InternalSymbols::default(),
            report: IngestReport::default(),
        };

        image.report = image.ingest(&object.symbols, config);
        if image.functions.is_empty() {
            return Err(SymtabError::NoFunctions(path.to_path_buf()));
        }
        Ok(image)
    }

    pub(crate) fn set_digest(&mut self, digest: Option<String>) {
        self.digest = digest;
    }

    /// Path the image was loaded from.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// File-name part of the path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn little_endian(&self) -> bool {
        self.little_endian
    }

    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    pub fn code_offset(&self) -> Address {
        self.space.code_offset()
    }

    pub fn data_offset(&self) -> Address {
        self.space.data_offset()
    }

    /// SHA-256 of the file contents, when the file was readable from disk.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn ingest_report(&self) -> &IngestReport {
        &self.report
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Module behind a handle from this image. Panics on a handle minted by
    /// a larger image; use [`Image::get_module`] when the source is unknown.
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn get_module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Function behind a handle from this image. Panics like
    /// [`Image::module`]; [`Image::get_function`] does not.
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn get_function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    /// Functions in address order.
    pub fn functions_by_addr(&self) -> impl Iterator<Item = &Function> + '_ {
        self.funcs_by_addr.values().map(|id| self.function(*id))
    }

    /// Find a module by full name, falling back to the short file name when
    /// no module carries exactly `name`.
    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.mods_by_full_name
            .get(name)
            .or_else(|| self.mods_by_file_name.get(name))
            .map(|id| self.module(*id))
    }

    /// All functions, across modules, with this symbol-table name.
    pub fn find_functions(&self, name: &str) -> Vec<&Function> {
        self.funcs_by_name
            .get(name)
            .map(|ids| ids.iter().map(|id| self.function(*id)).collect())
            .unwrap_or_default()
    }

    /// The function starting exactly at `addr`.
    pub fn find_function_at(&self, addr: Address) -> Option<&Function> {
        self.funcs_by_addr.get(&addr).map(|id| self.function(*id))
    }

    /// The first function ingested under `name`, for callers that tolerate
    /// ambiguity.
    pub fn find_one_function(&self, name: &str) -> Option<&Function> {
        self.funcs_by_name.get(name).and_then(|ids| ids.first()).map(|id| self.function(*id))
    }

    /// All functions whose demangled name is `pretty`.
    pub fn find_functions_by_pretty(&self, pretty: &str) -> Vec<&Function> {
        self.funcs_by_pretty
            .get(pretty)
            .map(|ids| ids.iter().map(|id| self.function(*id)).collect())
            .unwrap_or_default()
    }

    /// Lookup of `name` within one module.
    pub fn find_module_function(&self, module: &str, name: &str) -> Option<&Function> {
        let module = self.find_module(module)?;
        module.find_function(name).map(|id| self.function(id))
    }

    /// Every occurrence of a function's name in its module, starting with `id`.
    pub fn siblings(&self, id: FuncId) -> impl Iterator<Item = &Function> + '_ {
        std::iter::successors(Some(self.function(id)), move |f| f.sibling().map(|s| self.function(s)))
    }

    /// Whether any symbol record, of any kind, carried this name.
    pub fn symbol_exists(&self, name: &str) -> bool {
        self.symbol_names.contains(name)
    }

    /// Instruction word at `addr`, or `None` if `addr` is not a valid
    /// code/data address.
    pub fn get_instruction(&self, addr: Address) -> Option<u32> {
        self.space.is_valid(addr).then(|| self.instruction_word(addr))
    }

    /// Instruction word at an address already known to be valid.
    ///
    /// Panics otherwise: reaching here with a bad address is a classifier bug.
    pub(crate) fn instruction_word(&self, addr: Address) -> u32 {
        assert!(self.space.is_valid(addr), "instruction fetch at invalid address 0x{addr:X}");
        let (base, bytes) = if self.space.is_code(addr) {
            (self.space.code_offset(), &self.code)
        } else {
            (self.space.data_offset(), &self.data)
        };
        let index = ((addr - base) / WORD_SIZE) as usize;
        let mut raw = [0u8; 4];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = bytes.get(index * 4 + i).copied().unwrap_or(0);
        }
        if self.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        }
    }

    /// Raw code bytes for `[start, end)`, clipped to the code segment.
    pub(crate) fn code_bytes(&self, start: Address, end: Address) -> &[u8] {
        let base = self.space.code_offset();
        if start < base {
            return &[];
        }
        let from = ((start - base) as usize).min(self.code.len());
        let to = (end.saturating_sub(base) as usize).clamp(from, self.code.len());
        &self.code[from..to]
    }

    /// Flip the library tag on every function of one module.
    pub fn change_module_lib_flag(&mut self, module: ModuleId, set_suppress: bool) -> usize {
        let Some(module) = self.modules.get(module.index()) else { return 0 };
        module.change_lib_flag(&mut self.functions, set_suppress)
    }

    /// Flip the library tag on every function of every module.
    pub fn change_lib_flag_all(&mut self, set_suppress: bool) -> usize {
        let modules = &self.modules;
        modules.iter().map(|m| m.change_lib_flag(&mut self.functions, set_suppress)).sum()
    }

    /// Record a line-table entry for a module. A function of that module
    /// starting at `addr` takes `line` as its first line if it has none.
    pub fn record_line(&mut self, module: ModuleId, line: u32, addr: Address) {
        let Some(owner) = self.modules.get_mut(module.index()) else { return };
        owner.set_line_addr(line, addr);
        if let Some(id) = self.funcs_by_addr.get(&addr) {
            let func = &mut self.functions[id.index()];
            if func.module == module && func.line == UNKNOWN_LINE {
                func.line = line;
            }
        }
    }

    /// Report every module of this image to a sink.
    pub fn define_modules(&self, sink: &mut dyn ReportSink) {
        for module in &self.modules {
            module.define(&self.name, sink);
        }
    }

    /// Look up a runtime helper symbol. A miss is logged when `warn` is set,
    /// since it usually means the runtime and image are out of step.
    pub fn find_internal_symbol(&self, name: &str, warn: bool) -> Option<&InternalSym> {
        let found = self.internal.get(name);
        if found.is_none() && warn {
            log::warn!("internal symbol {name} not found in {}", self.name);
        }
        found
    }

    /// Address of a runtime helper symbol; `None` means not found.
    pub fn find_internal_address(&self, name: &str, warn: bool) -> Option<Address> {
        self.find_internal_symbol(name, warn).map(InternalSym::addr)
    }

    pub fn internal_symbols(&self) -> &InternalSymbols {
        &self.internal
    }
}
