use serde::{Deserialize, Serialize};

use crate::model::{Address, FuncId, InstPoint, ModuleId, Tags, UNKNOWN_LINE};

/// A function discovered in an image.
///
/// Pretty names are not unique; symbol-table names are unique per module
/// except for siblings (the same name at a different address), which are
/// chained through `sibling`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub(crate) id: FuncId,
    pub(crate) sym_name: String,
    pub(crate) pretty_name: String,
    pub(crate) module: ModuleId,
    pub(crate) addr: Address,
    pub(crate) size: u64,
    pub(crate) tags: Tags,
    pub(crate) line: u32,
    pub(crate) sibling: Option<FuncId>,
    pub(crate) entry: Option<InstPoint>,
    pub(crate) returns: Vec<InstPoint>,
    pub(crate) calls: Vec<InstPoint>,
    pub(crate) points_checked: bool,
}

impl Function {
    pub(crate) fn new(
        id: FuncId,
        sym_name: &str,
        module: ModuleId,
        addr: Address,
        size: u64,
        tags: Tags,
    ) -> Self {
        Self {
            id,
            sym_name: sym_name.to_string(),
            pretty_name: crate::model::pretty_name(sym_name),
            module,
            addr,
            size,
            tags,
            line: UNKNOWN_LINE,
            sibling: None,
            entry: None,
            returns: Vec::new(),
            calls: Vec::new(),
            points_checked: false,
        }
    }

    pub fn id(&self) -> FuncId {
        self.id
    }

    /// Name as it appears in the symbol table.
    pub fn sym_tab_name(&self) -> &str {
        &self.sym_name
    }

    /// Demangled, user-facing name.
    pub fn pretty_name(&self) -> &str {
        &self.pretty_name
    }

    /// Module that owns this function.
    pub fn file(&self) -> ModuleId {
        self.module
    }

    pub fn addr(&self) -> Address {
        self.addr
    }

    /// Declared symbol size; zero when the object file did not record one.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Next function with the same symbol-table name in the same module.
    pub fn sibling(&self) -> Option<FuncId> {
        self.sibling
    }

    pub fn tags(&self) -> Tags {
        self.tags
    }

    pub fn tag_as_lib(&mut self) {
        self.tags.insert(Tags::LIB_FUNC);
    }

    pub fn untag_as_lib(&mut self) {
        self.tags.remove(Tags::LIB_FUNC);
    }

    pub fn is_tag_similar(&self, mask: Tags) -> bool {
        self.tags.intersects(mask)
    }

    pub fn is_lib_tag(&self) -> bool {
        self.tags.intersects(Tags::LIB_FUNC)
    }

    /// Where entry instrumentation goes; often not `addr()`.
    ///
    /// `None` until call points have been checked.
    pub fn func_entry(&self) -> Option<&InstPoint> {
        self.entry.as_ref()
    }

    /// First return point.
    pub fn func_return(&self) -> Option<&InstPoint> {
        self.returns.first()
    }

    pub fn func_returns(&self) -> &[InstPoint] {
        &self.returns
    }

    /// Outgoing call sites in address order.
    pub fn calls(&self) -> &[InstPoint] {
        &self.calls
    }

    pub fn call_points_checked(&self) -> bool {
        self.points_checked
    }
}
