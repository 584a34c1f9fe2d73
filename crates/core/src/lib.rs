//! symtab-core
//!
//! Symbol-table and function-discovery engine for dynamic binary
//! instrumentation.
//!
//! Given a loaded executable image, this crate rebuilds a structured model of
//! the program (modules, functions, call sites) from raw symbol records and
//! exposes it to an instrumentation layer that inserts measurement code at
//! specific addresses.
//!
//! Layout:
//! - `model`: modules, functions, instrumentation points, tags.
//! - `image`: the per-file registry, symbol ingestion, call-point discovery,
//!   tag-state files and the process-wide image table.
//! - `backends`: object readers and instruction decoders (goblin, capstone,
//!   SPARC word classifier).
//! - `catalog`: the static library-function catalog.

pub mod backends;
pub mod catalog;
pub mod config;
pub mod error;
pub mod image;
pub mod model;

pub use config::{load_config, AddrRange, RequiredSymbol, SymtabConfig};
pub use error::{IngestError, StateError, SymtabError};
pub use image::registry::{self, SharedImage};
pub use image::{Image, IngestReport};
pub use model::{Address, FuncId, Function, InstPoint, Module, ModuleId, PointKind, Tags};

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
