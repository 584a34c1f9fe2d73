//! Adapters for the collaborators the symbol engine consumes.
//!
//! - `reader`: object-file readers producing raw symbol records and
//!   code/data bytes (goblin for ELF, an in-memory reader for prepared
//!   objects).
//! - `decoder`: instruction decoders that classify call/return shapes and
//!   delay slots (built-in SPARC classifier, capstone for everything else).

pub mod decoder;
pub mod reader;
