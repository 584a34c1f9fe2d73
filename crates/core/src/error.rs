use std::path::PathBuf;

use thiserror::Error;

use crate::model::Address;

/// Errors that prevent an image from being built at all.
///
/// A failed parse never leaves a partially built image in the process-wide
/// registry.
#[derive(Debug, Error)]
pub enum SymtabError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse object file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("No usable symbol table in {0}")]
    NoSymbols(PathBuf),

    #[error(
        "Code range 0x{code_start:X}-0x{code_end:X} overlaps data range 0x{data_start:X}-0x{data_end:X}"
    )]
    OverlappingSegments {
        code_start: Address,
        code_end: Address,
        data_start: Address,
        data_end: Address,
    },

    #[error("No functions recovered from {0}")]
    NoFunctions(PathBuf),
}

/// A single symbol record that could not be ingested.
///
/// The record is dropped and ingestion of the remaining records continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("Unnamed function symbol at 0x{address:X}")]
    EmptyName { address: Address },

    #[error("Symbol {name} at 0x{address:X} lies outside both code and data")]
    InvalidAddress { name: String, address: Address },

    #[error("Symbol {name} names an unusable module {module:?}")]
    UnresolvedModule { name: String, module: String },
}

/// Errors raised while loading or saving a tag-state file.
///
/// Any of these leaves the image untouched.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON state: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed YAML state: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported state format version {found}; supported is {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("State was saved for image {found}, not {expected}")]
    ImageMismatch { expected: String, found: String },

    #[error("State digest {found} does not match image digest {expected}")]
    DigestMismatch { expected: String, found: String },

    #[error("Record {index} names neither a function nor an address")]
    MissingKey { index: usize },

    #[error("Record {index} does not match any function ({key})")]
    UnknownFunction { index: usize, key: String },
}
