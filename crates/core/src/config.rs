//! Parse-time configuration for images.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Address;

/// Half-open address range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrRange {
    pub start: Address,
    pub end: Address,
}

impl AddrRange {
    pub fn new(start: Address, end: Address) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end
    }

    /// True if `[addr, addr + size)` lies entirely inside this range.
    pub fn contains_span(&self, addr: Address, size: u64) -> bool {
        match addr.checked_add(size) {
            Some(end) => self.contains(addr) && end <= self.end,
            None => false,
        }
    }
}

/// A symbol the layout check expects to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredSymbol {
    pub name: String,
    #[serde(default)]
    pub must_exist: bool,
}

/// Knobs for building an image from an object file.
///
/// Loaded from JSON or YAML; every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymtabConfig {
    /// Declared user-code range; unannotated functions here go to `USER_MODULE`.
    pub user_range: Option<AddrRange>,
    /// Declared dynamic-runtime range; functions here go to `DYN_MODULE`.
    pub runtime_range: Option<AddrRange>,
    /// Prefixes marking runtime-injected helper symbols.
    pub internal_prefixes: Vec<String>,
    /// Inputs to the heap/layout sanity check.
    pub required_symbols: Vec<RequiredSymbol>,
    /// Decoder override, e.g. `sparc` or `x86_64`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl Default for SymtabConfig {
    fn default() -> Self {
        Self {
            user_range: None,
            runtime_range: None,
            internal_prefixes: vec!["DYNINST".to_string()],
            required_symbols: Vec::new(),
            arch: None,
        }
    }
}

impl SymtabConfig {
    pub fn is_internal(&self, name: &str) -> bool {
        self.internal_prefixes.iter().any(|p| !p.is_empty() && name.starts_with(p.as_str()))
    }
}

/// Load a config file; `.yaml`/`.yml` is read as YAML, anything else as JSON.
pub fn load_config(path: impl AsRef<Path>) -> Result<SymtabConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read symtab config at {}", path.display()))?;
    let config = if is_yaml(path) {
        serde_yaml::from_str(&text).context("Failed to parse symtab config YAML")?
    } else {
        serde_json::from_str(&text).context("Failed to parse symtab config JSON")?
    };
    Ok(config)
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
}
