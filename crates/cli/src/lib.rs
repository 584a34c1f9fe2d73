use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Context, Result};
use symtab_core::backends::reader::ElfReader;
use symtab_core::{registry, Image, SharedImage, SymtabConfig};

pub mod commands;

/// Resolve `path` against the current working directory, canonicalizing it
/// when it exists.
pub fn canonicalize_or_current(path: &str) -> Result<PathBuf> {
    let candidate = Path::new(path);
    match candidate.canonicalize() {
        Ok(p) => Ok(p),
        Err(_) if candidate.is_absolute() => Ok(candidate.to_path_buf()),
        Err(_) => {
            let cwd = env::current_dir().context("Failed to get current directory")?;
            Ok(cwd.join(candidate))
        }
    }
}

/// Parse an address written as `0x`-prefixed hex or plain decimal.
pub fn parse_address(text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse::<u64>(),
    };
    parsed.map_err(|e| anyhow!("Invalid address '{}': {}", text, e))
}

/// Load the config at `path`, or the defaults when none is given.
pub fn load_config_or_default(path: Option<&str>) -> Result<SymtabConfig> {
    match path {
        Some(p) => symtab_core::load_config(canonicalize_or_current(p)?),
        None => Ok(SymtabConfig::default()),
    }
}

/// Parse an ELF image through the process-wide registry.
pub fn open_image(path: &str, config: &SymtabConfig) -> Result<SharedImage> {
    let resolved = canonicalize_or_current(path)?;
    registry::parse_image_with(&resolved, &ElfReader, config)
        .with_context(|| format!("Failed to load image {}", resolved.display()))
}

pub fn read_image(shared: &SharedImage) -> RwLockReadGuard<'_, Image> {
    shared.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write_image(shared: &SharedImage) -> RwLockWriteGuard<'_, Image> {
    shared.write().unwrap_or_else(PoisonError::into_inner)
}

/// `0x`-prefixed upper-case hex, the form every command prints addresses in.
pub fn hex(addr: u64) -> String {
    format!("0x{addr:X}")
}
