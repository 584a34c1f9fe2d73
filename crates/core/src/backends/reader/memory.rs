use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{ObjectFile, ObjectReader};
use crate::error::SymtabError;

/// Reader over objects that were decoded elsewhere, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryReader {
    objects: HashMap<PathBuf, ObjectFile>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self { objects: HashMap::new() }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, object: ObjectFile) -> &mut Self {
        self.objects.insert(path.into(), object);
        self
    }
}

impl ObjectReader for MemoryReader {
    fn read(&self, path: &Path) -> Result<ObjectFile, SymtabError> {
        let object = self.objects.get(path).ok_or_else(|| SymtabError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such object"),
        })?;
        if object.symbols.is_empty() {
            return Err(SymtabError::NoSymbols(path.to_path_buf()));
        }
        Ok(object.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
