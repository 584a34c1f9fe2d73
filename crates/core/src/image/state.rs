//! Tag-state files: what a previous run decided about each function.
//!
//! A state file maps functions (by address, by name, or both) to their tag
//! bit-field. Loading one is all-or-nothing: every record is resolved before
//! any tag changes.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::is_yaml;
use crate::error::StateError;
use crate::image::Image;
use crate::model::{Address, FuncId, Tags};

/// Current on-disk format version.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// One function's saved tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    pub format_version: u32,
    /// File name of the image the state was taken from.
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    pub records: Vec<TagRecord>,
}

fn read_state(path: &Path) -> Result<SavedState, StateError> {
    let text = fs::read_to_string(path)
        .map_err(|source| StateError::Io { path: path.to_path_buf(), source })?;
    let state = if is_yaml(path) { serde_yaml::from_str(&text)? } else { serde_json::from_str(&text)? };
    Ok(state)
}

impl Image {
    /// Capture every function's current tags.
    pub fn snapshot_state(&self) -> SavedState {
        SavedState {
            format_version: STATE_FORMAT_VERSION,
            image: self.name.clone(),
            digest: self.digest.clone(),
            saved_at: Some(Utc::now().to_rfc3339()),
            records: self
                .functions_by_addr()
                .map(|f| TagRecord {
                    name: Some(f.sym_tab_name().to_string()),
                    address: Some(f.addr()),
                    tags: f.tags(),
                })
                .collect(),
        }
    }

    /// Write the current tags to `path` (YAML for `.yaml`/`.yml`, else JSON).
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let path = path.as_ref();
        let state = self.snapshot_state();
        let text = if is_yaml(path) {
            serde_yaml::to_string(&state)?
        } else {
            serde_json::to_string_pretty(&state)?
        };
        fs::write(path, text).map_err(|source| StateError::Io { path: path.to_path_buf(), source })
    }

    /// Load a previously saved state file and merge its tags into this image.
    ///
    /// Returns the number of functions whose tags were set. On any error the
    /// image is left exactly as it was.
    pub fn post_process(&mut self, path: impl AsRef<Path>) -> Result<usize, StateError> {
        let state = read_state(path.as_ref())?;
        let applied = self.apply_state(&state)?;
        log::info!("merged {applied} tag records from {} into {}", path.as_ref().display(), self.name);
        Ok(applied)
    }

    /// Validate and apply an in-memory state.
    pub fn apply_state(&mut self, state: &SavedState) -> Result<usize, StateError> {
        if state.format_version != STATE_FORMAT_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: state.format_version,
                supported: STATE_FORMAT_VERSION,
            });
        }
        if state.image != self.name {
            return Err(StateError::ImageMismatch {
                expected: self.name.clone(),
                found: state.image.clone(),
            });
        }
        if let (Some(ours), Some(theirs)) = (&self.digest, &state.digest) {
            if ours != theirs {
                return Err(StateError::DigestMismatch {
                    expected: ours.clone(),
                    found: theirs.clone(),
                });
            }
        }

        let mut updates: Vec<(FuncId, Tags)> = Vec::new();
        for (index, record) in state.records.iter().enumerate() {
            let targets = self.resolve_record(index, record)?;
            updates.extend(targets.into_iter().map(|id| (id, record.tags)));
        }

        for (id, tags) in &updates {
            self.functions[id.index()].tags = *tags;
        }
        Ok(updates.len())
    }

    fn resolve_record(&self, index: usize, record: &TagRecord) -> Result<Vec<FuncId>, StateError> {
        match (&record.address, &record.name) {
            (Some(addr), name) => {
                let func = self.find_function_at(*addr).filter(|f| {
                    name.as_deref().map_or(true, |n| n == f.sym_tab_name())
                });
                match func {
                    Some(func) => Ok(vec![func.id()]),
                    None => Err(StateError::UnknownFunction {
                        index,
                        key: match name {
                            Some(n) => format!("{n} at 0x{addr:X}"),
                            None => format!("0x{addr:X}"),
                        },
                    }),
                }
            }
            (None, Some(name)) => {
                let ids: Vec<FuncId> = self.find_functions(name).iter().map(|f| f.id()).collect();
                if ids.is_empty() {
                    Err(StateError::UnknownFunction { index, key: name.clone() })
                } else {
                    Ok(ids)
                }
            }
            (None, None) => Err(StateError::MissingKey { index }),
        }
    }
}
