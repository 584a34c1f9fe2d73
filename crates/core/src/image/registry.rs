//! Process-wide table of parsed images.
//!
//! Images enter the table only through `parse_image`/`parse_image_with` and
//! leave it only through `clear_images` (process shutdown). A second parse
//! request for the same path returns the image already in the table. Each
//! image sits behind a `RwLock`, so bulk tag updates are seen by readers
//! either completely or not at all.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use sha2::{Digest, Sha256};

use crate::backends::reader::{ElfReader, ObjectReader};
use crate::config::SymtabConfig;
use crate::error::SymtabError;
use crate::image::Image;

/// Shared handle to a registered image.
pub type SharedImage = Arc<RwLock<Image>>;

fn all_images_table() -> &'static Mutex<HashMap<PathBuf, SharedImage>> {
    static ALL_IMAGES: OnceLock<Mutex<HashMap<PathBuf, SharedImage>>> = OnceLock::new();
    ALL_IMAGES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// SHA-256 of a file as a hex string, or `None` if it cannot be read.
fn sha256_file(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Some(format!("{:x}", hasher.finalize()))
}

/// Parse an ELF file with the default configuration, or return the image
/// already registered for `path`.
pub fn parse_image(path: impl AsRef<Path>) -> Result<SharedImage, SymtabError> {
    parse_image_with(path, &ElfReader, &SymtabConfig::default())
}

/// Parse `path` through `reader`, or return the image already registered for
/// it. Nothing is registered when parsing fails.
pub fn parse_image_with(
    path: impl AsRef<Path>,
    reader: &dyn ObjectReader,
    config: &SymtabConfig,
) -> Result<SharedImage, SymtabError> {
    let path = path.as_ref();
    let mut table = all_images_table().lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = table.get(path) {
        return Ok(Arc::clone(existing));
    }

    let object = reader.read(path)?;
    let mut image = Image::from_object(path, object, config)?;
    image.set_digest(sha256_file(path));

    let report = image.ingest_report();
    log::info!(
        "parsed {} via {}: {} modules, {} functions, {} symbols skipped",
        path.display(),
        reader.name(),
        image.modules().len(),
        report.functions,
        report.error_count()
    );

    let shared = Arc::new(RwLock::new(image));
    table.insert(path.to_path_buf(), Arc::clone(&shared));
    Ok(shared)
}

/// The image registered for `path`, if any.
pub fn find_image(path: impl AsRef<Path>) -> Option<SharedImage> {
    let table = all_images_table().lock().unwrap_or_else(PoisonError::into_inner);
    table.get(path.as_ref()).map(Arc::clone)
}

/// Every registered image, sorted by path.
pub fn all_images() -> Vec<SharedImage> {
    let table = all_images_table().lock().unwrap_or_else(PoisonError::into_inner);
    let mut entries: Vec<(&PathBuf, &SharedImage)> = table.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.into_iter().map(|(_, image)| Arc::clone(image)).collect()
}

/// Drop every registered image.
pub fn clear_images() {
    all_images_table().lock().unwrap_or_else(PoisonError::into_inner).clear();
}

/// A node of the code-resource hierarchy: the `/Code` root or a module below
/// it (`/Code/<module>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    parts: Vec<String>,
}

impl Resource {
    pub const CODE_ROOT: &'static str = "Code";

    /// Parse a slash-separated resource name such as `/Code/m.c`.
    pub fn parse(name: &str) -> Self {
        Self { parts: name.split('/').filter(|p| !p.is_empty()).map(str::to_string).collect() }
    }

    pub fn code_root() -> Self {
        Self { parts: vec![Self::CODE_ROOT.to_string()] }
    }

    pub fn module(name: &str) -> Self {
        let mut resource = Self::code_root();
        resource.parts.extend(name.split('/').filter(|p| !p.is_empty()).map(str::to_string));
        resource
    }

    pub fn is_code_root(&self) -> bool {
        self.parts.len() == 1 && self.parts[0] == Self::CODE_ROOT
    }

    /// Module named by this resource: the full path below the root, so
    /// `/Code/lib/m.c` names `lib/m.c`.
    pub fn module_name(&self) -> Option<String> {
        match self.parts.as_slice() {
            [root, rest @ ..] if root == Self::CODE_ROOT && !rest.is_empty() => Some(rest.join("/")),
            _ => None,
        }
    }
}

/// Mark (or unmark) every function under `resource` as library code, in
/// every registered image. Returns the number of functions touched.
///
/// Each image is updated under its write lock.
pub fn change_lib_flag(resource: &Resource, set_suppress: bool) -> usize {
    let mut touched = 0;
    for shared in all_images() {
        let mut image = shared.write().unwrap_or_else(PoisonError::into_inner);
        if resource.is_code_root() {
            touched += image.change_lib_flag_all(set_suppress);
        } else if let Some(name) = resource.module_name() {
            if let Some(id) = image.find_module(&name).map(|m| m.id()) {
                touched += image.change_module_lib_flag(id, set_suppress);
            }
        }
    }
    touched
}

impl Image {
    /// Bulk reclassification across the process-wide table; see
    /// [`change_lib_flag`].
    pub fn change_lib_flag(resource: &Resource, set_suppress: bool) -> usize {
        change_lib_flag(resource, set_suppress)
    }
}
