use anyhow::{Context, Result};
use symtab_core::registry::{self, Resource};
use symtab_core::SymtabConfig;

use crate::{canonicalize_or_current, open_image, read_image, write_image};

/// Write every function's tags to a state file.
pub fn save_state_command(path: &str, config: &SymtabConfig, out: &str) -> Result<()> {
    let shared = open_image(path, config)?;
    let image = read_image(&shared);
    let out_path = canonicalize_or_current(out)?;
    image
        .save_state(&out_path)
        .with_context(|| format!("Failed to save state to {}", out_path.display()))?;

    println!("Saved state:");
    println!("  Image: {}", image.name());
    println!("  Functions: {}", image.functions().len());
    println!("  File: {}", out_path.display());
    Ok(())
}

/// Merge a saved state into the image, optionally writing the result out.
pub fn apply_state_command(
    path: &str,
    config: &SymtabConfig,
    state: &str,
    save_to: Option<&str>,
) -> Result<()> {
    let shared = open_image(path, config)?;
    let mut image = write_image(&shared);
    let state_path = canonicalize_or_current(state)?;
    let applied = image
        .post_process(&state_path)
        .with_context(|| format!("Failed to apply state {}", state_path.display()))?;
    println!("Applied {} tag records to {}", applied, image.name());

    if let Some(out) = save_to {
        let out_path = canonicalize_or_current(out)?;
        image
            .save_state(&out_path)
            .with_context(|| format!("Failed to save state to {}", out_path.display()))?;
        println!("Saved merged state to {}", out_path.display());
    }
    Ok(())
}

/// Set or clear the library tag under a code resource (`/Code` or
/// `/Code/<module>`).
pub fn lib_flag_command(
    path: &str,
    config: &SymtabConfig,
    resource: &str,
    clear: bool,
    save_to: Option<&str>,
) -> Result<()> {
    let shared = open_image(path, config)?;
    let resource = Resource::parse(resource);
    let touched = registry::change_lib_flag(&resource, !clear);
    println!(
        "{} library tag on {} functions",
        if clear { "Cleared" } else { "Set" },
        touched
    );

    if let Some(out) = save_to {
        let out_path = canonicalize_or_current(out)?;
        read_image(&shared)
            .save_state(&out_path)
            .with_context(|| format!("Failed to save state to {}", out_path.display()))?;
        println!("Saved state to {}", out_path.display());
    }
    Ok(())
}
