//! Clean the output directory

use anyhow::{Context, Result};
use std::path::Path;

use crate::output::clean_output;

/// Remove the output directory
pub fn run(output_dir: &Path) -> Result<()> {
    let removed = clean_output(output_dir)
        .with_context(|| format!("Failed to remove {:?}", output_dir))?;
    if !removed {
        tracing::info!("Nothing to clean at {:?}", output_dir);
    }
    Ok(())
}
