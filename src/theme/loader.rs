//! Layout loader - reads user layouts from a directory

use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::ConfigError;

/// Read every `*.html` file under `dir` as `(name, source)`
///
/// Names are paths relative to `dir` with `/` separators, so a layout can
/// extend `partials/base.html`. Files and directories starting with `.`
/// are skipped.
pub fn load_layouts(dir: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::Layouts(format!(
            "layouts directory not found: {}",
            dir.display()
        )));
    }

    let mut layouts = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
    {
        let entry = entry.map_err(|e| ConfigError::Layouts(e.to_string()))?;
        let path = entry.path();

        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }

        let relative = path
            .strip_prefix(dir)
            .map_err(|e| ConfigError::Layouts(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let source = fs::read_to_string(path)
            .map_err(|e| ConfigError::Layouts(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Loaded layout {}", name);
        layouts.push((name, source));
    }

    Ok(layouts)
}
