//! Tool-version manifest persistence (spec §4.9), grounded in
//! `pyqa/tool_versions.py::load_versions`/`save_versions`.
//!
//! One flat `<cache_dir>/tool-versions.json` maps tool name to the version
//! string its runtime probe reported last run, so a later `qa doctor`-style
//! report can flag drift without re-invoking every tool.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

const FILE_NAME: &str = "tool-versions.json";

/// Best-effort load: a missing or malformed manifest is an empty map, never
/// an error (versions are an optimization, not load-bearing state).
pub fn load_versions(cache_dir: &Path) -> BTreeMap<String, String> {
    let path = cache_dir.join(FILE_NAME);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return BTreeMap::new();
    };
    serde_json::from_str(&contents).unwrap_or_default()
}

/// Best-effort atomic save (tempfile-then-rename, matching
/// `qa_cache::store`'s write discipline).
pub fn save_versions(cache_dir: &Path, versions: &BTreeMap<String, String>) {
    if std::fs::create_dir_all(cache_dir).is_err() {
        return;
    }
    let Ok(serialized) = serde_json::to_vec_pretty(versions) else {
        return;
    };
    let path = cache_dir.join(FILE_NAME);
    let _ = write_atomic(&path, &serialized);
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
