//! Filesystem scanning of the catalog directory tree (spec §4.1, §6).

use std::path::{Path, PathBuf};

const CACHE_FILENAME: &str = "cache.json";

fn walk_json(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk_json_inner(root, &mut out);
    out
}

fn walk_json_inner(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_json_inner(&path, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path);
        }
    }
}

fn under(path: &Path, ancestor: &Path) -> bool {
    path.ancestors().any(|a| a == ancestor)
}

/// Scans one catalog root into its four contributing file categories.
pub struct CatalogScanner {
    pub catalog_root: PathBuf,
}

impl CatalogScanner {
    pub fn new(catalog_root: impl Into<PathBuf>) -> Self {
        Self {
            catalog_root: catalog_root.into(),
        }
    }

    /// Tool definitions: every `*.json` outside `strategies/`/`docs/`, not
    /// prefixed `_`, and not the catalog's own cache file.
    pub fn tool_documents(&self) -> Vec<PathBuf> {
        let strategies_root = self.catalog_root.join("strategies");
        let docs_root = self.catalog_root.join("docs");
        let mut paths: Vec<PathBuf> = walk_json(&self.catalog_root)
            .into_iter()
            .filter(|p| !under(p, &strategies_root))
            .filter(|p| !under(p, &docs_root))
            .filter(|p| !file_name_starts_with(p, "_"))
            .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some(CACHE_FILENAME))
            .collect();
        paths.sort();
        paths
    }

    /// Strategy definitions: every non-`_`-prefixed `*.json` under `strategies/`.
    pub fn strategy_documents(&self) -> Vec<PathBuf> {
        let strategies_root = self.catalog_root.join("strategies");
        if !strategies_root.exists() {
            return Vec::new();
        }
        let mut paths: Vec<PathBuf> = walk_json(&strategies_root)
            .into_iter()
            .filter(|p| !file_name_starts_with(p, "_"))
            .collect();
        paths.sort();
        paths
    }

    /// Fragment documents: `_`-prefixed `*.json` outside `strategies/`/`docs/`.
    pub fn fragment_documents(&self) -> Vec<PathBuf> {
        let strategies_root = self.catalog_root.join("strategies");
        let docs_root = self.catalog_root.join("docs");
        let mut paths: Vec<PathBuf> = walk_json(&self.catalog_root)
            .into_iter()
            .filter(|p| !under(p, &strategies_root))
            .filter(|p| !under(p, &docs_root))
            .filter(|p| file_name_starts_with(p, "_"))
            .collect();
        paths.sort();
        paths
    }

    /// Supporting documentation files under `docs/` (any extension).
    pub fn documentation_files(&self) -> Vec<PathBuf> {
        let docs_root = self.catalog_root.join("docs");
        if !docs_root.exists() {
            return Vec::new();
        }
        let mut paths = Vec::new();
        walk_all_files(&docs_root, &mut paths);
        paths.sort();
        paths
    }

    /// Union of all four categories, deduplicated and sorted — the file set
    /// that contributes to the catalog checksum.
    pub fn catalog_files(&self) -> Vec<PathBuf> {
        let mut paths = self.tool_documents();
        paths.extend(self.fragment_documents());
        paths.extend(self.strategy_documents());
        paths.extend(self.documentation_files());
        paths.sort();
        paths.dedup();
        paths
    }
}

fn walk_all_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_all_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

fn file_name_starts_with(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_scan_partitions_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("group/ruff.json"));
        touch(&root.join("_common.json"));
        touch(&root.join("strategies/subprocess.json"));
        touch(&root.join("strategies/_base.json"));
        touch(&root.join("docs/readme.md"));
        touch(&root.join("cache.json"));

        let scanner = CatalogScanner::new(root);
        let tools = scanner.tool_documents();
        assert_eq!(tools, vec![root.join("group/ruff.json")]);

        let fragments = scanner.fragment_documents();
        assert_eq!(fragments, vec![root.join("_common.json")]);

        let strategies = scanner.strategy_documents();
        assert_eq!(strategies, vec![root.join("strategies/subprocess.json")]);

        let docs = scanner.documentation_files();
        assert_eq!(docs, vec![root.join("docs/readme.md")]);
    }

    #[test]
    fn test_catalog_files_deduped_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b_tool.json"));
        touch(&root.join("a_tool.json"));

        let scanner = CatalogScanner::new(root);
        let files = scanner.catalog_files();
        assert_eq!(
            files,
            vec![root.join("a_tool.json"), root.join("b_tool.json")]
        );
    }

    #[test]
    fn test_missing_strategies_and_docs_dirs_return_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = CatalogScanner::new(dir.path());
        assert!(scanner.strategy_documents().is_empty());
        assert!(scanner.documentation_files().is_empty());
    }
}
