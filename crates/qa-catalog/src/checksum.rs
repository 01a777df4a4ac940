//! Catalog checksum computation (spec §4.1).

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// SHA-256 over `relative_path || 0x00 || file_contents` for each path, in
/// the order given. Callers must pass a sorted, deduplicated file list —
/// this function does not sort.
pub fn compute_catalog_checksum(catalog_root: &Path, paths: &[PathBuf]) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    for path in paths {
        let relative = path
            .strip_prefix(catalog_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(path)?);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Extend a base checksum with a canonical JSON payload contributed by a
/// plugin factory (spec §4.1 "Plugin contributions").
pub fn extend_checksum_with_payload(base_checksum: &str, payload: &serde_json::Value) -> String {
    let canonical = serde_json::to_vec(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(base_checksum.as_bytes());
    hasher.update(canonical);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_checksum_stable_for_same_contents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let file_a = root.join("a.json");
        let file_b = root.join("b.json");
        fs::write(&file_a, r#"{"x":1}"#).unwrap();
        fs::write(&file_b, r#"{"y":2}"#).unwrap();

        let paths = vec![file_a.clone(), file_b.clone()];
        let first = compute_catalog_checksum(root, &paths).unwrap();
        let second = compute_catalog_checksum(root, &paths).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let file_a = root.join("a.json");
        fs::write(&file_a, r#"{"x":1}"#).unwrap();
        let before = compute_catalog_checksum(root, &[file_a.clone()]).unwrap();

        fs::write(&file_a, r#"{"x":2}"#).unwrap();
        let after = compute_catalog_checksum(root, &[file_a]).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_checksum_order_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let file_a = root.join("a.json");
        let file_b = root.join("b.json");
        fs::write(&file_a, "a").unwrap();
        fs::write(&file_b, "b").unwrap();

        let forward = compute_catalog_checksum(root, &[file_a.clone(), file_b.clone()]).unwrap();
        let reverse = compute_catalog_checksum(root, &[file_b, file_a]).unwrap();
        assert_ne!(forward, reverse);
    }

    #[test]
    fn test_extend_checksum_with_payload_changes_result() {
        let base = "deadbeef";
        let payload = serde_json::json!({"plugin": "extra"});
        let extended = extend_checksum_with_payload(base, &payload);
        assert_ne!(extended, base);
        let again = extend_checksum_with_payload(base, &payload);
        assert_eq!(extended, again);
    }
}
