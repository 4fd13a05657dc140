//! Whole-file JSON persistence with replace-on-write.

use std::io::Write;
use std::path::Path;

use dealscout_shared::{DealScoutError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

/// Read and decode a JSON file. `Ok(None)` when the file does not exist.
///
/// A file that exists but does not decode is a storage error, never an
/// empty state.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DealScoutError::io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| DealScoutError::Storage(format!("corrupt state file {}: {e}", path.display())))
}

/// Serialize `value` to a sibling temp file, fsync it, then rename it over `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| DealScoutError::io(dir, e))?;

    let body = serde_json::to_vec_pretty(value)
        .map_err(|e| DealScoutError::Storage(format!("failed to serialize state: {e}")))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DealScoutError::io(dir, e))?;
    tmp.write_all(&body)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| DealScoutError::io(tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| DealScoutError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let value: Option<BTreeMap<String, u32>> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn write_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("counts.json");

        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1u32);
        write_json(&path, &map).unwrap();
        map.insert("b".to_string(), 2);
        write_json(&path, &map).unwrap();

        let back: BTreeMap<String, u32> = read_json(&path).unwrap().unwrap();
        assert_eq!(back.len(), 2);

        // No stray temp files left beside the target.
        let files: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_json::<BTreeMap<String, u32>>(&path).unwrap_err();
        assert!(matches!(err, DealScoutError::Storage(_)));
    }
}
