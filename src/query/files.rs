//! Definition file discovery and content hashing.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extension of query definition files.
pub const DEFINITION_EXTENSION: &str = "toml";

/// Recursively list definition files under `directory`, sorted by path.
pub fn list_definition_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory) {
        let entry = entry
            .with_context(|| format!("Failed to scan query directory {}", directory.display()))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(DEFINITION_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// The query name for a definition file: its file name without extension.
pub fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lowercase hex SHA-256 of raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("webtrack_test_files_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn test_hash_known_value() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_bytes(b"").len(), 64);
    }

    #[test]
    fn test_list_definition_files_recursive() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("b.toml"), "").unwrap();
        std::fs::write(dir.join("a.toml"), "").unwrap();
        std::fs::write(dir.join("notes.txt"), "").unwrap();
        std::fs::write(dir.join("nested").join("c.toml"), "").unwrap();

        let files = list_definition_files(&dir).unwrap();
        let names: Vec<String> = files.iter().map(|p| name_from_path(p)).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_list_missing_directory() {
        assert!(list_definition_files(Path::new("/nonexistent/queries")).is_err());
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(name_from_path(Path::new("queries/bitcoin.toml")), "bitcoin");
        assert_eq!(name_from_path(Path::new("versions.toml")), "versions");
    }
}
