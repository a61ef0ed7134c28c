use crate::infrastructure::error::InfrastructureError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write content to a file atomically using a temporary file.
///
/// The temporary file lives in the target's directory so the final rename is
/// atomic; a crash leaves either the old file or the new one, never a torn
/// record. The local JSON backend relies on this for its one-file-per-record
/// guarantee.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp_file = tempfile::NamedTempFile::new_in(parent).map_err(InfrastructureError::Io)?;

    temp_file
        .write_all(content.as_ref())
        .map_err(InfrastructureError::Io)?;

    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

/// Non-recursive listing of the `.json` files directly inside `dir`.
/// A missing directory is an empty store, not an error.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, InfrastructureError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            InfrastructureError::Io(std::io::Error::other(e.to_string()))
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_file() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("ABCD12.json");

        atomic_write(&file_path, "{\"user_id\": \"ABCD12\"}")?;

        assert!(file_path.exists());
        let read_content = fs::read_to_string(file_path)?;
        assert_eq!(read_content, "{\"user_id\": \"ABCD12\"}");
        Ok(())
    }

    #[test]
    fn test_atomic_write_overwrites_existing() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.json");

        atomic_write(&file_path, "Initial")?;
        atomic_write(&file_path, "Updated")?;

        let read_content = fs::read_to_string(file_path)?;
        assert_eq!(read_content, "Updated");
        Ok(())
    }

    #[test]
    fn test_list_json_files_skips_other_extensions() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.json"), "{}")?;
        fs::write(dir.path().join("b.json"), "{}")?;
        fs::write(dir.path().join("notes.txt"), "x")?;

        let files = list_json_files(dir.path())?;
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn test_list_json_files_missing_dir_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let files = list_json_files(&dir.path().join("nope"))?;
        assert!(files.is_empty());
        Ok(())
    }
}
