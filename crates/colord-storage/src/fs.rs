//! Table directory listing

use colord_common::{ColordError, Result};
use std::path::{Path, PathBuf};

/// Turn a table location into a local path.
///
/// `file://` URIs are accepted; other schemes need a mounted gateway and are
/// rejected.
pub fn resolve_path(location: &str) -> Result<PathBuf> {
    if let Some(rest) = location.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if let Some((scheme, _)) = location.split_once("://") {
        return Err(ColordError::Directory(format!(
            "unsupported filesystem scheme '{scheme}' in {location}, mount it locally and pass the mount path"
        )));
    }
    Ok(PathBuf::from(location))
}

/// List the data files of a table directory, sorted by path.
///
/// Sub-directories and hidden or marker files (`.crc`, `_SUCCESS`, ...) are
/// skipped. Fails if `dir` is not a directory or holds no data file.
pub fn list_table_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ColordError::Directory(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        files.push(entry.path());
    }

    if files.is_empty() {
        return Err(ColordError::Directory(format!(
            "no table files found in {}",
            dir.display()
        )));
    }

    files.sort();
    tracing::debug!("Found {} table files in {:?}", files.len(), dir);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            resolve_path("file:///data/t").unwrap(),
            PathBuf::from("/data/t")
        );
        assert_eq!(resolve_path("/data/t").unwrap(), PathBuf::from("/data/t"));
        assert!(resolve_path("hdfs://namenode:9000/data/t").is_err());
    }

    #[test]
    fn test_list_skips_directories_and_markers() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("part-00001.parquet"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("part-00000.parquet"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("_SUCCESS"), b"").unwrap();
        std::fs::write(temp_dir.path().join(".part-00000.parquet.crc"), b"").unwrap();
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();

        let files = list_table_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["part-00000.parquet", "part-00001.parquet"]);
    }

    #[test]
    fn test_list_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();
        let err = list_table_files(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ColordError::Directory(_)));
    }

    #[test]
    fn test_list_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.parquet");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            list_table_files(&file),
            Err(ColordError::Directory(_))
        ));
        assert!(matches!(
            list_table_files(temp_dir.path().join("missing")),
            Err(ColordError::Directory(_))
        ));
    }
}
