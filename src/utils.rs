use crate::frames::error::DataError;
use log::debug;
use std::io;
use std::path::{Path, PathBuf};

pub(crate) fn ensure_dir_exists(path: &Path) -> Result<(), DataError> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(DataError::DirCreation(
                    path.to_path_buf(),
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "path exists but is not a directory",
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Creating directory: {}", path.display());
            std::fs::create_dir_all(path)
                .map_err(|e| DataError::DirCreation(path.to_path_buf(), e))
        }
        Err(e) => Err(DataError::DirCreation(path.to_path_buf(), e)),
    }
}

pub(crate) fn ensure_parent_exists(file: &Path) -> Result<(), DataError> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir_exists(parent),
        _ => Ok(()),
    }
}

/// Regular files directly inside `dir`, sorted by name.
///
/// Day-partitioned files carry their date in the name, so name order is date order.
pub(crate) fn list_files_sorted(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    if !dir.is_dir() {
        return Err(DataError::MissingUpstreamFile(dir.to_path_buf()));
    }
    let entries = std::fs::read_dir(dir).map_err(|e| DataError::DirRead(dir.to_path_buf(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DataError::DirRead(dir.to_path_buf(), e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_in_name_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("ld_grid_20180402.csv"), "a")?;
        std::fs::write(dir.path().join("ld_grid_20180331.csv"), "a")?;
        std::fs::create_dir(dir.path().join("nested"))?;
        let files = list_files_sorted(dir.path())?;
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["ld_grid_20180331.csv", "ld_grid_20180402.csv"]);
        Ok(())
    }

    #[test]
    fn missing_dir_is_missing_upstream() {
        let err = list_files_sorted(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, DataError::MissingUpstreamFile(_)));
    }

    #[test]
    fn creates_nested_parent() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("a").join("b").join("out.csv");
        ensure_parent_exists(&file)?;
        assert!(dir.path().join("a").join("b").is_dir());
        Ok(())
    }
}
