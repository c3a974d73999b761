//! Input discovery: the EPUB files directly inside a directory.

use std::path::{Path, PathBuf};

use crate::error::AssetError;

const EPUB_EXTENSION: &str = "epub";

/// List `*.epub` files (not recursive), sorted by path.
///
/// Fails with [`AssetError::InputDirMissing`] when `dir` does not exist and
/// with [`AssetError::NoEbooks`] when it holds no EPUB files.
pub fn find_epubs(dir: &Path) -> Result<Vec<PathBuf>, AssetError> {
    if !dir.is_dir() {
        return Err(AssetError::InputDirMissing(dir.to_path_buf()));
    }

    let mut epubs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e.eq_ignore_ascii_case(EPUB_EXTENSION))
        })
        .collect();

    if epubs.is_empty() {
        return Err(AssetError::NoEbooks(dir.to_path_buf()));
    }
    epubs.sort();
    Ok(epubs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sorted_epubs_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("b.epub"), b"").unwrap();
        std::fs::write(root.join("A.EPUB"), b"").unwrap();
        std::fs::write(root.join("c.pdf"), b"").unwrap();
        std::fs::create_dir(root.join("nested.epub")).unwrap();

        let found = find_epubs(root).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.EPUB", "b.epub"]);
    }

    #[test]
    fn missing_dir() {
        let err = find_epubs(Path::new("/nonexistent/books")).unwrap_err();
        assert!(matches!(err, AssetError::InputDirMissing(_)));
    }

    #[test]
    fn empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(find_epubs(dir.path()), Err(AssetError::NoEbooks(_))));
    }
}
