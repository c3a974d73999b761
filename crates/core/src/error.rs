/// Errors returned by the batch pipelines and per-book catalog entries.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Input directory not found: {0}")]
    InputDirMissing(std::path::PathBuf),

    #[error("No EPUB files found in {0}")]
    NoEbooks(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Decompression ratio {ratio}:1 for {name} exceeds limit {limit}:1")]
    ZipBomb { name: String, ratio: u64, limit: u64 },

    #[error("Unsafe archive entry path: {path}")]
    PathTraversal { path: String },

    #[error("Archive holds {count} entries, limit is {limit}")]
    TooManyEntries { count: u64, limit: u64 },

    #[error("Entry {name} is {size_mb}MB, limit is {limit_mb}MB")]
    OversizedEntry {
        name: String,
        size_mb: u64,
        limit_mb: u64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Malformed EPUB: {0}")]
    Malformed(String),

    #[error("Missing required content: {0}")]
    MissingContent(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not encode PNG: {0}")]
    Encode(String),

    #[error("Placeholder rendering failed: {0}")]
    Placeholder(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Could not serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn fatal_errors_name_the_directory() {
        let err = AssetError::InputDirMissing(PathBuf::from("Bundle Books"));
        assert_eq!(err.to_string(), "Input directory not found: Bundle Books");
        let err = AssetError::NoEbooks(PathBuf::from("books"));
        assert_eq!(err.to_string(), "No EPUB files found in books");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AssetError = io.into();
        assert!(matches!(err, AssetError::Io(_)));
    }

    #[test]
    fn security_errors_surface_as_read_errors() {
        let err: ReadError = SecurityError::PathTraversal {
            path: "../x".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Unsafe archive entry path: ../x");
    }
}
