//! Error types for cumulus-cloud

use thiserror::Error;

/// Errors raised while talking to an object store
#[derive(Error, Debug)]
pub enum CloudError {
    /// The object store rejected or failed a request
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unsupported store URL
    #[error("Invalid store URL: {0}")]
    InvalidPath(String),

    /// A writer gave up on its upload after an earlier failure
    #[error("Upload of {0} was aborted")]
    UploadAborted(String),

    /// The background runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result alias for cloud operations
pub type Result<T> = std::result::Result<T, CloudError>;

impl CloudError {
    /// Whether the store reported the object as missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudError::ObjectStore(object_store::Error::NotFound { .. })
        )
    }

    /// Convert into a core error, naming the key or prefix that was accessed
    pub fn into_core(self, context: &str) -> cumulus_core::Error {
        match self {
            CloudError::ObjectStore(object_store::Error::NotFound { .. }) => {
                cumulus_core::Error::NotFound(context.to_string())
            }
            CloudError::ObjectStore(object_store::Error::AlreadyExists { .. }) => {
                cumulus_core::Error::AlreadyExists(context.to_string())
            }
            CloudError::Io(e) => cumulus_core::Error::Io(e),
            other => cumulus_core::Error::backend(context, other),
        }
    }
}

impl From<CloudError> for std::io::Error {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Io(io_err) => io_err,
            CloudError::ObjectStore(object_store::Error::NotFound { path, .. }) => {
                std::io::Error::new(std::io::ErrorKind::NotFound, path)
            }
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> CloudError {
        CloudError::ObjectStore(object_store::Error::NotFound {
            path: "a/b".to_string(),
            source: "gone".into(),
        })
    }

    #[test]
    fn test_not_found_maps_to_core_not_found() {
        let err = not_found();
        assert!(err.is_not_found());
        assert!(err.into_core("a/b").is_not_found());
    }

    #[test]
    fn test_other_errors_are_backend_failures() {
        let err = CloudError::Runtime("boom".to_string()).into_core("prefix/");
        match err {
            cumulus_core::Error::BackendUnavailable { context, message } => {
                assert_eq!(context, "prefix/");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_io_conversion() {
        let io: std::io::Error = not_found().into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_already_exists_names_the_key() {
        let err = CloudError::ObjectStore(object_store::Error::AlreadyExists {
            path: "/tmp/store/dst".to_string(),
            source: "taken".into(),
        });
        match err.into_core("dst") {
            cumulus_core::Error::AlreadyExists(key) => assert_eq!(key, "dst"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
