use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Failures reported by registry and store operations.
///
/// Every variant is recoverable: the requested mutation is declined and the
/// registry is left as it was.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("category '{0}' already exists")]
    AlreadyExists(String),

    #[error("the '{0}' category cannot be removed")]
    Protected(String),

    #[error("'{path}' is already in category '{category}'")]
    DuplicateEntry { category: String, path: String },

    #[error("file not found: {0}")]
    PathNotFound(String),

    #[error("index {index} is out of range for a list of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("category name is empty")]
    EmptyName,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid store file: {0}")]
    Json(#[from] serde_json::Error),
}
