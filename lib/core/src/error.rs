use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty corpus: no usable tokens to build a vector space from")]
    EmptyCorpus,

    #[error("Unknown vector dimension: expected {expected}, got {actual}")]
    UnknownDimension { expected: usize, actual: usize },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),

    #[error("Build cancelled")]
    Cancelled,

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for errors a caller can surface as a "not found" outcome
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ItemNotFound(_))
    }
}
