use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Caller-facing status an [`Error`] surfaces as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    InvalidArgument,
    NotFound,
    Internal,
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            StatusCode::NotFound => write!(f, "NOT_FOUND"),
            StatusCode::Internal => write!(f, "INTERNAL"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("No businesses match the given preferences")]
    NotFound,

    #[error("Stale index reference: position {offset} (snapshot v{position_version}) against index v{index_version} with {len} records")]
    Consistency {
        offset: usize,
        position_version: u64,
        index_version: u64,
        len: usize,
    },

    #[error("Index does not support {0} queries")]
    ModeUnavailable(&'static str),

    #[error("Feature index not loaded")]
    IndexNotLoaded,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map the error onto the status a query caller sees.
    ///
    /// `MalformedEvent` never reaches a caller in practice; it maps to
    /// `InvalidArgument` for completeness.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::MalformedEvent(_) => StatusCode::InvalidArgument,
            Error::NotFound => StatusCode::NotFound,
            Error::Consistency { .. }
            | Error::ModeUnavailable(_)
            | Error::IndexNotLoaded
            | Error::Upstream(_)
            | Error::Persistence(_)
            | Error::Serialization(_)
            | Error::Io(_) => StatusCode::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
