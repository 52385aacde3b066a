use std::fmt;

/// Result type for desirepath-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the storage layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Insert with an identifier that already exists
    Duplicate(String),

    /// Remote transport failed (used by the HTTP store implementation)
    Transport(String),

    /// Invalid input (bad filter value, malformed payload, unknown field)
    Invalid(String),

    /// The caller's cancellation token fired; any in-flight transaction
    /// was rolled back
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "Database error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Duplicate(id) => write!(f, "Duplicate identifier: {}", id),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::Invalid(msg) => write!(f, "Invalid input: {}", msg),
            Error::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Duplicate(_) | Error::Transport(_) | Error::Invalid(_) | Error::Cancelled => {
                None
            }
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
