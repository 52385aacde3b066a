use std::fmt;

/// Result type for desirepath-transcript operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing a transcript
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// Malformed JSON at a specific line of the stream
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json { line, source } => {
                write!(f, "Malformed JSON at line {}: {}", line, source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
