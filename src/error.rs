use std::fmt;

/// Failures at the crate's I/O edges. The highlighting engine itself degrades instead
/// of erroring.
#[derive(Debug)]
pub enum GlossaryError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnknownTerm(String),
    InvalidInput(String),
}

impl fmt::Display for GlossaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlossaryError::Io(err) => write!(f, "io error: {err}"),
            GlossaryError::Parse(err) => write!(f, "parse error: {err}"),
            GlossaryError::UnknownTerm(query) => write!(f, "no glossary term matches {query:?}"),
            GlossaryError::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for GlossaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GlossaryError::Io(err) => Some(err),
            GlossaryError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GlossaryError {
    fn from(value: std::io::Error) -> Self {
        GlossaryError::Io(value)
    }
}

impl From<serde_json::Error> for GlossaryError {
    fn from(value: serde_json::Error) -> Self {
        GlossaryError::Parse(value)
    }
}
