//! Fatal errors from reading story source text.
//!
//! Almost nothing about malformed story text is fatal: bad lines are logged
//! as warnings and skipped so that a whole batch can load in one pass. The
//! variants here are for input the parser cannot meaningfully continue from.

use std::{error::Error, fmt};

#[derive(Debug)]
/// Fatal error from reading story content.
pub enum ParseError {
    /// The source could not be read at all.
    Io(std::io::Error),
    /// A file path had no file name to report diagnostics against.
    InvalidFileName { path: String },
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Io(err) => write!(f, "could not read story source: {}", err),
            ParseError::InvalidFileName { path } => {
                write!(f, "story file path '{}' has no valid file name", path)
            }
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::Io(err)
    }
}
