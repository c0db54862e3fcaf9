//! Errors from writing or reading compiled story files.

use crate::error::ParseError;

use std::{error::Error, fmt};

#[derive(Debug)]
/// Error from compiling stories to binary or loading them back.
pub enum CompileError {
    /// Reading or writing a file failed.
    Io(std::io::Error),
    /// The binary payload could not be encoded or decoded.
    Encoding(bincode::Error),
    /// The file did not start with the expected magic bytes.
    BadMagic,
    /// The file was written by an incompatible format version.
    BadVersion { found: u32, expected: u32 },
    /// Parsing the source file failed before compilation could start.
    Parse(ParseError),
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CompileError::Io(err) => Some(err),
            CompileError::Encoding(err) => Some(err),
            CompileError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::Io(err) => write!(f, "compiled story i/o failed: {}", err),
            CompileError::Encoding(err) => write!(f, "compiled story encoding failed: {}", err),
            CompileError::BadMagic => write!(f, "not a compiled story file"),
            CompileError::BadVersion { found, expected } => write!(
                f,
                "compiled story format version {} does not match expected {}",
                found, expected
            ),
            CompileError::Parse(err) => write!(f, "{}", err),
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::Io(err)
    }
}

impl From<bincode::Error> for CompileError {
    fn from(err: bincode::Error) -> Self {
        CompileError::Encoding(err)
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        CompileError::Parse(err)
    }
}
