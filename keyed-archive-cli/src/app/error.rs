/*!
Errors that can happen during the application's runtime
*/

use std::{
    fmt::{Display, Formatter, Result},
    io::Error as IoError,
    path::PathBuf,
};

use json::Error as JsonError;
use keyed_archive::error::{decode::DecodeError, encode::EncodeError};

/// Errors that can happen during the application's runtime
#[derive(Debug)]
pub enum RuntimeError {
    InvalidOptions(String),
    CreateError(IoError, PathBuf),
    DiskError(IoError, PathBuf),
    EncodeError(EncodeError),
    DecodeError(DecodeError),
    InvalidJson(JsonError),
    UnsupportedJson(String),
}

impl Display for RuntimeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            RuntimeError::InvalidOptions(why) => write!(fmt, "Invalid options!\n{why}"),
            RuntimeError::CreateError(why, path) => write!(fmt, "{why}: {path:?}"),
            RuntimeError::DiskError(why, path) => write!(fmt, "Unable to read {path:?}: {why}"),
            RuntimeError::EncodeError(why) => write!(fmt, "Unable to encode archive: {why}"),
            RuntimeError::DecodeError(why) => write!(fmt, "Unable to decode archive: {why}"),
            RuntimeError::InvalidJson(why) => write!(fmt, "Invalid JSON: {why}"),
            RuntimeError::UnsupportedJson(value) => {
                write!(fmt, "JSON value {value} cannot be archived!")
            }
        }
    }
}
