/*!
 Errors that can happen when rebuilding native data from a keyed archive.
*/

use std::{
    error,
    fmt::{Display, Formatter, Result},
};

/// Errors that can happen when decoding a keyed archive
#[derive(Debug)]
pub enum DecodeError {
    /// The bytes are not a valid property list
    MalformedArchive(plist::Error),
    /// A reference points outside of the objects table; holds the index and the table length
    MalformedRoot(usize, usize),
    /// A field is missing or holds the wrong kind of data; holds the field and the expected kind
    TypeMismatch(String, String),
    /// The most-derived class of an object is not in the class registry
    UnknownClass(String),
    /// An object references itself, directly or through its children
    CyclicReference(usize),
    /// Objects are nested deeper than the configured limit
    DepthExceeded(usize),
    /// Shared objects expand to more values than the configured limit
    ObjectLimitExceeded(usize),
}

impl Display for DecodeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            DecodeError::MalformedArchive(why) => write!(fmt, "Failed to parse archive: {why}"),
            DecodeError::MalformedRoot(idx, len) => {
                write!(fmt, "Reference {idx} is outside of objects table of length {len}!")
            }
            DecodeError::TypeMismatch(field, expected) => {
                write!(fmt, "Field {field} is not a valid {expected}!")
            }
            DecodeError::UnknownClass(name) => write!(fmt, "Unknown archived class: {name}"),
            DecodeError::CyclicReference(idx) => {
                write!(fmt, "Object {idx} references itself!")
            }
            DecodeError::DepthExceeded(limit) => {
                write!(fmt, "Objects are nested more than {limit} levels deep!")
            }
            DecodeError::ObjectLimitExceeded(limit) => {
                write!(fmt, "Archive expands to more than {limit} objects!")
            }
        }
    }
}

impl error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DecodeError::MalformedArchive(why) => Some(why),
            _ => None,
        }
    }
}

impl DecodeError {
    pub(crate) fn mismatch(field: impl Into<String>, expected: impl Into<String>) -> Self {
        DecodeError::TypeMismatch(field.into(), expected.into())
    }
}
