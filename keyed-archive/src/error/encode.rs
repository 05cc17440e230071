/*!
 Errors that can happen when building a keyed archive from native data.
*/

use std::{
    error,
    fmt::{Display, Formatter, Result},
};

/// Errors that can happen when encoding an [`Archivable`](crate::util::keyed_archive::models::Archivable)
#[derive(Debug)]
pub enum EncodeError {
    /// The value, or one nested inside of it, has no representation in the archive
    UnsupportedType(&'static str),
    /// The finished archive could not be written as a binary property list
    Serialization(plist::Error),
}

impl Display for EncodeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            EncodeError::UnsupportedType(kind) => {
                write!(fmt, "Values of type {kind} cannot be archived!")
            }
            EncodeError::Serialization(why) => {
                write!(fmt, "Failed to serialize archive: {why}")
            }
        }
    }
}

impl error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            EncodeError::Serialization(why) => Some(why),
            EncodeError::UnsupportedType(_) => None,
        }
    }
}
