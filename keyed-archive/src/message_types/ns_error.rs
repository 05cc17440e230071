/*!
 Logic and containers for `NSError` objects returned by device services.
*/

use std::{
    error,
    fmt::{Display, Formatter, Result},
};

use crate::util::keyed_archive::models::Archivable;

/// The user info key that holds a human readable description of the error
pub const LOCALIZED_DESCRIPTION_KEY: &str = "NSLocalizedDescription";

/// An archived `NSError`
///
/// # Internal Representation
///
/// Stored as an object with three fields:
///
/// - `NSCode`: the error code, stored inline
/// - `NSDomain`: a reference to the error domain string
/// - `NSUserInfo`: a reference to a dictionary of extra data, or to `$null`
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedError {
    pub code: i64,
    pub domain: String,
    pub user_info: Box<Archivable>,
}

impl ArchivedError {
    pub fn new(code: i64, domain: impl Into<String>, user_info: Archivable) -> Self {
        Self {
            code,
            domain: domain.into(),
            user_info: Box::new(user_info),
        }
    }

    /// The `NSLocalizedDescription` from the user info, if there is one
    pub fn localized_description(&self) -> Option<&str> {
        self.user_info
            .as_dictionary()?
            .get_key(LOCALIZED_DESCRIPTION_KEY)?
            .as_string()
    }
}

impl Display for ArchivedError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        write!(fmt, "{}/{}", self.code, self.domain)?;
        if let Some(description) = self.localized_description() {
            write!(fmt, " {description}")?;
        }
        Ok(())
    }
}

impl error::Error for ArchivedError {}

#[cfg(test)]
mod tests {
    use crate::{
        message_types::ns_error::ArchivedError,
        util::keyed_archive::models::{Archivable, Dictionary},
    };

    #[test]
    fn can_format_without_description() {
        let error = ArchivedError::new(2, "DTXMessage", Archivable::Null);
        assert_eq!(error.to_string(), "2/DTXMessage");
        assert!(error.localized_description().is_none());
    }

    #[test]
    fn can_format_with_description() {
        let mut info = Dictionary::new();
        info.insert(
            "NSLocalizedDescription".into(),
            "Operation not permitted".into(),
        );
        let error = ArchivedError::new(-1, "NSPOSIXErrorDomain", info.into());

        assert_eq!(
            error.localized_description(),
            Some("Operation not permitted")
        );
        assert_eq!(
            error.to_string(),
            "-1/NSPOSIXErrorDomain Operation not permitted"
        );
    }
}
