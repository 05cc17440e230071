use keyed_archive::util::keyed_archive::models::Archivable;

use crate::app::error::RuntimeError;

/// Defines behavior for rendering decoded archives to the desired output format
pub trait Writer {
    /// Render a value and everything it contains
    fn format_value(&self, value: &Archivable) -> String;
}

/// Defines behavior for building values to archive from another format
pub trait Reader {
    /// Parse a document into a value
    fn parse_value(&self, text: &str) -> Result<Archivable, RuntimeError>;
}
