/*!
 Logic and containers for `DTTapMessage` telemetry records.

 Instruments services such as `sysmontap` stream samples wrapped in `DTTapMessage` or
 `DTSysmonTapMessage` objects. Both carry a single `DTTapMessagePlist` payload, usually a
 dictionary of sample data.
*/

use crate::util::keyed_archive::models::{Archivable, Dictionary};

/// A tap message and its payload
#[derive(Debug, Clone, PartialEq)]
pub struct TapMessage {
    payload: Box<Archivable>,
}

impl TapMessage {
    pub fn new(payload: Archivable) -> Self {
        Self {
            payload: Box::new(payload),
        }
    }

    pub fn payload(&self) -> &Archivable {
        &self.payload
    }

    pub fn into_payload(self) -> Archivable {
        *self.payload
    }

    /// The payload, if it is a dictionary
    pub fn message(&self) -> Option<&Dictionary> {
        self.payload.as_dictionary()
    }

    /// Get a value from a dictionary payload
    pub fn get(&self, key: &str) -> Option<&Archivable> {
        self.message()?.get_key(key)
    }
}
