/*!
 Contains logic and data structures used to encode and decode `NSKeyedArchiver` data.

 ## Overview

 A keyed archive is a property list with four keys:

 - `$archiver`: always `NSKeyedArchiver`
 - `$objects`: a flat table of every object in the graph, where index `0` is `$null`
 - `$top`: a dictionary whose `root` key references the top-level object
 - `$version`: always `100000`

 Composite objects reference their class descriptor through `$class` and their children by index
 into `$objects`, so a string used many times is stored once. Device services use this format for
 every structured reply, including telemetry delivered as `DTTapMessage` records.

 ## Usage

 [`archiver::KeyedArchiver`] encodes [`models::Archivable`] data to bytes and decodes it back.
 The [`encode`] and [`decode`] functions do the same with default options.
*/

use crate::{
    error::{decode::DecodeError, encode::EncodeError},
    util::keyed_archive::{archiver::KeyedArchiver, models::Archivable},
};

pub mod archiver;
pub mod classes;
pub mod interner;
pub mod models;
#[cfg(test)]
mod tests;
pub mod unarchiver;

/// Encode a value with the default [`archiver::ArchiveOptions`]
pub fn encode(object: &Archivable) -> Result<Vec<u8>, EncodeError> {
    KeyedArchiver::new().encode(object)
}

/// Decode an archive with the default [`archiver::ArchiveOptions`]
pub fn decode(bytes: &[u8]) -> Result<Archivable, DecodeError> {
    KeyedArchiver::new().decode(bytes)
}
