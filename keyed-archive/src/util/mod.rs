/*!
 This module defines the keyed archive codec and the utilities it is built on.
*/

pub mod dates;
pub mod keyed_archive;
pub mod plist;
