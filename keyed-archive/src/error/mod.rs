/*!
 Errors that can happen when archiving or unarchiving keyed archive data.
*/

pub mod decode;
pub mod encode;
