/*!
 This module contains types of structured data that device services deliver inside keyed archives.
*/

pub mod ns_error;
pub mod tap;
