#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod error;
pub mod message_types;
pub mod util;

pub use util::keyed_archive::{decode, encode};
