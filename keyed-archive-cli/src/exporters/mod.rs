pub mod exporter;
pub mod inspect;
pub mod json;
pub mod txt;
