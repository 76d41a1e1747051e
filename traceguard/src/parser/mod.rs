//! Input parsers: ASC board netlists and the driver command file.

pub mod asc;
pub mod driver;

pub use asc::{AscParseError, AscParser};
pub use driver::{DriverParseError, DriverParser};
