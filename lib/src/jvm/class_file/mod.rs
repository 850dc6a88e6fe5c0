//! Binary class file format
//!
//! Everything here maps one-to-one onto the structures in the class file, so reading a class
//! file and writing it back out reproduces the same bytes.

mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod serialize;
mod version;

pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use serialize::*;
pub use version::*;
