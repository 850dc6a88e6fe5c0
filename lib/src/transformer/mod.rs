//! Passes which edit every class in a directory (or jar) of compiled classes
//!
//! A [`ClassTransformer`] holds two kinds of transformers:
//!
//!   - untargeted transformers (see [`ClassTransformer::add_transformer`]) which see every class
//!   - targeted transformers (see [`ClassTransformer::add_targeted_transformer`]) which only see
//!     the classes they name
//!
//! Classes which no transformer touches are copied through byte-for-byte.

mod archive;
mod class_transformer;
mod files;

pub use archive::*;
pub use class_transformer::*;
pub use files::*;
