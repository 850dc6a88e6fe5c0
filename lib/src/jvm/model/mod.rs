//! Semantic representations of classes
//!
//! This is the representation to use while editing classes. Names, descriptors, signatures, and
//! annotations are decoded into owned values, while everything else (method bodies included) is
//! kept encoded.
//!
//!   - __Class__ is represented using [`Class`]
//!   - __Method__ and __Field__ are both represented using [`Member`]
//!
//! Members carry the constant pool their encoded attributes refer to. Moving a member into another
//! class is done with [`Member::transplant`], and then the encoded attributes get relocated into
//! the constant pool of the new class when it is written out.

mod annotation;
mod class;
mod member;
mod relocate;
mod remap;

pub use annotation::*;
pub use class::*;
pub use member::{Field, Member, Method, RawAttribute};
pub use relocate::*;
pub use remap::*;
