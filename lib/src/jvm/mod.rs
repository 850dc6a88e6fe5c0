//! Read, edit, and write JVM classes
//!
//! There are two representations of a class:
//!
//!   - [`class_file::ClassFile`] mirrors the [binary format][0] exactly: every name is an index
//!     into the constant pool.
//!   - [`model::Class`] is the editable structural model. Names, descriptors, signatures, and
//!     annotations are resolved into owned values, so members can be renamed, removed, or moved
//!     from one class into another. Members moved across classes have their remaining attributes
//!     relocated into the new constant pool when the class is written out.
//!
//! ```
//! use mixin::jvm::model::{Class, Method};
//! use mixin::jvm::{AccessFlags, BinaryName, Name, UnqualifiedName};
//!
//! # fn edit() -> Result<(), mixin::jvm::Error> {
//! let mut class = Class::new(
//!     BinaryName::from_string(String::from("me/alec/Point")).unwrap(),
//!     Some(BinaryName::OBJECT),
//!     AccessFlags::PUBLIC | AccessFlags::SUPER,
//! );
//! class.add_method(Method::new(AccessFlags::PUBLIC, UnqualifiedName::INIT, "()V"))?;
//!
//! let bytes = class.to_bytes()?;
//! let parsed = Class::parse(&bytes)?;
//! assert_eq!(parsed.name.as_str(), "me/alec/Point");
//! assert_eq!(parsed.methods.len(), 1);
//! # Ok(())
//! # }
//! # edit().unwrap();
//! ```
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html

mod access_flags;
pub mod class_file;
mod errors;
pub mod model;
mod names;
mod types;

pub use access_flags::*;
pub use errors::*;
pub use names::*;
pub use types::*;
