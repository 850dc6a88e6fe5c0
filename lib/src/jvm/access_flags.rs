use crate::jvm::class_file::{Deserialize, Serialize};
use bitflags::bitflags;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Result;

bitflags! {
    /// Access flags on classes, fields, and methods
    ///
    /// The JVM reuses some bits with a different meaning depending on where the flags are found
    /// (eg. `0x0020` is `ACC_SUPER` on a class but `ACC_SYNCHRONIZED` on a method). Directives
    /// can apply to any kind of member, so a single set of flags covers all of them.
    ///
    ///   - [classes](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.1-200-E.1)
    ///   - [fields](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.5-200-A.1)
    ///   - [methods](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.6-200-A.1)
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

impl AccessFlags {
    /// Look up a flag by its Java keyword (or descriptive) name, eg. `public` or `synthetic`
    pub fn from_name(name: &str) -> Option<AccessFlags> {
        let flag = match name.to_ascii_lowercase().as_str() {
            "public" => AccessFlags::PUBLIC,
            "private" => AccessFlags::PRIVATE,
            "protected" => AccessFlags::PROTECTED,
            "static" => AccessFlags::STATIC,
            "final" => AccessFlags::FINAL,
            "super" => AccessFlags::SUPER,
            "synchronized" => AccessFlags::SYNCHRONIZED,
            "volatile" => AccessFlags::VOLATILE,
            "bridge" => AccessFlags::BRIDGE,
            "transient" => AccessFlags::TRANSIENT,
            "varargs" => AccessFlags::VARARGS,
            "native" => AccessFlags::NATIVE,
            "interface" => AccessFlags::INTERFACE,
            "abstract" => AccessFlags::ABSTRACT,
            "strict" | "strictfp" => AccessFlags::STRICT,
            "synthetic" => AccessFlags::SYNTHETIC,
            "annotation" => AccessFlags::ANNOTATION,
            "enum" => AccessFlags::ENUM,
            "module" => AccessFlags::MODULE,
            _ => return None,
        };
        Some(flag)
    }

    /// Widen the visibility of a field or method
    ///
    /// `private` is always dropped. With `make_public` the member becomes `public`, otherwise
    /// anything that isn't already `public` becomes `protected`.
    pub fn make_accessible(self, make_public: bool) -> AccessFlags {
        let flags = self - AccessFlags::PRIVATE;
        if make_public {
            (flags - AccessFlags::PROTECTED) | AccessFlags::PUBLIC
        } else if flags.contains(AccessFlags::PUBLIC) {
            flags
        } else {
            flags | AccessFlags::PROTECTED
        }
    }

    /// Widen the visibility of a top-level class
    ///
    /// Classes only have `public` or package visibility, so this is a no-op unless `make_public`.
    pub fn make_class_accessible(self, make_public: bool) -> AccessFlags {
        if make_public {
            self | AccessFlags::PUBLIC
        } else {
            self
        }
    }
}

impl Serialize for AccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Deserialize for AccessFlags {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        Ok(AccessFlags::from_bits_truncate(u16::deserialize(reader)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(AccessFlags::from_name("public"), Some(AccessFlags::PUBLIC));
        assert_eq!(AccessFlags::from_name("STRICTFP"), Some(AccessFlags::STRICT));
        assert_eq!(AccessFlags::from_name("friendly"), None);
    }

    #[test]
    fn accessible_members() {
        let private = AccessFlags::PRIVATE | AccessFlags::FINAL;
        assert_eq!(
            private.make_accessible(false),
            AccessFlags::PROTECTED | AccessFlags::FINAL
        );
        assert_eq!(
            private.make_accessible(true),
            AccessFlags::PUBLIC | AccessFlags::FINAL
        );
        assert_eq!(
            AccessFlags::PUBLIC.make_accessible(false),
            AccessFlags::PUBLIC
        );
        assert_eq!(
            AccessFlags::PROTECTED.make_accessible(true),
            AccessFlags::PUBLIC
        );
    }

    #[test]
    fn accessible_classes() {
        let package = AccessFlags::SUPER | AccessFlags::FINAL;
        assert_eq!(package.make_class_accessible(false), package);
        assert_eq!(
            package.make_class_accessible(true),
            package | AccessFlags::PUBLIC
        );
    }
}
