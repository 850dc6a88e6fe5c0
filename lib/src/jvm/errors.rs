use crate::jvm::class_file::Constant;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A jar could not be read or written
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The bytes do not describe a well-formed class file
    #[error("malformed class file: {0}")]
    MalformedClass(String),

    /// A constant pool index is out of range or points at the wrong kind of constant
    #[error("bad constant pool index #{index}: expected {expected}")]
    BadConstantIndex { index: u16, expected: &'static str },

    /// The constant pool is full (the largest index is 65535)
    #[error("constant pool overflow at offset {offset} while adding {constant:?}")]
    ConstantPoolOverflow { constant: Constant, offset: u16 },

    /// A constant which cannot be moved into another class' constant pool
    ///
    /// `invokedynamic` and dynamically-computed constants point into the `BootstrapMethods`
    /// attribute of the class they were compiled into.
    #[error("constant #{index} ({kind}) cannot be relocated into another class")]
    UnrelocatableConstant { index: u16, kind: &'static str },

    /// An `ldc` instruction has a one byte operand, so it can only refer to the first 255
    /// constants. Widening it to `ldc_w` would shift every following instruction.
    #[error("relocated `ldc` operand #{0} no longer fits in one byte")]
    LdcIndexOverflow(u16),

    /// An instruction opcode that does not exist
    #[error("unknown opcode 0x{opcode:02x} at bytecode offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    /// A field or method descriptor (or generic signature) failed to parse
    #[error("bad descriptor '{descriptor}': {reason}")]
    BadDescriptor { descriptor: String, reason: String },

    /// Descriptor and generic signature have a different number of type slots
    #[error("descriptor '{descriptor}' and signature '{signature}' do not line up")]
    SignatureMismatch {
        descriptor: String,
        signature: String,
    },

    /// Asked for the class name of a primitive (or array) type
    #[error("can't get class name for primitive type '{0}'")]
    PrimitiveClassName(String),

    /// A member with the same name and descriptor is already present
    #[error("class {class} already has a member {member}")]
    DuplicateMember { class: String, member: String },
}
