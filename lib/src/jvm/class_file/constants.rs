use crate::jvm::class_file::{
    invalid_data, read_bytes, Attribute, AttributeLike, Deserialize, Serialize,
};
use crate::jvm::Error;
use crate::util::{Offset, OffsetVec, Width};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::result::Result;

/// Constants as in the constant pool
///
/// Floating point constants are kept as their raw bits, so that constants can be hashed and
/// compared exactly (`NaN` payloads and `-0.0` included).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(u32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`
    Double(u64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,

        /// Depending on the method kind, this points to different things:
        ///
        ///   - `FieldRef` for `GetField`, `GetStatic`, `PutField`, `PutStatic`
        ///   - `MethodRef` for the rest
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Module (only in `module-info` classes)
    Module(Utf8ConstantIndex),

    /// Package exported or opened by a module
    Package(Utf8ConstantIndex),
}

impl Constant {
    /// Name of the kind of constant, as it appears in the JVM specification
    pub fn kind(&self) -> &'static str {
        match self {
            Constant::Class(_) => "Class",
            Constant::FieldRef(_, _) => "Fieldref",
            Constant::MethodRef {
                is_interface: false,
                ..
            } => "Methodref",
            Constant::MethodRef { .. } => "InterfaceMethodref",
            Constant::String(_) => "String",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::Utf8(_) => "Utf8",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType { .. } => "MethodType",
            Constant::Dynamic { .. } => "Dynamic",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
            Constant::Module(_) => "Module",
            Constant::Package(_) => "Package",
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(string) => {
                1u8.serialize(writer)?;
                let buffer: Vec<u8> = encode_modified_utf8(string);
                (buffer.len() as u16).serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(float) => {
                4u8.serialize(writer)?;
                float.serialize(writer)?;
            }
            Constant::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(double) => {
                6u8.serialize(writer)?;
                double.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(bytes) => {
                8u8.serialize(writer)?;
                bytes.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                (if !is_interface { 10u8 } else { 11u8 }).serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                15u8.serialize(writer)?;
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => {
                16u8.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            } => {
                17u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            } => {
                18u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::Module(name) => {
                19u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::Package(name) => {
                20u8.serialize(writer)?;
                name.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Deserialize for Constant {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let tag = u8::deserialize(reader)?;
        let constant = match tag {
            1 => {
                let len = u16::deserialize(reader)?;
                let bytes = read_bytes(reader, len as usize)?;
                Constant::Utf8(decode_modified_utf8(&bytes).map_err(invalid_data)?)
            }
            3 => Constant::Integer(i32::deserialize(reader)?),
            4 => Constant::Float(u32::deserialize(reader)?),
            5 => Constant::Long(i64::deserialize(reader)?),
            6 => Constant::Double(u64::deserialize(reader)?),
            7 => Constant::Class(Utf8ConstantIndex::deserialize(reader)?),
            8 => Constant::String(Utf8ConstantIndex::deserialize(reader)?),
            9 => Constant::FieldRef(
                ClassConstantIndex::deserialize(reader)?,
                NameAndTypeConstantIndex::deserialize(reader)?,
            ),
            10 | 11 => Constant::MethodRef {
                class: ClassConstantIndex::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::deserialize(reader)?,
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            15 => Constant::MethodHandle {
                handle_kind: HandleKind::deserialize(reader)?,
                member: ConstantIndex::deserialize(reader)?,
            },
            16 => Constant::MethodType {
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            19 => Constant::Module(Utf8ConstantIndex::deserialize(reader)?),
            20 => Constant::Package(Utf8ConstantIndex::deserialize(reader)?),
            other => return Err(invalid_data(format!("unknown constant tag {}", other))),
        };
        Ok(constant)
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for c in string.chars() {
        // Handle the exception for how `\u{0000}` is represented
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }

            // Supplementary characters: main divergence from unicode
            _ => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x1F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

/// Inverse of [`encode_modified_utf8`]
///
/// Every 1, 2, or 3 byte group decodes into one UTF-16 code unit. Supplementary characters come
/// out as surrogate pairs, which get recombined at the end. Unpaired surrogates are legal in the
/// JVM but can't be represented in a Rust `String`, so they are rejected.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, String> {
    fn continuation(byte: Option<u8>) -> Result<u16, String> {
        match byte {
            Some(byte) if byte & 0b1100_0000 == 0b1000_0000 => Ok((byte & 0x3F) as u16),
            Some(byte) => Err(format!("expected continuation byte, found 0x{:02x}", byte)),
            None => Err(String::from("truncated multi-byte character")),
        }
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut bytes = bytes.iter().copied();
    while let Some(byte) = bytes.next() {
        let unit = if byte & 0b1000_0000 == 0 {
            byte as u16
        } else if byte & 0b1110_0000 == 0b1100_0000 {
            ((byte & 0x1F) as u16) << 6 | continuation(bytes.next())?
        } else if byte & 0b1111_0000 == 0b1110_0000 {
            let second = continuation(bytes.next())?;
            let third = continuation(bytes.next())?;
            ((byte & 0x0F) as u16) << 12 | second << 6 | third
        } else {
            return Err(format!("invalid leading byte 0x{:02x}", byte));
        };
        units.push(unit);
    }

    String::from_utf16(&units).map_err(|_| String::from("unpaired surrogate"))
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the JVM specification:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2. The constant_pool
/// > index n+1 must be valid but is considered unusable.
/// >
/// > In retrospect, making 8-byte constants take two constant pool entries was a poor choice.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct Utf8ConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ClassConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct NameAndTypeConstantIndex(pub ConstantIndex);

impl From<Utf8ConstantIndex> for ConstantIndex {
    fn from(index: Utf8ConstantIndex) -> ConstantIndex {
        index.0
    }
}
impl From<ClassConstantIndex> for ConstantIndex {
    fn from(index: ClassConstantIndex) -> ConstantIndex {
        index.0
    }
}
impl From<NameAndTypeConstantIndex> for ConstantIndex {
    fn from(index: NameAndTypeConstantIndex) -> ConstantIndex {
        index.0
    }
}

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for Utf8ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for ClassConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for NameAndTypeConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(ConstantIndex(u16::deserialize(reader)?))
    }
}
impl Deserialize for Utf8ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Utf8ConstantIndex(ConstantIndex::deserialize(reader)?))
    }
}
impl Deserialize for ClassConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(ClassConstantIndex(ConstantIndex::deserialize(reader)?))
    }
}
impl Deserialize for NameAndTypeConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(NameAndTypeConstantIndex(ConstantIndex::deserialize(reader)?))
    }
}

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let byte: u8 = match self {
            HandleKind::GetField => 1,
            HandleKind::GetStatic => 2,
            HandleKind::PutField => 3,
            HandleKind::PutStatic => 4,
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        };
        byte.serialize(writer)
    }
}

impl Deserialize for HandleKind {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let kind = match u8::deserialize(reader)? {
            1 => HandleKind::GetField,
            2 => HandleKind::GetStatic,
            3 => HandleKind::PutField,
            4 => HandleKind::PutStatic,
            5 => HandleKind::InvokeVirtual,
            6 => HandleKind::InvokeStatic,
            7 => HandleKind::InvokeSpecial,
            8 => HandleKind::NewInvokeSpecial,
            9 => HandleKind::InvokeInterface,
            other => return Err(invalid_data(format!("unknown method handle kind {}", other))),
        };
        Ok(kind)
    }
}

/// Constant pool of a class file that has been read in
///
/// Indexing starts at 1 and wide constants take up two slots (see [`OffsetVec`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    constants: OffsetVec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        ConstantPool::new()
    }
}

impl ConstantPool {
    /// Empty constants pool
    pub fn new() -> ConstantPool {
        ConstantPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
        }
    }

    /// Number of constants (not slots) in the pool
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> + '_ {
        self.constants
            .iter()
            .map(|(offset, _, constant)| (ConstantIndex(offset.0 as u16), constant))
    }

    /// Look up a constant by its index
    pub fn get(&self, index: impl Into<ConstantIndex>) -> Result<&Constant, Error> {
        let index = index.into();
        self.constants
            .get_offset(Offset(index.0 as usize))
            .ok_or(Error::BadConstantIndex {
                index: index.0,
                expected: "constant",
            })
    }

    /// Look up a `CONSTANT_Utf8_info`
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.get(index)? {
            Constant::Utf8(string) => Ok(string),
            _ => Err(Error::BadConstantIndex {
                index: (index.0).0,
                expected: "Utf8",
            }),
        }
    }

    /// Look up the name inside a `CONSTANT_Class_info`
    pub fn class_name(&self, index: ClassConstantIndex) -> Result<&str, Error> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(Error::BadConstantIndex {
                index: (index.0).0,
                expected: "Class",
            }),
        }
    }

    /// Look up the name and descriptor inside a `CONSTANT_NameAndType_info`
    pub fn name_and_type(&self, index: NameAndTypeConstantIndex) -> Result<(&str, &str), Error> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(Error::BadConstantIndex {
                index: (index.0).0,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolve a constant into a form that doesn't depend on this pool
    ///
    /// Dynamically-computed constants refer to the `BootstrapMethods` of the class that holds this
    /// pool, so they can't be resolved.
    pub fn resolve(&self, index: ConstantIndex) -> Result<ConstantData, Error> {
        let data = match self.get(index)? {
            Constant::Utf8(string) => ConstantData::Utf8(string.clone()),
            Constant::Class(name) => ConstantData::Class(self.utf8(*name)?.to_owned()),
            Constant::String(string) => ConstantData::String(self.utf8(*string)?.to_owned()),
            Constant::Integer(integer) => ConstantData::Integer(*integer),
            Constant::Float(float) => ConstantData::Float(*float),
            Constant::Long(long) => ConstantData::Long(*long),
            Constant::Double(double) => ConstantData::Double(*double),
            Constant::NameAndType { name, descriptor } => ConstantData::NameAndType {
                name: self.utf8(*name)?.to_owned(),
                descriptor: self.utf8(*descriptor)?.to_owned(),
            },
            Constant::FieldRef(class, name_and_type) => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                ConstantData::FieldRef {
                    class: self.class_name(*class)?.to_owned(),
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                }
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                ConstantData::MethodRef {
                    class: self.class_name(*class)?.to_owned(),
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                    is_interface: *is_interface,
                }
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => ConstantData::MethodHandle {
                handle_kind: *handle_kind,
                member: Box::new(self.resolve(*member)?),
            },
            Constant::MethodType { descriptor } => {
                ConstantData::MethodType(self.utf8(*descriptor)?.to_owned())
            }
            Constant::Module(name) => ConstantData::Module(self.utf8(*name)?.to_owned()),
            Constant::Package(name) => ConstantData::Package(self.utf8(*name)?.to_owned()),
            constant @ (Constant::Dynamic { .. } | Constant::InvokeDynamic { .. }) => {
                return Err(Error::UnrelocatableConstant {
                    index: index.0,
                    kind: constant.kind(),
                })
            }
        };
        Ok(data)
    }
}

/// Size is the offset of the next constant to be added (so it includes the unusable 0 index and
/// counts wide constants twice)
impl Serialize for ConstantPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.constants.offset_len().0 as u16).serialize(writer)?;
        for (_, _, constant) in &self.constants {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl Deserialize for ConstantPool {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let count = u16::deserialize(reader)? as usize;
        let mut pool = ConstantPool::new();
        while pool.constants.offset_len().0 < count {
            pool.constants.push(Constant::deserialize(reader)?);
        }
        if pool.constants.offset_len().0 != count {
            return Err(invalid_data("wide constant overruns the constant pool"));
        }
        Ok(pool)
    }
}

/// Constant with all of its references to other constants resolved
///
/// This is how constants get moved from one constant pool into another: resolve the constant in
/// the source pool, then insert it into the destination [`ConstantsPool`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantData {
    Utf8(String),
    Class(String),
    String(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    NameAndType {
        name: String,
        descriptor: String,
    },
    FieldRef {
        class: String,
        name: String,
        descriptor: String,
    },
    MethodRef {
        class: String,
        name: String,
        descriptor: String,
        is_interface: bool,
    },
    MethodHandle {
        handle_kind: HandleKind,
        member: Box<ConstantData>,
    },
    MethodType(String),
    Module(String),
    Package(String),
}

/// Class file constants pool builder
///
/// The pool is append only and only after the pool is fully built up, it can be consumed into a
/// regular [`ConstantPool`]. Constants are interned: asking for the same constant twice returns
/// the same index.
pub struct ConstantsPool {
    constants: OffsetVec<Constant>,
    utf8s: HashMap<String, Utf8ConstantIndex>,
    interned: HashMap<Constant, ConstantIndex>,
}

impl Default for ConstantsPool {
    fn default() -> Self {
        ConstantsPool::new()
    }
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
            utf8s: HashMap::new(),
            interned: HashMap::new(),
        }
    }

    /// Start from an existing pool
    ///
    /// Every existing constant keeps its index, so attributes which refer to the existing pool
    /// stay valid. New constants get appended after them.
    pub fn from_pool(pool: &ConstantPool) -> ConstantsPool {
        let mut builder = ConstantsPool {
            constants: pool.constants.clone(),
            utf8s: HashMap::new(),
            interned: HashMap::new(),
        };
        for (offset, _, constant) in &pool.constants {
            let index = ConstantIndex(offset.0 as u16);
            if let Constant::Utf8(string) = constant {
                builder
                    .utf8s
                    .entry(string.clone())
                    .or_insert(Utf8ConstantIndex(index));
            } else {
                builder.interned.entry(constant.clone()).or_insert(index);
            }
        }
        builder
    }

    /// Consume the pool and return the final pool of constants
    pub fn into_pool(self) -> ConstantPool {
        ConstantPool {
            constants: self.constants,
        }
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        // Compute the offset at which this constant will be inserted
        let offset = self.constants.offset_len().0;

        // Detect if the next constant would overflow the pool
        if offset + constant.width() > u16::MAX as usize {
            return Err(Error::ConstantPoolOverflow {
                constant,
                offset: offset as u16,
            });
        }

        self.constants.push(constant);
        Ok(ConstantIndex(offset as u16))
    }

    /// Get or insert a constant whose references are already in this pool
    pub fn get_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let constant = match constant {
            Constant::Utf8(string) => return Ok(self.get_utf8(string)?.0),
            other => other,
        };
        if let Some(idx) = self.interned.get(&constant) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(constant.clone())?;
            self.interned.insert(constant, idx);
            Ok(idx)
        }
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        let cow = utf8.into();

        if let Some(idx) = self.utf8s.get::<str>(cow.borrow()) {
            Ok(*idx)
        } else {
            let owned = cow.into_owned();
            let constant = Constant::Utf8(owned.clone());
            let idx = Utf8ConstantIndex(self.push_constant(constant)?);
            self.utf8s.insert(owned, idx);
            Ok(idx)
        }
    }

    /// Get or insert a class constant from the constant pool
    pub fn get_class<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        name: S,
    ) -> Result<ClassConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        Ok(ClassConstantIndex(self.get_constant(Constant::Class(name))?))
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type<'a, S: Into<Cow<'a, str>>, T: Into<Cow<'a, str>>>(
        &mut self,
        name: S,
        descriptor: T,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        let constant = Constant::NameAndType { name, descriptor };
        Ok(NameAndTypeConstantIndex(self.get_constant(constant)?))
    }

    /// Get or insert a resolved constant (along with everything it refers to)
    pub fn get_data(&mut self, data: &ConstantData) -> Result<ConstantIndex, Error> {
        let constant = match data {
            ConstantData::Utf8(string) => return Ok(self.get_utf8(string.as_str())?.0),
            ConstantData::Class(name) => return Ok(self.get_class(name.as_str())?.0),
            ConstantData::NameAndType { name, descriptor } => {
                return Ok(self
                    .get_name_and_type(name.as_str(), descriptor.as_str())?
                    .0)
            }
            ConstantData::String(string) => Constant::String(self.get_utf8(string.as_str())?),
            ConstantData::Integer(integer) => Constant::Integer(*integer),
            ConstantData::Float(float) => Constant::Float(*float),
            ConstantData::Long(long) => Constant::Long(*long),
            ConstantData::Double(double) => Constant::Double(*double),
            ConstantData::FieldRef {
                class,
                name,
                descriptor,
            } => Constant::FieldRef(
                self.get_class(class.as_str())?,
                self.get_name_and_type(name.as_str(), descriptor.as_str())?,
            ),
            ConstantData::MethodRef {
                class,
                name,
                descriptor,
                is_interface,
            } => Constant::MethodRef {
                class: self.get_class(class.as_str())?,
                name_and_type: self.get_name_and_type(name.as_str(), descriptor.as_str())?,
                is_interface: *is_interface,
            },
            ConstantData::MethodHandle {
                handle_kind,
                member,
            } => Constant::MethodHandle {
                handle_kind: *handle_kind,
                member: self.get_data(member)?,
            },
            ConstantData::MethodType(descriptor) => Constant::MethodType {
                descriptor: self.get_utf8(descriptor.as_str())?,
            },
            ConstantData::Module(name) => Constant::Module(self.get_utf8(name.as_str())?),
            ConstantData::Package(name) => Constant::Package(self.get_utf8(name.as_str())?),
        };
        self.get_constant(constant)
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: A) -> Result<Attribute, Error> {
        let mut info = vec![];
        attribute.serialize(&mut info).map_err(Error::IoError)?;
        self.get_raw_attribute(A::NAME, info)
    }

    /// Add an attribute whose info has already been serialized
    pub fn get_raw_attribute(&mut self, name: &str, info: Vec<u8>) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(name)?;
        Ok(Attribute { name_index, info })
    }
}

#[cfg(test)]
mod encode_modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert_eq!(
            encode_modified_utf8("hel10_World"),
            vec![104, 101, 108, 49, 48, 95, 87, 111, 114, 108, 100]
        );
    }

    #[test]
    fn supplementary_characters() {
        assert_eq!(
            encode_modified_utf8("\u{10000}\u{dffff}\u{10FFFF}"),
            vec![
                237, 160, 128, 237, 176, 128, 237, 172, 191, 237, 191, 191, 237, 175, 191, 237,
                191, 191
            ]
        );
    }

    #[test]
    fn decoding_inverts_encoding() {
        let strings = [
            "",
            "a\x00a",
            "ĄǍǞǠǺ",
            "ऄअॲঅਅ",
            "\u{10000}\u{dffff}\u{10FFFF}",
        ];
        for string in strings {
            let encoded = encode_modified_utf8(string);
            assert_eq!(decode_modified_utf8(&encoded).unwrap(), string);
        }
    }

    #[test]
    fn decoding_rejects_garbage() {
        assert!(decode_modified_utf8(&[0xFF]).is_err());
        assert!(decode_modified_utf8(&[0xC4]).is_err());
        assert!(decode_modified_utf8(&[0xE0, 0x41, 0x41]).is_err());
        // lone high surrogate
        assert!(decode_modified_utf8(&[237, 160, 128]).is_err());
    }
}
