use crate::jvm::class_file::{
    Constant, ConstantData, ConstantIndex, ConstantPool, ConstantsPool, Deserialize, Serialize,
    Utf8ConstantIndex,
};
use crate::jvm::model::Remapper;
use crate::jvm::{BinaryName, Error, Name};

/// Annotation on a class, field, method, or parameter
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.16
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation interface (eg. `Ljava/lang/Deprecated;`)
    pub type_descriptor: String,

    /// Element name/value pairs, in the order they appear in the class file
    pub values: Vec<(String, ElementValue)>,

    /// Whether the annotation is retained at runtime (`RuntimeVisibleAnnotations`) or only in the
    /// class file (`RuntimeInvisibleAnnotations`). Only meaningful on top-level annotations.
    pub visible: bool,
}

/// Value of an annotation element
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.16.1
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Boolean(bool),
    Long(i64),
    Float(u32),
    Double(u64),
    String(String),
    Enum {
        type_descriptor: String,
        const_name: String,
    },

    /// Class literal, stored as a return descriptor (so `V` for `void.class`)
    Class(String),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl Annotation {
    pub fn new(annotation_type: &BinaryName, visible: bool) -> Annotation {
        Annotation {
            type_descriptor: format!("L{};", annotation_type.as_str()),
            values: vec![],
            visible,
        }
    }

    /// Binary name of the annotation interface
    pub fn annotation_type(&self) -> Option<&str> {
        self.type_descriptor
            .strip_prefix('L')
            .and_then(|name| name.strip_suffix(';'))
    }

    /// Is this an annotation of the given type?
    pub fn is_a(&self, annotation_type: &BinaryName) -> bool {
        self.annotation_type() == Some(annotation_type.as_str())
    }

    /// Look up an element value by name
    ///
    /// Elements left at their default value are not stored in the class file, so they won't be
    /// found here.
    pub fn get(&self, name: &str) -> Option<&ElementValue> {
        self.values
            .iter()
            .find(|(element, _)| element == name)
            .map(|(_, value)| value)
    }

    pub fn with_value(mut self, name: impl Into<String>, value: ElementValue) -> Annotation {
        self.values.push((name.into(), value));
        self
    }

    /// Rename classes referenced from the annotation
    pub fn remap(&mut self, remapper: &Remapper) {
        self.type_descriptor = remapper.map_descriptor(&self.type_descriptor);
        for (_, value) in &mut self.values {
            value.remap(remapper);
        }
    }

    fn read(reader: &mut &[u8], pool: &ConstantPool, visible: bool) -> Result<Annotation, Error> {
        let type_descriptor = pool.utf8(Utf8ConstantIndex::deserialize(reader)?)?.to_owned();
        let count = u16::deserialize(reader)?;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.utf8(Utf8ConstantIndex::deserialize(reader)?)?.to_owned();
            values.push((name, ElementValue::read(reader, pool, visible)?));
        }
        Ok(Annotation {
            type_descriptor,
            values,
            visible,
        })
    }

    fn write(&self, out: &mut Vec<u8>, constants: &mut ConstantsPool) -> Result<(), Error> {
        constants
            .get_utf8(self.type_descriptor.as_str())?
            .serialize(out)?;
        (self.values.len() as u16).serialize(out)?;
        for (name, value) in &self.values {
            constants.get_utf8(name.as_str())?.serialize(out)?;
            value.write(out, constants)?;
        }
        Ok(())
    }
}

impl ElementValue {
    /// Rename classes referenced from the value
    pub fn remap(&mut self, remapper: &Remapper) {
        match self {
            ElementValue::Enum {
                type_descriptor, ..
            } => *type_descriptor = remapper.map_descriptor(type_descriptor),
            ElementValue::Class(descriptor) => *descriptor = remapper.map_descriptor(descriptor),
            ElementValue::Annotation(annotation) => annotation.remap(remapper),
            ElementValue::Array(values) => {
                for value in values {
                    value.remap(remapper);
                }
            }
            _ => (),
        }
    }

    pub fn read(reader: &mut &[u8], pool: &ConstantPool, visible: bool) -> Result<Self, Error> {
        let tag = u8::deserialize(reader)?;
        let value = match tag {
            b'B' | b'C' | b'S' | b'I' | b'Z' => {
                let index = ConstantIndex::deserialize(reader)?;
                let integer = match pool.get(index)? {
                    Constant::Integer(integer) => *integer,
                    _ => return Err(bad_value(index, "Integer")),
                };
                match tag {
                    b'B' => ElementValue::Byte(integer as i8),
                    b'C' => ElementValue::Char(integer as u16),
                    b'S' => ElementValue::Short(integer as i16),
                    b'I' => ElementValue::Int(integer),
                    _ => ElementValue::Boolean(integer != 0),
                }
            }
            b'J' => {
                let index = ConstantIndex::deserialize(reader)?;
                match pool.get(index)? {
                    Constant::Long(long) => ElementValue::Long(*long),
                    _ => return Err(bad_value(index, "Long")),
                }
            }
            b'F' => {
                let index = ConstantIndex::deserialize(reader)?;
                match pool.get(index)? {
                    Constant::Float(float) => ElementValue::Float(*float),
                    _ => return Err(bad_value(index, "Float")),
                }
            }
            b'D' => {
                let index = ConstantIndex::deserialize(reader)?;
                match pool.get(index)? {
                    Constant::Double(double) => ElementValue::Double(*double),
                    _ => return Err(bad_value(index, "Double")),
                }
            }
            b's' => ElementValue::String(read_utf8(reader, pool)?),
            b'e' => ElementValue::Enum {
                type_descriptor: read_utf8(reader, pool)?,
                const_name: read_utf8(reader, pool)?,
            },
            b'c' => ElementValue::Class(read_utf8(reader, pool)?),
            b'@' => ElementValue::Annotation(Box::new(Annotation::read(reader, pool, visible)?)),
            b'[' => {
                let count = u16::deserialize(reader)?;
                let values = (0..count)
                    .map(|_| ElementValue::read(reader, pool, visible))
                    .collect::<Result<_, _>>()?;
                ElementValue::Array(values)
            }
            other => {
                return Err(Error::MalformedClass(format!(
                    "unknown element value tag '{}'",
                    other as char
                )))
            }
        };
        Ok(value)
    }

    pub fn write(&self, out: &mut Vec<u8>, constants: &mut ConstantsPool) -> Result<(), Error> {
        let (tag, constant) = match self {
            ElementValue::Byte(byte) => (b'B', ConstantData::Integer(*byte as i32)),
            ElementValue::Char(c) => (b'C', ConstantData::Integer(*c as i32)),
            ElementValue::Short(short) => (b'S', ConstantData::Integer(*short as i32)),
            ElementValue::Int(int) => (b'I', ConstantData::Integer(*int)),
            ElementValue::Boolean(boolean) => (b'Z', ConstantData::Integer(*boolean as i32)),
            ElementValue::Long(long) => (b'J', ConstantData::Long(*long)),
            ElementValue::Float(float) => (b'F', ConstantData::Float(*float)),
            ElementValue::Double(double) => (b'D', ConstantData::Double(*double)),
            ElementValue::String(string) => (b's', ConstantData::Utf8(string.clone())),
            ElementValue::Class(descriptor) => (b'c', ConstantData::Utf8(descriptor.clone())),
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => {
                b'e'.serialize(out)?;
                constants.get_utf8(type_descriptor.as_str())?.serialize(out)?;
                constants.get_utf8(const_name.as_str())?.serialize(out)?;
                return Ok(());
            }
            ElementValue::Annotation(annotation) => {
                b'@'.serialize(out)?;
                return annotation.write(out, constants);
            }
            ElementValue::Array(values) => {
                b'['.serialize(out)?;
                (values.len() as u16).serialize(out)?;
                for value in values {
                    value.write(out, constants)?;
                }
                return Ok(());
            }
        };
        tag.serialize(out)?;
        constants.get_data(&constant)?.serialize(out)?;
        Ok(())
    }
}

fn read_utf8(reader: &mut &[u8], pool: &ConstantPool) -> Result<String, Error> {
    Ok(pool.utf8(Utf8ConstantIndex::deserialize(reader)?)?.to_owned())
}

fn bad_value(index: ConstantIndex, expected: &'static str) -> Error {
    Error::BadConstantIndex {
        index: index.0,
        expected,
    }
}

fn ensure_consumed(reader: &[u8], attribute: &str) -> Result<(), Error> {
    if reader.is_empty() {
        Ok(())
    } else {
        Err(Error::MalformedClass(format!(
            "{} attribute has {} trailing bytes",
            attribute,
            reader.len()
        )))
    }
}

/// Name of the attribute holding annotations with the given visibility
pub fn annotations_attribute_name(visible: bool) -> &'static str {
    if visible {
        "RuntimeVisibleAnnotations"
    } else {
        "RuntimeInvisibleAnnotations"
    }
}

/// Decode a `RuntimeVisibleAnnotations` or `RuntimeInvisibleAnnotations` attribute
pub fn read_annotations(
    info: &[u8],
    pool: &ConstantPool,
    visible: bool,
) -> Result<Vec<Annotation>, Error> {
    let mut reader = info;
    let count = u16::deserialize(&mut reader)?;
    let annotations = (0..count)
        .map(|_| Annotation::read(&mut reader, pool, visible))
        .collect::<Result<_, _>>()?;
    ensure_consumed(reader, annotations_attribute_name(visible))?;
    Ok(annotations)
}

/// Encode annotations into the info of a `Runtime*Annotations` attribute
pub fn write_annotations<'a>(
    annotations: impl ExactSizeIterator<Item = &'a Annotation>,
    constants: &mut ConstantsPool,
) -> Result<Vec<u8>, Error> {
    let mut out = vec![];
    (annotations.len() as u16).serialize(&mut out)?;
    for annotation in annotations {
        annotation.write(&mut out, constants)?;
    }
    Ok(out)
}

/// Decode a `Runtime*ParameterAnnotations` attribute (the parameter count is a single byte)
pub fn read_parameter_annotations(
    info: &[u8],
    pool: &ConstantPool,
    visible: bool,
) -> Result<Vec<Vec<Annotation>>, Error> {
    let mut reader = info;
    let parameters = u8::deserialize(&mut reader)?;
    let mut annotations = Vec::with_capacity(parameters as usize);
    for _ in 0..parameters {
        let count = u16::deserialize(&mut reader)?;
        annotations.push(
            (0..count)
                .map(|_| Annotation::read(&mut reader, pool, visible))
                .collect::<Result<_, _>>()?,
        );
    }
    ensure_consumed(reader, "parameter annotations")?;
    Ok(annotations)
}

pub fn write_parameter_annotations(
    parameters: &[Vec<Annotation>],
    constants: &mut ConstantsPool,
) -> Result<Vec<u8>, Error> {
    let mut out = vec![];
    (parameters.len() as u8).serialize(&mut out)?;
    for annotations in parameters {
        out.extend(write_annotations(annotations.iter(), constants)?);
    }
    Ok(out)
}
