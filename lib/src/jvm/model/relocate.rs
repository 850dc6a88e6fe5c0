//! Move attributes from one constant pool into another
//!
//! Members read from a class file keep their attributes as raw bytes, full of indices into the
//! constant pool of the class they were read from. When such a member is written into a different
//! class, every one of those indices needs to be resolved in the old pool and re-interned into the
//! new pool. Instructions are rewritten in place (operands keep their width) so branch offsets,
//! exception ranges, line numbers, and stack map offsets all stay valid.

use crate::jvm::class_file::{
    decode_attribute, ClassConstantIndex, Code, ConstantIndex, ConstantPool, ConstantValue,
    ConstantsPool, Exceptions, LocalVariableTable, LocalVariableTypeTable, MethodParameters,
    Serialize, StackMapTable, Utf8ConstantIndex,
};
use crate::jvm::model::{
    annotations_attribute_name, read_annotations, read_parameter_annotations, write_annotations,
    write_parameter_annotations, ElementValue, Remapper,
};
use crate::jvm::Error;
use log::warn;

pub struct Relocator<'a> {
    /// Pool the attributes currently refer to
    pub origin: &'a ConstantPool,

    /// Pool the attributes are being moved into
    pub constants: &'a mut ConstantsPool,

    /// Renames to apply along the way
    pub remapper: Option<&'a Remapper>,
}

impl<'a> Relocator<'a> {
    /// Move any constant into the new pool
    pub fn constant(&mut self, index: ConstantIndex) -> Result<ConstantIndex, Error> {
        let data = self.origin.resolve(index)?;
        let data = match self.remapper {
            Some(remapper) => remapper.map_constant(data),
            None => data,
        };
        self.constants.get_data(&data)
    }

    pub fn class(&mut self, index: ClassConstantIndex) -> Result<ClassConstantIndex, Error> {
        Ok(ClassConstantIndex(self.constant(index.0)?))
    }

    /// Move a UTF-8 constant without any renaming
    pub fn utf8(&mut self, index: Utf8ConstantIndex) -> Result<Utf8ConstantIndex, Error> {
        let string = self.origin.utf8(index)?;
        self.constants.get_utf8(string)
    }

    /// Move a UTF-8 constant holding a descriptor or signature
    pub fn descriptor(&mut self, index: Utf8ConstantIndex) -> Result<Utf8ConstantIndex, Error> {
        let descriptor = self.origin.utf8(index)?;
        match self.remapper {
            Some(remapper) => self.constants.get_utf8(remapper.map_descriptor(descriptor)),
            None => self.constants.get_utf8(descriptor),
        }
    }

    /// Relocate the info of an attribute of a field or method
    ///
    /// Returns `None` for attributes which are not understood well enough to move. Those are
    /// dropped (with a warning) rather than being copied with dangling indices.
    pub fn attribute(&mut self, name: &str, info: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let info = match name {
            "Code" => {
                let code: Code = decode_attribute(info)?;
                serialize(&self.code(code)?)?
            }
            "ConstantValue" => {
                let ConstantValue(value) = decode_attribute(info)?;
                serialize(&ConstantValue(self.constant(value)?))?
            }
            "Exceptions" => {
                let Exceptions(classes) = decode_attribute(info)?;
                let classes = classes
                    .into_iter()
                    .map(|class| self.class(class))
                    .collect::<Result<_, _>>()?;
                serialize(&Exceptions(classes))?
            }
            "MethodParameters" => {
                let MethodParameters(mut parameters) = decode_attribute(info)?;
                for parameter in &mut parameters {
                    if (parameter.name.0).0 != 0 {
                        parameter.name = self.utf8(parameter.name)?;
                    }
                }
                serialize(&MethodParameters(parameters))?
            }
            "AnnotationDefault" => {
                let mut reader = info;
                let mut value = ElementValue::read(&mut reader, self.origin, true)?;
                if let Some(remapper) = self.remapper {
                    value.remap(remapper);
                }
                let mut out = vec![];
                value.write(&mut out, self.constants)?;
                out
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let visible = name == annotations_attribute_name(true);
                let mut annotations = read_annotations(info, self.origin, visible)?;
                if let Some(remapper) = self.remapper {
                    annotations.iter_mut().for_each(|a| a.remap(remapper));
                }
                write_annotations(annotations.iter(), self.constants)?
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let visible = name == "RuntimeVisibleParameterAnnotations";
                let mut parameters = read_parameter_annotations(info, self.origin, visible)?;
                if let Some(remapper) = self.remapper {
                    parameters
                        .iter_mut()
                        .flatten()
                        .for_each(|a| a.remap(remapper));
                }
                write_parameter_annotations(&parameters, self.constants)?
            }
            "Synthetic" | "Deprecated" => info.to_vec(),
            other => {
                warn!(
                    "Dropping `{}` attribute which can't be moved into another class",
                    other
                );
                return Ok(None);
            }
        };
        Ok(Some(info))
    }

    /// Relocate the attributes nested inside a `Code` attribute
    fn code_attribute(&mut self, name: &str, info: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let info = match name {
            "StackMapTable" => {
                let StackMapTable(mut frames) = decode_attribute(info)?;
                for frame in &mut frames {
                    for class in frame.class_references_mut() {
                        *class = self.class(*class)?;
                    }
                }
                serialize(&StackMapTable(frames))?
            }
            "LocalVariableTable" => {
                let LocalVariableTable(mut locals) = decode_attribute(info)?;
                for local in &mut locals {
                    local.name = self.utf8(local.name)?;
                    local.descriptor = self.descriptor(local.descriptor)?;
                }
                serialize(&LocalVariableTable(locals))?
            }
            "LocalVariableTypeTable" => {
                let LocalVariableTypeTable(mut locals) = decode_attribute(info)?;
                for local in &mut locals {
                    local.name = self.utf8(local.name)?;
                    local.descriptor = self.descriptor(local.descriptor)?;
                }
                serialize(&LocalVariableTypeTable(locals))?
            }
            "LineNumberTable" => info.to_vec(),
            other => {
                warn!(
                    "Dropping `{}` code attribute which can't be moved into another class",
                    other
                );
                return Ok(None);
            }
        };
        Ok(Some(info))
    }

    fn code(&mut self, mut code: Code) -> Result<Code, Error> {
        code.code_array.0 = self.instructions(&code.code_array.0)?;

        for handler in &mut code.exception_table {
            if (handler.catch_type.0).0 != 0 {
                handler.catch_type = self.class(handler.catch_type)?;
            }
        }

        let mut attributes = Vec::with_capacity(code.attributes.len());
        for attribute in &code.attributes {
            let name = self.origin.utf8(attribute.name_index)?;
            if let Some(info) = self.code_attribute(name, &attribute.info)? {
                attributes.push(self.constants.get_raw_attribute(name, info)?);
            }
        }
        code.attributes = attributes;

        Ok(code)
    }

    /// Rewrite the constant pool operands of every instruction
    fn instructions(&mut self, code: &[u8]) -> Result<Vec<u8>, Error> {
        let mut relocated = code.to_vec();
        let mut offset = 0;
        while offset < code.len() {
            let opcode = code[offset];
            match opcode {
                // ldc
                0x12 => {
                    let index = ConstantIndex(read_u8(code, offset + 1)? as u16);
                    let ConstantIndex(new_index) = self.constant(index)?;
                    if new_index > u8::MAX as u16 {
                        return Err(Error::LdcIndexOverflow(new_index));
                    }
                    relocated[offset + 1] = new_index as u8;
                }

                // ldc_w, ldc2_w, field and method instructions, new, anewarray, checkcast,
                // instanceof, multianewarray (and invokedynamic, which will fail to resolve)
                0x13 | 0x14 | 0xb2..=0xbb | 0xbd | 0xc0 | 0xc1 | 0xc5 => {
                    let index = ConstantIndex(read_u16(code, offset + 1)?);
                    let ConstantIndex(new_index) = self.constant(index)?;
                    relocated[offset + 1..offset + 3].copy_from_slice(&new_index.to_be_bytes());
                }

                _ => (),
            }
            offset += instruction_width(code, offset)?;
        }
        Ok(relocated)
    }
}

fn serialize<A: Serialize>(attribute: &A) -> Result<Vec<u8>, Error> {
    let mut info = vec![];
    attribute.serialize(&mut info)?;
    Ok(info)
}

fn truncated(offset: usize) -> Error {
    Error::MalformedClass(format!("instruction at bytecode offset {} is truncated", offset))
}

fn read_u8(code: &[u8], offset: usize) -> Result<u8, Error> {
    code.get(offset).copied().ok_or_else(|| truncated(offset))
}

fn read_u16(code: &[u8], offset: usize) -> Result<u16, Error> {
    match code.get(offset..offset + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(truncated(offset)),
    }
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32, Error> {
    match code.get(offset..offset + 4) {
        Some(bytes) => Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        None => Err(truncated(offset)),
    }
}

/// Number of bytes taken up by the instruction starting at `offset`
///
/// The switch instructions pad their operands out to a multiple of 4 bytes from the start of the
/// code array. `wide` takes the width of the instruction it modifies.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-6.html#jvms-6.5
pub fn instruction_width(code: &[u8], offset: usize) -> Result<usize, Error> {
    let opcode = read_u8(code, offset)?;
    let width = match opcode {
        // constants, loads, stores, arithmetic, conversions, comparisons
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13 | 0x14 => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        0x84 => 3,
        0x85..=0x98 => 1,

        // branches, `jsr`, `ret`
        0x99..=0xa8 => 3,
        0xa9 => 2,

        // tableswitch
        0xaa => {
            let padding = 3 - offset % 4;
            let operands = offset + 1 + padding;
            let low = read_i32(code, operands + 4)?;
            let high = read_i32(code, operands + 8)?;
            let targets = (high as i64 - low as i64 + 1).max(0) as usize;
            1 + padding + 12 + 4 * targets
        }

        // lookupswitch
        0xab => {
            let padding = 3 - offset % 4;
            let operands = offset + 1 + padding;
            let pairs = read_i32(code, operands + 4)?.max(0) as usize;
            1 + padding + 8 + 8 * pairs
        }

        // returns
        0xac..=0xb1 => 1,

        // field access, invocations, object creation
        0xb2..=0xb8 => 3,
        0xb9 | 0xba => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,

        // wide
        0xc4 => {
            if read_u8(code, offset + 1)? == 0x84 {
                6
            } else {
                4
            }
        }

        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        opcode => return Err(Error::UnknownOpcode { opcode, offset }),
    };
    if offset + width > code.len() {
        return Err(truncated(offset));
    }
    Ok(width)
}
