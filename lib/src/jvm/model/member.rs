use crate::jvm::class_file::{
    Attribute, ConstantPool, ConstantsPool, Signature, Utf8ConstantIndex,
};
use crate::jvm::model::{
    annotations_attribute_name, read_annotations, write_annotations, Annotation, Relocator,
    Remapper,
};
use crate::jvm::{AccessFlags, BinaryName, Error, Name, TypeEntry, UnqualifiedName};
use std::fmt::{Display, Error as FmtError, Formatter};
use std::rc::Rc;

/// Field declared by a class
pub type Field = Member;

/// Method declared by a class
pub type Method = Member;

/// Semantic representation of a field or method
///
/// The signature and annotations are decoded. Every other attribute (including the method body)
/// stays encoded, referring into the constant pool the member was read from.
#[derive(Debug, Clone)]
pub struct Member {
    pub access_flags: AccessFlags,
    pub name: UnqualifiedName,

    /// Field descriptor (for fields) or method descriptor (for methods)
    pub descriptor: String,

    /// Generic signature, if any
    pub signature: Option<String>,
    pub annotations: Vec<Annotation>,

    /// Attributes which aren't decoded
    pub attributes: Vec<RawAttribute>,

    /// Constant pool the raw attributes refer to
    origin: Option<Rc<ConstantPool>>,

    /// Renames still to be applied to the raw attributes
    remapper: Option<Rc<Remapper>>,
}

/// Attribute kept in its encoded form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub info: Vec<u8>,
}

impl Member {
    /// Make a fresh member with no attributes
    pub fn new(
        access_flags: AccessFlags,
        name: UnqualifiedName,
        descriptor: impl Into<String>,
    ) -> Member {
        Member {
            access_flags,
            name,
            descriptor: descriptor.into(),
            signature: None,
            annotations: vec![],
            attributes: vec![],
            origin: None,
            remapper: None,
        }
    }

    pub fn is_method(&self) -> bool {
        self.descriptor.starts_with('(')
    }

    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }

    /// Does this member have the given name and descriptor?
    pub fn matches(&self, name: &str, descriptor: &str) -> bool {
        self.name.as_str() == name && self.descriptor == descriptor
    }

    /// First annotation of the given type
    pub fn annotation(&self, annotation_type: &BinaryName) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.is_a(annotation_type))
    }

    /// Parameter types followed by the return type (or just the type, for a field)
    pub fn types(&self) -> Result<Vec<TypeEntry>, Error> {
        TypeEntry::decompose(&self.descriptor, self.signature.as_deref())
    }

    /// Copy this member so it can be inserted into another class
    ///
    /// The descriptor, signature, and annotations are remapped immediately. Encoded attributes
    /// get remapped (and relocated into the new constant pool) when the class is written out.
    pub fn transplant(&self, remapper: &Rc<Remapper>) -> Member {
        let mut member = self.clone();
        member.descriptor = remapper.map_descriptor(&member.descriptor);
        member.signature = member
            .signature
            .map(|signature| remapper.map_descriptor(&signature));
        for annotation in &mut member.annotations {
            annotation.remap(remapper);
        }
        member.remapper = Some(remapper.clone());
        member
    }

    /// Decode a member read from a class file
    pub(super) fn read(
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
        attributes: &[Attribute],
        pool: &Rc<ConstantPool>,
    ) -> Result<Member, Error> {
        let name = UnqualifiedName::from_string(name.to_owned()).map_err(Error::MalformedClass)?;
        let mut member = Member::new(access_flags, name, descriptor);
        member.read_attributes(attributes, pool)?;
        member.origin = Some(pool.clone());
        Ok(member)
    }

    fn read_attributes(
        &mut self,
        attributes: &[Attribute],
        pool: &ConstantPool,
    ) -> Result<(), Error> {
        let (signature, annotations, attributes) = read_common_attributes(attributes, pool)?;
        self.signature = signature;
        self.annotations = annotations;
        self.attributes = attributes;
        Ok(())
    }

    /// Encode the member attributes into the constant pool being built for `class_pool`
    ///
    /// Returns the name index, descriptor index, and attributes.
    pub(super) fn write(
        &self,
        constants: &mut ConstantsPool,
        class_pool: &Rc<ConstantPool>,
    ) -> Result<(Utf8ConstantIndex, Utf8ConstantIndex, Vec<Attribute>), Error> {
        let name_index = constants.get_utf8(self.name.as_str())?;
        let descriptor_index = constants.get_utf8(self.descriptor.as_str())?;

        let mut attributes = Vec::with_capacity(self.attributes.len() + 2);
        match &self.origin {
            // Still refers to the pool being extended, so indices are valid as-is
            Some(origin) if Rc::ptr_eq(origin, class_pool) && self.remapper.is_none() => {
                for attribute in &self.attributes {
                    attributes.push(
                        constants.get_raw_attribute(&attribute.name, attribute.info.clone())?,
                    );
                }
            }
            Some(origin) => {
                let mut relocator = Relocator {
                    origin: &**origin,
                    constants,
                    remapper: self.remapper.as_deref(),
                };
                let mut relocated = vec![];
                for attribute in &self.attributes {
                    if let Some(info) = relocator.attribute(&attribute.name, &attribute.info)? {
                        relocated.push((attribute.name.as_str(), info));
                    }
                }
                for (name, info) in relocated {
                    attributes.push(constants.get_raw_attribute(name, info)?);
                }
            }

            // Built from scratch: raw attributes are expected to be free of constant references
            None => {
                for attribute in &self.attributes {
                    attributes.push(
                        constants.get_raw_attribute(&attribute.name, attribute.info.clone())?,
                    );
                }
            }
        }

        write_common_attributes(
            self.signature.as_deref(),
            &self.annotations,
            constants,
            &mut attributes,
        )?;
        Ok((name_index, descriptor_index, attributes))
    }
}

/// Split out the signature and annotations of a class or member
pub(super) fn read_common_attributes(
    attributes: &[Attribute],
    pool: &ConstantPool,
) -> Result<(Option<String>, Vec<Annotation>, Vec<RawAttribute>), Error> {
    let mut signature = None;
    let mut annotations = vec![];
    let mut raw = vec![];
    for attribute in attributes {
        let name = pool.utf8(attribute.name_index)?;
        match name {
            "Signature" => {
                let Signature { signature: index } = attribute.decode()?;
                signature = Some(pool.utf8(index)?.to_owned());
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let visible = name == annotations_attribute_name(true);
                annotations.extend(read_annotations(&attribute.info, pool, visible)?);
            }
            _ => raw.push(RawAttribute {
                name: name.to_owned(),
                info: attribute.info.clone(),
            }),
        }
    }
    Ok((signature, annotations, raw))
}

/// Encode a signature and annotations, appending the attributes
pub(super) fn write_common_attributes(
    signature: Option<&str>,
    annotations: &[Annotation],
    constants: &mut ConstantsPool,
    attributes: &mut Vec<Attribute>,
) -> Result<(), Error> {
    if let Some(signature) = signature {
        let signature = constants.get_utf8(signature)?;
        attributes.push(constants.get_attribute(Signature { signature })?);
    }
    for visible in [true, false] {
        let matching: Vec<&Annotation> = annotations
            .iter()
            .filter(|annotation| annotation.visible == visible)
            .collect();
        if !matching.is_empty() {
            let info = write_annotations(matching.into_iter(), constants)?;
            let name = annotations_attribute_name(visible);
            attributes.push(constants.get_raw_attribute(name, info)?);
        }
    }
    Ok(())
}

/// Java-like rendering, eg. `void add(int, java.lang.String)` or `int size`
impl Display for Member {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let types = match TypeEntry::decompose(&self.descriptor, None) {
            Ok(types) if !types.is_empty() => types,
            _ => return write!(f, "{}{}", self.name, self.descriptor),
        };
        if self.is_method() {
            let (return_type, parameters) = types.split_last().ok_or(FmtError)?;
            write!(f, "{} {}(", return_type.java_name(), self.name)?;
            for (i, parameter) in parameters.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(&parameter.java_name())?;
            }
            f.write_str(")")
        } else {
            write!(f, "{} {}", types[0].java_name(), self.name)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::model::ElementValue;

    fn name(name: &str) -> UnqualifiedName {
        UnqualifiedName::from_string(name.to_owned()).unwrap()
    }

    #[test]
    fn display() {
        let method = Member::new(
            AccessFlags::PUBLIC,
            name("add"),
            "(ILjava/lang/String;[[J)V",
        );
        assert_eq!(method.to_string(), "void add(int, java.lang.String, long[][])");

        let field = Member::new(AccessFlags::PRIVATE, name("size"), "I");
        assert_eq!(field.to_string(), "int size");
    }

    #[test]
    fn transplant_remaps_types() {
        let mixin = BinaryName::from_string(String::from("me/mixins/ListMixin")).unwrap();
        let target = BinaryName::from_string(String::from("me/List")).unwrap();
        let mut remapper = Remapper::new();
        remapper.rename_class(&mixin, &target);
        let remapper = Rc::new(remapper);

        let mut method = Member::new(
            AccessFlags::PUBLIC,
            name("copy"),
            "(Lme/mixins/ListMixin;)Lme/mixins/ListMixin;",
        );
        method.signature = Some(String::from(
            "<T:Ljava/lang/Object;>(Lme/mixins/ListMixin;)Lme/mixins/ListMixin;",
        ));
        method.annotations.push(
            Annotation::new(&BinaryName::from_string(String::from("me/Marker")).unwrap(), true)
                .with_value("value", ElementValue::Class(String::from("Lme/mixins/ListMixin;"))),
        );

        let moved = method.transplant(&remapper);
        assert_eq!(moved.descriptor, "(Lme/List;)Lme/List;");
        assert_eq!(
            moved.signature.as_deref(),
            Some("<T:Ljava/lang/Object;>(Lme/List;)Lme/List;")
        );
        assert_eq!(
            moved.annotations[0].get("value"),
            Some(&ElementValue::Class(String::from("Lme/List;")))
        );

        // The original is left alone
        assert_eq!(method.descriptor, "(Lme/mixins/ListMixin;)Lme/mixins/ListMixin;");
    }

    #[test]
    fn types() {
        let method = Member::new(AccessFlags::PUBLIC, name("get"), "(I)Ljava/lang/Object;");
        let types = method.types().unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types[1].class_name().unwrap(), "java.lang.Object");
    }
}
