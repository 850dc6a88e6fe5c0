use crate::jvm::class_file;
use crate::jvm::class_file::{ClassFile, ConstantPool, ConstantsPool, Version};
use crate::jvm::model::member::{read_common_attributes, write_common_attributes};
use crate::jvm::model::{Annotation, Field, Member, Method, RawAttribute};
use crate::jvm::{AccessFlags, BinaryName, Error, Name};
use std::rc::Rc;

/// Semantic representation of a class
#[derive(Debug, Clone)]
pub struct Class {
    pub version: Version,
    pub access_flags: AccessFlags,
    pub name: BinaryName,

    /// Only `java/lang/Object` has no super class
    pub super_name: Option<BinaryName>,
    pub interfaces: Vec<BinaryName>,

    /// Fields
    ///
    /// Use [`Self::add_field`] to also check that the field isn't already declared
    pub fields: Vec<Field>,

    /// Methods
    ///
    /// Use [`Self::add_method`] to also check that the method isn't already declared
    pub methods: Vec<Method>,

    /// Generic signature, if any
    pub signature: Option<String>,
    pub annotations: Vec<Annotation>,

    /// Attributes which aren't decoded (eg. `SourceFile`, `InnerClasses`, `BootstrapMethods`)
    pub attributes: Vec<RawAttribute>,

    /// Pool the class was read from
    ///
    /// When the class is written out, this pool is extended instead of building a new one, so
    /// encoded attributes of the class and of members which were already in the class stay valid.
    constants: Rc<ConstantPool>,
}

impl Class {
    /// Create a new empty class
    pub fn new(
        name: BinaryName,
        super_name: Option<BinaryName>,
        access_flags: AccessFlags,
    ) -> Class {
        Class {
            version: Version::JAVA8,
            access_flags,
            name,
            super_name,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            signature: None,
            annotations: vec![],
            attributes: vec![],
            constants: Rc::new(ConstantPool::new()),
        }
    }

    /// Parse a class from the bytes of a class file
    pub fn parse(bytes: &[u8]) -> Result<Class, Error> {
        Class::from_class_file(ClassFile::parse(bytes)?)
    }

    pub fn from_class_file(class_file: ClassFile) -> Result<Class, Error> {
        let constants = Rc::new(class_file.constants);
        let binary_name = |name: &str| {
            BinaryName::from_string(name.to_owned()).map_err(Error::MalformedClass)
        };

        let name = binary_name(constants.class_name(class_file.this_class)?)?;
        let super_name = match class_file.super_class {
            Some(super_class) => Some(binary_name(constants.class_name(super_class)?)?),
            None => None,
        };
        let interfaces = class_file
            .interfaces
            .iter()
            .map(|interface| binary_name(constants.class_name(*interface)?))
            .collect::<Result<_, _>>()?;

        let fields = class_file
            .fields
            .iter()
            .map(|field| {
                Member::read(
                    field.access_flags,
                    constants.utf8(field.name_index)?,
                    constants.utf8(field.descriptor_index)?,
                    &field.attributes,
                    &constants,
                )
            })
            .collect::<Result<_, _>>()?;
        let methods = class_file
            .methods
            .iter()
            .map(|method| {
                Member::read(
                    method.access_flags,
                    constants.utf8(method.name_index)?,
                    constants.utf8(method.descriptor_index)?,
                    &method.attributes,
                    &constants,
                )
            })
            .collect::<Result<_, _>>()?;

        let (signature, annotations, attributes) =
            read_common_attributes(&class_file.attributes, &constants)?;

        Ok(Class {
            version: class_file.version,
            access_flags: class_file.access_flags,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            signature,
            annotations,
            attributes,
            constants,
        })
    }

    /// Serialize the class into a class file
    ///
    /// The constant pool the class was read from is kept (with new constants appended), so the
    /// output only differs where the class was edited.
    pub fn to_class_file(&self) -> Result<ClassFile, Error> {
        let mut constants = ConstantsPool::from_pool(&self.constants);

        let this_class = constants.get_class(self.name.as_str())?;
        let super_class = match &self.super_name {
            Some(super_name) => Some(constants.get_class(super_name.as_str())?),
            None => None,
        };
        let interfaces = self
            .interfaces
            .iter()
            .map(|interface| constants.get_class(interface.as_str()))
            .collect::<Result<_, _>>()?;

        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let (name_index, descriptor_index, attributes) =
                field.write(&mut constants, &self.constants)?;
            fields.push(class_file::Field {
                access_flags: field.access_flags,
                name_index,
                descriptor_index,
                attributes,
            });
        }

        let mut methods = Vec::with_capacity(self.methods.len());
        for method in &self.methods {
            let (name_index, descriptor_index, attributes) =
                method.write(&mut constants, &self.constants)?;
            methods.push(class_file::Method {
                access_flags: method.access_flags,
                name_index,
                descriptor_index,
                attributes,
            });
        }

        let mut attributes = Vec::with_capacity(self.attributes.len() + 2);
        for attribute in &self.attributes {
            attributes.push(constants.get_raw_attribute(&attribute.name, attribute.info.clone())?);
        }
        write_common_attributes(
            self.signature.as_deref(),
            &self.annotations,
            &mut constants,
            &mut attributes,
        )?;

        Ok(ClassFile {
            version: self.version,
            constants: constants.into_pool(),
            access_flags: self.access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.to_class_file()?.to_bytes()
    }

    /// Constant pool the encoded attributes of this class refer to
    pub fn constant_pool(&self) -> &Rc<ConstantPool> {
        &self.constants
    }

    /// First annotation on the class of the given type
    pub fn annotation(&self, annotation_type: &BinaryName) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.is_a(annotation_type))
    }

    pub fn get_method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.matches(name, descriptor))
    }

    pub fn get_method_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut Method> {
        self.methods.iter_mut().find(|m| m.matches(name, descriptor))
    }

    pub fn get_field(&self, name: &str, descriptor: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.matches(name, descriptor))
    }

    pub fn get_field_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.matches(name, descriptor))
    }

    /// Add a method to the class
    pub fn add_method(&mut self, method: Method) -> Result<(), Error> {
        if self.get_method(method.name.as_str(), &method.descriptor).is_some() {
            return Err(self.duplicate(&method));
        }
        self.methods.push(method);
        Ok(())
    }

    /// Add a field to the class
    pub fn add_field(&mut self, field: Field) -> Result<(), Error> {
        if self.get_field(field.name.as_str(), &field.descriptor).is_some() {
            return Err(self.duplicate(&field));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Remove a method, returning it
    pub fn remove_method(&mut self, name: &str, descriptor: &str) -> Option<Method> {
        let position = self.methods.iter().position(|m| m.matches(name, descriptor))?;
        Some(self.methods.remove(position))
    }

    /// Remove a field, returning it
    pub fn remove_field(&mut self, name: &str, descriptor: &str) -> Option<Field> {
        let position = self.fields.iter().position(|f| f.matches(name, descriptor))?;
        Some(self.fields.remove(position))
    }

    /// Instance initialization methods
    pub fn constructors(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(|method| method.is_constructor())
    }

    fn duplicate(&self, member: &Member) -> Error {
        Error::DuplicateMember {
            class: self.name.to_java_name(),
            member: member.to_string(),
        }
    }
}
