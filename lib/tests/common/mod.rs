//! Builders for the mixin and target classes used by the integration tests

#![allow(dead_code)]

use mixin::jvm::class_file::{
    self, BytecodeArray, ClassFile, Code, ConstantData, ConstantsPool, Version,
};
use mixin::jvm::model::{Annotation, Class, ElementValue};
use mixin::jvm::{AccessFlags, BinaryName, Name, UnqualifiedName};
use mixin::mixin::{DirectiveKind, Settings};
use mixin::transformer::{visit_archive, ArchiveEntry, ArchiveWriter};
use std::fs;
use std::path::Path;

pub fn binary(name: &str) -> BinaryName {
    BinaryName::from_string(name.to_owned()).unwrap()
}

pub fn unqualified(name: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(name.to_owned()).unwrap()
}

/// Directive annotation from the default directive package
pub fn directive(kind: DirectiveKind) -> Annotation {
    let annotation_type = kind.annotation_type(Settings::DEFAULT_DIRECTIVE_PACKAGE);
    Annotation::new(&binary(&annotation_type), false)
}

pub fn string(value: &str) -> ElementValue {
    ElementValue::String(value.to_owned())
}

pub fn strings(values: &[&str]) -> ElementValue {
    ElementValue::Array(values.iter().map(|value| string(value)).collect())
}

/// Builds class files, including method bodies which refer to constants
pub struct ClassBuilder {
    constants: ConstantsPool,
    name: String,
    access_flags: AccessFlags,
    super_class: Option<String>,
    fields: Vec<class_file::Field>,
    methods: Vec<class_file::Method>,
}

impl ClassBuilder {
    pub fn new(name: &str, super_name: Option<&str>, access_flags: AccessFlags) -> ClassBuilder {
        ClassBuilder {
            constants: ConstantsPool::new(),
            name: name.to_owned(),
            access_flags,
            super_class: super_name.map(str::to_owned),
            fields: vec![],
            methods: vec![],
        }
    }

    pub fn field(mut self, access_flags: AccessFlags, name: &str, descriptor: &str) -> Self {
        let field = class_file::Field {
            access_flags,
            name_index: self.constants.get_utf8(name.to_owned()).unwrap(),
            descriptor_index: self.constants.get_utf8(descriptor.to_owned()).unwrap(),
            attributes: vec![],
        };
        self.fields.push(field);
        self
    }

    /// Method without a body
    pub fn method(mut self, access_flags: AccessFlags, name: &str, descriptor: &str) -> Self {
        let method = class_file::Method {
            access_flags,
            name_index: self.constants.get_utf8(name.to_owned()).unwrap(),
            descriptor_index: self.constants.get_utf8(descriptor.to_owned()).unwrap(),
            attributes: vec![],
        };
        self.methods.push(method);
        self
    }

    /// Method whose bytecode is produced by `code`, which can add constants to the pool
    pub fn method_with_code(
        mut self,
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: impl FnOnce(&mut ConstantsPool) -> Vec<u8>,
    ) -> Self {
        let code = Code {
            max_stack,
            max_locals,
            code_array: BytecodeArray(code(&mut self.constants)),
            exception_table: vec![],
            attributes: vec![],
        };
        let method = class_file::Method {
            access_flags,
            name_index: self.constants.get_utf8(name.to_owned()).unwrap(),
            descriptor_index: self.constants.get_utf8(descriptor.to_owned()).unwrap(),
            attributes: vec![self.constants.get_attribute(code).unwrap()],
        };
        self.methods.push(method);
        self
    }

    pub fn build(mut self) -> Class {
        let this_class = self.constants.get_class(self.name.clone()).unwrap();
        let super_class = self
            .super_class
            .clone()
            .map(|super_class| self.constants.get_class(super_class).unwrap());
        let bytes = ClassFile {
            version: Version::JAVA8,
            constants: self.constants.into_pool(),
            access_flags: self.access_flags,
            this_class,
            super_class,
            interfaces: vec![],
            fields: self.fields,
            methods: self.methods,
            attributes: vec![],
        }
        .to_bytes()
        .unwrap();
        Class::parse(&bytes).unwrap()
    }
}

/// Bytes of a `u2` constant index operand
pub fn index_operand(constants: &mut ConstantsPool, data: ConstantData) -> [u8; 2] {
    constants.get_data(&data).unwrap().0.to_be_bytes()
}

/// `aload_0; getfield <owner>.<name>:I; ireturn`
pub fn get_int_field(
    owner: &'static str,
    name: &'static str,
) -> impl FnOnce(&mut ConstantsPool) -> Vec<u8> {
    move |constants| {
        let [high, low] = index_operand(
            constants,
            ConstantData::FieldRef {
                class: owner.to_owned(),
                name: name.to_owned(),
                descriptor: String::from("I"),
            },
        );
        vec![0x2a, 0xb4, high, low, 0xac]
    }
}

/// `bipush <value>; ireturn`
pub fn return_int(value: i8) -> impl FnOnce(&mut ConstantsPool) -> Vec<u8> {
    move |_| vec![0x10, value as u8, 0xac]
}

/// Target class `me/Counter`:
///
/// ```java
/// public final class Counter {
///     private int count;
///     public Counter(int start) { .. }
///     public final int limit() { return 10; }
///     int count() { return count; }
/// }
/// ```
pub fn counter_class() -> Class {
    ClassBuilder::new(
        "me/Counter",
        Some("java/lang/Object"),
        AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::SUPER,
    )
        .field(AccessFlags::PRIVATE, "count", "I")
        .method(AccessFlags::PUBLIC, "<init>", "(I)V")
        .method_with_code(
            AccessFlags::PUBLIC | AccessFlags::FINAL,
            "limit",
            "()I",
            1,
            1,
            return_int(10),
        )
        .method_with_code(
            AccessFlags::empty(),
            "count",
            "()I",
            1,
            1,
            get_int_field("me/Counter", "count"),
        )
        .build()
}

/// Abstract mixin class `me/mixins/CounterMixin` extending `me/Counter`, with no directives
pub fn counter_mixin() -> ClassBuilder {
    ClassBuilder::new(
        "me/mixins/CounterMixin",
        Some("me/Counter"),
        AccessFlags::PUBLIC | AccessFlags::ABSTRACT | AccessFlags::SUPER,
    )
}

/// Attach an annotation to the class (`member` is `None`) or to the named field or method
pub fn annotate(class: &mut Class, member: Option<&str>, annotation: Annotation) {
    match member {
        None => class.annotations.push(annotation),
        Some(name) => {
            let member = class
                .fields
                .iter_mut()
                .chain(class.methods.iter_mut())
                .find(|member| member.name.as_str() == name)
                .unwrap_or_else(|| panic!("no member named {}", name));
            member.annotations.push(annotation);
        }
    }
}

/// Write a class under `dir`, at the path matching its name
pub fn write_class(dir: &Path, class: &Class) {
    let path = dir.join(format!("{}.class", class.name.as_str()));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, class.to_bytes().unwrap()).unwrap();
}

/// Write classes (and other files) into a jar, in the given order
pub fn write_jar(path: &Path, classes: &[Class], files: &[(&str, &[u8])]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut writer = ArchiveWriter::create(path).unwrap();
    for (name, contents) in files {
        writer
            .add(&ArchiveEntry {
                name: String::from(*name),
                directory: false,
                contents: contents.to_vec(),
            })
            .unwrap();
    }
    for class in classes {
        writer
            .add(&ArchiveEntry {
                name: format!("{}.class", class.name.as_str()),
                directory: false,
                contents: class.to_bytes().unwrap(),
            })
            .unwrap();
    }
    writer.finish().unwrap();
}

pub fn read_jar(path: &Path) -> Vec<ArchiveEntry> {
    let mut entries = vec![];
    visit_archive(path, |entry| -> Result<(), mixin::jvm::Error> {
        entries.push(entry);
        Ok(())
    })
    .unwrap();
    entries
}

pub fn read_class(dir: &Path, name: &str) -> Class {
    Class::parse(&fs::read(dir.join(format!("{}.class", name))).unwrap()).unwrap()
}

/// Bytecode of a method
pub fn code_of(class: &Class, name: &str, descriptor: &str) -> Vec<u8> {
    let method = class.get_method(name, descriptor).unwrap();
    let attribute = method
        .attributes
        .iter()
        .find(|attribute| attribute.name == "Code")
        .unwrap();
    let code: Code = class_file::decode_attribute(&attribute.info).unwrap();
    code.code_array.0
}
