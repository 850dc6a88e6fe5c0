use crate::jvm::class_file::ConstantData;
use crate::jvm::{BinaryName, Name, UnqualifiedName};
use std::borrow::Cow;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// Renames to apply to everything a member refers to when it gets moved from one class into
/// another
///
/// Class renames apply to class constants and to every class type inside descriptors and generic
/// signatures. Field renames apply to field references, keyed by the owner class as it was before
/// any class renames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remapper {
    classes: HashMap<String, String>,
    fields: HashMap<(String, String), String>,
}

impl Remapper {
    pub fn new() -> Remapper {
        Remapper::default()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.fields.is_empty()
    }

    pub fn rename_class(&mut self, from: &BinaryName, to: &BinaryName) {
        self.classes
            .insert(from.as_str().to_owned(), to.as_str().to_owned());
    }

    pub fn rename_field(
        &mut self,
        owner: &BinaryName,
        from: &UnqualifiedName,
        to: &UnqualifiedName,
    ) {
        self.fields.insert(
            (owner.as_str().to_owned(), from.as_str().to_owned()),
            to.as_str().to_owned(),
        );
    }

    /// Map the name inside a `CONSTANT_Class_info`
    ///
    /// Array classes are named by their descriptor (eg. `[Ljava/lang/String;`).
    pub fn map_class_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if name.starts_with('[') {
            Cow::Owned(self.map_descriptor(name))
        } else {
            match self.classes.get(name) {
                Some(renamed) => Cow::Owned(renamed.clone()),
                None => Cow::Borrowed(name),
            }
        }
    }

    /// Map a field name, given the (unmapped) class that owns the field
    pub fn map_field_name<'a>(&self, owner: &str, name: &'a str) -> Cow<'a, str> {
        match self.fields.get(&(owner.to_owned(), name.to_owned())) {
            Some(renamed) => Cow::Owned(renamed.clone()),
            None => Cow::Borrowed(name),
        }
    }

    /// Map every class type in a field descriptor, method descriptor, or generic signature
    ///
    /// Input that doesn't parse is copied through as-is.
    pub fn map_descriptor(&self, descriptor: &str) -> String {
        if self.classes.is_empty() {
            return descriptor.to_owned();
        }

        let mut source = descriptor.chars().peekable();
        let mut output = String::with_capacity(descriptor.len());

        // Formal type parameters: `<T:Ljava/lang/Object;U::Ljava/lang/Comparable<TU;>;>`
        if source.peek() == Some(&'<') {
            source.next();
            output.push('<');
            while let Some(c) = source.next() {
                output.push(c);
                match c {
                    '>' => break,
                    ':' => {
                        if source.peek() != Some(&':') {
                            self.map_type(&mut source, &mut output);
                        }
                    }
                    _ => (),
                }
            }
        }

        while source.peek().is_some() {
            self.map_type(&mut source, &mut output);
        }
        output
    }

    /// Map one type (or copy one character of punctuation like `(` or `^`)
    fn map_type(&self, source: &mut Peekable<Chars>, output: &mut String) {
        match source.next() {
            Some('L') => {
                output.push('L');
                let mut name = String::new();
                while let Some(&c) = source.peek() {
                    if c == ';' || c == '<' {
                        break;
                    }
                    name.push(c);
                    source.next();
                }
                output.push_str(&self.map_class_name(&name));

                // Type arguments and inner class suffixes, up until the terminating `;`
                while let Some(c) = source.next() {
                    output.push(c);
                    match c {
                        ';' => break,
                        '<' => self.map_type_arguments(source, output),
                        _ => (),
                    }
                }
            }
            Some('T') => {
                output.push('T');
                for c in source.by_ref() {
                    output.push(c);
                    if c == ';' {
                        break;
                    }
                }
            }
            Some(c) => output.push(c),
            None => (),
        }
    }

    /// Map type arguments, starting just after the `<` and consuming the closing `>`
    fn map_type_arguments(&self, source: &mut Peekable<Chars>, output: &mut String) {
        while let Some(&c) = source.peek() {
            match c {
                '>' => {
                    source.next();
                    output.push('>');
                    return;
                }
                '*' | '+' | '-' => {
                    source.next();
                    output.push(c);
                }
                _ => self.map_type(source, output),
            }
        }
    }

    /// Map a resolved constant
    pub fn map_constant(&self, data: ConstantData) -> ConstantData {
        if self.is_empty() {
            return data;
        }

        match data {
            ConstantData::Class(name) => {
                ConstantData::Class(self.map_class_name(&name).into_owned())
            }
            ConstantData::FieldRef {
                class,
                name,
                descriptor,
            } => ConstantData::FieldRef {
                name: self.map_field_name(&class, &name).into_owned(),
                class: self.map_class_name(&class).into_owned(),
                descriptor: self.map_descriptor(&descriptor),
            },
            ConstantData::MethodRef {
                class,
                name,
                descriptor,
                is_interface,
            } => ConstantData::MethodRef {
                class: self.map_class_name(&class).into_owned(),
                name,
                descriptor: self.map_descriptor(&descriptor),
                is_interface,
            },
            ConstantData::NameAndType { name, descriptor } => ConstantData::NameAndType {
                name,
                descriptor: self.map_descriptor(&descriptor),
            },
            ConstantData::MethodType(descriptor) => {
                ConstantData::MethodType(self.map_descriptor(&descriptor))
            }
            ConstantData::MethodHandle {
                handle_kind,
                member,
            } => ConstantData::MethodHandle {
                handle_kind,
                member: Box::new(self.map_constant(*member)),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn remapper() -> Remapper {
        let mut remapper = Remapper::new();
        remapper.rename_class(
            &BinaryName::from_string(String::from("me/mixins/ListMixin")).unwrap(),
            &BinaryName::from_string(String::from("me/List")).unwrap(),
        );
        remapper.rename_field(
            &BinaryName::from_string(String::from("me/mixins/ListMixin")).unwrap(),
            &UnqualifiedName::from_string(String::from("size_")).unwrap(),
            &UnqualifiedName::from_string(String::from("size")).unwrap(),
        );
        remapper
    }

    #[test]
    fn descriptors() {
        let remapper = remapper();
        assert_eq!(
            remapper.map_descriptor("(Lme/mixins/ListMixin;[Lme/mixins/ListMixin;I)Lme/mixins/ListMixinImpl;"),
            "(Lme/List;[Lme/List;I)Lme/mixins/ListMixinImpl;"
        );
        assert_eq!(remapper.map_descriptor("J"), "J");
    }

    #[test]
    fn signatures() {
        let remapper = remapper();
        assert_eq!(
            remapper.map_descriptor(
                "<LT:Lme/mixins/ListMixin;U::Ljava/lang/Comparable<-Lme/mixins/ListMixin;>;>(TLT;Ljava/util/Map<*+Lme/mixins/ListMixin;>.Entry<Lme/mixins/ListMixin;>;)V^Lme/mixins/ListMixin;"
            ),
            "<LT:Lme/List;U::Ljava/lang/Comparable<-Lme/List;>;>(TLT;Ljava/util/Map<*+Lme/List;>.Entry<Lme/List;>;)V^Lme/List;"
        );
    }

    #[test]
    fn constants() {
        let remapper = remapper();
        assert_eq!(
            remapper.map_constant(ConstantData::Class(String::from("[Lme/mixins/ListMixin;"))),
            ConstantData::Class(String::from("[Lme/List;"))
        );
        assert_eq!(
            remapper.map_constant(ConstantData::FieldRef {
                class: String::from("me/mixins/ListMixin"),
                name: String::from("size_"),
                descriptor: String::from("I"),
            }),
            ConstantData::FieldRef {
                class: String::from("me/List"),
                name: String::from("size"),
                descriptor: String::from("I"),
            }
        );
        assert_eq!(
            remapper.map_constant(ConstantData::FieldRef {
                class: String::from("me/Other"),
                name: String::from("size_"),
                descriptor: String::from("I"),
            }),
            ConstantData::FieldRef {
                class: String::from("me/Other"),
                name: String::from("size_"),
                descriptor: String::from("I"),
            }
        );
    }
}
