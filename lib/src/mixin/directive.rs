use super::Error;
use crate::jvm::model::{Annotation, ElementValue};
use crate::jvm::{AccessFlags, BinaryName};
use std::borrow::Cow;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Kind of directive, named by the simple name of its annotation (eg. `Overwrite`)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectiveKind(Cow<'static, str>);

impl DirectiveKind {
    pub const MIXIN: DirectiveKind = DirectiveKind::name("Mixin");
    pub const FLAGS: DirectiveKind = DirectiveKind::name("Flags");
    pub const ADD: DirectiveKind = DirectiveKind::name("Add");
    pub const OVERWRITE: DirectiveKind = DirectiveKind::name("Overwrite");
    pub const SYNCHRONIZE: DirectiveKind = DirectiveKind::name("Synchronize");
    pub const INJECT: DirectiveKind = DirectiveKind::name("Inject");
    pub const INJECTABLE: DirectiveKind = DirectiveKind::name("Injectable");

    const fn name(name: &'static str) -> DirectiveKind {
        DirectiveKind(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> DirectiveKind {
        DirectiveKind(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    /// Binary name of the annotation, given the directive package
    pub fn annotation_type(&self, package: &str) -> String {
        format!("{}/{}", package, self.0)
    }
}

impl Display for DirectiveKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.as_str())
    }
}

impl Debug for DirectiveKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "@{}", self.0)
    }
}

/// Directive annotation found on a class or member
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub annotation: Annotation,
}

impl Directive {
    /// Interpret an annotation as a directive, if it comes from the directive package
    pub fn from_annotation(annotation: &Annotation, package: &str) -> Option<Directive> {
        let simple_name = annotation
            .annotation_type()?
            .strip_prefix(package)?
            .strip_prefix('/')?;
        if simple_name.contains('/') {
            return None;
        }
        Some(Directive {
            kind: DirectiveKind::new(simple_name),
            annotation: annotation.clone(),
        })
    }

    /// All the directives in a list of annotations, in declaration order
    pub fn find_all(annotations: &[Annotation], package: &str) -> Vec<Directive> {
        annotations
            .iter()
            .filter_map(|annotation| Directive::from_annotation(annotation, package))
            .collect()
    }

    pub fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::InvalidDirective {
            directive: self.kind.to_string(),
            reason: reason.into(),
        }
    }

    /// Optional `String` element
    pub fn string(&self, element: &str) -> Result<Option<&str>, Error> {
        match self.annotation.get(element) {
            None => Ok(None),
            Some(ElementValue::String(string)) => Ok(Some(string.as_str())),
            Some(other) => Err(self.invalid(format!(
                "`{}` should be a string, not {:?}",
                element,
                other,
            ))),
        }
    }

    /// Optional `boolean` element
    pub fn boolean(&self, element: &str) -> Result<Option<bool>, Error> {
        match self.annotation.get(element) {
            None => Ok(None),
            Some(ElementValue::Boolean(boolean)) => Ok(Some(*boolean)),
            Some(other) => Err(self.invalid(format!(
                "`{}` should be a boolean, not {:?}",
                element,
                other,
            ))),
        }
    }

    /// Optional `String[]` element (a single string is accepted too)
    pub fn strings(&self, element: &str) -> Result<Option<Vec<&str>>, Error> {
        match self.annotation.get(element) {
            None => Ok(None),
            Some(ElementValue::String(string)) => Ok(Some(vec![string.as_str()])),
            Some(ElementValue::Array(values)) => values
                .iter()
                .map(|value| match value {
                    ElementValue::String(string) => Ok(string.as_str()),
                    other => Err(self.invalid(format!(
                        "`{}` should only contain strings, not {:?}",
                        element,
                        other,
                    ))),
                })
                .collect::<Result<_, _>>()
                .map(Some),
            Some(other) => Err(self.invalid(format!(
                "`{}` should be a string array, not {:?}",
                element,
                other,
            ))),
        }
    }

    /// Optional enum element, returning the name of the constant
    pub fn enum_constant(&self, element: &str) -> Result<Option<&str>, Error> {
        match self.annotation.get(element) {
            None => Ok(None),
            Some(ElementValue::Enum { const_name, .. }) => Ok(Some(const_name.as_str())),
            Some(other) => Err(self.invalid(format!(
                "`{}` should be an enum constant, not {:?}",
                element,
                other,
            ))),
        }
    }
}

/// Renders like Java source, eg. `@Flags(flags={"public"}, mode=SET)`
impl Display for Directive {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "@{}", self.kind)?;
        if !self.annotation.values.is_empty() {
            f.write_str("(")?;
            for (i, (name, value)) in self.annotation.values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}=", name)?;
                write_value(f, value)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

fn write_value(f: &mut Formatter<'_>, value: &ElementValue) -> Result<(), FmtError> {
    match value {
        ElementValue::String(string) => write!(f, "{:?}", string),
        ElementValue::Boolean(boolean) => write!(f, "{}", boolean),
        ElementValue::Int(int) => write!(f, "{}", int),
        ElementValue::Enum { const_name, .. } => f.write_str(const_name),
        ElementValue::Array(values) => {
            f.write_str("{")?;
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(f, value)?;
            }
            f.write_str("}")
        }
        other => write!(f, "{:?}", other),
    }
}

/// `@Mixin(target = "", makePublic = false)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinDirective {
    /// Explicit target class, if one was given
    pub target: Option<BinaryName>,

    /// Make the target class and its members `public` instead of just `protected`
    pub make_public: bool,
}

impl MixinDirective {
    pub fn read(directive: &Directive) -> Result<MixinDirective, Error> {
        let target = match directive.string("target")? {
            None | Some("") => None,
            Some(target) => {
                Some(BinaryName::from_java_name(target).map_err(|err| directive.invalid(err))?)
            }
        };
        Ok(MixinDirective {
            target,
            make_public: directive.boolean("makePublic")?.unwrap_or(false),
        })
    }
}

/// How `@Flags` combines its flags with the existing ones
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlagsMode {
    Add,
    Remove,
    Set,
}

/// `@Flags(flags = {...}, mode = ADD)`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FlagsDirective {
    pub flags: AccessFlags,
    pub mode: FlagsMode,
}

impl FlagsDirective {
    pub fn read(directive: &Directive) -> Result<FlagsDirective, Error> {
        let mut flags = AccessFlags::empty();
        for entry in directive.strings("flags")?.unwrap_or_default() {
            for name in entry.split_whitespace() {
                flags |= AccessFlags::from_name(name)
                    .ok_or_else(|| directive.invalid(format!("unknown access flag '{}'", name)))?;
            }
        }
        let mode = match directive.enum_constant("mode")? {
            None | Some("ADD") => FlagsMode::Add,
            Some("REMOVE") => FlagsMode::Remove,
            Some("SET") => FlagsMode::Set,
            Some(other) => return Err(directive.invalid(format!("unknown mode '{}'", other))),
        };
        Ok(FlagsDirective { flags, mode })
    }

    pub fn apply(&self, existing: AccessFlags) -> AccessFlags {
        match self.mode {
            FlagsMode::Add => existing | self.flags,
            FlagsMode::Remove => existing - self.flags,
            FlagsMode::Set => self.flags,
        }
    }
}

/// `@Inject(injectable = "...")`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectDirective {
    /// Name of the `@Injectable` method to splice in
    pub injectable: String,
}

impl InjectDirective {
    pub fn read(directive: &Directive) -> Result<InjectDirective, Error> {
        match directive.string("injectable")? {
            Some(injectable) if !injectable.is_empty() => Ok(InjectDirective {
                injectable: injectable.to_owned(),
            }),
            _ => Err(directive.invalid("missing `injectable`")),
        }
    }
}

/// `@Injectable(name = "")`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectableDirective {
    /// Name to match instead of the method name
    pub name: Option<String>,
}

impl InjectableDirective {
    pub fn read(directive: &Directive) -> Result<InjectableDirective, Error> {
        Ok(InjectableDirective {
            name: directive
                .string("name")?
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::Name;

    const PACKAGE: &str = "dev/minco/mixin";

    fn directive(kind: &str) -> Directive {
        let annotation_type = BinaryName::from_string(format!("{}/{}", PACKAGE, kind)).unwrap();
        Directive::from_annotation(&Annotation::new(&annotation_type, false), PACKAGE).unwrap()
    }

    fn with(mut directive: Directive, name: &str, value: ElementValue) -> Directive {
        directive.annotation.values.push((name.to_owned(), value));
        directive
    }

    #[test]
    fn recognizing_directives() {
        let other = BinaryName::from_string(String::from("dev/minco/mixin/sub/Mixin")).unwrap();
        assert_eq!(Directive::from_annotation(&Annotation::new(&other, false), PACKAGE), None);
        let other = BinaryName::from_string(String::from("java/lang/Deprecated")).unwrap();
        assert_eq!(Directive::from_annotation(&Annotation::new(&other, true), PACKAGE), None);
        assert_eq!(directive("Overwrite").kind, DirectiveKind::OVERWRITE);
    }

    #[test]
    fn mixin_parameters() {
        let plain = MixinDirective::read(&directive("Mixin")).unwrap();
        assert_eq!(plain.target, None);
        assert!(!plain.make_public);

        let explicit = with(
            with(directive("Mixin"), "target", ElementValue::String(String::from("me.List"))),
            "makePublic",
            ElementValue::Boolean(true),
        );
        let explicit = MixinDirective::read(&explicit).unwrap();
        assert_eq!(explicit.target.unwrap().as_str(), "me/List");
        assert!(explicit.make_public);

        let bad = with(directive("Mixin"), "makePublic", ElementValue::Int(1));
        assert!(matches!(MixinDirective::read(&bad), Err(Error::InvalidDirective { .. })));
    }

    #[test]
    fn flags_parameters() {
        let flags = with(
            with(
                directive("Flags"),
                "flags",
                ElementValue::Array(vec![
                    ElementValue::String(String::from("public")),
                    ElementValue::String(String::from("static final")),
                ]),
            ),
            "mode",
            ElementValue::Enum {
                type_descriptor: String::from("Ldev/minco/mixin/Flags$Mode;"),
                const_name: String::from("REMOVE"),
            },
        );
        let flags = FlagsDirective::read(&flags).unwrap();
        assert_eq!(
            flags.flags,
            AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL
        );
        assert_eq!(flags.mode, FlagsMode::Remove);
        assert_eq!(
            flags.apply(AccessFlags::PUBLIC | AccessFlags::SYNCHRONIZED),
            AccessFlags::SYNCHRONIZED
        );

        let unknown = with(
            directive("Flags"),
            "flags",
            ElementValue::String(String::from("sealed")),
        );
        assert!(FlagsDirective::read(&unknown).is_err());
    }

    #[test]
    fn display() {
        let flags = with(
            directive("Flags"),
            "flags",
            ElementValue::Array(vec![ElementValue::String(String::from("public"))]),
        );
        assert_eq!(flags.to_string(), "@Flags(flags={\"public\"})");
        assert_eq!(directive("Add").to_string(), "@Add");
    }
}
