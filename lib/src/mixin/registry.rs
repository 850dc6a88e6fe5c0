use super::{ApplicationType, CodeInjector, Directive, DirectiveKind, Error, LogSink, Settings};
use crate::jvm::model::{Class, Field, Member, Method, Remapper};
use crate::jvm::{BinaryName, Name};
use std::collections::BTreeMap;
use std::fmt::{Display, Error as FmtError, Formatter};
use std::rc::Rc;
use std::sync::Arc;

/// Thing a directive is attached to, in the mixin class
#[derive(Debug, Clone, Copy)]
pub enum Annotated<'a> {
    Class(&'a Class),
    Field(&'a Field),
    Method(&'a Method),
}

impl<'a> Display for Annotated<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Annotated::Class(class) => f.write_str(&class.name.to_java_name()),
            Annotated::Field(member) | Annotated::Method(member) => Display::fmt(member, f),
        }
    }
}

/// Handler for directives on the mixin class itself
pub type ClassHandler =
    dyn Fn(&HandlerContext<'_>, &Directive, &Class, &mut Class) -> Result<(), Error> + Send + Sync;

/// Handler for directives on a field or a method
pub type MemberHandler =
    dyn Fn(&HandlerContext<'_>, &Directive, &Member, &mut Class) -> Result<(), Error> + Send + Sync;

/// Handler for directives on anything
pub type AnyHandler = dyn Fn(
        &HandlerContext<'_>,
        &Directive,
        Annotated<'_>,
        &mut Class,
    ) -> Result<(), Error>
    + Send
    + Sync;

/// Directive handler, tagged with what it can be attached to
///
/// Handlers receive the directive, the annotated class or member of the mixin, and the target
/// class being edited.
#[derive(Clone)]
pub enum Handler {
    Class(Arc<ClassHandler>),
    Field(Arc<MemberHandler>),
    Method(Arc<MemberHandler>),
    Any(Arc<AnyHandler>),
}

impl Handler {
    pub fn class(
        handler: impl Fn(&HandlerContext<'_>, &Directive, &Class, &mut Class) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    ) -> Handler {
        Handler::Class(Arc::new(handler))
    }

    pub fn field(
        handler: impl Fn(&HandlerContext<'_>, &Directive, &Field, &mut Class) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    ) -> Handler {
        Handler::Field(Arc::new(handler))
    }

    pub fn method(
        handler: impl Fn(&HandlerContext<'_>, &Directive, &Method, &mut Class) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    ) -> Handler {
        Handler::Method(Arc::new(handler))
    }

    pub fn any(
        handler: impl Fn(
                &HandlerContext<'_>,
                &Directive,
                Annotated<'_>,
                &mut Class,
            ) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    ) -> Handler {
        Handler::Any(Arc::new(handler))
    }

    /// Can this handler be attached to the given class or member?
    pub fn applies_to(&self, annotated: Annotated<'_>) -> bool {
        matches!(
            (self, annotated),
            (Handler::Class(_), Annotated::Class(_))
                | (Handler::Field(_), Annotated::Field(_))
                | (Handler::Method(_), Annotated::Method(_))
                | (Handler::Any(_), _)
        )
    }

    /// What this handler can be attached to
    pub fn role(&self) -> &'static str {
        match self {
            Handler::Class(_) => "class",
            Handler::Field(_) => "field",
            Handler::Method(_) => "method",
            Handler::Any(_) => "any",
        }
    }

    /// Run the handler
    ///
    /// Fails with [`Error::HandlerRoleMismatch`] if the handler can't be attached to `annotated`
    /// (see [`Handler::applies_to`]).
    pub fn call(
        &self,
        context: &HandlerContext<'_>,
        directive: &Directive,
        annotated: Annotated<'_>,
        target: &mut Class,
    ) -> Result<(), Error> {
        match (self, annotated) {
            (Handler::Class(handler), Annotated::Class(class)) => {
                handler(context, directive, class, target)
            }
            (Handler::Field(handler), Annotated::Field(member))
            | (Handler::Method(handler), Annotated::Method(member)) => {
                handler(context, directive, member, target)
            }
            (Handler::Any(handler), annotated) => handler(context, directive, annotated, target),
            (handler, annotated) => Err(Error::HandlerRoleMismatch {
                role: handler.role(),
                member: annotated.to_string(),
            }),
        }
    }
}

/// Handler along with the priority it runs at (lower runs first)
#[derive(Clone)]
pub struct RegisteredHandler {
    pub priority: i32,
    pub handler: Handler,
}

/// Table of handlers for each kind of directive
///
/// Handlers for a kind are kept sorted by priority, with ties kept in registration order, so
/// lookups always return them in the same order.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    handlers: BTreeMap<DirectiveKind, Vec<RegisteredHandler>>,
}

impl DirectiveRegistry {
    /// Registry with no handlers at all
    pub fn new() -> DirectiveRegistry {
        DirectiveRegistry::default()
    }

    /// Registry with the handlers for the built-in directives
    pub fn with_builtins() -> DirectiveRegistry {
        let mut registry = DirectiveRegistry::new();
        super::handlers::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, kind: DirectiveKind, priority: i32, handler: Handler) {
        let handlers = self.handlers.entry(kind).or_default();
        let position = handlers
            .iter()
            .position(|registered| registered.priority > priority)
            .unwrap_or(handlers.len());
        handlers.insert(position, RegisteredHandler { priority, handler });
    }

    /// Handlers for a kind of directive, in the order they should run
    pub fn lookup(&self, kind: &DirectiveKind) -> &[RegisteredHandler] {
        self.handlers.get(kind).map_or(&[][..], Vec::as_slice)
    }

    /// Every kind of directive with at least one handler
    pub fn kinds(&self) -> impl Iterator<Item = &DirectiveKind> {
        self.handlers.keys()
    }
}

/// Everything a handler has access to besides the directive and target
pub struct HandlerContext<'a> {
    pub settings: &'a Settings,

    /// Mixin class the directive was found in
    pub mixin: &'a Class,

    /// Class the mixin is being applied to
    pub target_name: &'a BinaryName,

    /// Renames applied to members copied from the mixin into the target
    pub remapper: &'a Rc<Remapper>,
    pub injector: &'a dyn CodeInjector,
    pub log: &'a LogSink,
}

impl<'a> HandlerContext<'a> {
    pub fn application_type(&self) -> ApplicationType {
        self.settings.application_type
    }

    pub fn log(&self, message: &str) {
        self.log.log(message)
    }

    /// Copy a mixin member so that it can be inserted into the target
    ///
    /// References to the mixin class become references to the target and directive annotations
    /// are dropped.
    pub fn transplant(&self, member: &Member) -> Member {
        let mut member = member.transplant(self.remapper);
        let package = self.settings.directive_package.as_str();
        member
            .annotations
            .retain(|annotation| Directive::from_annotation(annotation, package).is_none());
        member
    }

    /// Find the method in the target matching a method of the mixin
    pub fn target_method<'t>(
        &self,
        method: &Method,
        target: &'t mut Class,
    ) -> Result<&'t mut Method, Error> {
        let descriptor = self.remapper.map_descriptor(&method.descriptor);
        let position = target
            .methods
            .iter()
            .position(|m| m.matches(method.name.as_str(), &descriptor));
        match position {
            Some(position) => Ok(&mut target.methods[position]),
            None => Err(missing_member(method, target, &target.methods)),
        }
    }

    /// Find the field in the target matching a field of the mixin
    ///
    /// Fields added with a name suffix are found under their name in the target.
    pub fn target_field<'t>(
        &self,
        field: &Field,
        target: &'t mut Class,
    ) -> Result<&'t mut Field, Error> {
        let name = self
            .remapper
            .map_field_name(self.mixin.name.as_str(), field.name.as_str());
        let descriptor = self.remapper.map_descriptor(&field.descriptor);
        let position = target
            .fields
            .iter()
            .position(|f| f.matches(&name, &descriptor));
        match position {
            Some(position) => Ok(&mut target.fields[position]),
            None => Err(missing_member(field, target, &target.fields)),
        }
    }
}

fn missing_member(member: &Member, target: &Class, candidates: &[Member]) -> Error {
    Error::MissingTargetMember {
        member: member.to_string(),
        target: target.name.to_java_name(),
        available: candidates.iter().map(Member::to_string).collect(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_order() {
        let mut registry = DirectiveRegistry::new();
        for priority in [2, 0, 2, i32::MIN] {
            registry.register(DirectiveKind::FLAGS, priority, Handler::any(|_, _, _, _| Ok(())));
        }

        let priorities: Vec<i32> = registry
            .lookup(&DirectiveKind::FLAGS)
            .iter()
            .map(|registered| registered.priority)
            .collect();
        assert_eq!(priorities, vec![i32::MIN, 0, 2, 2]);
        assert!(registry.lookup(&DirectiveKind::ADD).is_empty());
        assert_eq!(registry.kinds().count(), 1);
    }

    #[test]
    fn roles() {
        let class = Class::new(BinaryName::OBJECT, None, crate::jvm::AccessFlags::PUBLIC);
        let handler = Handler::method(|_, _, _, _| Ok(()));
        assert!(!handler.applies_to(Annotated::Class(&class)));
        assert!(Handler::any(|_, _, _, _| Ok(())).applies_to(Annotated::Class(&class)));
        assert!(Handler::class(|_, _, _, _| Ok(())).applies_to(Annotated::Class(&class)));
    }

    #[test]
    fn mismatched_roles_fail() {
        let settings = Settings::new();
        let mixin = Class::new(BinaryName::OBJECT, None, crate::jvm::AccessFlags::ABSTRACT);
        let mut target = mixin.clone();
        let remapper = Rc::new(Remapper::new());
        let log = LogSink::default();
        let context = HandlerContext {
            settings: &settings,
            mixin: &mixin,
            target_name: &mixin.name,
            remapper: &remapper,
            injector: &crate::mixin::UnavailableInjector,
            log: &log,
        };
        let directive = Directive {
            kind: DirectiveKind::MIXIN,
            annotation: crate::jvm::model::Annotation::new(&BinaryName::OBJECT, false),
        };

        let handler = Handler::method(|_, _, _, _| Ok(()));
        match handler.call(&context, &directive, Annotated::Class(&mixin), &mut target) {
            Err(Error::HandlerRoleMismatch { role, member }) => {
                assert_eq!(role, "method");
                assert_eq!(member, "java.lang.Object");
            }
            other => panic!("unexpected result {:?}", other),
        }

        let handler = Handler::class(|_, _, _, _| Ok(()));
        assert!(handler
            .call(&context, &directive, Annotated::Class(&mixin), &mut target)
            .is_ok());
    }
}
