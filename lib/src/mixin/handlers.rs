//! Handlers for the built-in directives

use super::{
    Annotated, ApplicationType, Directive, DirectiveKind, DirectiveRegistry, Error,
    FlagsDirective, Handler, HandlerContext, InjectDirective, InjectableDirective, MixinDirective,
};
use crate::jvm::model::{Class, Field, Method};
use crate::jvm::{AccessFlags, Name, UnqualifiedName};

/// Runs before everything else
pub const LOGGING_PRIORITY: i32 = i32::MIN;

/// Default priority, used by directives which edit existing target members
pub const DEFAULT_PRIORITY: i32 = 0;

/// Runs before any members get edited
pub const SHAPE_PRIORITY: i32 = 1;

/// Adding members and changing flags
pub const MEMBER_PRIORITY: i32 = 2;

/// Suffix that fields added with `@Add` must have (and which gets stripped)
pub const ADDED_FIELD_SUFFIX: &str = "_";

pub fn register_builtins(registry: &mut DirectiveRegistry) {
    registry.register(DirectiveKind::MIXIN, LOGGING_PRIORITY, Handler::class(log_mixin));
    registry.register(DirectiveKind::MIXIN, SHAPE_PRIORITY, Handler::class(fix_shape));
    registry.register(DirectiveKind::FLAGS, MEMBER_PRIORITY, Handler::any(flags));
    registry.register(DirectiveKind::ADD, MEMBER_PRIORITY, Handler::field(add_field));
    registry.register(DirectiveKind::ADD, MEMBER_PRIORITY, Handler::method(add_method));
    registry.register(DirectiveKind::OVERWRITE, DEFAULT_PRIORITY, Handler::method(overwrite));
    registry.register(DirectiveKind::SYNCHRONIZE, DEFAULT_PRIORITY, Handler::method(synchronize));
    registry.register(DirectiveKind::INJECT, DEFAULT_PRIORITY, Handler::method(inject));
}

fn log_mixin(
    context: &HandlerContext<'_>,
    directive: &Directive,
    mixin: &Class,
    _target: &mut Class,
) -> Result<(), Error> {
    context.log(&format!(
        "Handling class {} with annotation {}",
        mixin.name.to_java_name(),
        directive
    ));
    Ok(())
}

/// Make the target extensible so that patched sources can be compiled against it
///
/// Only matters for source patching, so this is skipped in [`ApplicationType::FinalPatch`].
fn fix_shape(
    context: &HandlerContext<'_>,
    directive: &Directive,
    _mixin: &Class,
    target: &mut Class,
) -> Result<(), Error> {
    if context.application_type() == ApplicationType::FinalPatch {
        return Ok(());
    }
    let make_public = MixinDirective::read(directive)?.make_public;

    // Subclasses need a no-args constructor to call
    let needs_no_args = {
        let mut constructors = target.constructors().peekable();
        constructors.peek().is_some()
            && constructors.all(|constructor| !constructor.descriptor.starts_with("()"))
    };
    if needs_no_args {
        target.add_method(Method::new(
            AccessFlags::PROTECTED,
            UnqualifiedName::INIT,
            "()V",
        ))?;
    }

    target.access_flags =
        target.access_flags.make_class_accessible(make_public) - AccessFlags::FINAL;
    for member in target.fields.iter_mut().chain(target.methods.iter_mut()) {
        member.access_flags = member.access_flags.make_accessible(make_public)
            - AccessFlags::FINAL
            - AccessFlags::SYNTHETIC;
    }
    Ok(())
}

fn flags(
    context: &HandlerContext<'_>,
    directive: &Directive,
    annotated: Annotated<'_>,
    target: &mut Class,
) -> Result<(), Error> {
    let flags = FlagsDirective::read(directive)?;
    let access_flags = match annotated {
        Annotated::Class(_) => &mut target.access_flags,
        Annotated::Field(field) => &mut context.target_field(field, target)?.access_flags,
        Annotated::Method(method) => &mut context.target_method(method, target)?.access_flags,
    };
    *access_flags = flags.apply(*access_flags);
    Ok(())
}

fn add_field(
    context: &HandlerContext<'_>,
    _directive: &Directive,
    field: &Field,
    target: &mut Class,
) -> Result<(), Error> {
    let name = field
        .name
        .strip_suffix(ADDED_FIELD_SUFFIX)
        .ok_or_else(|| Error::InvalidMemberName {
            member: field.to_string(),
            reason: format!("name of @Add-ed field must end with '{}'", ADDED_FIELD_SUFFIX),
        })?;

    let mut added = context.transplant(field);
    added.name = name;
    added.access_flags =
        (added.access_flags - AccessFlags::PUBLIC - AccessFlags::PRIVATE) | AccessFlags::PROTECTED;
    target.add_field(added)?;
    Ok(())
}

fn add_method(
    context: &HandlerContext<'_>,
    _directive: &Directive,
    method: &Method,
    target: &mut Class,
) -> Result<(), Error> {
    target.add_method(context.transplant(method))?;
    Ok(())
}

/// Replace a target method with the mixin version
///
/// The target method must exist in both phases, but it is only replaced in
/// [`ApplicationType::FinalPatch`] since sources get patched separately.
fn overwrite(
    context: &HandlerContext<'_>,
    _directive: &Directive,
    method: &Method,
    target: &mut Class,
) -> Result<(), Error> {
    let existing = context.target_method(method, target)?;
    if context.application_type() == ApplicationType::PrePatch {
        return Ok(());
    }
    *existing = context.transplant(method);
    Ok(())
}

fn synchronize(
    context: &HandlerContext<'_>,
    _directive: &Directive,
    method: &Method,
    target: &mut Class,
) -> Result<(), Error> {
    context.target_method(method, target)?.access_flags |= AccessFlags::SYNCHRONIZED;
    Ok(())
}

/// Splice an `@Injectable` method of the mixin into the matching target method
///
/// Injectables are matched on their `name` if they have one, otherwise on their method name.
fn inject(
    context: &HandlerContext<'_>,
    directive: &Directive,
    method: &Method,
    target: &mut Class,
) -> Result<(), Error> {
    let inject = InjectDirective::read(directive)?;
    let package = context.settings.directive_package.as_str();

    let mut candidates = vec![];
    for candidate in &context.mixin.methods {
        let injectable = candidate
            .annotations
            .iter()
            .filter_map(|annotation| Directive::from_annotation(annotation, package))
            .find(|directive| directive.kind == DirectiveKind::INJECTABLE);
        let injectable = match injectable {
            Some(injectable) => InjectableDirective::read(&injectable)?,
            None => continue,
        };
        let name = injectable
            .name
            .as_deref()
            .unwrap_or_else(|| candidate.name.as_str());
        if name == inject.injectable {
            candidates.push(candidate);
        }
    }

    let injectable = match candidates.as_slice() {
        [injectable] => *injectable,
        _ => {
            return Err(Error::InjectableResolutionError {
                injectable: inject.injectable,
                mixin: context.mixin.name.to_java_name(),
                found: candidates.len(),
            })
        }
    };

    let target_method = context.target_method(method, target)?;
    context.injector.inject(
        target_method,
        injectable,
        directive,
        context.settings.fail_on_injection_error,
    )
}
