use super::handlers::ADDED_FIELD_SUFFIX;
use super::mixin_transformer::{Applicator, MemberRef};
use super::{
    Annotated, CodeInjector, Directive, DirectiveKind, DirectiveRegistry, Error, LogSink,
    MixinDirective, MixinTransformer, NoMixinPolicy, Settings,
};
use crate::jvm::model::{Annotation, Class, Remapper};
use crate::jvm::{AccessFlags, BinaryName};
use std::rc::Rc;

/// Outcome of processing a class from a mixin source
#[derive(Debug)]
pub enum Processed {
    /// The class is a mixin, ready to be applied to its target
    Mixin(MixinTransformer),

    /// The class has no `@Mixin` and was ignored
    Skipped,
}

/// Turns mixin classes into transformers for their targets
pub struct MixinProcessor<'a> {
    pub registry: &'a DirectiveRegistry,
    pub settings: &'a Rc<Settings>,
    pub injector: &'a Rc<dyn CodeInjector>,
    pub log: &'a LogSink,
}

impl<'a> MixinProcessor<'a> {
    /// Validate a mixin class and resolve the handlers for all of its directives
    ///
    /// Handlers run ordered by priority. Handlers with the same priority run in the order their
    /// directives appear: class directives first, then fields, then methods.
    pub fn process(&self, class: Class, no_mixin: NoMixinPolicy) -> Result<Processed, Error> {
        let package = self.settings.directive_package.as_str();

        let mut mixin_directives = Directive::find_all(&class.annotations, package)
            .into_iter()
            .filter(|directive| directive.kind == DirectiveKind::MIXIN);
        let directive = match (mixin_directives.next(), mixin_directives.next()) {
            (None, _) => {
                return match no_mixin {
                    NoMixinPolicy::Skip => Ok(Processed::Skipped),
                    NoMixinPolicy::Error => Err(Error::NotAMixin(class.name.to_java_name())),
                };
            }
            (Some(directive), None) => directive,
            (Some(_), Some(_)) => {
                return Err(Error::DuplicateMixinDirective(class.name.to_java_name()))
            }
        };

        if !class.access_flags.contains(AccessFlags::ABSTRACT) {
            return Err(Error::InvalidMixinShape {
                class: class.name.to_java_name(),
            });
        }

        let target = match MixinDirective::read(&directive)?.target {
            Some(target) => target,
            None => class.super_name.clone().ok_or_else(|| {
                directive.invalid("no `target` was given and the class has no superclass")
            })?,
        };

        let mut applicators = vec![];
        self.collect(
            MemberRef::Class,
            Annotated::Class(&class),
            &class.annotations,
            &mut applicators,
        );
        for (index, field) in class.fields.iter().enumerate() {
            self.collect(
                MemberRef::Field(index),
                Annotated::Field(field),
                &field.annotations,
                &mut applicators,
            );
        }
        for (index, method) in class.methods.iter().enumerate() {
            self.collect(
                MemberRef::Method(index),
                Annotated::Method(method),
                &method.annotations,
                &mut applicators,
            );
        }
        applicators.sort_by_key(|applicator| applicator.priority);

        self.log.log(&format!(
            "Found Mixin class '{}' targeting class '{}' with {} applicators.",
            class.name.to_java_name(),
            target.to_java_name(),
            applicators.len()
        ));
        if applicators.is_empty() {
            return Err(Error::NoApplicatorsFound(class.name.to_java_name()));
        }

        let remapper = Rc::new(self.remapper(&class, &target));
        Ok(Processed::Mixin(MixinTransformer::new(
            class,
            target,
            remapper,
            applicators,
            self.settings.clone(),
            self.injector.clone(),
            self.log.clone(),
        )))
    }

    fn collect(
        &self,
        member: MemberRef,
        annotated: Annotated<'_>,
        annotations: &[Annotation],
        applicators: &mut Vec<Applicator>,
    ) {
        let package = self.settings.directive_package.as_str();
        for directive in Directive::find_all(annotations, package) {
            for registered in self.registry.lookup(&directive.kind) {
                if registered.handler.applies_to(annotated) {
                    applicators.push(Applicator {
                        priority: registered.priority,
                        member,
                        directive: directive.clone(),
                        handler: registered.handler.clone(),
                    });
                }
            }
        }
    }

    /// Renames for members copied out of the mixin
    ///
    /// The mixin class becomes the target, and `@Add`-ed fields lose their suffix.
    fn remapper(&self, class: &Class, target: &BinaryName) -> Remapper {
        let package = self.settings.directive_package.as_str();
        let mut remapper = Remapper::new();
        if &class.name != target {
            remapper.rename_class(&class.name, target);
        }
        for field in &class.fields {
            let added = Directive::find_all(&field.annotations, package)
                .iter()
                .any(|directive| directive.kind == DirectiveKind::ADD);
            if let (true, Some(name)) = (added, field.name.strip_suffix(ADDED_FIELD_SUFFIX)) {
                remapper.rename_field(&class.name, &field.name, &name);
            }
        }
        remapper
    }
}
