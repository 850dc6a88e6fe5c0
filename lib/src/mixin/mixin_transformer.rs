use super::{Annotated, CodeInjector, Directive, Error, Handler, HandlerContext, LogSink, Settings};
use crate::jvm::model::{Class, Remapper};
use crate::jvm::BinaryName;
use crate::transformer::{TargetedTransformer, Transformer};
use std::cell::Cell;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};
use std::rc::Rc;

/// Where in the mixin class a directive was found
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum MemberRef {
    Class,
    Field(usize),
    Method(usize),
}

/// Directive handler bound to the directive and member it was found on
#[derive(Clone)]
pub(super) struct Applicator {
    pub priority: i32,
    pub member: MemberRef,
    pub directive: Directive,
    pub handler: Handler,
}

/// Transformer applying one mixin class to its target
pub struct MixinTransformer {
    mixin: Class,
    target: BinaryName,
    remapper: Rc<Remapper>,
    applicators: Vec<Applicator>,
    settings: Rc<Settings>,
    injector: Rc<dyn CodeInjector>,
    log: LogSink,

    /// Has this transformer been run on its target?
    ran: Cell<bool>,
}

impl MixinTransformer {
    pub(super) fn new(
        mixin: Class,
        target: BinaryName,
        remapper: Rc<Remapper>,
        applicators: Vec<Applicator>,
        settings: Rc<Settings>,
        injector: Rc<dyn CodeInjector>,
        log: LogSink,
    ) -> MixinTransformer {
        MixinTransformer {
            mixin,
            target,
            remapper,
            applicators,
            settings,
            injector,
            log,
            ran: Cell::new(false),
        }
    }

    /// Name of the mixin class
    pub fn name(&self) -> &BinaryName {
        &self.mixin.name
    }

    pub fn target(&self) -> &BinaryName {
        &self.target
    }

    pub fn mixin(&self) -> &Class {
        &self.mixin
    }

    pub fn remapper(&self) -> &Remapper {
        &self.remapper
    }

    /// Directives in the order they get applied
    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.applicators.iter().map(|applicator| &applicator.directive)
    }

    pub fn applicator_count(&self) -> usize {
        self.applicators.len()
    }

    pub fn ran(&self) -> bool {
        self.ran.get()
    }

    /// Run every handler, in order, on the target class
    ///
    /// The first failing handler stops the application, leaving `target` partially edited.
    pub fn apply(&self, target: &mut Class) -> Result<(), Error> {
        self.ran.set(true);
        let context = HandlerContext {
            settings: &self.settings,
            mixin: &self.mixin,
            target_name: &self.target,
            remapper: &self.remapper,
            injector: self.injector.as_ref(),
            log: &self.log,
        };

        for applicator in &self.applicators {
            let annotated = match applicator.member {
                MemberRef::Class => Annotated::Class(&self.mixin),
                MemberRef::Field(index) => Annotated::Field(&self.mixin.fields[index]),
                MemberRef::Method(index) => Annotated::Method(&self.mixin.methods[index]),
            };
            applicator
                .handler
                .call(&context, &applicator.directive, annotated, target)
                .map_err(|source| Error::HandlerExecution {
                    kind: applicator.directive.kind.to_string(),
                    member: annotated.to_string(),
                    mixin: self.mixin.name.to_java_name(),
                    target: target.name.to_java_name(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

impl Transformer<Error> for MixinTransformer {
    fn transform(&self, class: &mut Class) -> Result<(), Error> {
        self.apply(class)
    }
}

impl TargetedTransformer<Error> for MixinTransformer {
    fn target_classes(&self) -> Vec<BinaryName> {
        vec![self.target.clone()]
    }
}

impl Display for MixinTransformer {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "{} -> {}",
            self.mixin.name.to_java_name(),
            self.target.to_java_name()
        )
    }
}

impl Debug for MixinTransformer {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("MixinTransformer")
            .field("mixin", &self.mixin.name)
            .field("target", &self.target)
            .field("directives", &self.directives().collect::<Vec<_>>())
            .field("ran", &self.ran.get())
            .finish()
    }
}
