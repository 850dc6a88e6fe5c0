use super::{Directive, Error};
use crate::jvm::model::Method;
use log::warn;

/// Splices the code of an injectable method into a target method
///
/// Finding the injection point inside the target method body is up to the implementation. The
/// `directive` is the `@Inject` that requested the injection, carrying any parameters for the
/// matcher.
pub trait CodeInjector {
    fn inject(
        &self,
        target: &mut Method,
        injectable: &Method,
        directive: &Directive,
        fail_on_error: bool,
    ) -> Result<(), Error>;
}

/// Injector for when no bytecode matcher is available
///
/// Every injection fails, or is skipped with a warning if `fail_on_error` is off.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableInjector;

impl CodeInjector for UnavailableInjector {
    fn inject(
        &self,
        target: &mut Method,
        injectable: &Method,
        directive: &Directive,
        fail_on_error: bool,
    ) -> Result<(), Error> {
        let reason = format!("no code injector is available to handle {}", directive);
        if fail_on_error {
            return Err(Error::InjectionFailed {
                target: target.to_string(),
                injectable: injectable.to_string(),
                reason,
            });
        }
        warn!("Skipping injection of {} into {}: {}", injectable, target, reason);
        Ok(())
    }
}
