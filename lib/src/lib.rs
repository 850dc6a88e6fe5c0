//! Apply mixin classes to compiled JVM classes
//!
//! A mixin is an abstract class whose members carry directive annotations (`@Mixin`, `@Add`,
//! `@Overwrite`, ...). The [`mixin::MixinApplicator`] turns every mixin it finds into a targeted
//! transformer and runs those transformers over already compiled target classes through a
//! [`transformer::ClassTransformer`] pass.
//!
//! ```no_run
//! use mixin::mixin::{ApplicationType, DirectiveRegistry, MixinApplicator, Settings};
//!
//! # fn apply() -> Result<(), mixin::mixin::Error> {
//! let registry = DirectiveRegistry::with_builtins();
//! let mut settings = Settings::new();
//! settings.application_type = ApplicationType::FinalPatch;
//!
//! let pass = MixinApplicator::new(&registry, settings)
//!     .add_source("build/mixins", None)
//!     .build()?;
//! pass.transform("build/classes", "build/patched-classes")?;
//! # Ok(())
//! # }
//! ```

pub mod jvm;
pub mod mixin;
pub mod transformer;
mod util;
