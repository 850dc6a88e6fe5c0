//! Directive-driven mixins
//!
//! Directives are annotations from a configurable package (by default `dev.minco.mixin`). Each
//! kind of directive is handled by one or more handlers from a [`DirectiveRegistry`], run in
//! priority order when the mixin is applied to its target:
//!
//!   - `@Mixin(target, makePublic)` marks an abstract class as a mixin. Without a `target`, the
//!     superclass is the target. In [`ApplicationType::PrePatch`], it also opens up the target
//!     for extension (no `final`, `protected` or `public` members, a no-args constructor).
//!   - `@Add` copies a field or method into the target. Added fields must be named with a `_`
//!     suffix, which gets stripped.
//!   - `@Overwrite` replaces a target method.
//!   - `@Flags(flags, mode)` edits the access flags of the target or of a target member.
//!   - `@Synchronize` makes a target method `synchronized`.
//!   - `@Inject(injectable)` splices an `@Injectable` method into a target method, using a
//!     [`CodeInjector`].

mod application_type;
mod directive;
mod errors;
mod handlers;
mod injector;
mod log_sink;
mod mixin_transformer;
mod processor;
mod registry;
mod session;
mod settings;

pub use application_type::*;
pub use directive::*;
pub use errors::*;
pub use handlers::{
    ADDED_FIELD_SUFFIX, DEFAULT_PRIORITY, LOGGING_PRIORITY, MEMBER_PRIORITY, SHAPE_PRIORITY,
};
pub use injector::*;
pub use log_sink::*;
pub use mixin_transformer::MixinTransformer;
pub use processor::*;
pub use registry::*;
pub use session::*;
pub use settings::*;
