use crate::jvm;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading, writing, or editing a class failed
    #[error(transparent)]
    ClassFile(#[from] jvm::Error),

    /// A class with no `@Mixin` was found where only mixins are expected
    #[error("class {0} is not an @Mixin")]
    NotAMixin(String),

    #[error("{0} can not use @Mixin multiple times")]
    DuplicateMixinDirective(String),

    /// Mixin classes are templates and must be `abstract`
    #[error("{class} must be abstract to use @Mixin")]
    InvalidMixinShape { class: String },

    /// A directive refers to a member which the target class doesn't have
    #[error(
        "can't find member matching {member} in target {target} (members in target: {available:?})"
    )]
    MissingTargetMember {
        member: String,
        target: String,
        available: Vec<String>,
    },

    #[error("bad name for {member}: {reason}")]
    InvalidMemberName { member: String, reason: String },

    /// An `@Inject` needs exactly one matching `@Injectable`
    #[error("couldn't find exactly 1 injectable with name {injectable} in {mixin} (found {found})")]
    InjectableResolutionError {
        injectable: String,
        mixin: String,
        found: usize,
    },

    /// A mixin class produced no directive handlers at all
    #[error("mixin {0} has no directives that can be applied")]
    NoApplicatorsFound(String),

    /// Mixins whose target class never showed up in the transformed classes
    #[error("{count} transformers were not applied: {transformers:?}")]
    UnappliedTransformers {
        count: usize,
        transformers: Vec<String>,
    },

    /// A directive handler failed
    #[error(
        "failed to apply handler for directive '{kind}' on '{member}' in '{mixin}' to '{target}'"
    )]
    HandlerExecution {
        kind: String,
        member: String,
        mixin: String,
        target: String,
        #[source]
        source: Box<Error>,
    },

    /// A handler was called on something it can't be attached to
    #[error("{role} handler can't be applied to {member}")]
    HandlerRoleMismatch { role: &'static str, member: String },

    /// A directive parameter is missing or has the wrong type
    #[error("invalid @{directive}: {reason}")]
    InvalidDirective { directive: String, reason: String },

    /// The code injector couldn't splice in an injectable
    #[error("failed to inject {injectable} into {target}: {reason}")]
    InjectionFailed {
        target: String,
        injectable: String,
        reason: String,
    },
}

impl Error {
    /// Strip off any handler context, returning the underlying failure
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::HandlerExecution { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
