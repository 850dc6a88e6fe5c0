use super::ApplicationType;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Phase the mixins are applied in
    pub application_type: ApplicationType,

    /// What to do with classes in a mixin source that don't have `@Mixin`
    pub no_mixin: NoMixinPolicy,

    /// Fail if some mixin targets a class that never gets transformed
    ///
    /// This catches stale or misspelled targets, which would otherwise be silently ignored.
    pub not_applied_is_error: bool,

    /// Passed on to the code injector: should a failed injection be an error or just a warning?
    pub fail_on_injection_error: bool,

    /// Package (written as `my/package`) containing the directive annotations
    ///
    /// Annotations from this package are interpreted as directives and get stripped from members
    /// when they are copied into a target class.
    pub directive_package: String,
}

/// How to handle classes without a `@Mixin` directive
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoMixinPolicy {
    /// Ignore the class
    Skip,

    /// Fail with [`super::Error::NotAMixin`]
    Error,
}

impl Settings {
    /// Default package for directive annotations
    pub const DEFAULT_DIRECTIVE_PACKAGE: &'static str = "dev/minco/mixin";

    pub fn new() -> Settings {
        Settings {
            application_type: ApplicationType::FinalPatch,
            no_mixin: NoMixinPolicy::Skip,
            not_applied_is_error: true,
            fail_on_injection_error: true,
            directive_package: String::from(Self::DEFAULT_DIRECTIVE_PACKAGE),
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
