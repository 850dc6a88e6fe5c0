use std::fmt::{Display, Error as FmtError, Formatter};
use std::str::FromStr;

/// Phase a mixin is being applied in
///
/// The same mixin gets applied once to patch sources and later again to patch the compiled
/// classes. Some directives only make sense in one of those phases.
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ApplicationType {
    /// Preparing classes that patched sources will be compiled against
    PrePatch,

    /// Patching the final compiled classes
    #[default]
    FinalPatch,
}

impl ApplicationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationType::PrePatch => "PRE_PATCH",
            ApplicationType::FinalPatch => "FINAL_PATCH",
        }
    }
}

impl Display for ApplicationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.as_str())
    }
}

/// Parses `PRE_PATCH` or `FINAL_PATCH`, ignoring case and accepting `-` in place of `_`
impl FromStr for ApplicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "PRE_PATCH" => Ok(ApplicationType::PrePatch),
            "FINAL_PATCH" => Ok(ApplicationType::FinalPatch),
            _ => Err(format!(
                "unknown application type '{}' (expected PRE_PATCH or FINAL_PATCH)",
                s
            )),
        }
    }
}
