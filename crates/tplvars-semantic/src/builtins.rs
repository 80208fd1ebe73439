//! Names the template language provides, which are never free variables.

use rustc_hash::FxHashSet;

/// Always available in every template.
pub const BUILTIN_NAMES: &[&str] = &["loop", "range"];

/// Literal keywords, matched in any letter case (`true`, `True`, `TRUE`).
const LITERAL_NAMES: &[&str] = &["true", "false", "none"];

/// The global frame at the bottom of every scope stack: the built-ins plus any
/// names a caller declares as always provided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Globals {
    extra: FxHashSet<String>,
}

impl Globals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra: names.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        BUILTIN_NAMES.contains(&name)
            || LITERAL_NAMES
                .iter()
                .any(|literal| literal.eq_ignore_ascii_case(name))
            || self.extra.contains(name)
    }

    /// Extra names beyond the built-ins.
    #[must_use]
    pub fn extra_len(&self) -> usize {
        self.extra.len()
    }
}
