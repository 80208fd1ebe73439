use rustc_hash::FxHashSet;
use serde::Serialize;
use serde::Serializer;

/// The free variables of a template, in order of first reference.
#[derive(Debug, Clone, Default)]
pub struct FreeVariables {
    order: Vec<String>,
    seen: FxHashSet<String>,
}

impl FreeVariables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`; returns `false` if it was already present.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.order.push(name.to_string());
        true
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.order.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

impl PartialEq for FreeVariables {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for FreeVariables {}

impl<'a> IntoIterator for &'a FreeVariables {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for FreeVariables {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut variables = Self::new();
        for name in iter {
            variables.insert(name.as_ref());
        }
        variables
    }
}

impl Serialize for FreeVariables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.order)
    }
}
