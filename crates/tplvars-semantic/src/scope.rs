use rustc_hash::FxHashSet;

use crate::builtins::Globals;

/// Lexical scopes during a walk, innermost last.
///
/// The [`Globals`] act as the bottom frame and can never be popped.
#[derive(Debug)]
pub struct ScopeStack {
    globals: Globals,
    frames: Vec<FxHashSet<String>>,
}

impl ScopeStack {
    #[must_use]
    pub fn new(globals: Globals) -> Self {
        Self {
            globals,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self) {
        self.frames.push(FxHashSet::default());
    }

    /// Push a frame that already binds `names`.
    pub fn push_with<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frames.push(names.into_iter().map(Into::into).collect());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Bind `name` in the innermost frame.
    pub fn bind(&mut self, name: impl Into<String>) {
        if self.frames.is_empty() {
            self.push();
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into());
        }
    }

    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains(name)) || self.globals.contains(name)
    }

    /// Frames above the global frame.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
