//! Free-variable analysis for parsed templates.
//!
//! A variable is *free* when a template reads it but nothing in the template
//! binds it: no enclosing `for`, `set`, macro parameter, `with`, `call` or
//! import introduces the name, and it is not one of the built-in [`Globals`].
//! Only the root of an access chain counts, so `user.profile.name` reports
//! `user`.

mod builtins;
mod collector;
mod scope;
mod variables;

pub use builtins::Globals;
pub use builtins::BUILTIN_NAMES;
pub use collector::Collector;
pub use scope::ScopeStack;
use tplvars_templates::Node;
pub use variables::FreeVariables;

/// Free variables of `nodes`, with only the built-in globals.
#[must_use]
pub fn collect(nodes: &[Node]) -> FreeVariables {
    collect_with_globals(nodes, &Globals::new())
}

/// Free variables of `nodes`, treating `globals` as always bound.
#[must_use]
pub fn collect_with_globals(nodes: &[Node], globals: &Globals) -> FreeVariables {
    let variables = Collector::with_globals(globals.clone()).collect(nodes);
    tracing::debug!(
        nodes = nodes.len(),
        extra_globals = globals.extra_len(),
        free = variables.len(),
        "collected free variables"
    );
    variables
}
