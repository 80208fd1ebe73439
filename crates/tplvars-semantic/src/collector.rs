use tplvars_templates::nodelist::MacroParam;
use tplvars_templates::nodelist::SetTarget;
use tplvars_templates::walk_expr;
use tplvars_templates::walk_nodelist;
use tplvars_templates::walk_node;
use tplvars_templates::Expr;
use tplvars_templates::ExprKind;
use tplvars_templates::Node;
use tplvars_templates::Visitor;

use crate::builtins::Globals;
use crate::scope::ScopeStack;
use crate::variables::FreeVariables;

/// Names every macro body can use without declaring them.
const MACRO_IMPLICIT_NAMES: &[&str] = &["caller", "varargs", "kwargs"];

/// Walks a template and records every identifier no enclosing scope binds.
///
/// Each node list gets its own frame, so a `set` is visible to the siblings
/// after it and never outside the body it appears in.
#[derive(Debug)]
pub struct Collector {
    scopes: ScopeStack,
    free: FreeVariables,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::with_globals(Globals::new())
    }

    #[must_use]
    pub fn with_globals(globals: Globals) -> Self {
        Self {
            scopes: ScopeStack::new(globals),
            free: FreeVariables::new(),
        }
    }

    #[must_use]
    pub fn collect(mut self, nodes: &[Node]) -> FreeVariables {
        self.visit_nodelist(nodes);
        self.free
    }

    fn reference(&mut self, name: &str) {
        if !self.scopes.is_bound(name) {
            self.free.insert(name);
        }
    }

    fn visit_param_defaults(&mut self, params: &[MacroParam]) {
        for default in params.iter().filter_map(|param| param.default.as_ref()) {
            self.visit_expr(default);
        }
    }

    /// Walk `body` with `names` bound around it.
    fn visit_scoped<I, S>(&mut self, names: I, body: &[Node])
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.push_with(names);
        self.visit_nodelist(body);
        self.scopes.pop();
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for Collector {
    fn visit_nodelist(&mut self, nodes: &[Node]) {
        self.scopes.push();
        walk_nodelist(self, nodes);
        self.scopes.pop();
    }

    fn visit_node(&mut self, node: &Node) {
        match node {
            Node::For {
                loop_vars,
                iterable,
                condition,
                body,
                else_body,
                ..
            } => {
                self.visit_expr(iterable);

                self.scopes.push_with(loop_vars.iter().map(String::as_str));
                if let Some(condition) = condition {
                    self.visit_expr(condition);
                }
                self.visit_nodelist(body);
                self.scopes.pop();

                if let Some(else_body) = else_body {
                    self.visit_nodelist(else_body);
                }
            }
            Node::Macro { params, body, .. } => {
                self.visit_param_defaults(params);
                let names = params
                    .iter()
                    .map(|param| param.name.as_str())
                    .chain(MACRO_IMPLICIT_NAMES.iter().copied());
                self.visit_scoped(names, body);
            }
            Node::CallBlock {
                params, call, body, ..
            } => {
                self.visit_expr(call);
                self.visit_param_defaults(params);
                self.visit_scoped(params.iter().map(|param| param.name.as_str()), body);
            }
            Node::With { bindings, body, .. } => {
                for (_, value) in bindings {
                    self.visit_expr(value);
                }
                self.visit_scoped(bindings.iter().map(|(name, _)| name.as_str()), body);
            }
            Node::Set { targets, value, .. } => {
                self.visit_expr(value);
                for target in targets {
                    match target {
                        SetTarget::Name(name) => self.scopes.bind(name.as_str()),
                        SetTarget::Attribute { namespace, .. } => self.reference(namespace),
                    }
                }
            }
            Node::SetBlock {
                name,
                filters,
                body,
                ..
            } => {
                for filter in filters {
                    self.visit_filter(filter);
                }
                self.visit_nodelist(body);
                self.scopes.bind(name.as_str());
            }
            Node::Import {
                template, alias, ..
            } => {
                self.visit_expr(template);
                self.scopes.bind(alias.as_str());
            }
            Node::FromImport {
                template, names, ..
            } => {
                self.visit_expr(template);
                for name in names {
                    self.scopes.bind(name.bound_name());
                }
            }
            _ => walk_node(self, node),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Identifier(name) = &expr.kind {
            self.reference(name);
        } else {
            walk_expr(self, expr);
        }
    }
}
