use crate::expression::Argument;
use crate::expression::Expr;
use crate::expression::ExprKind;
use crate::expression::FilterCall;
use crate::nodelist::Node;

/// Trait for visiting a parsed template.
///
/// Every method defaults to walking its children, so an implementation only
/// overrides the hooks it cares about and calls the matching `walk_*` function
/// to keep descending.
pub trait Visitor {
    fn visit_nodelist(&mut self, nodes: &[Node]) {
        walk_nodelist(self, nodes);
    }

    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_filter(&mut self, filter: &FilterCall) {
        walk_arguments(self, &filter.args);
    }
}

/// Visit each node of a list in order.
pub fn walk_nodelist<V: Visitor + ?Sized>(visitor: &mut V, nodes: &[Node]) {
    for node in nodes {
        visitor.visit_node(node);
    }
}

/// Visit the expressions and bodies of a single node, in source order.
pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match node {
        Node::Text { .. }
        | Node::Raw { .. }
        | Node::Comment { .. }
        | Node::LoopControl { .. } => {}
        Node::Expression { expr, .. } | Node::Do { expr, .. } => visitor.visit_expr(expr),
        Node::If {
            branches,
            else_body,
            ..
        } => {
            for branch in branches {
                visitor.visit_expr(&branch.condition);
                visitor.visit_nodelist(&branch.body);
            }
            if let Some(body) = else_body {
                visitor.visit_nodelist(body);
            }
        }
        Node::For {
            iterable,
            condition,
            body,
            else_body,
            ..
        } => {
            visitor.visit_expr(iterable);
            if let Some(condition) = condition {
                visitor.visit_expr(condition);
            }
            visitor.visit_nodelist(body);
            if let Some(body) = else_body {
                visitor.visit_nodelist(body);
            }
        }
        Node::Set { value, .. } => visitor.visit_expr(value),
        Node::SetBlock { filters, body, .. } | Node::FilterBlock { filters, body, .. } => {
            for filter in filters {
                visitor.visit_filter(filter);
            }
            visitor.visit_nodelist(body);
        }
        Node::Macro { params, body, .. } => {
            for default in params.iter().filter_map(|param| param.default.as_ref()) {
                visitor.visit_expr(default);
            }
            visitor.visit_nodelist(body);
        }
        Node::CallBlock {
            params, call, body, ..
        } => {
            for default in params.iter().filter_map(|param| param.default.as_ref()) {
                visitor.visit_expr(default);
            }
            visitor.visit_expr(call);
            visitor.visit_nodelist(body);
        }
        Node::With { bindings, body, .. } => {
            for (_, value) in bindings {
                visitor.visit_expr(value);
            }
            visitor.visit_nodelist(body);
        }
        Node::Block { body, .. } => visitor.visit_nodelist(body),
        Node::Extends { template, .. }
        | Node::Include { template, .. }
        | Node::Import { template, .. }
        | Node::FromImport { template, .. } => visitor.visit_expr(template),
    }
}

/// Visit every sub-expression of `expr`.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) => {}
        ExprKind::Attribute { base, .. } => visitor.visit_expr(base),
        ExprKind::Subscript { base, index } => {
            visitor.visit_expr(base);
            visitor.visit_expr(index);
        }
        ExprKind::Slice { start, stop, step } => {
            for part in [start, stop, step].into_iter().flatten() {
                visitor.visit_expr(part);
            }
        }
        ExprKind::Call { callee, args } => {
            visitor.visit_expr(callee);
            walk_arguments(visitor, args);
        }
        ExprKind::Filter { value, filter } => {
            visitor.visit_expr(value);
            visitor.visit_filter(filter);
        }
        ExprKind::Test { value, args, .. } => {
            visitor.visit_expr(value);
            walk_arguments(visitor, args);
        }
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::BinaryBool { left, right, .. }
        | ExprKind::Compare { left, right, .. }
        | ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Ternary {
            true_expr,
            condition,
            false_expr,
        } => {
            visitor.visit_expr(true_expr);
            visitor.visit_expr(condition);
            if let Some(false_expr) = false_expr {
                visitor.visit_expr(false_expr);
            }
        }
        ExprKind::List(items) | ExprKind::Tuple(items) => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
        ExprKind::Dict(entries) => {
            for (key, value) in entries {
                visitor.visit_expr(key);
                visitor.visit_expr(value);
            }
        }
    }
}

/// Visit argument values; keyword names are not expressions.
pub fn walk_arguments<V: Visitor + ?Sized>(visitor: &mut V, args: &[Argument]) {
    for arg in args {
        visitor.visit_expr(&arg.value);
    }
}
