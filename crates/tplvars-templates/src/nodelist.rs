use tplvars_source::Span;

use crate::expression::Expr;
use crate::expression::FilterCall;

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Text {
        content: String,
        span: Span,
    },
    Expression {
        expr: Expr,
        span: Span,
    },
    If {
        branches: Vec<IfBranch>,
        else_body: Option<Vec<Node>>,
        span: Span,
    },
    For {
        /// Every name introduced by the target, unpacked tuples flattened.
        loop_vars: Vec<String>,
        iterable: Expr,
        condition: Option<Expr>,
        recursive: bool,
        body: Vec<Node>,
        else_body: Option<Vec<Node>>,
        span: Span,
    },
    Set {
        targets: Vec<SetTarget>,
        value: Expr,
        span: Span,
    },
    /// `{% set name | filters %}…{% endset %}`
    SetBlock {
        name: String,
        filters: Vec<FilterCall>,
        body: Vec<Node>,
        span: Span,
    },
    Macro {
        name: String,
        params: Vec<MacroParam>,
        body: Vec<Node>,
        span: Span,
    },
    CallBlock {
        params: Vec<MacroParam>,
        call: Expr,
        body: Vec<Node>,
        span: Span,
    },
    With {
        bindings: Vec<(String, Expr)>,
        body: Vec<Node>,
        span: Span,
    },
    FilterBlock {
        filters: Vec<FilterCall>,
        body: Vec<Node>,
        span: Span,
    },
    Block {
        name: String,
        body: Vec<Node>,
        span: Span,
    },
    Extends {
        template: Expr,
        span: Span,
    },
    Include {
        template: Expr,
        span: Span,
    },
    Import {
        template: Expr,
        alias: String,
        span: Span,
    },
    FromImport {
        template: Expr,
        names: Vec<ImportName>,
        span: Span,
    },
    Do {
        expr: Expr,
        span: Span,
    },
    LoopControl {
        kind: LoopControl,
        span: Span,
    },
    Raw {
        content: String,
        span: Span,
    },
    Comment {
        span: Span,
    },
}

impl Node {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Node::Text { span, .. }
            | Node::Expression { span, .. }
            | Node::If { span, .. }
            | Node::For { span, .. }
            | Node::Set { span, .. }
            | Node::SetBlock { span, .. }
            | Node::Macro { span, .. }
            | Node::CallBlock { span, .. }
            | Node::With { span, .. }
            | Node::FilterBlock { span, .. }
            | Node::Block { span, .. }
            | Node::Extends { span, .. }
            | Node::Include { span, .. }
            | Node::Import { span, .. }
            | Node::FromImport { span, .. }
            | Node::Do { span, .. }
            | Node::LoopControl { span, .. }
            | Node::Raw { span, .. }
            | Node::Comment { span } => *span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SetTarget {
    Name(String),
    /// `{% set ns.attr = … %}`
    Attribute { namespace: String, attr: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MacroParam {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportName {
    /// The name the import binds in the importing template.
    #[must_use]
    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
    Break,
    Continue,
}
