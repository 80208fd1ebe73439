//! Pratt parser for the expression language used inside `{{ … }}` and the
//! arguments of block tags.
//!
//! Binding powers, loosest first:
//!
//! | operators                                   | left | right |
//! |---------------------------------------------|------|-------|
//! | `or`                                        | 1    | 2     |
//! | `and`                                       | 3    | 4     |
//! | prefix `not`                                |      | 5     |
//! | `==` `!=` `<` `>` `<=` `>=` `in` `not in` `is` | 7 | 8     |
//! | `~`                                         | 9    | 10    |
//! | `+` `-`                                     | 11   | 12    |
//! | `*` `/` `//` `%`                            | 13   | 14    |
//! | prefix `-` `+`                              |      | 15    |
//! | `**`                                        | 18   | 17    |
//!
//! Postfix access (`.name`, `[index]`, `(args)`) and filter pipelines bind
//! tighter than any operator. The ternary `a if b else c` wraps the whole
//! table and is only accepted where the caller allows it.

use tplvars_source::Span;

use crate::error::ParseError;
use crate::expression::Argument;
use crate::expression::BinaryOp;
use crate::expression::BoolOp;
use crate::expression::CompareOp;
use crate::expression::Expr;
use crate::expression::ExprKind;
use crate::expression::FilterCall;
use crate::expression::Literal;
use crate::expression::UnaryOp;
use crate::tokens::ExprToken;
use crate::tokens::TokenKind;

/// Words that are operators, never identifiers.
const RESERVED: &[&str] = &["and", "or", "not", "in", "is", "if", "else"];

const NOT_BP: u8 = 5;
const SIGN_BP: u8 = 15;

#[derive(Clone, Copy, Debug)]
enum Infix {
    Bool(BoolOp),
    Compare(CompareOp),
    Binary(BinaryOp),
    Test,
}

impl Infix {
    fn binding_power(self) -> (u8, u8) {
        match self {
            Infix::Bool(BoolOp::Or) => (1, 2),
            Infix::Bool(BoolOp::And) => (3, 4),
            Infix::Compare(_) | Infix::Test => (7, 8),
            Infix::Binary(BinaryOp::Concat) => (9, 10),
            Infix::Binary(BinaryOp::Add | BinaryOp::Sub) => (11, 12),
            Infix::Binary(BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) => {
                (13, 14)
            }
            Infix::Binary(BinaryOp::Pow) => (18, 17),
        }
    }

    /// Tokens the operator occupies; the `not` of `is not` belongs to the test.
    fn width(self) -> usize {
        match self {
            Infix::Compare(CompareOp::NotIn) => 2,
            _ => 1,
        }
    }
}

/// Cursor over the tokens of one tag, with the expression grammar on top.
///
/// Block-tag parsing drives the cursor directly (`expect_name`, `skip_name`,
/// ...) and hands sub-expressions to [`ExpressionParser::parse_expression`].
pub(crate) struct ExpressionParser<'t> {
    tokens: &'t [ExprToken],
    pos: usize,
    /// Zero-width span just past the tag interior, for end-of-input errors.
    end: Span,
    last_end: usize,
}

impl<'t> ExpressionParser<'t> {
    pub(crate) fn new(tokens: &'t [ExprToken], end: Span) -> Self {
        let last_end = tokens.first().map_or(end.start_usize(), |t| t.span.start_usize());
        Self {
            tokens,
            pos: 0,
            end,
            last_end,
        }
    }

    /// Parse the whole token slice as one expression (a bare tuple is allowed).
    pub(crate) fn parse_all(mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_tuple(true)?;
        self.expect_end()?;
        Ok(expr)
    }

    /// A full expression, ternary included.
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_bp(0)?;

        while self.skip_name("if") {
            let condition = self.parse_bp(0)?;
            let false_expr = if self.skip_name("else") {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            let span = self.span_from(expr.span);
            expr = Expr::new(
                ExprKind::Ternary {
                    true_expr: Box::new(expr),
                    condition: Box::new(condition),
                    false_expr,
                },
                span,
            );
        }

        Ok(expr)
    }

    /// Comma-separated expressions; more than one (or a trailing comma) makes a tuple.
    ///
    /// With `with_ternary` unset, a following `if` is left for the caller, as in
    /// `for x in items if x`.
    pub(crate) fn parse_tuple(&mut self, with_ternary: bool) -> Result<Expr, ParseError> {
        let first = self.parse_item(with_ternary)?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let start = first.span;
        let mut items = vec![first];
        while self.skip(&TokenKind::Comma) {
            if self.at_tuple_end() {
                break;
            }
            items.push(self.parse_item(with_ternary)?);
        }

        let span = self.span_from(start);
        Ok(Expr::new(ExprKind::Tuple(items), span))
    }

    fn parse_item(&mut self, with_ternary: bool) -> Result<Expr, ParseError> {
        if with_ternary {
            self.parse_expression()
        } else {
            self.parse_bp(0)
        }
    }

    fn at_tuple_end(&self) -> bool {
        match self.peek_kind() {
            None | Some(TokenKind::Assign | TokenKind::RParen) => true,
            Some(TokenKind::Name(name)) => matches!(name.as_str(), "if" | "else" | "recursive"),
            Some(_) => false,
        }
    }

    fn parse_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if self.is_name_next("not") && !self.is_nth_name(1, "in") {
                let token = self.tokens[self.pos].span;
                return Err(ParseError::syntax(
                    "Not expecting 'not' as infix operator.",
                    token,
                ));
            }

            let Some(op) = self.peek_infix() else {
                break;
            };
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            for _ in 0..op.width() {
                self.advance();
            }

            lhs = match op {
                Infix::Test => self.parse_test(lhs)?,
                Infix::Bool(op) => {
                    let rhs = self.parse_bp(r_bp)?;
                    let span = lhs.span.cover(rhs.span);
                    Expr::new(
                        ExprKind::BinaryBool {
                            op,
                            left: Box::new(lhs),
                            right: Box::new(rhs),
                        },
                        span,
                    )
                }
                Infix::Compare(op) => {
                    let rhs = self.parse_bp(r_bp)?;
                    let span = lhs.span.cover(rhs.span);
                    Expr::new(
                        ExprKind::Compare {
                            op,
                            left: Box::new(lhs),
                            right: Box::new(rhs),
                        },
                        span,
                    )
                }
                Infix::Binary(op) => {
                    let rhs = self.parse_bp(r_bp)?;
                    let span = lhs.span.cover(rhs.span);
                    Expr::new(
                        ExprKind::Binary {
                            op,
                            left: Box::new(lhs),
                            right: Box::new(rhs),
                        },
                        span,
                    )
                }
            };
        }

        Ok(lhs)
    }

    fn peek_infix(&self) -> Option<Infix> {
        let op = match self.peek_kind()? {
            TokenKind::Name(name) => match name.as_str() {
                "or" => Infix::Bool(BoolOp::Or),
                "and" => Infix::Bool(BoolOp::And),
                "in" => Infix::Compare(CompareOp::In),
                "not" => Infix::Compare(CompareOp::NotIn),
                "is" => Infix::Test,
                _ => return None,
            },
            TokenKind::Eq => Infix::Compare(CompareOp::Eq),
            TokenKind::Ne => Infix::Compare(CompareOp::Ne),
            TokenKind::Lt => Infix::Compare(CompareOp::Lt),
            TokenKind::Gt => Infix::Compare(CompareOp::Gt),
            TokenKind::Le => Infix::Compare(CompareOp::Le),
            TokenKind::Ge => Infix::Compare(CompareOp::Ge),
            TokenKind::Plus => Infix::Binary(BinaryOp::Add),
            TokenKind::Minus => Infix::Binary(BinaryOp::Sub),
            TokenKind::Tilde => Infix::Binary(BinaryOp::Concat),
            TokenKind::Star => Infix::Binary(BinaryOp::Mul),
            TokenKind::Slash => Infix::Binary(BinaryOp::Div),
            TokenKind::SlashSlash => Infix::Binary(BinaryOp::FloorDiv),
            TokenKind::Percent => Infix::Binary(BinaryOp::Mod),
            TokenKind::StarStar => Infix::Binary(BinaryOp::Pow),
            _ => return None,
        };
        Some(op)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let (op, r_bp) = match self.peek_kind() {
            Some(TokenKind::Name(name)) if name == "not" => (UnaryOp::Not, NOT_BP),
            Some(TokenKind::Minus) => (UnaryOp::Neg, SIGN_BP),
            Some(TokenKind::Plus) => (UnaryOp::Pos, SIGN_BP),
            _ => return self.parse_unary_operand(),
        };

        let start = self.advance_span();
        let operand = self.parse_bp(r_bp)?;
        let span = start.cover(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// Primary, postfix accessors, then any filter pipeline.
    fn parse_unary_operand(&mut self) -> Result<Expr, ParseError> {
        let primary = self.parse_primary()?;
        let expr = self.parse_postfix(primary)?;
        self.parse_filters(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.peek() else {
            return Err(self.unexpected_end());
        };

        match &token.kind {
            TokenKind::Name(name) => {
                let kind = match name.as_str() {
                    "true" | "True" => ExprKind::Literal(Literal::Bool(true)),
                    "false" | "False" => ExprKind::Literal(Literal::Bool(false)),
                    "none" | "None" => ExprKind::Literal(Literal::None),
                    word if RESERVED.contains(&word) => {
                        return Err(ParseError::syntax(
                            format!("Not expecting '{word}' in this position."),
                            token.span,
                        ));
                    }
                    _ => ExprKind::Identifier(name.clone()),
                };
                self.advance();
                Ok(Expr::new(kind, token.span))
            }
            TokenKind::Number(number) => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Literal(Literal::Number(number.clone())),
                    token.span,
                ))
            }
            TokenKind::Str(_) => Ok(self.parse_string()),
            TokenKind::LParen => self.parse_group(),
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_dict(),
            kind => Err(ParseError::syntax(
                format!("Unexpected {kind} in expression"),
                token.span,
            )),
        }
    }

    /// Adjacent string literals concatenate, as in `"a" "b"`.
    fn parse_string(&mut self) -> Expr {
        let mut value = String::new();
        let mut span: Option<Span> = None;

        while let Some(ExprToken {
            kind: TokenKind::Str(part),
            span: part_span,
        }) = self.peek()
        {
            value.push_str(part);
            span = Some(span.map_or(*part_span, |s| s.cover(*part_span)));
            self.advance();
        }

        Expr::new(
            ExprKind::Literal(Literal::Str(value)),
            span.unwrap_or(self.end),
        )
    }

    fn parse_group(&mut self) -> Result<Expr, ParseError> {
        let open = self.advance_span();

        if self.skip(&TokenKind::RParen) {
            return Ok(Expr::new(ExprKind::Tuple(Vec::new()), self.span_from(open)));
        }

        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            self.expect_closing(&TokenKind::RParen, "(", open)?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.skip(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_closing(&TokenKind::RParen, "(", open)?;

        Ok(Expr::new(ExprKind::Tuple(items), self.span_from(open)))
    }

    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        let open = self.advance_span();
        let mut items = Vec::new();

        while !self.check(&TokenKind::RBracket) {
            if !items.is_empty() {
                self.expect_closing(&TokenKind::Comma, "[", open)?;
                if self.check(&TokenKind::RBracket) {
                    break;
                }
            }
            items.push(self.parse_expression()?);
        }
        self.expect_closing(&TokenKind::RBracket, "[", open)?;

        Ok(Expr::new(ExprKind::List(items), self.span_from(open)))
    }

    fn parse_dict(&mut self) -> Result<Expr, ParseError> {
        let open = self.advance_span();
        let mut entries = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            if !entries.is_empty() {
                self.expect_closing(&TokenKind::Comma, "{", open)?;
                if self.check(&TokenKind::RBrace) {
                    break;
                }
            }
            let key = self.parse_expression()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key, value));
        }
        self.expect_closing(&TokenKind::RBrace, "{", open)?;

        Ok(Expr::new(ExprKind::Dict(entries), self.span_from(open)))
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            match self.peek_kind() {
                Some(TokenKind::Dot) => {
                    self.advance();
                    let name = match self.peek() {
                        Some(ExprToken {
                            kind: TokenKind::Name(name) | TokenKind::Number(name),
                            ..
                        }) => name.clone(),
                        Some(token) => {
                            return Err(ParseError::syntax(
                                format!("Expected attribute name after '.', found {}", token.kind),
                                token.span,
                            ));
                        }
                        None => {
                            return Err(ParseError::syntax(
                                "Expected attribute name after '.'",
                                self.end,
                            ));
                        }
                    };
                    self.advance();
                    let span = self.span_from(expr.span);
                    expr = Expr::new(
                        ExprKind::Attribute {
                            base: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
                Some(TokenKind::LBracket) => {
                    let open = self.advance_span();
                    let index = self.parse_subscript_index()?;
                    self.expect_closing(&TokenKind::RBracket, "[", open)?;
                    let span = self.span_from(expr.span);
                    expr = Expr::new(
                        ExprKind::Subscript {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                Some(TokenKind::LParen) => {
                    let args = self.parse_call_args()?;
                    let span = self.span_from(expr.span);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_subscript_index(&mut self) -> Result<Expr, ParseError> {
        let start_span = self.peek().map_or(self.end, |t| t.span);

        let start = if self.check(&TokenKind::Colon) {
            None
        } else {
            let expr = self.parse_expression()?;
            if !self.check(&TokenKind::Colon) {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };

        self.advance();
        let stop = self.parse_slice_part()?;
        let step = if self.skip(&TokenKind::Colon) {
            self.parse_slice_part()?
        } else {
            None
        };

        let span = self.span_from(start_span);
        Ok(Expr::new(ExprKind::Slice { start, stop, step }, span))
    }

    fn parse_slice_part(&mut self) -> Result<Option<Box<Expr>>, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Colon | TokenKind::RBracket) | None => Ok(None),
            Some(_) => Ok(Some(Box::new(self.parse_expression()?))),
        }
    }

    /// `(a, key=b, *rest, **opts)`; the cursor must be on the `(`.
    pub(crate) fn parse_call_args(&mut self) -> Result<Vec<Argument>, ParseError> {
        let open = self.advance_span();
        let mut args = Vec::new();

        while !self.check(&TokenKind::RParen) {
            if !args.is_empty() {
                self.expect_closing(&TokenKind::Comma, "(", open)?;
                if self.check(&TokenKind::RParen) {
                    break;
                }
            }

            if self.skip(&TokenKind::Star) || self.skip(&TokenKind::StarStar) {
                args.push(Argument::positional(self.parse_expression()?));
                continue;
            }

            let keyword = match (self.peek_kind(), self.peek_nth(1).map(|t| &t.kind)) {
                (Some(TokenKind::Name(name)), Some(TokenKind::Assign)) => Some(name.clone()),
                _ => None,
            };
            if keyword.is_some() {
                self.advance();
                self.advance();
            }

            args.push(Argument {
                name: keyword,
                value: self.parse_expression()?,
            });
        }
        self.expect_closing(&TokenKind::RParen, "(", open)?;

        Ok(args)
    }

    fn parse_filters(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        while self.skip(&TokenKind::Pipe) {
            let filter = self.parse_filter_call()?;
            let span = expr.span.cover(filter.span);
            expr = Expr::new(
                ExprKind::Filter {
                    value: Box::new(expr),
                    filter,
                },
                span,
            );
        }
        Ok(expr)
    }

    /// `name[.name…][(args)]`, the part of a filter stage after `|`.
    pub(crate) fn parse_filter_call(&mut self) -> Result<FilterCall, ParseError> {
        let (name, start) = self.parse_dotted_name("filter name")?;
        let args = if self.check(&TokenKind::LParen) {
            self.parse_call_args()?
        } else {
            Vec::new()
        };

        Ok(FilterCall {
            name,
            args,
            span: self.span_from(start),
        })
    }

    /// `is [not] name[(args) | arg]`; the `is` has already been consumed.
    fn parse_test(&mut self, value: Expr) -> Result<Expr, ParseError> {
        let negated = self.skip_name("not");
        let (name, _) = self.parse_dotted_name("test name")?;

        let args = if self.check(&TokenKind::LParen) {
            self.parse_call_args()?
        } else if self.starts_bare_test_arg() {
            let arg = self.parse_primary()?;
            vec![Argument::positional(self.parse_postfix(arg)?)]
        } else {
            Vec::new()
        };

        let span = self.span_from(value.span);
        Ok(Expr::new(
            ExprKind::Test {
                value: Box::new(value),
                name,
                args,
                negated,
            },
            span,
        ))
    }

    /// `x is divisibleby 3` takes a single argument without parentheses.
    fn starts_bare_test_arg(&self) -> bool {
        match self.peek_kind() {
            Some(TokenKind::Name(name)) => {
                !RESERVED.contains(&name.as_str()) && name != "recursive"
            }
            Some(
                TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::LBracket | TokenKind::LBrace,
            ) => true,
            _ => false,
        }
    }

    fn parse_dotted_name(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        let (mut name, start) = self.expect_name(what)?;
        while self.check(&TokenKind::Dot) && self.peek_nth(1).is_some_and(ExprToken::is_any_name) {
            self.advance();
            let (part, _) = self.expect_name(what)?;
            name.push('.');
            name.push_str(&part);
        }
        Ok((name, start))
    }

    pub(crate) fn peek(&self) -> Option<&'t ExprToken> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'t ExprToken> {
        self.tokens.get(self.pos + n)
    }

    pub(crate) fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    pub(crate) fn advance(&mut self) -> Option<&'t ExprToken> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        self.last_end = token.span.end_usize();
        Some(token)
    }

    fn advance_span(&mut self) -> Span {
        self.advance().map_or(self.end, |t| t.span)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    pub(crate) fn skip(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn is_name_next(&self, name: &str) -> bool {
        self.peek().is_some_and(|t| t.is_name(name))
    }

    pub(crate) fn is_nth_name(&self, n: usize, name: &str) -> bool {
        self.peek_nth(n).is_some_and(|t| t.is_name(name))
    }

    pub(crate) fn is_nth_kind(&self, n: usize, kind: &TokenKind) -> bool {
        self.peek_nth(n).is_some_and(|t| &t.kind == kind)
    }

    pub(crate) fn skip_name(&mut self, name: &str) -> bool {
        if self.is_name_next(name) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<Span, ParseError> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.advance();
                Ok(token.span)
            }
            Some(token) => Err(ParseError::syntax(
                format!("Expected {kind}, found {}", token.kind),
                token.span,
            )),
            None => Err(ParseError::syntax(
                format!("Expected {kind}, found end of tag"),
                self.end,
            )),
        }
    }

    /// Like [`Self::expect`], but running out of tokens reports the unclosed opener.
    fn expect_closing(
        &mut self,
        kind: &TokenKind,
        opener: &str,
        open: Span,
    ) -> Result<Span, ParseError> {
        if self.at_end() {
            return Err(ParseError::syntax(
                format!("Unclosed '{opener}' in expression"),
                open,
            ));
        }
        self.expect(kind)
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> Result<Span, ParseError> {
        match self.peek() {
            Some(token) if token.is_name(keyword) => {
                self.advance();
                Ok(token.span)
            }
            Some(token) => Err(ParseError::syntax(
                format!("Expected '{keyword}', found {}", token.kind),
                token.span,
            )),
            None => Err(ParseError::syntax(
                format!("Expected '{keyword}', found end of tag"),
                self.end,
            )),
        }
    }

    /// Assignment targets: `a`, `a, b`, `(k, (a, b))`. Nested tuples are flattened.
    pub(crate) fn parse_target_names(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        self.collect_target_names(&mut names)?;
        Ok(names)
    }

    fn collect_target_names(&mut self, names: &mut Vec<String>) -> Result<(), ParseError> {
        loop {
            if self.check(&TokenKind::LParen) {
                let open = self.advance_span();
                self.collect_target_names(names)?;
                self.expect_closing(&TokenKind::RParen, "(", open)?;
            } else {
                let (name, span) = self.expect_name("variable name")?;
                if RESERVED.contains(&name.as_str()) {
                    return Err(ParseError::syntax(
                        format!("Cannot assign to '{name}'"),
                        span,
                    ));
                }
                names.push(name);
            }

            if !self.skip(&TokenKind::Comma) {
                return Ok(());
            }
            if self.is_name_next("in") || self.at_tuple_end() {
                return Ok(());
            }
        }
    }

    pub(crate) fn expect_name(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(ExprToken {
                kind: TokenKind::Name(name),
                span,
            }) => {
                self.advance();
                Ok((name.clone(), *span))
            }
            Some(token) => Err(ParseError::syntax(
                format!("Expected {what}, found {}", token.kind),
                token.span,
            )),
            None => Err(ParseError::syntax(
                format!("Expected {what}, found end of tag"),
                self.end,
            )),
        }
    }

    /// Fails on the first leftover token.
    pub(crate) fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ParseError::syntax(
                format!("Unused {} at end of expression.", token.kind),
                token.span,
            )),
        }
    }

    fn unexpected_end(&self) -> ParseError {
        ParseError::syntax("Unexpected end of expression.", self.end)
    }

    fn span_from(&self, start: Span) -> Span {
        Span::from_bounds(start.start_usize(), self.last_end.max(start.end_usize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use crate::tokens::TagDelimiter;

    fn tokens(source: &str) -> (String, Vec<ExprToken>, Span) {
        let template = format!("{{{{ {source} }}}}");
        let scanned = Scanner::new(&template, 2, 0, TagDelimiter::Variable)
            .scan()
            .unwrap();
        let end = Span::from_parts(scanned.content_end, 0);
        (template, scanned.tokens, end)
    }

    fn parse(source: &str) -> Result<Expr, ParseError> {
        let (_, tokens, end) = tokens(source);
        ExpressionParser::new(&tokens, end).parse_all()
    }

    fn sexpr(source: &str) -> String {
        render(&parse(source).unwrap())
    }

    fn error(source: &str) -> String {
        parse(source).unwrap_err().to_string()
    }

    fn render_args(args: &[Argument]) -> String {
        args.iter()
            .map(|arg| match &arg.name {
                Some(name) => format!(" {name}={}", render(&arg.value)),
                None => format!(" {}", render(&arg.value)),
            })
            .collect()
    }

    fn render_opt(expr: Option<&Expr>) -> String {
        expr.map_or_else(|| "_".to_string(), render)
    }

    fn render(expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Literal(Literal::Str(s)) => format!("{s:?}"),
            ExprKind::Literal(Literal::Number(n)) => n.clone(),
            ExprKind::Literal(Literal::Bool(b)) => b.to_string(),
            ExprKind::Literal(Literal::None) => "none".to_string(),
            ExprKind::Identifier(name) => name.clone(),
            ExprKind::Attribute { base, name } => format!("(. {} {name})", render(base)),
            ExprKind::Subscript { base, index } => {
                format!("([] {} {})", render(base), render(index))
            }
            ExprKind::Slice { start, stop, step } => format!(
                "(: {} {} {})",
                render_opt(start.as_deref()),
                render_opt(stop.as_deref()),
                render_opt(step.as_deref())
            ),
            ExprKind::Call { callee, args } => {
                format!("(call {}{})", render(callee), render_args(args))
            }
            ExprKind::Filter { value, filter } => format!(
                "(| {} {}{})",
                render(value),
                filter.name,
                render_args(&filter.args)
            ),
            ExprKind::Test {
                value,
                name,
                args,
                negated,
            } => format!(
                "({} {} {name}{})",
                if *negated { "is-not" } else { "is" },
                render(value),
                render_args(args)
            ),
            ExprKind::Unary { op, operand } => {
                let op = match op {
                    UnaryOp::Not => "not",
                    UnaryOp::Neg => "neg",
                    UnaryOp::Pos => "pos",
                };
                format!("({op} {})", render(operand))
            }
            ExprKind::BinaryBool { op, left, right } => {
                let op = match op {
                    BoolOp::And => "and",
                    BoolOp::Or => "or",
                };
                format!("({op} {} {})", render(left), render(right))
            }
            ExprKind::Compare { op, left, right } => {
                format!("({op} {} {})", render(left), render(right))
            }
            ExprKind::Binary { op, left, right } => {
                format!("({op} {} {})", render(left), render(right))
            }
            ExprKind::Ternary {
                true_expr,
                condition,
                false_expr,
            } => format!(
                "(? {} {} {})",
                render(condition),
                render(true_expr),
                render_opt(false_expr.as_deref())
            ),
            ExprKind::List(items) => format!(
                "[{}]",
                items.iter().map(render).collect::<Vec<_>>().join(" ")
            ),
            ExprKind::Tuple(items) => format!(
                "(tuple{})",
                items
                    .iter()
                    .map(|item| format!(" {}", render(item)))
                    .collect::<String>()
            ),
            ExprKind::Dict(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", render(k), render(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    mod primaries {
        use super::*;

        #[test]
        fn identifier_and_literals() {
            assert_eq!(sexpr("name"), "name");
            assert_eq!(sexpr("42"), "42");
            assert_eq!(sexpr("'hi' \"there\""), "\"hithere\"");
            assert_eq!(sexpr("True"), "true");
            assert_eq!(sexpr("none"), "none");
        }

        #[test]
        fn attribute_chain() {
            insta::assert_snapshot!(sexpr("user.profile.settings.theme"), @"(. (. (. user profile) settings) theme)");
        }

        #[test]
        fn subscripts_and_calls() {
            insta::assert_snapshot!(sexpr("items[other][0].name"), @"(. ([] ([] items other) 0) name)");
            insta::assert_snapshot!(sexpr("range(1, n, step=2)"), @"(call range 1 n step=2)");
            insta::assert_snapshot!(sexpr("f(*args, **kwargs)"), @"(call f args kwargs)");
        }

        #[test]
        fn slices() {
            insta::assert_snapshot!(sexpr("items[1:n]"), @"([] items (: 1 n _))");
            insta::assert_snapshot!(sexpr("items[::step]"), @"([] items (: _ _ step))");
        }

        #[test]
        fn collections() {
            insta::assert_snapshot!(sexpr("[a, 'b', 3,]"), @r#"[a "b" 3]"#);
            insta::assert_snapshot!(sexpr("{'k': v, key: 1}"), @r#"{"k": v, key: 1}"#);
            insta::assert_snapshot!(sexpr("(a, b)"), @"(tuple a b)");
            insta::assert_snapshot!(sexpr("()"), @"(tuple)");
            insta::assert_snapshot!(sexpr("a, b"), @"(tuple a b)");
        }

        #[test]
        fn integer_attribute_lookup() {
            insta::assert_snapshot!(sexpr("rows.0.1"), @"(. (. rows 0) 1)");
        }
    }

    mod operators {
        use super::*;

        #[test]
        fn arithmetic_precedence() {
            insta::assert_snapshot!(sexpr("a + b * c"), @"(+ a (* b c))");
            insta::assert_snapshot!(sexpr("a - b - c"), @"(- (- a b) c)");
            insta::assert_snapshot!(sexpr("a ** b ** c"), @"(** a (** b c))");
            insta::assert_snapshot!(sexpr("-a ** 2"), @"(neg (** a 2))");
            insta::assert_snapshot!(sexpr("a ~ b + c"), @"(~ a (+ b c))");
            insta::assert_snapshot!(sexpr("a // b % c"), @"(% (// a b) c)");
        }

        #[test]
        fn boolean_precedence() {
            insta::assert_snapshot!(sexpr("a or b and c"), @"(or a (and b c))");
            insta::assert_snapshot!(sexpr("not a and b"), @"(and (not a) b)");
            insta::assert_snapshot!(sexpr("not user.is_banned"), @"(not (. user is_banned))");
            insta::assert_snapshot!(sexpr("not a == b"), @"(not (== a b))");
        }

        #[test]
        fn comparisons() {
            insta::assert_snapshot!(sexpr("a in b"), @"(in a b)");
            insta::assert_snapshot!(sexpr("a not in b or c"), @"(or (not in a b) c)");
            insta::assert_snapshot!(sexpr("x + 1 >= limit"), @"(>= (+ x 1) limit)");
        }

        #[test]
        fn filters_bind_tighter_than_operators() {
            insta::assert_snapshot!(sexpr("a + b | upper"), @"(+ a (| b upper))");
            insta::assert_snapshot!(sexpr("-x|abs"), @"(neg (| x abs))");
            insta::assert_snapshot!(sexpr("name | default('x', true) | trim"), @r#"(| (| name default "x" true) trim)"#);
        }

        #[test]
        fn tests() {
            insta::assert_snapshot!(sexpr("x is defined"), @"(is x defined)");
            insta::assert_snapshot!(sexpr("x is not none"), @"(is-not x none)");
            insta::assert_snapshot!(sexpr("n is divisibleby 3"), @"(is n divisibleby 3)");
            insta::assert_snapshot!(sexpr("n is divisibleby(d) and ok"), @"(and (is n divisibleby d) ok)");
            insta::assert_snapshot!(sexpr("x is sameas other.value"), @"(is x sameas (. other value))");
        }

        #[test]
        fn ternary() {
            insta::assert_snapshot!(sexpr("a if cond else b"), @"(? cond a b)");
            insta::assert_snapshot!(sexpr("a if cond"), @"(? cond a _)");
            insta::assert_snapshot!(sexpr("a if c1 else b if c2 else d"), @"(? c1 a (? c2 b d))");
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn trailing_operator() {
            insta::assert_snapshot!(error("a +"), @"Unexpected end of expression.");
        }

        #[test]
        fn missing_operand() {
            insta::assert_snapshot!(error("a and or b"), @"Not expecting 'or' in this position.");
        }

        #[test]
        fn unbalanced_parens() {
            insta::assert_snapshot!(error("(a + b"), @"Unclosed '(' in expression");
            insta::assert_snapshot!(error("a + b)"), @"Unused ')' at end of expression.");
            insta::assert_snapshot!(error("f(a"), @"Unclosed '(' in expression");
            insta::assert_snapshot!(error("items[0"), @"Unclosed '[' in expression");
        }

        #[test]
        fn mismatched_bracket() {
            insta::assert_snapshot!(error("(a]"), @"Expected ')', found ']'");
        }

        #[test]
        fn not_as_infix() {
            insta::assert_snapshot!(error("a not b"), @"Not expecting 'not' as infix operator.");
        }

        #[test]
        fn unused_token() {
            insta::assert_snapshot!(error("a b"), @"Unused 'b' at end of expression.");
        }

        #[test]
        fn missing_filter_name() {
            insta::assert_snapshot!(error("name |"), @"Expected filter name, found end of tag");
        }

        #[test]
        fn missing_attribute_name() {
            insta::assert_snapshot!(error("user."), @"Expected attribute name after '.'");
        }

        #[test]
        fn unclosed_error_points_at_opener() {
            let err = parse("(a + b").unwrap_err();
            assert_eq!(err.span(), Span::new(3, 1));
        }

        #[test]
        fn trailing_token_span() {
            let err = parse("a b").unwrap_err();
            assert_eq!(err.span(), Span::new(5, 1));
        }
    }

    #[test]
    fn spans_cover_whole_expression() {
        let expr = parse("user.name | upper").unwrap();
        assert_eq!(expr.span, Span::new(3, 17));
        let (template, _, _) = tokens("user.name | upper");
        assert_eq!(&template[3..20], "user.name | upper");
    }
}
