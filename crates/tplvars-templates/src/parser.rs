use tplvars_source::Span;

use crate::error::ParseError;
use crate::expression::ExprKind;
use crate::expression_parser::ExpressionParser;
use crate::nodelist::IfBranch;
use crate::nodelist::ImportName;
use crate::nodelist::LoopControl;
use crate::nodelist::MacroParam;
use crate::nodelist::Node;
use crate::nodelist::SetTarget;
use crate::tokens::TagToken;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// A block tag whose closer has not been seen yet.
#[derive(Debug)]
struct OpenTag {
    name: String,
    span: Span,
}

impl OpenTag {
    fn closer(&self) -> String {
        format!("end{}", self.name)
    }
}

/// Builds the node tree from a token stream, stopping at the first error.
pub struct Parser {
    tokens: std::vec::IntoIter<Token>,
    open_tags: Vec<OpenTag>,
    eof: u32,
}

impl Parser {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof = tokens.last().map_or(0, |token| token.span().end());
        Self {
            tokens: tokens.into_iter(),
            open_tags: Vec::new(),
            eof,
        }
    }

    pub fn parse(mut self) -> Result<Vec<Node>, ParseError> {
        let (nodes, _) = self.parse_nodelist(&[])?;
        Ok(nodes)
    }

    /// Parse nodes until end of input or a block tag named in `terminators`,
    /// which is handed back to the caller.
    fn parse_nodelist(
        &mut self,
        terminators: &[&str],
    ) -> Result<(Vec<Node>, Option<TagToken>), ParseError> {
        let mut nodes = Vec::new();

        loop {
            let token = self.tokens.next().unwrap_or(Token::Eof { offset: self.eof });

            match token {
                Token::Eof { .. } => return Ok((nodes, None)),
                Token::Text { content, span } => nodes.push(Node::Text { content, span }),
                Token::Raw { content, span } => nodes.push(Node::Raw { content, span }),
                Token::Comment { span } => nodes.push(Node::Comment { span }),
                Token::Variable(tag) => nodes.push(Self::parse_variable(&tag)?),
                Token::Block(tag) => {
                    let name = tag_name(&tag)?.to_string();
                    if terminators.contains(&name.as_str()) {
                        return Ok((nodes, Some(tag)));
                    }
                    if is_closing_tag(&name) {
                        return Err(self.stray_tag(name, tag.span));
                    }
                    nodes.push(self.parse_block(&name, tag)?);
                }
            }
        }
    }

    /// Parse the body of the innermost open tag up to one of its `terminators`.
    fn parse_body(&mut self, terminators: &[&str]) -> Result<(Vec<Node>, TagToken), ParseError> {
        match self.parse_nodelist(terminators)? {
            (nodes, Some(closer)) => Ok((nodes, closer)),
            (_, None) => Err(self.unclosed()),
        }
    }

    fn open(&mut self, name: &str, tag: &TagToken) {
        self.open_tags.push(OpenTag {
            name: name.to_string(),
            span: tag.span,
        });
    }

    fn close(&mut self) {
        self.open_tags.pop();
    }

    fn unclosed(&self) -> ParseError {
        match self.open_tags.last() {
            Some(open) => ParseError::UnclosedTag {
                tag: open.name.clone(),
                expected: open.closer(),
                span: open.span,
            },
            None => ParseError::syntax("Unexpected end of template", Span::new(self.eof, 0)),
        }
    }

    /// A closer or intermediate tag that the innermost open tag does not accept.
    fn stray_tag(&self, tag: String, span: Span) -> ParseError {
        match self.open_tags.last() {
            Some(open) => ParseError::MismatchedTag {
                tag,
                expected: open.closer(),
                opener: open.name.clone(),
                opener_span: open.span,
                span,
            },
            None => ParseError::UnexpectedTag { tag, span },
        }
    }

    /// `{% endblock name %}` and `{% endmacro name %}` may repeat the opener's name.
    fn expect_closer_name(&self, closer: &TagToken, name: &str) -> Result<(), ParseError> {
        let mut args = arguments(closer);
        if let Some(token) = args.peek() {
            if !token.is_name(name) {
                let closer_name = closer.name().unwrap_or_default();
                let found = match &token.kind {
                    TokenKind::Name(found) => found.clone(),
                    kind => kind.to_string(),
                };
                let opener_span = self.open_tags.last().map_or(closer.span, |open| open.span);
                return Err(ParseError::MismatchedTag {
                    tag: format!("{closer_name} {found}"),
                    expected: format!("{closer_name} {name}"),
                    opener: format!("{} {name}", closer_name.trim_start_matches("end")),
                    opener_span,
                    span: token.span,
                });
            }
            args.advance();
        }
        args.expect_end()
    }

    fn parse_variable(tag: &TagToken) -> Result<Node, ParseError> {
        if tag.tokens.is_empty() {
            return Err(ParseError::EmptyExpression { span: tag.span });
        }

        let expr = ExpressionParser::new(&tag.tokens, tag.end_span()).parse_all()?;
        Ok(Node::Expression {
            expr,
            span: tag.span,
        })
    }

    fn parse_block(&mut self, name: &str, tag: TagToken) -> Result<Node, ParseError> {
        match name {
            "if" => self.parse_if(tag),
            "for" => self.parse_for(tag),
            "set" => self.parse_set(tag),
            "macro" => self.parse_macro(tag),
            "call" => self.parse_call(tag),
            "with" => self.parse_with(tag),
            "filter" => self.parse_filter(tag),
            "block" => self.parse_template_block(tag),
            "extends" | "include" => Self::parse_template_reference(name, &tag),
            "import" => Self::parse_import(&tag),
            "from" => Self::parse_from_import(&tag),
            "do" => {
                let mut args = arguments(&tag);
                let expr = args.parse_tuple(true)?;
                args.expect_end()?;
                Ok(Node::Do {
                    expr,
                    span: tag.span,
                })
            }
            "break" | "continue" => self.parse_loop_control(name, &tag),
            "raw" => Err(no_arguments("raw", &tag)),
            _ => Err(ParseError::UnknownTag {
                tag: name.to_string(),
                span: tag.span,
            }),
        }
    }

    fn parse_if(&mut self, tag: TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(&tag);
        let mut condition = Some(args.parse_tuple(false)?);
        args.expect_end()?;

        let mut branches = Vec::new();
        let mut else_body = None;

        self.open("if", &tag);
        let closer = loop {
            let terminators: &[&str] = if condition.is_some() {
                &["elif", "elseif", "else", "endif"]
            } else {
                &["endif"]
            };
            let (body, closer) = self.parse_body(terminators)?;

            match condition.take() {
                Some(condition) => branches.push(IfBranch { condition, body }),
                None => else_body = Some(body),
            }

            if matches!(closer.name(), Some("elif" | "elseif")) {
                let mut args = arguments(&closer);
                condition = Some(args.parse_tuple(false)?);
                args.expect_end()?;
                continue;
            }

            expect_bare(&closer)?;
            if closer.name() == Some("endif") {
                break closer;
            }
        };
        self.close();

        Ok(Node::If {
            branches,
            else_body,
            span: tag.span.cover(closer.span),
        })
    }

    fn parse_for(&mut self, tag: TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(&tag);
        let loop_vars = args.parse_target_names()?;
        args.expect_keyword("in")?;
        let iterable = args.parse_tuple(false)?;
        let condition = if args.skip_name("if") {
            Some(args.parse_expression()?)
        } else {
            None
        };
        let recursive = args.skip_name("recursive");
        args.expect_end()?;

        self.open("for", &tag);
        let (body, mut closer) = self.parse_body(&["else", "endfor"])?;
        expect_bare(&closer)?;
        let else_body = if closer.name() == Some("else") {
            let (else_body, endfor) = self.parse_body(&["endfor"])?;
            expect_bare(&endfor)?;
            closer = endfor;
            Some(else_body)
        } else {
            None
        };
        self.close();

        Ok(Node::For {
            loop_vars,
            iterable,
            condition,
            recursive,
            body,
            else_body,
            span: tag.span.cover(closer.span),
        })
    }

    fn parse_set(&mut self, tag: TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(&tag);

        let targets = if args.peek().is_some_and(|t| t.is_any_name())
            && args.is_nth_kind(1, &TokenKind::Dot)
        {
            let (namespace, _) = args.expect_name("variable name")?;
            args.advance();
            let (attr, _) = args.expect_name("attribute name")?;
            vec![SetTarget::Attribute { namespace, attr }]
        } else {
            args.parse_target_names()?
                .into_iter()
                .map(SetTarget::Name)
                .collect()
        };

        if args.skip(&TokenKind::Assign) {
            let value = args.parse_tuple(true)?;
            args.expect_end()?;
            return Ok(Node::Set {
                targets,
                value,
                span: tag.span,
            });
        }

        let name = match targets.as_slice() {
            [SetTarget::Name(name)] => name.clone(),
            _ => {
                return Err(ParseError::syntax(
                    "Expected '=' after assignment targets",
                    tag.end_span(),
                ));
            }
        };

        let mut filters = Vec::new();
        while args.skip(&TokenKind::Pipe) {
            filters.push(args.parse_filter_call()?);
        }
        args.expect_end()?;

        self.open("set", &tag);
        let (body, closer) = self.parse_body(&["endset"])?;
        expect_bare(&closer)?;
        self.close();

        Ok(Node::SetBlock {
            name,
            filters,
            body,
            span: tag.span.cover(closer.span),
        })
    }

    fn parse_macro(&mut self, tag: TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(&tag);
        let (name, _) = args.expect_name("macro name")?;
        let params = parse_params(&mut args)?;
        args.expect_end()?;

        self.open("macro", &tag);
        let (body, closer) = self.parse_body(&["endmacro"])?;
        self.expect_closer_name(&closer, &name)?;
        self.close();

        Ok(Node::Macro {
            name,
            params,
            body,
            span: tag.span.cover(closer.span),
        })
    }

    fn parse_call(&mut self, tag: TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(&tag);
        let params = if args.check(&TokenKind::LParen) {
            parse_params(&mut args)?
        } else {
            Vec::new()
        };

        let call = args.parse_expression()?;
        if !matches!(call.kind, ExprKind::Call { .. }) {
            return Err(ParseError::syntax(
                "Expected a macro call after 'call'",
                call.span,
            ));
        }
        args.expect_end()?;

        self.open("call", &tag);
        let (body, closer) = self.parse_body(&["endcall"])?;
        expect_bare(&closer)?;
        self.close();

        Ok(Node::CallBlock {
            params,
            call,
            body,
            span: tag.span.cover(closer.span),
        })
    }

    fn parse_with(&mut self, tag: TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(&tag);
        let mut bindings = Vec::new();

        while !args.at_end() {
            if !bindings.is_empty() {
                args.expect(&TokenKind::Comma)?;
            }
            let (name, _) = args.expect_name("variable name")?;
            args.expect(&TokenKind::Assign)?;
            bindings.push((name, args.parse_expression()?));
        }

        self.open("with", &tag);
        let (body, closer) = self.parse_body(&["endwith"])?;
        expect_bare(&closer)?;
        self.close();

        Ok(Node::With {
            bindings,
            body,
            span: tag.span.cover(closer.span),
        })
    }

    fn parse_filter(&mut self, tag: TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(&tag);
        let mut filters = vec![args.parse_filter_call()?];
        while args.skip(&TokenKind::Pipe) {
            filters.push(args.parse_filter_call()?);
        }
        args.expect_end()?;

        self.open("filter", &tag);
        let (body, closer) = self.parse_body(&["endfilter"])?;
        expect_bare(&closer)?;
        self.close();

        Ok(Node::FilterBlock {
            filters,
            body,
            span: tag.span.cover(closer.span),
        })
    }

    fn parse_template_block(&mut self, tag: TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(&tag);
        let (name, _) = args.expect_name("block name")?;
        args.skip_name("scoped");
        args.skip_name("required");
        args.expect_end()?;

        self.open("block", &tag);
        let (body, closer) = self.parse_body(&["endblock"])?;
        self.expect_closer_name(&closer, &name)?;
        self.close();

        Ok(Node::Block {
            name,
            body,
            span: tag.span.cover(closer.span),
        })
    }

    fn parse_template_reference(name: &str, tag: &TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(tag);
        let template = args.parse_expression()?;

        if name == "extends" {
            args.expect_end()?;
            return Ok(Node::Extends {
                template,
                span: tag.span,
            });
        }

        if args.skip_name("ignore") {
            args.expect_keyword("missing")?;
        }
        skip_context_modifier(&mut args);
        args.expect_end()?;

        Ok(Node::Include {
            template,
            span: tag.span,
        })
    }

    fn parse_import(tag: &TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(tag);
        let template = args.parse_expression()?;
        args.expect_keyword("as")?;
        let (alias, _) = args.expect_name("import alias")?;
        skip_context_modifier(&mut args);
        args.expect_end()?;

        Ok(Node::Import {
            template,
            alias,
            span: tag.span,
        })
    }

    fn parse_from_import(tag: &TagToken) -> Result<Node, ParseError> {
        let mut args = arguments(tag);
        let template = args.parse_expression()?;
        args.expect_keyword("import")?;

        let mut names = Vec::new();
        loop {
            if is_context_modifier(&args) {
                break;
            }
            let (name, _) = args.expect_name("name to import")?;
            let alias = if args.skip_name("as") {
                Some(args.expect_name("import alias")?.0)
            } else {
                None
            };
            names.push(ImportName { name, alias });

            if !args.skip(&TokenKind::Comma) {
                break;
            }
        }

        if names.is_empty() {
            return Err(ParseError::syntax("Expected name to import", tag.end_span()));
        }
        skip_context_modifier(&mut args);
        args.expect_end()?;

        Ok(Node::FromImport {
            template,
            names,
            span: tag.span,
        })
    }

    fn parse_loop_control(&self, name: &str, tag: &TagToken) -> Result<Node, ParseError> {
        if !self.open_tags.iter().any(|open| open.name == "for") {
            return Err(ParseError::syntax(
                format!("'{name}' is only allowed inside a 'for' loop"),
                tag.span,
            ));
        }
        expect_bare(tag)?;

        let kind = if name == "break" {
            LoopControl::Break
        } else {
            LoopControl::Continue
        };
        Ok(Node::LoopControl {
            kind,
            span: tag.span,
        })
    }
}

fn tag_name(tag: &TagToken) -> Result<&str, ParseError> {
    match tag.tokens.first() {
        None => Err(ParseError::EmptyTag { span: tag.span }),
        Some(token) => match &token.kind {
            TokenKind::Name(name) => Ok(name),
            kind => Err(ParseError::syntax(
                format!("Expected tag name, found {kind}"),
                token.span,
            )),
        },
    }
}

fn is_closing_tag(name: &str) -> bool {
    name.starts_with("end") || matches!(name, "elif" | "elseif" | "else")
}

/// Cursor over the tokens following the tag name.
fn arguments(tag: &TagToken) -> ExpressionParser<'_> {
    ExpressionParser::new(tag.tokens.get(1..).unwrap_or_default(), tag.end_span())
}

fn no_arguments(name: &str, tag: &TagToken) -> ParseError {
    let span = tag.tokens.get(1).map_or(tag.span, |token| token.span);
    ParseError::syntax(format!("'{name}' takes no arguments"), span)
}

fn expect_bare(tag: &TagToken) -> Result<(), ParseError> {
    if tag.tokens.len() > 1 {
        return Err(no_arguments(tag.name().unwrap_or_default(), tag));
    }
    Ok(())
}

/// `(a, b=default, …)` after a macro name or `call`.
fn parse_params(args: &mut ExpressionParser<'_>) -> Result<Vec<MacroParam>, ParseError> {
    args.expect(&TokenKind::LParen)?;
    let mut params = Vec::new();

    while !args.skip(&TokenKind::RParen) {
        if !params.is_empty() {
            args.expect(&TokenKind::Comma)?;
            if args.skip(&TokenKind::RParen) {
                break;
            }
        }
        let (name, _) = args.expect_name("parameter name")?;
        let default = if args.skip(&TokenKind::Assign) {
            Some(args.parse_expression()?)
        } else {
            None
        };
        params.push(MacroParam { name, default });
    }

    Ok(params)
}

fn is_context_modifier(args: &ExpressionParser<'_>) -> bool {
    (args.is_name_next("with") || args.is_name_next("without")) && args.is_nth_name(1, "context")
}

fn skip_context_modifier(args: &mut ExpressionParser<'_>) {
    if is_context_modifier(args) {
        args.advance();
        args.advance();
    }
}
