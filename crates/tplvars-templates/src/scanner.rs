use tplvars_source::Span;

use crate::error::ParseError;
use crate::tokens::ExprToken;
use crate::tokens::TagDelimiter;
use crate::tokens::TokenKind;
use crate::tokens::WhitespaceControl;

/// Result of scanning the interior of a `{{ … }}` or `{% … %}` tag.
#[derive(Debug)]
pub(crate) struct ScannedTag {
    pub tokens: Vec<ExprToken>,
    /// Byte offset where the interior ends (before any closing marker).
    pub content_end: usize,
    /// Byte offset just past the closing delimiter.
    pub end: usize,
    pub right: WhitespaceControl,
}

/// Splits a tag interior into expression tokens, stopping at the tag's closer.
///
/// For `{{ … }}` the closer is only recognised outside of open `{` brackets, so
/// dict literals such as `{{ {'a': {'b': 1}} }}` scan correctly. String literals
/// are consumed whole, so a closer inside quotes never ends the tag.
pub(crate) struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    opener_start: usize,
    delimiter: TagDelimiter,
    brackets: Vec<char>,
    after_dot: bool,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(
        source: &'a str,
        start: usize,
        opener_start: usize,
        delimiter: TagDelimiter,
    ) -> Self {
        Self {
            source,
            pos: start,
            opener_start,
            delimiter,
            brackets: Vec::new(),
            after_dot: false,
        }
    }

    pub(crate) fn scan(mut self) -> Result<ScannedTag, ParseError> {
        let mut tokens = Vec::new();

        loop {
            let content_end = self.pos;
            self.skip_whitespace();

            if self.is_at_end() {
                return Err(ParseError::UnclosedDelimiter {
                    kind: self.delimiter.describe(),
                    closer: self.delimiter.closer(),
                    span: Span::from_parts(self.opener_start, TagDelimiter::LENGTH),
                });
            }

            if let Some(right) = self.closer_here() {
                let end = self.pos + right.marker_len() + TagDelimiter::LENGTH;
                // Whitespace before the closer is not part of the interior.
                let content_end = tokens
                    .last()
                    .map_or(content_end, |token: &ExprToken| token.span.end_usize());
                return Ok(ScannedTag {
                    tokens,
                    content_end,
                    end,
                    right,
                });
            }

            let token = self.next_token()?;
            self.after_dot = token.kind == TokenKind::Dot;
            tokens.push(token);
        }
    }

    fn closer_here(&self) -> Option<WhitespaceControl> {
        if self.delimiter == TagDelimiter::Variable && self.brackets.last() == Some(&'{') {
            return None;
        }

        let rest = self.rest();
        let closer = self.delimiter.closer();

        [
            ('-', WhitespaceControl::Trim),
            ('+', WhitespaceControl::Keep),
        ]
        .into_iter()
        .find_map(|(marker, control)| {
            rest.strip_prefix(marker)
                .filter(|after| after.starts_with(closer))
                .map(|_| control)
        })
        .or_else(|| rest.starts_with(closer).then_some(WhitespaceControl::Preserve))
    }

    fn next_token(&mut self) -> Result<ExprToken, ParseError> {
        let start = self.pos;
        let c = self.peek();

        if c.is_alphabetic() || c == '_' {
            return Ok(self.lex_name(start));
        }

        if c.is_ascii_digit() {
            return Ok(self.lex_number(start));
        }

        if c == '\'' || c == '"' {
            return self.lex_string(start, c);
        }

        let rest = self.rest();
        let two_char = [
            ("**", TokenKind::StarStar),
            ("//", TokenKind::SlashSlash),
            ("==", TokenKind::Eq),
            ("!=", TokenKind::Ne),
            ("<=", TokenKind::Le),
            (">=", TokenKind::Ge),
        ];
        if let Some((text, kind)) = two_char.into_iter().find(|(text, _)| rest.starts_with(text)) {
            self.pos += text.len();
            return Ok(ExprToken::new(kind, Span::from_bounds(start, self.pos)));
        }

        let kind = match c {
            '(' | '[' | '{' => {
                self.brackets.push(c);
                match c {
                    '(' => TokenKind::LParen,
                    '[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                }
            }
            ')' => self.close_bracket('(', TokenKind::RParen),
            ']' => self.close_bracket('[', TokenKind::RBracket),
            '}' => self.close_bracket('{', TokenKind::RBrace),
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '|' => TokenKind::Pipe,
            '~' => TokenKind::Tilde,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Assign,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            _ => {
                return Err(ParseError::syntax(
                    format!("Unexpected character '{c}'"),
                    Span::from_parts(start, c.len_utf8()),
                ));
            }
        };

        self.consume();
        Ok(ExprToken::new(kind, Span::from_bounds(start, self.pos)))
    }

    fn close_bracket(&mut self, opener: char, kind: TokenKind) -> TokenKind {
        if self.brackets.last() == Some(&opener) {
            self.brackets.pop();
        }
        kind
    }

    fn lex_name(&mut self, start: usize) -> ExprToken {
        while !self.is_at_end() && (self.peek().is_alphanumeric() || self.peek() == '_') {
            self.consume();
        }
        let name = self.source[start..self.pos].to_string();
        ExprToken::new(TokenKind::Name(name), Span::from_bounds(start, self.pos))
    }

    fn lex_number(&mut self, start: usize) -> ExprToken {
        self.consume_digits();

        // `items.0.1` is two integer attribute lookups, never a float.
        if !self.after_dot {
            if self.peek() == '.' && self.peek_nth(1).is_ascii_digit() {
                self.consume();
                self.consume_digits();
            }

            if matches!(self.peek(), 'e' | 'E') {
                let sign = usize::from(matches!(self.peek_nth(1), '+' | '-'));
                if self.peek_nth(1 + sign).is_ascii_digit() {
                    for _ in 0..=sign {
                        self.consume();
                    }
                    self.consume_digits();
                }
            }
        }

        let text = self.source[start..self.pos].replace('_', "");
        ExprToken::new(TokenKind::Number(text), Span::from_bounds(start, self.pos))
    }

    fn consume_digits(&mut self) {
        while !self.is_at_end() && (self.peek().is_ascii_digit() || self.peek() == '_') {
            self.consume();
        }
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Result<ExprToken, ParseError> {
        self.consume();
        let mut value = String::new();

        while !self.is_at_end() {
            let c = self.peek();
            self.consume();

            if c == quote {
                return Ok(ExprToken::new(
                    TokenKind::Str(value),
                    Span::from_bounds(start, self.pos),
                ));
            }

            if c == '\\' && !self.is_at_end() {
                let escaped = self.peek();
                self.consume();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' | '\'' | '"' => value.push(escaped),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
            } else {
                value.push(c);
            }
        }

        Err(ParseError::syntax(
            "Unterminated string literal",
            Span::from_bounds(start, self.pos),
        ))
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.consume();
        }
    }

    #[inline]
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    #[inline]
    fn peek(&self) -> char {
        self.rest().chars().next().unwrap_or('\0')
    }

    fn peek_nth(&self, n: usize) -> char {
        self.rest().chars().nth(n).unwrap_or('\0')
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    #[inline]
    fn consume(&mut self) {
        if let Some(ch) = self.rest().chars().next() {
            self.pos += ch.len_utf8();
        }
    }
}
