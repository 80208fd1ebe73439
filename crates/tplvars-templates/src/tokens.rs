use std::fmt;

use tplvars_source::Span;

/// The three delimiter families a template can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagDelimiter {
    Block,
    Variable,
    Comment,
}

impl TagDelimiter {
    pub const CHAR_OPEN: char = '{';
    pub const LENGTH: usize = 2;
    pub const LENGTH_U32: u32 = 2;

    #[must_use]
    pub fn from_input(input: &str) -> Option<TagDelimiter> {
        let bytes = input.as_bytes();

        if bytes.len() < Self::LENGTH || bytes[0] != Self::CHAR_OPEN as u8 {
            return None;
        }

        match bytes[1] {
            b'%' => Some(TagDelimiter::Block),
            b'{' => Some(TagDelimiter::Variable),
            b'#' => Some(TagDelimiter::Comment),
            _ => None,
        }
    }

    #[must_use]
    pub const fn opener(self) -> &'static str {
        match self {
            TagDelimiter::Block => "{%",
            TagDelimiter::Variable => "{{",
            TagDelimiter::Comment => "{#",
        }
    }

    #[must_use]
    pub const fn closer(self) -> &'static str {
        match self {
            TagDelimiter::Block => "%}",
            TagDelimiter::Variable => "}}",
            TagDelimiter::Comment => "#}",
        }
    }

    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            TagDelimiter::Block => "block tag",
            TagDelimiter::Variable => "expression tag",
            TagDelimiter::Comment => "comment",
        }
    }
}

/// Whitespace-control marker written against a delimiter (`{%-`, `+%}`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WhitespaceControl {
    #[default]
    Preserve,
    /// `-`: strip whitespace on this side of the tag.
    Trim,
    /// `+`: keep whitespace even when trimming is configured.
    Keep,
}

impl WhitespaceControl {
    #[must_use]
    pub fn from_marker(marker: Option<char>) -> Self {
        match marker {
            Some('-') => WhitespaceControl::Trim,
            Some('+') => WhitespaceControl::Keep,
            _ => WhitespaceControl::Preserve,
        }
    }

    #[must_use]
    pub fn marker_len(self) -> usize {
        match self {
            WhitespaceControl::Preserve => 0,
            WhitespaceControl::Trim | WhitespaceControl::Keep => 1,
        }
    }
}

/// Interior of a `{{ … }}` or `{% … %}` tag, already split into expression tokens.
#[derive(Clone, Debug, PartialEq)]
pub struct TagToken {
    pub tokens: Vec<ExprToken>,
    /// Full lexeme, delimiters included.
    pub span: Span,
    /// Between the delimiters (and any whitespace-control markers).
    pub content_span: Span,
    pub left: WhitespaceControl,
    pub right: WhitespaceControl,
}

impl TagToken {
    /// Leading name of a block tag (`if`, `endfor`, ...).
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self.tokens.first() {
            Some(ExprToken {
                kind: TokenKind::Name(name),
                ..
            }) => Some(name),
            _ => None,
        }
    }

    /// Span pointing just past the last interior token, used for end-of-input errors.
    #[must_use]
    pub fn end_span(&self) -> Span {
        Span::new(self.content_span.end(), 0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Text { content: String, span: Span },
    Variable(TagToken),
    Block(TagToken),
    Comment { span: Span },
    Raw { content: String, span: Span },
    Eof { offset: u32 },
}

impl Token {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Token::Text { span, .. } | Token::Comment { span } | Token::Raw { span, .. } => *span,
            Token::Variable(tag) | Token::Block(tag) => tag.span,
            Token::Eof { offset } => Span::new(*offset, 0),
        }
    }
}

/// A lexical unit inside an expression or block tag.
#[derive(Clone, Debug, PartialEq)]
pub struct ExprToken {
    pub kind: TokenKind,
    pub span: Span,
}

impl ExprToken {
    #[must_use]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    #[must_use]
    pub fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(n) if n == name)
    }

    #[must_use]
    pub fn is_any_name(&self) -> bool {
        matches!(self.kind, TokenKind::Name(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    /// Integer or float, kept as written.
    Number(String),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Pipe,
    Tilde,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Name(name) => return write!(f, "'{name}'"),
            TokenKind::Number(number) => return write!(f, "'{number}'"),
            TokenKind::Str(_) => return f.write_str("string literal"),
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Pipe => "|",
            TokenKind::Tilde => "~",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::SlashSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::Ne => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
        };
        write!(f, "'{text}'")
    }
}
