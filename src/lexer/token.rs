use phf::{phf_map, phf_set};

pub(super) static KEYWORDS: phf::Map<&str, TokenKind> = phf_map! {
    "exit" => TokenKind::Keyword(Keyword::Exit),
    "print" => TokenKind::Keyword(Keyword::Print),
    "let" => TokenKind::Keyword(Keyword::Let),
    "if" => TokenKind::Keyword(Keyword::If),
    "else" => TokenKind::Keyword(Keyword::Else),
    "while" => TokenKind::Keyword(Keyword::While),
    "assign" => TokenKind::Keyword(Keyword::Assign),
    "processor" => TokenKind::Keyword(Keyword::Processor),
    "call" => TokenKind::Keyword(Keyword::Call),
    "true" => TokenKind::Bool,
    "false" => TokenKind::Bool,
};

pub(super) static SEPARATORS: phf::Set<char> = phf_set! {
    '(', ')', '{', '}', ';', ',',
};

pub(super) static OPERATORS: phf::Set<char> = phf_set! {
    '+', '-', '*', '/', '=', '<', '>', '!', '&', '|',
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Exit,
    Print,
    Let,
    If,
    Else,
    While,
    Assign,
    Processor,
    Call,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Int,
    Keyword(Keyword),
    Separator,
    Operator,
    Str,
    Ident,
    Bool,
    Eof,
    /// Part of the token model; the lexer reports unknown characters instead.
    Unknown,
}

/// Where a token starts in the source. `offset` counts chars, `line` and
/// `column` are 1-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn is_separator(&self, c: char) -> bool {
        self.kind == TokenKind::Separator && self.text.starts_with(c)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Token text as it should appear in a diagnostic.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Str => format!("\"{}\"", self.text),
            _ => self.text.clone(),
        }
    }
}
