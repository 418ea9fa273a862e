use tracing::{debug, trace};

use crate::error::{CompileError, CompileResult};

use super::{
    token::{KEYWORDS, OPERATORS, SEPARATORS},
    Span, Token, TokenKind,
};

#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    tokens: Vec<Token>,
    index: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(s: &str) -> Self {
        Self {
            chars: s.chars().collect(),
            tokens: vec![],
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.index + ahead).copied()
    }

    fn span(&self) -> Span {
        Span {
            offset: self.index,
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek(0).filter(|&c| f(c)) {
            s.push(c);
            self.bump();
        }
        s
    }

    fn new_token(&mut self, kind: TokenKind, text: String, span: Span) {
        trace!(?kind, %text, line = span.line, column = span.column, "token");
        self.tokens.push(Token { kind, text, span });
    }

    fn error(span: Span, message: impl Into<String>) -> CompileError {
        CompileError::Lex {
            line: span.line,
            column: span.column,
            message: message.into(),
        }
    }

    fn parse_number(&mut self) {
        let span = self.span();
        let s = self.take_while(|c| c.is_ascii_digit());
        self.new_token(TokenKind::Int, s, span);
    }

    fn parse_identifier(&mut self) {
        let span = self.span();
        let s = self.take_while(|c| c.is_ascii_alphabetic());

        let kind = KEYWORDS.get(s.as_str()).copied().unwrap_or(TokenKind::Ident);
        self.new_token(kind, s, span);
    }

    fn parse_string(&mut self) -> CompileResult<()> {
        let span = self.span();
        self.bump();
        let s = self.take_while(|c| c != '"');
        if self.bump() != Some('"') {
            return Err(Self::error(span, "unterminated string literal"));
        }
        self.new_token(TokenKind::Str, s, span);
        Ok(())
    }

    fn skip_comment(&mut self) {
        self.take_while(|c| c != '\n');
    }

    fn _tokenize(&mut self) -> CompileResult<()> {
        while let Some(c) = self.peek(0) {
            let span = self.span();

            if c.is_whitespace() {
                self.bump();
            } else if c.is_ascii_digit() {
                self.parse_number();
            } else if c.is_ascii_alphabetic() {
                self.parse_identifier();
            } else if c == '"' {
                self.parse_string()?;
            } else if SEPARATORS.contains(&c) {
                self.bump();
                self.new_token(TokenKind::Separator, c.to_string(), span);
            } else if c == '/' && self.peek(1) == Some('/') {
                self.skip_comment();
            } else if OPERATORS.contains(&c) {
                self.bump();
                self.new_token(TokenKind::Operator, c.to_string(), span);
            } else {
                return Err(Self::error(span, format!("unknown character '{c}'")));
            }
        }

        let span = self.span();
        self.new_token(TokenKind::Eof, String::new(), span);
        Ok(())
    }

    /// Splits `s` into tokens. The result always ends with exactly one
    /// [`TokenKind::Eof`].
    pub fn tokenize(s: &str) -> CompileResult<Vec<Token>> {
        let mut lexer = Lexer::new(s);
        lexer._tokenize()?;
        debug!(count = lexer.tokens.len(), "lexed source");

        Ok(lexer.tokens)
    }
}
