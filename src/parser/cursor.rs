use phf::phf_set;

use crate::error::{CompileError, CompileResult};
use crate::lexer::{Keyword, Span, Token, TokenKind};

/// Operators spelled with two characters. The lexer emits one token per
/// character, so the cursor joins two operator tokens that touch in the source.
static TWO_CHAR_OPERATORS: phf::Set<&'static str> = phf_set! {
    "==", "!=", "<=", ">=", "&&", "||",
};

/// Deepest nesting the parsers accept, for both blocks and expressions. The
/// later passes recurse over the tree, so deeper input is a syntax error.
pub(super) const MAX_NESTING: usize = 512;

static END_OF_INPUT: Token = Token {
    kind: TokenKind::Eof,
    text: String::new(),
    span: Span {
        offset: 0,
        line: 0,
        column: 0,
    },
};

/// Read-only position in a token sequence.
#[derive(Clone, Debug)]
pub(super) struct Cursor<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token], index: usize) -> Self {
        Self { tokens, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The current token. Reading past the end yields the end-of-input token.
    pub fn peek(&self) -> &'a Token {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last().filter(|t| t.kind == TokenKind::Eof))
            .unwrap_or(&END_OF_INPUT)
    }

    pub fn is_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub fn advance(&mut self) -> &'a Token {
        let t = self.peek();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        t
    }

    pub fn error(&self, message: impl Into<String>) -> CompileError {
        let t = self.peek();
        CompileError::Syntax {
            line: t.span.line,
            column: t.span.column,
            near: t.describe(),
            message: message.into(),
        }
    }

    /// The operator at the cursor and how many tokens it spans.
    pub fn peek_operator(&self) -> Option<(String, usize)> {
        let first = self.peek();
        if first.kind != TokenKind::Operator {
            return None;
        }

        if let Some(second) = self.tokens.get(self.index + 1) {
            if second.kind == TokenKind::Operator && second.span.offset == first.span.offset + 1 {
                let joined = format!("{}{}", first.text, second.text);
                if TWO_CHAR_OPERATORS.contains(joined.as_str()) {
                    return Some((joined, 2));
                }
            }
        }

        Some((first.text.clone(), 1))
    }

    pub fn consume_operator(&mut self, op: &str) -> bool {
        match self.peek_operator() {
            Some((text, len)) if text == op => {
                self.index += len;
                true
            }
            _ => false,
        }
    }

    pub fn expect_operator(&mut self, op: &str, context: &str) -> CompileResult<()> {
        if self.consume_operator(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{op}` {context}")))
        }
    }

    pub fn consume_separator(&mut self, c: char) -> bool {
        if self.peek().is_separator(c) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn expect_separator(&mut self, c: char, context: &str) -> CompileResult<()> {
        if self.consume_separator(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}` {context}")))
        }
    }

    pub fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().is_keyword(keyword) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn expect_ident(&mut self, context: &str) -> CompileResult<String> {
        let t = self.peek();
        if t.kind == TokenKind::Ident {
            self.index += 1;
            Ok(t.text.clone())
        } else {
            Err(self.error(format!("expected an identifier {context}")))
        }
    }
}
