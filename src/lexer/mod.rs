mod lexer;
mod token;

pub use lexer::*;
pub use token::{Keyword, Span, Token, TokenKind};
