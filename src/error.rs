//! Errors shared by every stage of the pipeline.
//!
//! Every error is fatal: the first one stops compilation and is handed back to
//! the caller unchanged.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Lexical,
    Syntax,
    Semantic,
}

#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("lexical error at {line}:{column}: {message}")]
    Lex {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("syntax error at {line}:{column} near `{near}`: {message}")]
    Syntax {
        line: usize,
        column: usize,
        near: String,
        message: String,
    },

    #[error("semantic error: use of undeclared variable `{name}`")]
    UndeclaredVariable { name: String },
}

impl CompileError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CompileError::Lex { .. } => ErrorClass::Lexical,
            CompileError::Syntax { .. } => ErrorClass::Syntax,
            CompileError::UndeclaredVariable { .. } => ErrorClass::Semantic,
        }
    }
}
