pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;

use tracing::info;

use codegen::Codegen;
use error::CompileResult;
use lexer::Lexer;
use parser::Parser;

/// Runs the whole pipeline on `user_input` and returns the assembly text.
pub fn compile(user_input: &str) -> CompileResult<String> {
    let tokens = Lexer::tokenize(user_input)?;

    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;

    let mut codegen = Codegen::new();
    let asm = codegen.generate(&program)?;
    info!(bytes = asm.len(), "compiled program");

    Ok(asm)
}
