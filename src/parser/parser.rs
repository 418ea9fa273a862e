use tracing::debug;

use crate::error::CompileResult;
use crate::lexer::{Keyword, Token, TokenKind};

use super::{
    cursor::{Cursor, MAX_NESTING},
    Block, Expr, ExprParser, PrintArg, Program, Stmt,
};

/// Where a statement sequence stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Terminator {
    EndOfInput,
    CloseBrace,
}

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            index: 0,
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> CompileResult<Program> {
        self.parse_program()
    }

    fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.tokens, self.index)
    }

    /// Runs `f` on a cursor at the current position and keeps the position it
    /// ends at.
    fn with_cursor<T>(&mut self, f: impl FnOnce(&mut Cursor<'_>) -> T) -> T {
        let mut cursor = Cursor::new(&self.tokens, self.index);
        let result = f(&mut cursor);
        self.index = cursor.index();
        result
    }

    fn expect_separator(&mut self, c: char, context: &str) -> CompileResult<()> {
        self.with_cursor(|cursor| cursor.expect_separator(c, context))
    }

    fn expect_operator(&mut self, op: &str, context: &str) -> CompileResult<()> {
        self.with_cursor(|cursor| cursor.expect_operator(op, context))
    }

    fn expect_ident(&mut self, context: &str) -> CompileResult<String> {
        self.with_cursor(|cursor| cursor.expect_ident(context))
    }

    fn consume_separator(&mut self, c: char) -> bool {
        self.with_cursor(|cursor| cursor.consume_separator(c))
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        self.with_cursor(|cursor| cursor.consume_keyword(keyword))
    }

    fn parse_expr(&mut self) -> CompileResult<Expr> {
        let (expr, index) = ExprParser::parse(&self.tokens, self.index)?;
        self.index = index;
        Ok(expr)
    }

    /// program = stmt*
    fn parse_program(&mut self) -> CompileResult<Program> {
        let stmts = self.parse_stmts_until(Terminator::EndOfInput)?;
        debug!(statements = stmts.len(), "parsed program");
        Ok(Program(stmts))
    }

    /// Parses statements until `terminator`. A closing brace is consumed, the
    /// end of input is not.
    fn parse_stmts_until(&mut self, terminator: Terminator) -> CompileResult<Vec<Stmt>> {
        let mut stmts = vec![];

        loop {
            let cursor = self.cursor();
            match terminator {
                Terminator::EndOfInput if cursor.is_eof() => break,
                Terminator::CloseBrace if cursor.peek().is_separator('}') => {
                    self.index += 1;
                    break;
                }
                Terminator::CloseBrace if cursor.is_eof() => {
                    return Err(cursor.error("expected `}` to close the block"));
                }
                _ => stmts.push(self.parse_stmt()?),
            }
        }

        Ok(stmts)
    }

    /// block = "{" stmt* "}"
    fn parse_block(&mut self, context: &str) -> CompileResult<Block> {
        self.expect_separator('{', context)?;
        if self.depth >= MAX_NESTING {
            return Err(self.cursor().error("blocks nested too deeply"));
        }

        self.depth += 1;
        let stmts = self.parse_stmts_until(Terminator::CloseBrace);
        self.depth -= 1;
        Ok(Block(stmts?))
    }

    /// stmt = "exit" "(" expr ")" ";"
    ///      | "print" "(" (string | expr) ")" ";"
    ///      | "let" ident "=" expr ";"
    ///      | "assign" ident "=" expr ";"
    ///      | "if" "(" expr ")" block ("else" block)?
    ///      | "while" "(" expr ")" block
    ///      | "call" ident "(" (expr ("," expr)*)? ")" ";"
    ///      | "processor" ident "(" (ident ("," ident)*)? ")" block
    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        let cursor = self.cursor();
        let t = cursor.peek();
        let TokenKind::Keyword(keyword) = t.kind else {
            return Err(cursor.error("expected a statement"));
        };

        self.index += 1;
        let stmt = match keyword {
            Keyword::Exit => self.parse_exit()?,
            Keyword::Print => self.parse_print()?,
            Keyword::Let => self.parse_let()?,
            Keyword::Assign => self.parse_assign()?,
            Keyword::If => self.parse_if()?,
            Keyword::While => self.parse_while()?,
            Keyword::Call => self.parse_call()?,
            Keyword::Processor => self.parse_processor()?,
            Keyword::Else => {
                self.index -= 1;
                return Err(self.cursor().error("`else` without a preceding `if`"));
            }
        };
        debug!(?keyword, "parsed statement");

        Ok(stmt)
    }

    fn parse_exit(&mut self) -> CompileResult<Stmt> {
        self.expect_separator('(', "after `exit`")?;
        let expr = self.parse_expr()?;
        self.expect_separator(')', "after the exit status")?;
        self.expect_separator(';', "after exit statement")?;
        Ok(Stmt::Exit(expr))
    }

    fn parse_print(&mut self) -> CompileResult<Stmt> {
        self.expect_separator('(', "after `print`")?;

        let t = self.cursor().peek();
        let arg = if t.kind == TokenKind::Str {
            let text = t.text.clone();
            self.index += 1;
            PrintArg::Str(text)
        } else {
            PrintArg::Expr(self.parse_expr()?)
        };

        self.expect_separator(')', "after the print argument")?;
        self.expect_separator(';', "after print statement")?;
        Ok(Stmt::Print(arg))
    }

    fn parse_binding(&mut self, statement: &str) -> CompileResult<(String, Expr)> {
        let name = self.expect_ident(&format!("after `{statement}`"))?;
        self.expect_operator("=", "after the variable name")?;
        let expr = self.parse_expr()?;
        self.expect_separator(';', &format!("after {statement} statement"))?;
        Ok((name, expr))
    }

    fn parse_let(&mut self) -> CompileResult<Stmt> {
        let (name, expr) = self.parse_binding("let")?;
        Ok(Stmt::Let(name, expr))
    }

    fn parse_assign(&mut self) -> CompileResult<Stmt> {
        let (name, expr) = self.parse_binding("assign")?;
        Ok(Stmt::Assign(name, expr))
    }

    fn parse_condition(&mut self, statement: &str) -> CompileResult<Expr> {
        self.expect_separator('(', &format!("after `{statement}`"))?;
        let expr = self.parse_expr()?;
        self.expect_separator(')', &format!("after {statement} condition"))?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> CompileResult<Stmt> {
        let cond = self.parse_condition("if")?;
        let then_block = self.parse_block("after if condition")?;

        let else_block = if self.consume_keyword(Keyword::Else) {
            Some(self.parse_block("after `else`")?)
        } else {
            None
        };

        Ok(Stmt::If(cond, then_block, else_block))
    }

    fn parse_while(&mut self) -> CompileResult<Stmt> {
        let cond = self.parse_condition("while")?;
        let body = self.parse_block("after while condition")?;
        Ok(Stmt::While(cond, body))
    }

    fn parse_call(&mut self) -> CompileResult<Stmt> {
        let name = self.expect_ident("after `call`")?;
        self.expect_separator('(', "after the function name")?;

        let mut args = vec![];
        if !self.consume_separator(')') {
            args.push(self.parse_expr()?);
            while self.consume_separator(',') {
                args.push(self.parse_expr()?);
            }
            self.expect_separator(')', "after the call arguments")?;
        }

        self.expect_separator(';', "after call statement")?;
        Ok(Stmt::Call(name, args))
    }

    fn parse_processor(&mut self) -> CompileResult<Stmt> {
        let name = self.expect_ident("after `processor`")?;
        self.expect_separator('(', "after the processor name")?;

        let mut params = vec![];
        if !self.consume_separator(')') {
            params.push(self.expect_ident("in the parameter list")?);
            while self.consume_separator(',') {
                params.push(self.expect_ident("in the parameter list")?);
            }
            self.expect_separator(')', "after the parameter list")?;
        }

        let body = self.parse_block("after the parameter list")?;
        Ok(Stmt::Processor(name, params, body))
    }
}
