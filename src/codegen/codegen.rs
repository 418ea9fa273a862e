use std::collections::HashSet;

use tracing::{debug, trace, warn};

use crate::{
    error::{CompileError, CompileResult},
    parser::{BinOpKind, Block, Expr, PrintArg, Program, Stmt, UnaryOp},
};

use super::tables::{variable_label, StringTable, Variables};

const ARGUMENT_REGISTERS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];
const SAVED_REGISTERS: [&str; 4] = ["rax", "rbx", "rcx", "rdx"];

const SYS_WRITE: i32 = 1;
const SYS_EXIT: i32 = 60;
const STDOUT: i32 = 1;

/// Operand list for a `db` directive holding `s` followed by a newline.
fn db_operands(s: &str) -> String {
    let mut parts = vec![];
    let mut run = String::new();

    for b in s.bytes() {
        if (b' '..=b'~').contains(&b) && b != b'"' {
            run.push(b as char);
        } else {
            if !run.is_empty() {
                parts.push(format!("\"{}\"", std::mem::take(&mut run)));
            }
            parts.push(b.to_string());
        }
    }
    if !run.is_empty() {
        parts.push(format!("\"{run}\""));
    }
    parts.push("10".to_string());

    parts.join(", ")
}

/// Translates a [`Program`] into NASM x86-64 assembly for Linux.
///
/// The value of every expression ends up in `eax`; `ebx` holds the saved
/// right operand of a binary operation. Variables live in the data section as
/// 32-bit words.
#[derive(Debug, Default)]
pub struct Codegen {
    label_index: usize,
    variables: Variables,
    strings: StringTable,
    externs: Vec<String>,
    declared: HashSet<String>,
    out: String,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn generate(&mut self, program: &Program) -> CompileResult<String> {
        *self = Self::new();

        self.collect(&program.0);
        debug!(
            variables = self.variables.len(),
            externs = self.externs.len(),
            "collected variables"
        );

        self.emit("default rel");
        self.emit("section .text");
        self.emit("global _start");
        for name in self.externs.clone() {
            self.emit(&format!("extern {name}"));
        }
        self.emit("_start:");

        for stmt in &program.0 {
            self.gen_stmt(stmt)?;
        }

        self.emit("");
        self.emit("; program end");
        self.instr(&format!("mov eax, {SYS_EXIT}"));
        self.instr("xor edi, edi");
        self.instr("syscall");

        self.gen_data();
        debug!(
            labels = self.label_index,
            strings = self.strings.len(),
            "generated assembly"
        );

        Ok(std::mem::take(&mut self.out))
    }

    fn emit(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn instr(&mut self, instruction: &str) {
        self.out.push_str("  ");
        self.emit(instruction);
    }

    fn new_label(&mut self, prefix: &str) -> String {
        self.label_index += 1;
        format!("{prefix}_{}", self.label_index)
    }

    /// Walks the whole tree once, recording every `let` binding and every
    /// called function. Emits nothing.
    fn collect(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::Let(name, expr) => {
                    let initial = match expr {
                        Expr::Num(value) => *value,
                        _ => 0,
                    };
                    self.variables.declare(name, initial);
                }
                Stmt::If(_, then_block, else_block) => {
                    self.collect(&then_block.0);
                    if let Some(else_block) = else_block {
                        self.collect(&else_block.0);
                    }
                }
                Stmt::While(_, body) | Stmt::Processor(_, _, body) => self.collect(&body.0),
                Stmt::Call(name, _) => {
                    if !self.externs.contains(name) {
                        self.externs.push(name.clone());
                    }
                }
                Stmt::Exit(_) | Stmt::Print(_) | Stmt::Assign(_, _) => (),
            }
        }
    }

    fn check_declared(&self, name: &str) -> CompileResult<()> {
        if self.declared.contains(name) {
            Ok(())
        } else {
            Err(CompileError::UndeclaredVariable {
                name: name.to_string(),
            })
        }
    }

    fn gen_block(&mut self, block: &Block) -> CompileResult<()> {
        for stmt in &block.0 {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Exit(expr) => {
                self.gen_expr(expr)?;
                self.instr("mov edi, eax ; exit status");
                self.instr(&format!("mov eax, {SYS_EXIT}"));
                self.instr("syscall");
            }
            Stmt::Print(arg) => self.gen_print(arg)?,
            Stmt::Let(name, expr) => {
                self.gen_expr(expr)?;
                self.declared.insert(name.clone());
                self.gen_store(name);
            }
            Stmt::Assign(name, expr) => {
                self.check_declared(name)?;
                self.gen_expr(expr)?;
                self.gen_store(name);
            }
            Stmt::If(expr, then_block, else_block) => {
                self.gen_if(expr, then_block, else_block.as_ref())?
            }
            Stmt::While(expr, body) => self.gen_while(expr, body)?,
            Stmt::Call(name, args) => self.gen_call(name, args)?,
            Stmt::Processor(name, _, _) => {
                warn!(%name, "processor definitions produce no code; skipping");
            }
        };
        Ok(())
    }

    fn gen_store(&mut self, name: &str) {
        self.instr(&format!("mov [{}], eax", variable_label(name)));
    }

    fn gen_print(&mut self, arg: &PrintArg) -> CompileResult<()> {
        match arg {
            PrintArg::Str(s) => {
                let label = self.strings.register(s);
                debug!(%label, "registered string literal");

                self.emit("");
                self.emit(&format!("; print {label}"));
                self.instr(&format!("mov eax, {SYS_WRITE}"));
                self.instr(&format!("mov edi, {STDOUT}"));
                self.instr(&format!("lea rsi, [{label}]"));
                self.instr(&format!("mov edx, {}", s.len() + 1));
                self.instr("syscall");
            }
            PrintArg::Expr(expr) => {
                self.gen_expr(expr)?;
                warn!("printing a numeric value is not supported; no output is produced");
                self.instr("; print of a numeric value is not implemented");
            }
        }
        Ok(())
    }

    fn gen_if(
        &mut self,
        expr: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> CompileResult<()> {
        let else_label = self.new_label("else");
        let end_label = self.new_label("end");

        self.gen_expr(expr)?;
        self.instr("cmp eax, 0");
        self.instr(&format!("je {else_label}"));
        self.gen_block(then_block)?;
        self.instr(&format!("jmp {end_label}"));
        self.emit(&format!("{else_label}:"));
        if let Some(else_block) = else_block {
            self.gen_block(else_block)?;
        }
        self.emit(&format!("{end_label}:"));
        Ok(())
    }

    fn gen_while(&mut self, expr: &Expr, body: &Block) -> CompileResult<()> {
        let begin_label = self.new_label("while");
        let end_label = self.new_label("end");

        self.emit(&format!("{begin_label}:"));
        self.gen_expr(expr)?;
        self.instr("cmp eax, 0");
        self.instr(&format!("je {end_label}"));
        self.gen_block(body)?;
        self.instr(&format!("jmp {begin_label}"));
        self.emit(&format!("{end_label}:"));
        Ok(())
    }

    fn gen_call(&mut self, name: &str, args: &[Expr]) -> CompileResult<()> {
        for reg in SAVED_REGISTERS {
            self.instr(&format!("push {reg}"));
        }

        for arg in args.iter().rev() {
            self.gen_expr(arg)?;
            self.instr("push rax");
        }
        for reg in ARGUMENT_REGISTERS.iter().take(args.len()) {
            self.instr(&format!("pop {reg}"));
        }

        self.instr(&format!("call {name}"));
        let stack_args = args.len().saturating_sub(ARGUMENT_REGISTERS.len());
        if stack_args > 0 {
            self.instr(&format!("add rsp, {}", stack_args * 8));
        }

        for reg in SAVED_REGISTERS.iter().rev() {
            self.instr(&format!("pop {reg}"));
        }
        Ok(())
    }

    fn gen_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::Num(value) => self.instr(&format!("mov eax, {value}")),
            Expr::Bool(value) => self.instr(&format!("mov eax, {}", i32::from(*value))),
            Expr::Ident(name) => {
                self.check_declared(name)?;
                self.instr(&format!("mov eax, [{}]", variable_label(name)));
            }
            Expr::Unary(UnaryOp::Neg, operand) => {
                self.gen_expr(operand)?;
                self.instr("neg eax");
            }
            Expr::Unary(UnaryOp::Not, operand) => {
                self.gen_expr(operand)?;
                self.emit("  test eax, eax\n  sete al\n  movzx eax, al");
            }
            Expr::Binary(kind, lhs, rhs) => {
                let combine = match kind {
                    BinOpKind::Add => "  add eax, ebx",
                    BinOpKind::Sub => "  sub eax, ebx",
                    BinOpKind::Mul => "  imul eax, ebx",
                    BinOpKind::Div => "  cdq\n  idiv ebx",
                    BinOpKind::Equal => "  cmp eax, ebx\n  sete al\n  movzx eax, al",
                    BinOpKind::NotEqual => "  cmp eax, ebx\n  setne al\n  movzx eax, al",
                    BinOpKind::LessThan => "  cmp eax, ebx\n  setl al\n  movzx eax, al",
                    BinOpKind::LessEqual => "  cmp eax, ebx\n  setle al\n  movzx eax, al",
                    BinOpKind::GreaterThan => "  cmp eax, ebx\n  setg al\n  movzx eax, al",
                    BinOpKind::GreaterEqual => "  cmp eax, ebx\n  setge al\n  movzx eax, al",
                    BinOpKind::LogicalAnd => {
                        "  test eax, eax\n  setne al\n  test ebx, ebx\n  setne bl\n  and al, bl\n  movzx eax, al"
                    }
                    BinOpKind::LogicalOr => {
                        "  test eax, eax\n  setne al\n  test ebx, ebx\n  setne bl\n  or al, bl\n  movzx eax, al"
                    }
                };
                trace!(op = kind.symbol(), "binary operation");
                self.gen_binop(lhs, rhs, combine)?;
            }
        }
        Ok(())
    }

    /// Right operand first, parked on the stack while the left one is
    /// computed, then `combine` runs with left in `eax` and right in `ebx`.
    fn gen_binop(&mut self, lhs: &Expr, rhs: &Expr, combine: &str) -> CompileResult<()> {
        self.gen_expr(rhs)?;
        self.instr("push rax");
        self.gen_expr(lhs)?;
        self.instr("pop rbx");
        self.emit(combine);
        Ok(())
    }

    fn gen_data(&mut self) {
        self.emit("");
        self.emit("section .data");

        let strings: Vec<_> = self
            .strings
            .iter()
            .map(|(label, s)| format!("{label}: db {}", db_operands(s)))
            .collect();
        let variables: Vec<_> = self
            .variables
            .iter()
            .map(|(name, value)| format!("{}: dd {value}", variable_label(name)))
            .collect();

        for line in strings.iter().chain(&variables) {
            self.emit(line);
        }
    }
}
