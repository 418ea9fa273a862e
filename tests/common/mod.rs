//! A tiny interpreter for the x86-64 subset the code generator emits, so tests
//! can check what a compiled program does instead of how it is spelled.

#![allow(dead_code)]

use std::collections::HashMap;

const STEP_LIMIT: usize = 100_000;
const STRING_BASE: u64 = 0x1000_0000;

#[derive(Debug)]
pub struct Call {
    pub name: String,
    /// rdi, rsi, rdx, rcx, r8, r9 at the call, as 32-bit values.
    pub registers: [i32; 6],
    /// Stack slots from the top down at the call.
    pub stack: Vec<i32>,
}

#[derive(Debug)]
pub struct Outcome {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub variables: HashMap<String, i32>,
    pub calls: Vec<Call>,
}

impl Outcome {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn var(&self, name: &str) -> i32 {
        *self
            .variables
            .get(&format!("var_{name}"))
            .unwrap_or_else(|| panic!("no variable {name}"))
    }
}

pub fn compile(src: &str) -> String {
    tinyc::compile(src).unwrap_or_else(|e| panic!("compilation failed: {e}"))
}

pub fn run(src: &str) -> Outcome {
    run_asm(&compile(src))
}

#[derive(Clone, Copy, PartialEq)]
enum Width {
    Byte,
    Dword,
    Qword,
}

fn register(name: &str) -> Option<(usize, Width)> {
    let r = match name {
        "rax" => (0, Width::Qword),
        "eax" => (0, Width::Dword),
        "al" => (0, Width::Byte),
        "rbx" => (1, Width::Qword),
        "ebx" => (1, Width::Dword),
        "bl" => (1, Width::Byte),
        "rcx" => (2, Width::Qword),
        "ecx" => (2, Width::Dword),
        "rdx" => (3, Width::Qword),
        "edx" => (3, Width::Dword),
        "rdi" => (4, Width::Qword),
        "edi" => (4, Width::Dword),
        "rsi" => (5, Width::Qword),
        "esi" => (5, Width::Dword),
        "r8" => (6, Width::Qword),
        "r9" => (7, Width::Qword),
        _ => return None,
    };
    Some(r)
}

struct Instr {
    op: String,
    args: Vec<String>,
}

struct Machine {
    regs: [u64; 8],
    stack: Vec<u64>,
    flags: (i64, i64),
    memory: HashMap<String, i32>,
    strings: Vec<(String, Vec<u8>)>,
    stdout: Vec<u8>,
    calls: Vec<Call>,
}

impl Machine {
    fn read(&self, operand: &str) -> u64 {
        if let Some((i, width)) = register(operand) {
            return match width {
                Width::Qword => self.regs[i],
                Width::Dword => self.regs[i] & 0xffff_ffff,
                Width::Byte => self.regs[i] & 0xff,
            };
        }
        if let Some(label) = operand.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let value = self
                .memory
                .get(label)
                .unwrap_or_else(|| panic!("unknown memory label {label}"));
            return *value as u32 as u64;
        }
        operand
            .parse::<i64>()
            .unwrap_or_else(|_| panic!("bad operand {operand}")) as u64
    }

    /// Reads a 32-bit operand as a signed value.
    fn read_i32(&self, operand: &str) -> i32 {
        self.read(operand) as u32 as i32
    }

    fn write(&mut self, operand: &str, value: u64) {
        if let Some((i, width)) = register(operand) {
            self.regs[i] = match width {
                Width::Qword => value,
                Width::Dword => value & 0xffff_ffff,
                Width::Byte => (self.regs[i] & !0xff) | (value & 0xff),
            };
            return;
        }
        if let Some(label) = operand.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            assert!(self.memory.contains_key(label), "store to unknown label {label}");
            self.memory.insert(label.to_string(), value as u32 as i32);
            return;
        }
        panic!("cannot write to {operand}");
    }

    fn condition(&self, op: &str) -> bool {
        let (a, b) = self.flags;
        match op {
            "sete" | "je" => a == b,
            "setne" => a != b,
            "setl" => a < b,
            "setle" => a <= b,
            "setg" => a > b,
            "setge" => a >= b,
            _ => panic!("unknown condition {op}"),
        }
    }
}

fn parse_db(operands: &str) -> Vec<u8> {
    let mut bytes = vec![];
    let mut chars = operands.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    bytes.push(c as u8);
                }
            }
            c if c.is_ascii_digit() => {
                let mut n = c.to_string();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    n.push(*d);
                    chars.next();
                }
                bytes.push(n.parse().unwrap());
            }
            _ => (),
        }
    }
    bytes
}

pub fn run_asm(asm: &str) -> Outcome {
    let mut program = vec![];
    let mut labels = HashMap::new();
    let mut memory = HashMap::new();
    let mut strings = vec![];
    let mut in_data = false;

    for raw in asm.lines() {
        if in_data {
            let Some((label, rest)) = raw.split_once(':') else {
                continue;
            };
            let rest = rest.trim();
            if let Some(value) = rest.strip_prefix("dd ") {
                memory.insert(label.to_string(), value.trim().parse().unwrap());
            } else if let Some(operands) = rest.strip_prefix("db ") {
                strings.push((label.to_string(), parse_db(operands)));
            }
            continue;
        }

        let line = raw.split(';').next().unwrap().trim();
        if line.is_empty() {
            continue;
        }
        if line == "section .data" {
            in_data = true;
            continue;
        }
        if line.starts_with("default")
            || line.starts_with("section")
            || line.starts_with("global")
            || line.starts_with("extern")
        {
            continue;
        }
        if let Some(label) = line.strip_suffix(':') {
            labels.insert(label.to_string(), program.len());
            continue;
        }

        let (op, rest) = line.split_once(' ').unwrap_or((line, ""));
        let args = rest
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        program.push(Instr {
            op: op.to_string(),
            args,
        });
    }

    let mut m = Machine {
        regs: [0; 8],
        stack: vec![],
        flags: (0, 0),
        memory,
        strings,
        stdout: vec![],
        calls: vec![],
    };

    let mut pc = 0;
    for _ in 0..STEP_LIMIT {
        let instr = program
            .get(pc)
            .unwrap_or_else(|| panic!("ran past the end of the program"));
        pc += 1;
        let a = instr.args.first().map(String::as_str).unwrap_or("");
        let b = instr.args.get(1).map(String::as_str).unwrap_or("");

        match instr.op.as_str() {
            "mov" => {
                let v = m.read(b);
                m.write(a, v);
            }
            "movzx" => {
                let v = m.read(b);
                m.write(a, v);
            }
            "lea" => {
                let label = b.trim_start_matches('[').trim_end_matches(']');
                let id = m
                    .strings
                    .iter()
                    .position(|(l, _)| l == label)
                    .unwrap_or_else(|| panic!("unknown string label {label}"));
                m.write(a, STRING_BASE + id as u64);
            }
            "push" => {
                let v = m.read(a);
                m.stack.push(v);
            }
            "pop" => {
                let v = m.stack.pop().expect("pop from empty stack");
                m.write(a, v);
            }
            "add" if a == "rsp" => {
                let slots = b.parse::<usize>().unwrap() / 8;
                for _ in 0..slots {
                    m.stack.pop().expect("stack underflow");
                }
            }
            "add" | "sub" | "imul" => {
                let (x, y) = (m.read_i32(a), m.read_i32(b));
                let r = match instr.op.as_str() {
                    "add" => x.wrapping_add(y),
                    "sub" => x.wrapping_sub(y),
                    _ => x.wrapping_mul(y),
                };
                m.write(a, r as u32 as u64);
            }
            "and" | "or" | "xor" => {
                let (x, y) = (m.read(a), m.read(b));
                let r = match instr.op.as_str() {
                    "and" => x & y,
                    "or" => x | y,
                    _ => x ^ y,
                };
                m.write(a, r);
            }
            "neg" => {
                let r = m.read_i32(a).wrapping_neg();
                m.write(a, r as u32 as u64);
            }
            "cdq" => {
                let sign = if m.read_i32("eax") < 0 { 0xffff_ffff } else { 0 };
                m.write("edx", sign);
            }
            "idiv" => {
                let dividend = ((m.read("edx") << 32) | m.read("eax")) as i64;
                let divisor = m.read_i32(a) as i64;
                assert!(divisor != 0, "division by zero");
                m.write("eax", (dividend / divisor) as i32 as u32 as u64);
                m.write("edx", (dividend % divisor) as i32 as u32 as u64);
            }
            "cmp" => m.flags = (m.read_i32(a) as i64, m.read_i32(b) as i64),
            "test" => m.flags = ((m.read(a) & m.read(b)) as i64, 0),
            "sete" | "setne" | "setl" | "setle" | "setg" | "setge" => {
                let v = m.condition(&instr.op) as u64;
                m.write(a, v);
            }
            "je" => {
                if m.condition("je") {
                    pc = labels[a];
                }
            }
            "jmp" => pc = labels[a],
            "call" => {
                let registers = [4, 5, 3, 2, 6, 7].map(|i| m.regs[i] as u32 as i32);
                let stack = m.stack.iter().rev().map(|&v| v as u32 as i32).collect();
                m.calls.push(Call {
                    name: a.to_string(),
                    registers,
                    stack,
                });
            }
            "syscall" => match m.read("rax") {
                1 => {
                    let id = (m.read("rsi") - STRING_BASE) as usize;
                    let len = m.read("rdx") as usize;
                    let bytes = m.strings[id].1[..len].to_vec();
                    m.stdout.extend(bytes);
                }
                60 => {
                    return Outcome {
                        exit_code: m.read_i32("edi"),
                        stdout: m.stdout,
                        variables: m.memory,
                        calls: m.calls,
                    };
                }
                n => panic!("unsupported syscall {n}"),
            },
            op => panic!("unsupported instruction {op}"),
        }
    }

    panic!("step limit exceeded");
}
