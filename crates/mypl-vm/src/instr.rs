use std::fmt;

use crate::value::VMValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Push,
    Pop,
    Load,
    Store,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Not,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    Jmp,
    Jmpf,
    Call,
    Ret,
    Write,
    Read,
    Slen,
    Alen,
    Getc,
    ToInt,
    ToDbl,
    ToStr,
    Concat,
    Allocs,
    Alloca,
    Addf,
    Setf,
    Getf,
    Seti,
    Geti,
    Dup,
    Nop,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::Push => "PUSH",
            OpCode::Pop => "POP",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Not => "NOT",
            OpCode::CmpEq => "CMPEQ",
            OpCode::CmpNe => "CMPNE",
            OpCode::CmpLt => "CMPLT",
            OpCode::CmpLe => "CMPLE",
            OpCode::CmpGt => "CMPGT",
            OpCode::CmpGe => "CMPGE",
            OpCode::Jmp => "JMP",
            OpCode::Jmpf => "JMPF",
            OpCode::Call => "CALL",
            OpCode::Ret => "RET",
            OpCode::Write => "WRITE",
            OpCode::Read => "READ",
            OpCode::Slen => "SLEN",
            OpCode::Alen => "ALEN",
            OpCode::Getc => "GETC",
            OpCode::ToInt => "TOINT",
            OpCode::ToDbl => "TODBL",
            OpCode::ToStr => "TOSTR",
            OpCode::Concat => "CONCAT",
            OpCode::Allocs => "ALLOCS",
            OpCode::Alloca => "ALLOCA",
            OpCode::Addf => "ADDF",
            OpCode::Setf => "SETF",
            OpCode::Getf => "GETF",
            OpCode::Seti => "SETI",
            OpCode::Geti => "GETI",
            OpCode::Dup => "DUP",
            OpCode::Nop => "NOP",
        };
        write!(f, "{name}")
    }
}

/// The operand carried by an instruction, if any. `Int` covers slot
/// indices and jump targets, `Name` covers function/field names, and
/// `Value` covers `PUSH` literals.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Int(i64),
    Name(String),
    Value(VMValue),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int(i) => write!(f, " {i}"),
            Operand::Name(n) => write!(f, " {n}"),
            Operand::Value(v) => write!(f, " {}", v.to_display_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VMInstr {
    pub op: OpCode,
    pub operand: Operand,
}

impl VMInstr {
    pub fn new(op: OpCode, operand: Operand) -> Self {
        VMInstr { op, operand }
    }

    pub fn bare(op: OpCode) -> Self {
        VMInstr { op, operand: Operand::None }
    }
}

impl fmt::Display for VMInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.operand)
    }
}

/// The static, reusable record for one function: name, declared arity,
/// and its lowered instruction sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct VMFrameInfo {
    pub function_name: String,
    pub arg_count: usize,
    pub instructions: Vec<VMInstr>,
}

impl fmt::Display for VMFrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frame '{}'", self.function_name)?;
        for (i, instr) in self.instructions.iter().enumerate() {
            writeln!(f, "  {i}: {instr}")?;
        }
        Ok(())
    }
}
