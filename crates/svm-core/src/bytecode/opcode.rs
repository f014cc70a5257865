//! Bytecode Opcode Definitions
//!
//! Defines the closed opcode set of the stack VM.
//! This file contains no execution semantics.
//! Opcode byte values are part of the chunk image format and must not change.

use std::fmt;

/// Bytecode opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Stack operations
    Push = 0x01,
    Pop  = 0x02,
    Dup  = 0x03,
    Swap = 0x04,

    // Arithmetic
    Add = 0x10,
    Sub = 0x11,
    Mul = 0x12,
    Div = 0x13,
    Mod = 0x14,
    Neg = 0x15,

    // Comparison
    Eq = 0x20,
    Ne = 0x21,
    Lt = 0x22,
    Le = 0x23,
    Gt = 0x24,
    Ge = 0x25,

    // Logical
    And = 0x28,
    Or  = 0x29,
    Not = 0x2A,

    // Memory
    Load        = 0x30,
    Store       = 0x31,
    LoadGlobal  = 0x32,
    StoreGlobal = 0x33,

    // Control flow
    Jmp        = 0x40,
    JmpIfFalse = 0x41,
    JmpIfTrue  = 0x42,
    Call       = 0x43,
    Ret        = 0x44,

    // Objects
    NewArray = 0x50,
    ArrayGet = 0x51,
    ArraySet = 0x52,
    ArrayLen = 0x53,

    // System
    Print = 0xE0,
    Nop   = 0xF0,
    Halt  = 0xFF,
}

impl OpCode {
    /// Every opcode, in byte order.
    pub const ALL: [OpCode; 35] = [
        OpCode::Push,
        OpCode::Pop,
        OpCode::Dup,
        OpCode::Swap,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Mod,
        OpCode::Neg,
        OpCode::Eq,
        OpCode::Ne,
        OpCode::Lt,
        OpCode::Le,
        OpCode::Gt,
        OpCode::Ge,
        OpCode::And,
        OpCode::Or,
        OpCode::Not,
        OpCode::Load,
        OpCode::Store,
        OpCode::LoadGlobal,
        OpCode::StoreGlobal,
        OpCode::Jmp,
        OpCode::JmpIfFalse,
        OpCode::JmpIfTrue,
        OpCode::Call,
        OpCode::Ret,
        OpCode::NewArray,
        OpCode::ArrayGet,
        OpCode::ArraySet,
        OpCode::ArrayLen,
        OpCode::Print,
        OpCode::Nop,
        OpCode::Halt,
    ];

    /// Convert raw byte to opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(OpCode::Push),
            0x02 => Some(OpCode::Pop),
            0x03 => Some(OpCode::Dup),
            0x04 => Some(OpCode::Swap),

            0x10 => Some(OpCode::Add),
            0x11 => Some(OpCode::Sub),
            0x12 => Some(OpCode::Mul),
            0x13 => Some(OpCode::Div),
            0x14 => Some(OpCode::Mod),
            0x15 => Some(OpCode::Neg),

            0x20 => Some(OpCode::Eq),
            0x21 => Some(OpCode::Ne),
            0x22 => Some(OpCode::Lt),
            0x23 => Some(OpCode::Le),
            0x24 => Some(OpCode::Gt),
            0x25 => Some(OpCode::Ge),

            0x28 => Some(OpCode::And),
            0x29 => Some(OpCode::Or),
            0x2A => Some(OpCode::Not),

            0x30 => Some(OpCode::Load),
            0x31 => Some(OpCode::Store),
            0x32 => Some(OpCode::LoadGlobal),
            0x33 => Some(OpCode::StoreGlobal),

            0x40 => Some(OpCode::Jmp),
            0x41 => Some(OpCode::JmpIfFalse),
            0x42 => Some(OpCode::JmpIfTrue),
            0x43 => Some(OpCode::Call),
            0x44 => Some(OpCode::Ret),

            0x50 => Some(OpCode::NewArray),
            0x51 => Some(OpCode::ArrayGet),
            0x52 => Some(OpCode::ArraySet),
            0x53 => Some(OpCode::ArrayLen),

            0xE0 => Some(OpCode::Print),
            0xF0 => Some(OpCode::Nop),
            0xFF => Some(OpCode::Halt),

            _ => None,
        }
    }

    /// Assembly mnemonic, as accepted by the text front-end.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Push => "PUSH",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Swap => "SWAP",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Neg => "NEG",
            OpCode::Eq => "EQ",
            OpCode::Ne => "NE",
            OpCode::Lt => "LT",
            OpCode::Le => "LE",
            OpCode::Gt => "GT",
            OpCode::Ge => "GE",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Not => "NOT",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::LoadGlobal => "LOAD_GLOBAL",
            OpCode::StoreGlobal => "STORE_GLOBAL",
            OpCode::Jmp => "JMP",
            OpCode::JmpIfFalse => "JMP_IF_FALSE",
            OpCode::JmpIfTrue => "JMP_IF_TRUE",
            OpCode::Call => "CALL",
            OpCode::Ret => "RET",
            OpCode::NewArray => "NEW_ARRAY",
            OpCode::ArrayGet => "ARRAY_GET",
            OpCode::ArraySet => "ARRAY_SET",
            OpCode::ArrayLen => "ARRAY_LEN",
            OpCode::Print => "PRINT",
            OpCode::Nop => "NOP",
            OpCode::Halt => "HALT",
        }
    }

    /// Look up an opcode by mnemonic, ignoring ASCII case.
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        OpCode::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }

    /// Whether the instruction's operand carries meaning for this opcode.
    pub fn has_operand(self) -> bool {
        matches!(
            self,
            OpCode::Push
                | OpCode::Load
                | OpCode::Store
                | OpCode::LoadGlobal
                | OpCode::StoreGlobal
                | OpCode::Jmp
                | OpCode::JmpIfFalse
                | OpCode::JmpIfTrue
                | OpCode::Call
                | OpCode::NewArray
        )
    }

    /// Whether the operand is an absolute instruction index.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            OpCode::Jmp | OpCode::JmpIfFalse | OpCode::JmpIfTrue | OpCode::Call
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_values_decode_back() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_u8(op as u8), Some(op));
        }
        assert_eq!(OpCode::from_u8(0x00), None);
        assert_eq!(OpCode::from_u8(0x99), None);
    }

    #[test]
    fn mnemonic_lookup_is_case_insensitive() {
        assert_eq!(OpCode::from_mnemonic("jmp_if_false"), Some(OpCode::JmpIfFalse));
        assert_eq!(OpCode::from_mnemonic("ARRAY_LEN"), Some(OpCode::ArrayLen));
        assert_eq!(OpCode::from_mnemonic("jump"), None);
    }
}
