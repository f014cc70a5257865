//! Bytecode Instruction Representation
//!
//! An instruction is a raw opcode byte plus a signed 32-bit operand.
//! The byte is decoded at dispatch time, so an instruction stream loaded
//! from outside the assembler may carry bytes the VM does not know.

use std::fmt;

use super::opcode::OpCode;

/// Raw bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub operand: i32,
}

impl Instruction {
    /// Create an instruction with no operand
    pub fn new(opcode: OpCode) -> Self {
        Instruction {
            opcode: opcode as u8,
            operand: 0,
        }
    }

    /// Create an instruction with a single operand
    pub fn with_operand(opcode: OpCode, operand: i32) -> Self {
        Instruction {
            opcode: opcode as u8,
            operand,
        }
    }

    /// Create an instruction from an undecoded opcode byte
    pub fn raw(opcode: u8, operand: i32) -> Self {
        Instruction { opcode, operand }
    }

    /// Decode the opcode byte
    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_u8(self.opcode)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Some(op) if op.has_operand() => write!(f, "{} {}", op, self.operand),
            Some(op) => write!(f, "{}", op),
            None => write!(f, "<0x{:02X}> {}", self.opcode, self.operand),
        }
    }
}
