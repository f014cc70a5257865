//! Bytecode Chunk
//!
//! A chunk is the unit handed to the VM: an instruction sequence, a
//! constant pool and a per-instruction source line table. The line table
//! always has exactly one entry per instruction.

use super::instruction::Instruction;

/// Constant pool entry.
///
/// Chunks are built before any heap exists, so string constants are kept
/// as plain text here and turned into heap objects when pushed.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(Box<str>),
}

/// A compiled program
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    code: Vec<Instruction>,
    constants: Vec<Constant>,
    lines: Vec<u32>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction and its source line.
    pub fn write(&mut self, instruction: Instruction, line: u32) {
        self.code.push(instruction);
        self.lines.push(line);
    }

    /// Append a constant and return its index. Indices are never reused.
    pub fn add_constant(&mut self, value: Constant) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Overwrite the operand of an already written instruction.
    ///
    /// Only the assembler patches operands, and only before the chunk is
    /// handed out.
    pub(crate) fn patch_operand(&mut self, index: usize, operand: i32) -> bool {
        match self.code.get_mut(index) {
            Some(instr) => {
                instr.operand = operand;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.code.get(index)
    }

    pub fn line(&self, index: usize) -> Option<u32> {
        self.lines.get(index).copied()
    }

    pub fn constant(&self, index: usize) -> Option<&Constant> {
        self.constants.get(index)
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn lines(&self) -> &[u32] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;

    #[test]
    fn code_and_lines_stay_in_lock_step() {
        let mut chunk = Chunk::new();
        chunk.write(Instruction::with_operand(OpCode::Push, 0), 1);
        chunk.write(Instruction::new(OpCode::Print), 1);
        chunk.write(Instruction::new(OpCode::Halt), 2);

        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.lines().len(), chunk.code().len());
        assert_eq!(chunk.line(2), Some(2));
        assert_eq!(chunk.line(3), None);
    }

    #[test]
    fn constant_indices_are_stable() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Constant::Int(10)), 0);
        assert_eq!(chunk.add_constant(Constant::Int(10)), 1);
        assert_eq!(chunk.add_constant(Constant::Str("hi".into())), 2);
        assert_eq!(chunk.constant(0), Some(&Constant::Int(10)));
        assert_eq!(chunk.constant(2), Some(&Constant::Str("hi".into())));
    }

    #[test]
    fn patch_only_touches_existing_instructions() {
        let mut chunk = Chunk::new();
        chunk.write(Instruction::with_operand(OpCode::Jmp, 0), 1);
        assert!(chunk.patch_operand(0, 7));
        assert!(!chunk.patch_operand(1, 7));
        assert_eq!(chunk.instruction(0).map(|i| i.operand), Some(7));
    }
}
