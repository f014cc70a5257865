//! Chunk Builder
//!
//! Emits instructions into a `Chunk`, records label addresses and
//! back-patches branch operands once every label is known.

use std::collections::HashMap;

use crate::bytecode::{Chunk, Constant, Instruction, OpCode};
use crate::error::{SvmError, SvmResult};

/// Label-aware chunk builder
#[derive(Debug)]
pub struct Assembler {
    chunk: Chunk,
    labels: HashMap<String, usize>,
    // (instruction index, label name, referencing line) awaiting resolution
    unresolved: Vec<(usize, String, u32)>,
    line: u32,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            chunk: Chunk::new(),
            labels: HashMap::new(),
            unresolved: Vec::new(),
            line: 1,
        }
    }

    /// Bind `name` to the address of the next instruction.
    pub fn label(&mut self, name: &str) -> SvmResult<()> {
        if self.labels.contains_key(name) {
            return Err(SvmError::DuplicateLabel {
                name: name.to_string(),
                line: self.line,
            });
        }
        self.labels.insert(name.to_string(), self.current_address());
        Ok(())
    }

    /// Address a label was bound to, if it has been defined yet.
    pub fn label_address(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Index the next emitted instruction will get.
    pub fn current_address(&self) -> usize {
        self.chunk.len()
    }

    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    pub fn next_line(&mut self) {
        self.line += 1;
    }

    pub fn op(&mut self, opcode: OpCode) {
        self.chunk.write(Instruction::new(opcode), self.line);
    }

    pub fn emit(&mut self, opcode: OpCode, operand: i32) {
        self.chunk.write(Instruction::with_operand(opcode, operand), self.line);
    }

    /// Add `constant` to the pool and emit a PUSH of it.
    pub fn push_constant(&mut self, constant: Constant) {
        let index = self.chunk.add_constant(constant);
        // Constant pools past i32::MAX entries are not addressable; PUSH then ignores the operand.
        self.emit(OpCode::Push, i32::try_from(index).unwrap_or(-1));
    }

    pub fn push(&mut self, value: i64) {
        self.push_constant(Constant::Int(value));
    }

    pub fn push_double(&mut self, value: f64) {
        self.push_constant(Constant::Double(value));
    }

    pub fn push_bool(&mut self, value: bool) {
        self.push_constant(Constant::Bool(value));
    }

    pub fn push_nil(&mut self) {
        self.push_constant(Constant::Nil);
    }

    pub fn push_str(&mut self, text: &str) {
        self.push_constant(Constant::Str(text.into()));
    }

    /// Emit `opcode` with a placeholder target to be patched with `label`'s address.
    pub fn branch(&mut self, opcode: OpCode, label: &str) {
        self.unresolved
            .push((self.current_address(), label.to_string(), self.line));
        self.emit(opcode, 0);
    }

    pub fn jump(&mut self, label: &str) {
        self.branch(OpCode::Jmp, label);
    }

    pub fn jump_if_false(&mut self, label: &str) {
        self.branch(OpCode::JmpIfFalse, label);
    }

    pub fn jump_if_true(&mut self, label: &str) {
        self.branch(OpCode::JmpIfTrue, label);
    }

    pub fn call(&mut self, label: &str) {
        self.branch(OpCode::Call, label);
    }

    pub fn load_global(&mut self, index: i32) {
        self.emit(OpCode::LoadGlobal, index);
    }

    pub fn store_global(&mut self, index: i32) {
        self.emit(OpCode::StoreGlobal, index);
    }

    pub fn load(&mut self, index: i32) {
        self.emit(OpCode::Load, index);
    }

    pub fn store(&mut self, index: i32) {
        self.emit(OpCode::Store, index);
    }

    pub fn new_array(&mut self, size: i32) {
        self.emit(OpCode::NewArray, size);
    }

    /// Patch every pending branch and hand out the finished chunk.
    pub fn resolve(mut self) -> SvmResult<Chunk> {
        for (index, name, line) in std::mem::take(&mut self.unresolved) {
            let address = self
                .labels
                .get(&name)
                .copied()
                .ok_or(SvmError::UndefinedLabel { name, line })?;
            let operand = i32::try_from(address).map_err(|_| SvmError::InvalidJumpTarget(i32::MAX))?;
            self.chunk.patch_operand(index, operand);
        }
        Ok(self.chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_jump_is_patched_to_label_address() {
        let mut asm = Assembler::new();
        asm.push(1);
        asm.jump_if_false("else");
        asm.push(10);
        asm.op(OpCode::Print);
        asm.op(OpCode::Halt);
        assert_eq!(asm.current_address(), 5);
        asm.label("else").expect("label failed");
        asm.push(20);
        asm.op(OpCode::Print);

        assert_eq!(asm.label_address("else"), Some(5));
        assert_eq!(asm.current_address(), 7);
        let chunk = asm.resolve().expect("resolve failed");
        let branch = chunk.instruction(1).expect("missing branch");
        assert_eq!(branch.op(), Some(OpCode::JmpIfFalse));
        assert_eq!(branch.operand, 5);
    }

    #[test]
    fn backward_jump_and_call() {
        let mut asm = Assembler::new();
        asm.label("top").expect("label failed");
        asm.op(OpCode::Nop);
        asm.call("sub");
        asm.jump("top");
        asm.label("sub").expect("label failed");
        asm.op(OpCode::Ret);

        let chunk = asm.resolve().expect("resolve failed");
        assert_eq!(chunk.instruction(1).map(|i| i.operand), Some(3));
        assert_eq!(chunk.instruction(2).map(|i| i.operand), Some(0));
    }

    #[test]
    fn undefined_label_is_a_build_error() {
        let mut asm = Assembler::new();
        asm.jump("nowhere");
        match asm.resolve() {
            Err(SvmError::UndefinedLabel { name, line }) => {
                assert_eq!(name, "nowhere");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut asm = Assembler::new();
        asm.label("again").expect("label failed");
        asm.op(OpCode::Nop);
        asm.next_line();
        let err = asm.label("again").expect_err("duplicate accepted");
        assert_eq!(
            err,
            SvmError::DuplicateLabel {
                name: "again".to_string(),
                line: 2,
            }
        );
        assert!(err.is_build_error());
        assert_eq!(asm.label_address("again"), Some(0));
    }

    #[test]
    fn lines_follow_the_builder() {
        let mut asm = Assembler::new();
        asm.push(1);
        asm.next_line();
        asm.op(OpCode::Print);
        asm.set_line(9);
        asm.op(OpCode::Halt);

        let chunk = asm.resolve().expect("resolve failed");
        assert_eq!(chunk.lines(), &[1, 2, 9]);
    }
}
