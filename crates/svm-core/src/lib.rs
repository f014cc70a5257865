//! SVM - Stack Virtual Machine Core Library
//!
//! Public API surface: the value and object model, the mark-and-sweep
//! heap, bytecode chunks, the assembler and the execution engine.

pub mod error;
pub mod config;
pub mod bytecode;
pub mod gc;
pub mod vm;
pub mod assembler;
pub mod loader;

// Re-export commonly used types
pub use error::{SvmError, SvmResult};
pub use config::VmConfig;
pub use bytecode::{Chunk, Constant, Instruction, OpCode};
pub use gc::{CollectStats, Heap, ObjRef};
pub use vm::{Fault, Value, VirtualMachine, VmState};
pub use assembler::{assemble_source, Assembler};
pub use loader::{ChunkLoader, ChunkWriter};

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_of(constants: Vec<Constant>, code: Vec<Instruction>) -> Chunk {
        let mut chunk = Chunk::new();
        for c in constants {
            chunk.add_constant(c);
        }
        for (line, instr) in code.into_iter().enumerate() {
            chunk.write(instr, line as u32 + 1);
        }
        chunk
    }

    fn run(chunk: &Chunk) -> (bool, VirtualMachine<Vec<u8>>) {
        let mut vm = VirtualMachine::with_output(VmConfig::new(), Vec::new());
        let ok = vm.execute(chunk);
        (ok, vm)
    }

    #[test]
    fn store_global_peeks() {
        let chunk = chunk_of(
            vec![Constant::Int(42)],
            vec![
                Instruction::with_operand(OpCode::Push, 0),
                Instruction::with_operand(OpCode::StoreGlobal, 3),
                Instruction::new(OpCode::Halt),
            ],
        );

        let (ok, vm) = run(&chunk);
        assert!(ok);
        assert_eq!(vm.state(), VmState::Halted);
        assert_eq!(vm.global(3), Some(Value::Int(42)));
        assert_eq!(vm.stack(), &[Value::Int(42)]);
    }

    #[test]
    fn push_out_of_range_constant_is_ignored() {
        let chunk = chunk_of(
            vec![Constant::Int(1)],
            vec![
                Instruction::with_operand(OpCode::Push, 5),
                Instruction::with_operand(OpCode::Push, -1),
                Instruction::with_operand(OpCode::Push, 0),
            ],
        );

        let (ok, vm) = run(&chunk);
        assert!(ok);
        assert_eq!(vm.stack(), &[Value::Int(1)]);
    }

    #[test]
    fn string_constant_prints_raw() {
        let chunk = chunk_of(
            vec![Constant::Str("hello, vm".into())],
            vec![
                Instruction::with_operand(OpCode::Push, 0),
                Instruction::new(OpCode::Print),
            ],
        );

        let (ok, vm) = run(&chunk);
        assert!(ok);
        assert_eq!(vm.heap().live_count(), 1);
        assert_eq!(String::from_utf8_lossy(vm.output()), "hello, vm\n");
    }

    #[test]
    fn stack_overflow_trapped() {
        let mut cfg = VmConfig::new();
        cfg.max_stack_size = 1;
        let chunk = chunk_of(
            vec![Constant::Int(1)],
            vec![
                Instruction::with_operand(OpCode::Push, 0),
                Instruction::with_operand(OpCode::Push, 0),
                Instruction::new(OpCode::Halt),
            ],
        );

        let mut vm = VirtualMachine::with_output(cfg, Vec::new());
        assert_eq!(vm.config().max_stack_size, 1);
        let fault = vm.run(&chunk).expect_err("overflow not trapped");
        assert_eq!(fault.error, SvmError::StackOverflow);
        assert_eq!(fault.ip, 1);
        assert_eq!(fault.line, Some(2));
        assert_eq!(vm.state(), VmState::Errored);
    }

    #[test]
    fn unknown_opcode_errors() {
        let chunk = chunk_of(vec![], vec![Instruction::new(OpCode::Nop), Instruction::raw(0x77, 0)]);

        let (ok, vm) = run(&chunk);
        assert!(!ok);
        assert_eq!(vm.fault().map(|f| f.error.clone()), Some(SvmError::UnknownOpcode(0x77)));
        assert_eq!(vm.fault().map(|f| f.ip), Some(1));
    }

    #[test]
    fn each_execute_starts_clean() {
        let chunk = chunk_of(
            vec![Constant::Int(9)],
            vec![
                Instruction::with_operand(OpCode::LoadGlobal, 0),
                Instruction::with_operand(OpCode::Push, 0),
                Instruction::with_operand(OpCode::StoreGlobal, 0),
            ],
        );

        let mut vm = VirtualMachine::with_output(VmConfig::new(), Vec::new());
        assert!(vm.execute(&chunk));
        assert!(vm.execute(&chunk));
        // the global written by the first run does not survive into the second
        assert_eq!(vm.stack(), &[Value::Nil, Value::Int(9)]);
    }
}
