pub mod chunk;
pub mod instruction;
pub mod opcode;

pub use chunk::{Chunk, Constant};
pub use instruction::Instruction;
pub use opcode::OpCode;
