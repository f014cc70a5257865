pub mod memory;
pub mod stack;
pub mod value;
pub mod vm;

pub use value::Value;
pub use vm::{Fault, VirtualMachine, VmState};
