//! SVM Configuration
//!
//! Runtime limits and collector policy for the stack VM.
//! Configuration specifies constraints only; enforcement is handled by the VM.

/// VM Configuration
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum operand stack depth
    pub max_stack_size: usize,

    /// Number of global variable slots
    pub global_slots: usize,

    /// Number of slots in the LOAD/STORE memory bank
    pub memory_slots: usize,

    /// Maximum depth of the return-address stack
    pub max_call_depth: usize,

    /// Initial (and minimum) live-object count that triggers a collection
    pub gc_threshold: usize,

    /// Dump ip, stack and next instruction before every dispatch
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_stack_size: 65536,
            global_slots: 256,
            memory_slots: 256,
            max_call_depth: 1024,
            gc_threshold: 8,
            trace: false,
        }
    }
}

impl VmConfig {
    /// Create a new configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }
}
