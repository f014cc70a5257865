//! SVM Error Types
//!
//! Defines every error condition produced by the stack VM, the assembler
//! and the chunk image loader. Runtime errors are always fatal to the
//! current `execute` call; assembly and image errors surface before any
//! chunk reaches the VM.

use std::io;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SvmError {
    // VM execution errors
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("{op}: expected {expected}, found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),
    #[error("invalid jump target: {0}")]
    InvalidJumpTarget(i32),
    #[error("call depth exceeded {0}")]
    CallDepthExceeded(usize),

    // Object errors
    #[error("operand is not an array")]
    NotAnArray,
    #[error("array index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("invalid array size: {0}")]
    InvalidArraySize(i32),
    #[error("reference to a collected object")]
    DanglingReference,

    // Assembly errors
    #[error("line {line}: duplicate label: {name}")]
    DuplicateLabel { name: String, line: u32 },
    #[error("line {line}: undefined label: {name}")]
    UndefinedLabel { name: String, line: u32 },
    #[error("line {line}: {message}")]
    Syntax { line: u32, message: String },

    // Chunk image errors
    #[error("invalid chunk image magic number")]
    InvalidMagicNumber,
    #[error("incompatible chunk image version")]
    InvalidImageVersion,
    #[error("chunk image is too short")]
    ImageTooShort,
    #[error("malformed chunk image")]
    MalformedImage,

    // IO boundary
    #[error("io error: {0}")]
    Io(String),
}

impl SvmError {
    /// True for errors raised while building a chunk, as opposed to running one.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            SvmError::DuplicateLabel { .. }
                | SvmError::UndefinedLabel { .. }
                | SvmError::Syntax { .. }
        )
    }
}

impl From<io::Error> for SvmError {
    fn from(err: io::Error) -> Self {
        SvmError::Io(err.to_string())
    }
}

pub type SvmResult<T> = Result<T, SvmError>;
