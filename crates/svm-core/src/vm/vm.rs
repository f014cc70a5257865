//! Virtual Machine Core
//!
//! Fetch-decode-execute loop over a `Chunk`. The VM owns the operand
//! stack, the global table, the memory bank, the return-address stack and
//! the heap. Collections only ever run between two instructions.

use std::io::{self, Stdout, Write};

use log::{trace, warn};
use thiserror::Error;

use crate::bytecode::{Chunk, Constant, Instruction, OpCode};
use crate::config::VmConfig;
use crate::error::{SvmError, SvmResult};
use crate::gc::{CollectStats, Heap};

use super::memory::Slots;
use super::stack::Stack;
use super::value::Value;

/// Execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Ready,
    Running,
    Halted,
    Errored,
}

/// A runtime error together with where it happened
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error} at instruction {ip}")]
pub struct Fault {
    #[source]
    pub error: SvmError,
    /// Index of the failing instruction
    pub ip: usize,
    /// Source line of the failing instruction
    pub line: Option<u32>,
}

/// Stack virtual machine
#[derive(Debug)]
pub struct VirtualMachine<W: Write = Stdout> {
    config: VmConfig,
    stack: Stack,
    globals: Slots,
    memory: Slots,
    call_stack: Vec<usize>,
    heap: Heap,

    ip: usize,
    state: VmState,
    fault: Option<Fault>,

    out: W,
}

impl VirtualMachine<Stdout> {
    /// Create a VM that prints to stdout
    pub fn new(config: VmConfig) -> Self {
        Self::with_output(config, io::stdout())
    }
}

impl<W: Write> VirtualMachine<W> {
    /// Create a VM that prints to `out`
    pub fn with_output(config: VmConfig, out: W) -> Self {
        VirtualMachine {
            stack: Stack::new(config.max_stack_size),
            globals: Slots::new(config.global_slots),
            memory: Slots::new(config.memory_slots),
            call_stack: Vec::new(),
            heap: Heap::new(config.gc_threshold),
            ip: 0,
            state: VmState::Ready,
            fault: None,
            out,
            config,
        }
    }

    /// Run `chunk` to completion. Returns true if the VM halted, false if it errored.
    pub fn execute(&mut self, chunk: &Chunk) -> bool {
        self.run(chunk).is_ok()
    }

    /// Run `chunk` to completion, returning the fault if execution errored.
    pub fn run(&mut self, chunk: &Chunk) -> Result<(), Fault> {
        self.reset();
        self.state = VmState::Running;

        let result = self.dispatch_loop(chunk);

        // Output printed before a fault must reach the sink too.
        if let Err(err) = self.out.flush() {
            warn!("failed to flush output: {}", err);
        }

        if let Err(fault) = &result {
            log::error!("runtime error: {}", fault);
            self.state = VmState::Errored;
            self.fault = Some(fault.clone());
        }
        result
    }

    fn dispatch_loop(&mut self, chunk: &Chunk) -> Result<(), Fault> {
        while self.state == VmState::Running {
            let at = self.ip;
            let Some(&instr) = chunk.instruction(at) else {
                // Running off the end is an implicit halt.
                self.state = VmState::Halted;
                break;
            };

            if self.config.trace {
                self.trace_state(&instr);
            }

            if self.heap.should_collect() {
                self.collect_garbage();
            }

            self.ip += 1;

            self.step(chunk, instr).map_err(|error| Fault {
                error,
                ip: at,
                line: chunk.line(at),
            })?;
        }
        Ok(())
    }

    /// Collect with the VM's complete live state as roots.
    pub fn collect_garbage(&mut self) -> CollectStats {
        self.heap.collect(&[
            self.stack.as_slice(),
            self.globals.as_slice(),
            self.memory.as_slice(),
        ])
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.globals.reset();
        self.memory.reset();
        self.call_stack.clear();
        self.ip = 0;
        self.fault = None;
        self.state = VmState::Ready;
    }

    /// Execute a single instruction
    fn step(&mut self, chunk: &Chunk, instr: Instruction) -> SvmResult<()> {
        let opcode = instr.op().ok_or(SvmError::UnknownOpcode(instr.opcode))?;
        let operand = instr.operand;

        match opcode {
            OpCode::Nop => Ok(()),
            OpCode::Halt => {
                self.state = VmState::Halted;
                Ok(())
            }

            // Stack
            OpCode::Push => self.push_constant(chunk, operand),
            OpCode::Pop => self.stack.pop().map(|_| ()),
            OpCode::Dup => self.stack.dup(),
            OpCode::Swap => self.stack.swap(),

            // Arithmetic & comparison
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Eq
            | OpCode::Ne
            | OpCode::Lt
            | OpCode::Le
            | OpCode::Gt
            | OpCode::Ge => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                match (a.as_int(), b.as_int()) {
                    (Some(x), Some(y)) => self.stack.push(int_binary(opcode, x, y)?),
                    (None, _) => Err(type_mismatch(opcode.mnemonic(), "integer operands", a)),
                    (_, None) => Err(type_mismatch(opcode.mnemonic(), "integer operands", b)),
                }
            }
            OpCode::Neg => {
                let value = self.stack.pop()?;
                let i = value
                    .as_int()
                    .ok_or_else(|| type_mismatch("NEG", "an integer operand", value))?;
                self.stack.push(Value::Int(i.wrapping_neg()))
            }

            // Logical
            OpCode::And | OpCode::Or => {
                let b = self.stack.pop()?.is_truthy();
                let a = self.stack.pop()?.is_truthy();
                let result = if opcode == OpCode::And { a && b } else { a || b };
                self.stack.push(Value::Bool(result))
            }
            OpCode::Not => {
                let value = self.stack.pop()?;
                self.stack.push(Value::Bool(!value.is_truthy()))
            }

            // Slots
            OpCode::LoadGlobal => load_slot(&mut self.stack, &self.globals, operand, "global"),
            OpCode::StoreGlobal => store_slot(&self.stack, &mut self.globals, operand, "global"),
            OpCode::Load => load_slot(&mut self.stack, &self.memory, operand, "memory"),
            OpCode::Store => store_slot(&self.stack, &mut self.memory, operand, "memory"),

            // Control flow
            OpCode::Jmp => self.jump(operand),
            OpCode::JmpIfFalse => {
                if !self.stack.peek()?.is_truthy() {
                    self.jump(operand)?;
                }
                Ok(())
            }
            OpCode::JmpIfTrue => {
                if self.stack.peek()?.is_truthy() {
                    self.jump(operand)?;
                }
                Ok(())
            }
            OpCode::Call => {
                if self.call_stack.len() >= self.config.max_call_depth {
                    return Err(SvmError::CallDepthExceeded(self.config.max_call_depth));
                }
                let return_ip = self.ip;
                self.jump(operand)?;
                self.call_stack.push(return_ip);
                Ok(())
            }
            OpCode::Ret => {
                match self.call_stack.pop() {
                    Some(return_ip) => self.ip = return_ip,
                    None => self.state = VmState::Halted,
                }
                Ok(())
            }

            // Arrays
            OpCode::NewArray => {
                let len = usize::try_from(operand).map_err(|_| SvmError::InvalidArraySize(operand))?;
                let handle = self.heap.allocate_array(len);
                self.stack.push(Value::Obj(handle))
            }
            OpCode::ArrayGet => {
                let index = self.stack.pop()?;
                let array = self.stack.pop()?;
                let elements = self.array_mut(array)?;
                let index = index
                    .as_int()
                    .ok_or_else(|| type_mismatch("ARRAY_GET", "an integer index", index))?;
                let element = elements[checked_index(index, elements.len())?];
                self.stack.push(Value::Int(element))
            }
            OpCode::ArraySet => {
                let value = self.stack.pop()?;
                let index = self.stack.pop()?;
                let array = self.stack.pop()?;
                let elements = self.array_mut(array)?;
                let i = index
                    .as_int()
                    .ok_or_else(|| type_mismatch("ARRAY_SET", "an integer index", index))?;
                let v = value
                    .as_int()
                    .ok_or_else(|| type_mismatch("ARRAY_SET", "an integer value", value))?;
                elements[checked_index(i, elements.len())?] = v;
                Ok(())
            }
            OpCode::ArrayLen => {
                let array = self.stack.pop()?;
                let len = self.array_mut(array)?.len();
                self.stack.push(Value::Int(len as i64))
            }

            // System
            OpCode::Print => {
                let value = self.stack.pop()?;
                writeln!(self.out, "{}", value.display(&self.heap))?;
                Ok(())
            }
        }
    }

    /// Push a constant; out-of-range indices are ignored.
    fn push_constant(&mut self, chunk: &Chunk, operand: i32) -> SvmResult<()> {
        let Some(constant) = usize::try_from(operand).ok().and_then(|i| chunk.constant(i)) else {
            warn!("PUSH: constant index {} out of range, ignored", operand);
            return Ok(());
        };

        let value = match constant {
            Constant::Str(text) => Value::Obj(self.heap.allocate_string(text)),
            other => Value::from_constant(other).unwrap_or(Value::Nil),
        };
        self.stack.push(value)
    }

    fn jump(&mut self, operand: i32) -> SvmResult<()> {
        self.ip = usize::try_from(operand).map_err(|_| SvmError::InvalidJumpTarget(operand))?;
        Ok(())
    }

    fn array_mut(&mut self, value: Value) -> SvmResult<&mut [i64]> {
        let handle = value.as_obj().ok_or(SvmError::NotAnArray)?;
        self.heap
            .get_mut(handle)
            .ok_or(SvmError::DanglingReference)?
            .as_array_mut()
            .ok_or(SvmError::NotAnArray)
    }

    fn trace_state(&self, next: &Instruction) {
        let stack = self
            .stack
            .as_slice()
            .iter()
            .map(|value| format!("[{}]", value.display(&self.heap)))
            .collect::<Vec<_>>()
            .join(" ");
        trace!(
            "ip {:04} | stack ({}): {} | next: {}",
            self.ip,
            self.stack.size(),
            stack,
            next
        );
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    /// The fault recorded by the last errored run
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Operand stack, bottom to top
    pub fn stack(&self) -> &[Value] {
        self.stack.as_slice()
    }

    pub fn global(&self, index: i32) -> Option<Value> {
        self.globals.load(index)
    }

    pub fn memory(&self, index: i32) -> Option<Value> {
        self.memory.load(index)
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Render a value with PRINT's display rules
    pub fn render(&self, value: &Value) -> String {
        value.display(&self.heap).to_string()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

fn int_binary(op: OpCode, a: i64, b: i64) -> SvmResult<Value> {
    let value = match op {
        OpCode::Add => Value::Int(a.wrapping_add(b)),
        OpCode::Sub => Value::Int(a.wrapping_sub(b)),
        OpCode::Mul => Value::Int(a.wrapping_mul(b)),
        OpCode::Div => {
            if b == 0 {
                return Err(SvmError::DivisionByZero);
            }
            Value::Int(a.wrapping_div(b))
        }
        OpCode::Mod => {
            if b == 0 {
                return Err(SvmError::ModuloByZero);
            }
            Value::Int(a.wrapping_rem(b))
        }
        OpCode::Eq => Value::Bool(a == b),
        OpCode::Ne => Value::Bool(a != b),
        OpCode::Lt => Value::Bool(a < b),
        OpCode::Le => Value::Bool(a <= b),
        OpCode::Gt => Value::Bool(a > b),
        OpCode::Ge => Value::Bool(a >= b),
        other => return Err(SvmError::UnknownOpcode(other as u8)),
    };
    Ok(value)
}

fn type_mismatch(op: &'static str, expected: &'static str, found: Value) -> SvmError {
    SvmError::TypeMismatch {
        op,
        expected,
        found: found.type_name(),
    }
}

fn checked_index(index: i64, len: usize) -> SvmResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(SvmError::IndexOutOfBounds { index, len })
}

fn load_slot(stack: &mut Stack, slots: &Slots, operand: i32, table: &str) -> SvmResult<()> {
    match slots.load(operand) {
        Some(value) => stack.push(value),
        None => {
            warn!("load from {} slot {} out of range, ignored", table, operand);
            Ok(())
        }
    }
}

/// Store the top of stack without popping it.
fn store_slot(stack: &Stack, slots: &mut Slots, operand: i32, table: &str) -> SvmResult<()> {
    let value = stack.peek()?;
    if !slots.store(operand, value) {
        warn!("store to {} slot {} out of range, ignored", table, operand);
    }
    Ok(())
}
