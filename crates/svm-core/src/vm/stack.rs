//! VM Stack Implementation
//!
//! Bounded operand stack. No execution semantics.

use crate::error::{SvmError, SvmResult};
use super::value::Value;

/// VM operand stack
#[derive(Debug)]
pub struct Stack {
    values: Vec<Value>,
    max_size: usize,
}

impl Stack {
    /// Create new stack with maximum size
    pub fn new(max_size: usize) -> Self {
        Stack {
            values: Vec::new(),
            max_size,
        }
    }

    /// Push value onto stack
    pub fn push(&mut self, value: Value) -> SvmResult<()> {
        if self.values.len() >= self.max_size {
            return Err(SvmError::StackOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop value from stack
    pub fn pop(&mut self) -> SvmResult<Value> {
        self.values.pop().ok_or(SvmError::StackUnderflow)
    }

    /// Peek at top of stack without removing
    pub fn peek(&self) -> SvmResult<Value> {
        self.values.last().copied().ok_or(SvmError::StackUnderflow)
    }

    /// Duplicate top value
    pub fn dup(&mut self) -> SvmResult<()> {
        let value = self.peek()?;
        self.push(value)
    }

    /// Exchange the two topmost values
    pub fn swap(&mut self) -> SvmResult<()> {
        let len = self.values.len();
        if len < 2 {
            return Err(SvmError::StackUnderflow);
        }
        self.values.swap(len - 1, len - 2);
        Ok(())
    }

    /// Get current stack size
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bottom-to-top view, used as a collector root
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Clear stack
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_underflows() {
        let mut stack = Stack::new(4);
        assert_eq!(stack.pop(), Err(SvmError::StackUnderflow));
        assert_eq!(stack.dup(), Err(SvmError::StackUnderflow));
    }

    #[test]
    fn dup_then_two_pops_restore_the_stack() {
        let mut stack = Stack::new(4);
        stack.push(Value::Double(1.25)).expect("push failed");
        stack.dup().expect("dup failed");
        assert_eq!(stack.size(), 2);

        let first = stack.pop().expect("pop failed");
        let second = stack.pop().expect("pop failed");
        assert_eq!(first, second);
        assert_eq!(first, Value::Double(1.25));
        assert!(stack.is_empty());
    }

    #[test]
    fn bounded_push() {
        let mut stack = Stack::new(1);
        stack.push(Value::Int(1)).expect("push failed");
        assert_eq!(stack.push(Value::Int(2)), Err(SvmError::StackOverflow));
    }

    #[test]
    fn swap_needs_two_values() {
        let mut stack = Stack::new(4);
        stack.push(Value::Int(1)).expect("push failed");
        assert_eq!(stack.swap(), Err(SvmError::StackUnderflow));
        stack.push(Value::Bool(true)).expect("push failed");
        stack.swap().expect("swap failed");
        assert_eq!(stack.as_slice(), &[Value::Bool(true), Value::Int(1)]);
    }
}
