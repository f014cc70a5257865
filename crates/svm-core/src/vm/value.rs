//! Runtime Value Representation
//!
//! A small tagged scalar copied freely on the operand stack. Object
//! payloads live in the `Heap`; a value only carries a handle to them.

use std::fmt;

use crate::bytecode::Constant;
use crate::gc::{Heap, ObjRef, ObjectKind};

/// Runtime value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Absence of a value
    Nil,

    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// IEEE 754 double
    Double(f64),

    /// Handle to a heap object
    Obj(ObjRef),
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match *self {
            Value::Nil => false,
            Value::Bool(b) => b,
            Value::Int(i) => i != 0,
            Value::Double(d) => d != 0.0,
            // Handles are never null.
            Value::Obj(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<ObjRef> {
        match *self {
            Value::Obj(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Double(_) => "double",
            Value::Obj(_) => "object",
        }
    }

    /// Scalar value for a constant pool entry, `None` for string constants
    /// which need a heap allocation.
    pub fn from_constant(constant: &Constant) -> Option<Value> {
        match *constant {
            Constant::Nil => Some(Value::Nil),
            Constant::Bool(b) => Some(Value::Bool(b)),
            Constant::Int(i) => Some(Value::Int(i)),
            Constant::Double(d) => Some(Value::Double(d)),
            Constant::Str(_) => None,
        }
    }

    /// Display adapter resolving object handles through `heap`.
    pub fn display<'a>(&'a self, heap: &'a Heap) -> ValueDisplay<'a> {
        ValueDisplay { value: self, heap }
    }
}

/// Renders a value the way PRINT shows it.
pub struct ValueDisplay<'a> {
    value: &'a Value,
    heap: &'a Heap,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.value {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{:.2}", d),
            Value::Obj(handle) => match self.heap.get(handle).map(|obj| obj.kind()) {
                Some(ObjectKind::String(text)) => f.write_str(text),
                Some(ObjectKind::Array(_)) => f.write_str("[Array]"),
                None => f.write_str("[Collected]"),
            },
        }
    }
}
