//! VM Memory Model
//!
//! Fixed-size, index-addressed slot tables. The VM keeps two: the global
//! table (LOAD_GLOBAL / STORE_GLOBAL) and the memory bank (LOAD / STORE).
//! Access outside the table is reported to the caller, not treated as an error here.

use super::value::Value;

/// Pre-sized table of value slots
#[derive(Debug)]
pub struct Slots {
    values: Vec<Value>,
}

impl Slots {
    pub fn new(size: usize) -> Self {
        Slots {
            values: vec![Value::Nil; size],
        }
    }

    /// Resolve a signed instruction operand to a slot index.
    fn index(&self, operand: i32) -> Option<usize> {
        usize::try_from(operand)
            .ok()
            .filter(|&index| index < self.values.len())
    }

    pub fn load(&self, operand: i32) -> Option<Value> {
        self.index(operand).map(|index| self.values[index])
    }

    /// Returns false when the operand is outside the table.
    pub fn store(&mut self, operand: i32, value: Value) -> bool {
        match self.index(operand) {
            Some(index) => {
                self.values[index] = value;
                true
            }
            None => false,
        }
    }

    /// Reset every slot to nil
    pub fn reset(&mut self) {
        self.values.fill(Value::Nil);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Used as a collector root
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_access_is_refused() {
        let mut slots = Slots::new(2);
        assert!(slots.store(1, Value::Int(5)));
        assert!(!slots.store(2, Value::Int(5)));
        assert!(!slots.store(-1, Value::Int(5)));
        assert_eq!(slots.load(1), Some(Value::Int(5)));
        assert_eq!(slots.load(0), Some(Value::Nil));
        assert_eq!(slots.load(7), None);
    }
}
