//! Heap Object Model
//!
//! Variable-size data that lives in the collector's registry. Values only
//! ever hold an `ObjRef`; the `Heap` owns the objects themselves.

/// Non-owning handle to a heap object.
///
/// The generation is bumped whenever a slot is freed, so a handle that
/// outlives its object never resolves to whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ObjRef {
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

/// Object payload
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// Fixed-length, zero-initialised integer array
    Array(Vec<i64>),
    /// Immutable text
    String(Box<str>),
}

#[derive(Debug)]
pub struct Object {
    kind: ObjectKind,
    pub(crate) marked: bool,
}

impl Object {
    pub(crate) fn new(kind: ObjectKind) -> Self {
        Object {
            kind,
            marked: false,
        }
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn as_array(&self) -> Option<&[i64]> {
        match &self.kind {
            ObjectKind::Array(elements) => Some(elements.as_slice()),
            ObjectKind::String(_) => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut [i64]> {
        match &mut self.kind {
            ObjectKind::Array(elements) => Some(elements.as_mut_slice()),
            ObjectKind::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::String(text) => Some(&text[..]),
            ObjectKind::Array(_) => None,
        }
    }

    /// Push every object this one references onto `worklist`.
    pub(crate) fn trace(&self, _worklist: &mut Vec<ObjRef>) {
        match &self.kind {
            // Array elements are plain integers.
            ObjectKind::Array(_) => {}
            ObjectKind::String(_) => {}
        }
    }
}
