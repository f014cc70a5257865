//! Mark-and-Sweep Heap
//!
//! The heap is the single allocation path for objects and the registry
//! that owns them. A collection marks everything reachable from the root
//! slices it is handed and frees the rest.

use log::debug;

use super::object::{ObjRef, Object, ObjectKind};
use crate::vm::value::Value;

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// Outcome of one collection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectStats {
    pub freed: usize,
    pub live: usize,
    pub next_threshold: usize,
}

/// Object registry and collector
#[derive(Debug)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    next_gc: usize,
    min_threshold: usize,
    collections: u64,
}

impl Heap {
    /// Create an empty heap that first collects once `threshold` objects are live.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            next_gc: threshold,
            min_threshold: threshold,
            collections: 0,
        }
    }

    /// Register a new unmarked object and return its handle.
    pub fn allocate(&mut self, kind: ObjectKind) -> ObjRef {
        let object = Object::new(kind);
        self.live += 1;

        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.object = Some(object);
            return ObjRef {
                slot,
                generation: entry.generation,
            };
        }

        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            object: Some(object),
        });
        ObjRef {
            slot,
            generation: 0,
        }
    }

    pub fn allocate_array(&mut self, len: usize) -> ObjRef {
        self.allocate(ObjectKind::Array(vec![0; len]))
    }

    pub fn allocate_string(&mut self, text: &str) -> ObjRef {
        self.allocate(ObjectKind::String(text.into()))
    }

    pub fn get(&self, handle: ObjRef) -> Option<&Object> {
        self.slots
            .get(handle.slot as usize)
            .filter(|entry| entry.generation == handle.generation)
            .and_then(|entry| entry.object.as_ref())
    }

    pub fn get_mut(&mut self, handle: ObjRef) -> Option<&mut Object> {
        self.slots
            .get_mut(handle.slot as usize)
            .filter(|entry| entry.generation == handle.generation)
            .and_then(|entry| entry.object.as_mut())
    }

    pub fn contains(&self, handle: ObjRef) -> bool {
        self.get(handle).is_some()
    }

    /// Number of objects currently registered
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Live-object count at which the next collection triggers
    pub fn threshold(&self) -> usize {
        self.next_gc
    }

    pub fn collections(&self) -> u64 {
        self.collections
    }

    pub fn should_collect(&self) -> bool {
        self.live >= self.next_gc
    }

    /// Run a full mark-and-sweep cycle.
    ///
    /// `roots` must cover every value the mutator can still reach; anything
    /// not reachable from them is freed.
    pub fn collect(&mut self, roots: &[&[Value]]) -> CollectStats {
        self.mark(roots);
        let freed = self.sweep();

        self.next_gc = (self.live * 2).max(self.min_threshold);
        self.collections += 1;

        let stats = CollectStats {
            freed,
            live: self.live,
            next_threshold: self.next_gc,
        };
        debug!(
            "gc #{}: freed {} objects, {} live, next collection at {}",
            self.collections, stats.freed, stats.live, stats.next_threshold
        );
        stats
    }

    fn mark(&mut self, roots: &[&[Value]]) {
        let mut worklist: Vec<ObjRef> = roots
            .iter()
            .flat_map(|values| values.iter())
            .filter_map(Value::as_obj)
            .collect();

        while let Some(handle) = worklist.pop() {
            let Some(object) = self.get_mut(handle) else {
                continue;
            };
            if object.marked {
                continue;
            }
            object.marked = true;
            object.trace(&mut worklist);
        }
    }

    fn sweep(&mut self) -> usize {
        let mut freed = 0;

        for (index, entry) in self.slots.iter_mut().enumerate() {
            let Some(object) = entry.object.as_mut() else {
                continue;
            };
            if object.marked {
                object.marked = false;
                continue;
            }
            entry.object = None;
            entry.generation = entry.generation.wrapping_add(1);
            self.free.push(index as u32);
            freed += 1;
        }

        self.live -= freed;
        freed
    }
}
