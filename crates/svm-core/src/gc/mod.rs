pub mod heap;
pub mod object;

pub use heap::{CollectStats, Heap};
pub use object::{ObjRef, Object, ObjectKind};
