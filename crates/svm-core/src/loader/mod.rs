pub mod loader;

pub use loader::{ChunkLoader, ChunkWriter, IMAGE_MAGIC};
