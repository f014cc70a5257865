pub mod builder;
pub mod source;

pub use builder::Assembler;
pub use source::assemble_source;
