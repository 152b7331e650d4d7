//! Message decomposition and field-set assembly.

pub mod assembler;
pub mod decomposer;

pub use assembler::Assembler;
