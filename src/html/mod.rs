//! HTML handling: tokenizer, structural analysis, and visible text.

pub mod finder;
pub mod text;
pub mod tokenizer;

pub use finder::{HtmlFinder, StructuralAnalysis, StructuralAnalyzer};
