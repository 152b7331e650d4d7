//! Export functionality: CSV datasets and feature matrices, JSON lines.

pub mod csv;
pub mod json;
