//! Core data model: raw message trees, flattened leaves, and field-sets.

pub mod fields;
pub mod leaf;
pub mod message;
