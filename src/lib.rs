//! `phishsift`: phishing signal extraction for email.
//!
//! This crate decomposes raw messages into their MIME leaves, analyzes HTML
//! structure, extracts URL and IP signals, and turns the resulting
//! field-sets into feature matrices and text inputs for external classifiers.

pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod extract;
pub mod features;
pub mod html;
pub mod model;
pub mod parser;
pub mod signals;
