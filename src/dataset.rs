//! Labeled datasets built from whole mailbox archives.

use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::extract::Assembler;
use crate::model::fields::LabeledFieldSet;
use crate::model::message::RawMessage;
use crate::parser::mbox::MboxParser;
use crate::parser::parse_raw_message;

/// Messages parsed and assembled together before the next read.
const CHUNK_SIZE: usize = 512;

/// Options for [`parse_data_from_mbox`].
#[derive(Debug, Clone, Copy)]
pub struct DatasetOptions {
    /// Label attached to every row.
    pub is_phishy: Option<bool>,
    pub max_message_size: usize,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            is_phishy: None,
            max_message_size: crate::parser::mbox::DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

/// Assemble every message of an mbox archive into a labeled row.
///
/// Rows follow archive order. `progress` receives `(bytes_read, total_bytes)`.
pub fn parse_data_from_mbox(
    path: &Path,
    options: DatasetOptions,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<Vec<LabeledFieldSet>> {
    let parser = MboxParser::new(path)?.with_max_message_size(options.max_message_size);
    let assembler = Assembler::new();

    let mut rows = Vec::new();
    let mut pending: Vec<Vec<u8>> = Vec::with_capacity(CHUNK_SIZE);
    let flush = |pending: &mut Vec<Vec<u8>>, rows: &mut Vec<LabeledFieldSet>| {
        let messages: Vec<RawMessage> = pending
            .par_iter()
            .map(|raw| parse_raw_message(raw))
            .collect();
        pending.clear();
        rows.extend(
            assembler
                .assemble_batch(&messages)
                .into_iter()
                .map(|fields| LabeledFieldSet {
                    fields,
                    is_phishy: options.is_phishy,
                }),
        );
    };

    parser.parse(
        &mut |_offset, raw| {
            pending.push(raw.to_vec());
            if pending.len() >= CHUNK_SIZE {
                flush(&mut pending, &mut rows);
            }
            true
        },
        progress,
    )?;
    flush(&mut pending, &mut rows);

    info!(
        path = %path.display(),
        messages = rows.len(),
        "Built dataset"
    );
    Ok(rows)
}
