//! Export field-sets as JSON lines, one object per message.

use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{PhishError, Result};

/// Write every record to `output_path`, one JSON object per line.
pub fn export_jsonl<T: Serialize>(records: &[T], output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path).map_err(|e| PhishError::io(output_path, e))?;
    let mut out = BufWriter::new(file);
    write_jsonl(records, &mut out)
        .and_then(|()| out.flush())
        .map_err(|e| PhishError::io(output_path, e))
}

pub fn write_jsonl<T: Serialize, W: Write>(records: &[T], out: &mut W) -> std::io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
