//! Export field-set datasets and feature matrices to CSV.
//!
//! Output is UTF-8 with BOM for Excel compatibility.

use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{PhishError, Result};
use crate::features::FeatureMatrix;
use crate::model::fields::{LabeledFieldSet, FIELD_LABELS};

const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Export a dataset to a CSV file.
///
/// Columns: every field-set label in order, then `Is Phishy` (empty for
/// unlabeled rows). List fields are joined with `"; "`.
pub fn export_dataset_csv(rows: &[LabeledFieldSet], output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path).map_err(|e| PhishError::io(output_path, e))?;
    let mut out = BufWriter::new(file);
    write_dataset_csv(rows, &mut out)
        .and_then(|()| out.flush())
        .map_err(|e| PhishError::io(output_path, e))
}

pub fn write_dataset_csv<W: Write>(rows: &[LabeledFieldSet], out: &mut W) -> std::io::Result<()> {
    out.write_all(&BOM)?;

    let header = FIELD_LABELS
        .iter()
        .map(|label| csv_escape(label))
        .chain(std::iter::once("Is Phishy".to_string()))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{header}")?;

    for row in rows {
        let mut cells = Vec::with_capacity(FIELD_LABELS.len() + 1);
        for label in FIELD_LABELS {
            // Every FIELD_LABELS entry resolves.
            let value = row
                .fields
                .field(label)
                .map(|v| v.render())
                .unwrap_or_default();
            cells.push(csv_escape(&value));
        }
        cells.push(row.is_phishy.map(|p| p.to_string()).unwrap_or_default());
        writeln!(out, "{}", cells.join(","))?;
    }
    Ok(())
}

/// Export a feature matrix, optionally followed by an `Is Phishy` column.
pub fn export_features_csv(
    matrix: &FeatureMatrix,
    labels: Option<&[Option<bool>]>,
    output_path: &Path,
) -> Result<()> {
    let file = std::fs::File::create(output_path).map_err(|e| PhishError::io(output_path, e))?;
    let mut out = BufWriter::new(file);
    write_features_csv(matrix, labels, &mut out)
        .and_then(|()| out.flush())
        .map_err(|e| PhishError::io(output_path, e))
}

pub fn write_features_csv<W: Write>(
    matrix: &FeatureMatrix,
    labels: Option<&[Option<bool>]>,
    out: &mut W,
) -> std::io::Result<()> {
    out.write_all(&BOM)?;

    let mut header: Vec<String> = matrix.columns.iter().map(|c| csv_escape(c)).collect();
    if labels.is_some() {
        header.push("Is Phishy".to_string());
    }
    writeln!(out, "{}", header.join(","))?;

    for (i, row) in matrix.rows.iter().enumerate() {
        let mut cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        if let Some(labels) = labels {
            let label = labels.get(i).copied().flatten();
            cells.push(label.map(|p| p.to_string()).unwrap_or_default());
        }
        writeln!(out, "{}", cells.join(","))?;
    }
    Ok(())
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
