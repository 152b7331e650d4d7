//! Sequence-model input: labelled text fields joined with a separator.

use crate::error::{PhishError, Result};
use crate::model::fields::{EmailFieldSet, FIELD_LABELS, HEADER_KEYS};
use crate::parser::header::decode_encoded_words;

/// Joins text fields of a field-set into one string.
#[derive(Debug, Clone)]
pub struct TextConcat {
    fields: Vec<String>,
    separator: String,
}

impl Default for TextConcat {
    /// Subject and Extracted Text, one per line.
    fn default() -> Self {
        Self {
            fields: vec!["Subject".to_string(), "Extracted Text".to_string()],
            separator: "\n".to_string(),
        }
    }
}

impl TextConcat {
    /// Every label must be a known field-set label.
    pub fn new(fields: Vec<String>, separator: impl Into<String>) -> Result<Self> {
        if let Some(unknown) = fields
            .iter()
            .find(|label| !FIELD_LABELS.contains(&label.as_str()))
        {
            return Err(PhishError::UnknownField(unknown.clone()));
        }
        Ok(Self {
            fields,
            separator: separator.into(),
        })
    }

    /// Build the model input for one message. Header fields have their
    /// RFC 2047 encoded-words decoded.
    pub fn transform(&self, fields: &EmailFieldSet) -> Result<String> {
        let parts = self
            .fields
            .iter()
            .map(|label| {
                let value = fields.field(label)?.render();
                Ok(if HEADER_KEYS.contains(&label.as_str()) {
                    decode_encoded_words(&value)
                } else {
                    value
                })
            })
            .collect::<Result<Vec<String>>>()?;
        Ok(parts.join(&self.separator))
    }

    pub fn transform_batch(&self, fields: &[EmailFieldSet]) -> Result<Vec<String>> {
        fields.iter().map(|f| self.transform(f)).collect()
    }
}
