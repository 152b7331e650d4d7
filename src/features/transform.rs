//! Column transforms: derived attributes and column dropout.

use crate::error::{PhishError, Result};
use crate::features::matrix::FeatureMatrix;
use crate::model::fields::{EmailFieldSet, FieldValue, FIELD_LABELS};

/// Function applied to one field value to produce one derived number.
pub type AttributeFn = fn(FieldValue<'_>) -> f64;

/// Adds derived columns computed from field-set fields.
///
/// `inputs[i]` is transformed by `func` into the column `outputs[i]`.
#[derive(Clone)]
pub struct AttributeAdder {
    inputs: Vec<String>,
    outputs: Vec<String>,
    func: AttributeFn,
}

impl std::fmt::Debug for AttributeAdder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeAdder")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl AttributeAdder {
    /// Fails with [`PhishError::AttributeMismatch`] when the two label lists
    /// differ in length.
    pub fn new(inputs: Vec<String>, outputs: Vec<String>, func: AttributeFn) -> Result<Self> {
        if inputs.len() != outputs.len() {
            return Err(PhishError::AttributeMismatch {
                inputs: inputs.len(),
                outputs: outputs.len(),
            });
        }
        Ok(Self {
            inputs,
            outputs,
            func,
        })
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Append one column per output label to `matrix`.
    ///
    /// An input label the field-set does not have is a [`PhishError::UnknownField`],
    /// even for an empty batch.
    pub fn transform(&self, fields: &[EmailFieldSet], matrix: &mut FeatureMatrix) -> Result<()> {
        if let Some(unknown) = self
            .inputs
            .iter()
            .find(|label| !FIELD_LABELS.contains(&label.as_str()))
        {
            return Err(PhishError::UnknownField(unknown.clone()));
        }

        for (input, output) in self.inputs.iter().zip(&self.outputs) {
            let values = fields
                .iter()
                .map(|f| f.field(input).map(self.func))
                .collect::<Result<Vec<f64>>>()?;
            matrix.push_column(output.clone(), values);
        }
        Ok(())
    }
}

/// Removes named columns from a feature matrix.
#[derive(Debug, Clone, Default)]
pub struct AttributeDropout {
    exclude: Vec<String>,
}

impl AttributeDropout {
    pub fn new(exclude: Vec<String>) -> Self {
        Self { exclude }
    }

    pub fn excluded(&self) -> &[String] {
        &self.exclude
    }

    /// Fails with [`PhishError::UnknownField`] if a name is not a column.
    pub fn transform(&self, matrix: &mut FeatureMatrix) -> Result<()> {
        matrix.drop_columns(&self.exclude)
    }
}
