//! Named numeric columns, one row per message.

use serde::Serialize;

use crate::error::{PhishError, Result};

/// Row-major feature matrix with named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// An empty matrix with `n_rows` rows and no columns.
    pub fn with_rows(n_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows: vec![Vec::new(); n_rows],
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PhishError::UnknownField(name.to_string()))
    }

    /// Copy of one column's values.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Append a column. `values` must have one entry per row.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Remove the named columns. Every name must exist.
    pub fn drop_columns(&mut self, names: &[String]) -> Result<()> {
        let mut indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();

        for &idx in indices.iter().rev() {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        Ok(())
    }
}

/// Per-column standardization: `(x - mean) / std`.
///
/// Uses the population standard deviation. Zero-variance columns are only
/// centered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let n_cols = matrix.n_columns();
        let n = matrix.n_rows().max(1) as f64;

        let mut means = vec![0.0; n_cols];
        for row in &matrix.rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut variances = vec![0.0; n_cols];
        for row in &matrix.rows {
            for ((var, value), mean) in variances.iter_mut().zip(row).zip(&means) {
                *var += (value - mean).powi(2);
            }
        }

        let scales = variances
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std == 0.0 {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Self { means, scales }
    }

    pub fn transform(&self, matrix: &mut FeatureMatrix) {
        for row in &mut matrix.rows {
            for ((value, mean), scale) in row.iter_mut().zip(&self.means).zip(&self.scales) {
                *value = (*value - mean) / scale;
            }
        }
    }

    pub fn fit_transform(matrix: &mut FeatureMatrix) -> Self {
        let scaler = Self::fit(matrix);
        scaler.transform(matrix);
        scaler
    }
}
