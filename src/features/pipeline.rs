//! Field-sets to feature matrix: encoding, derived attributes, dropout, scaling.

use tracing::debug;

use crate::error::{PhishError, Result};
use crate::features::encode::{
    enumerate_bool, enumerate_encoding, enumerate_priority, enumerate_virus_scanned,
    message_length, url_characteristics,
};
use crate::features::matrix::{FeatureMatrix, StandardScaler};
use crate::features::transform::{AttributeAdder, AttributeDropout};
use crate::model::fields::{EmailFieldSet, FieldValue};

/// Every column the pipeline can produce, in output order.
pub const FEATURE_COLUMNS: [&str; 15] = [
    "X-Virus-Scanned",
    "X-Priority",
    "Encoding",
    "Is HTML",
    "Is JavaScript",
    "Is CSS",
    "Attachments",
    "URLs",
    "IPs",
    "Images",
    "Message Length",
    "URL Secured Ratio",
    "URL Unicode Ratio",
    "URL Avg Length",
    "URL Avg Levels",
];

fn text_length(value: FieldValue<'_>) -> f64 {
    match value {
        FieldValue::Text(text) => message_length(text) as f64,
        other => message_length(&other.render()) as f64,
    }
}

/// Configured transformation from field-sets to a numeric matrix.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    length_adder: AttributeAdder,
    dropout: AttributeDropout,
    normalize: bool,
}

impl FeaturePipeline {
    /// Every name in `exclude` must be one of [`FEATURE_COLUMNS`].
    pub fn new(exclude: &[String], normalize: bool) -> Result<Self> {
        if let Some(unknown) = exclude
            .iter()
            .find(|name| !FEATURE_COLUMNS.contains(&name.as_str()))
        {
            return Err(PhishError::UnknownField(unknown.clone()));
        }
        let length_adder = AttributeAdder::new(
            vec!["Extracted Text".to_string()],
            vec!["Message Length".to_string()],
            text_length,
        )?;
        Ok(Self {
            length_adder,
            dropout: AttributeDropout::new(exclude.to_vec()),
            normalize,
        })
    }

    /// Column names of the matrices this pipeline produces.
    pub fn feature_names(&self) -> Vec<String> {
        let exclude = self.dropout.excluded();
        FEATURE_COLUMNS
            .iter()
            .filter(|c| !exclude.iter().any(|e| e.as_str() == **c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Encode `fields` and, when normalizing, standardize every column using
    /// statistics of this same batch.
    pub fn fit_transform(&self, fields: &[EmailFieldSet]) -> Result<FeatureMatrix> {
        let mut matrix = FeatureMatrix::with_rows(fields.len());
        let column = |f: fn(&EmailFieldSet) -> f64| fields.iter().map(f).collect::<Vec<f64>>();

        matrix.push_column(
            "X-Virus-Scanned",
            column(|f| f64::from(enumerate_virus_scanned(&f.x_virus_scanned))),
        );
        matrix.push_column(
            "X-Priority",
            column(|f| enumerate_priority(&f.x_priority) as f64),
        );
        matrix.push_column(
            "Encoding",
            column(|f| f64::from(enumerate_encoding(&f.encoding))),
        );
        matrix.push_column("Is HTML", column(|f| f64::from(enumerate_bool(f.is_html))));
        matrix.push_column(
            "Is JavaScript",
            column(|f| f64::from(enumerate_bool(f.is_javascript))),
        );
        matrix.push_column("Is CSS", column(|f| f64::from(enumerate_bool(f.is_css))));
        matrix.push_column("Attachments", column(|f| f.attachment_count as f64));
        matrix.push_column("URLs", column(|f| f.url_count as f64));
        matrix.push_column("IPs", column(|f| f.ip_count as f64));
        matrix.push_column("Images", column(|f| f.image_count as f64));

        self.length_adder.transform(fields, &mut matrix)?;

        let characteristics: Vec<_> = fields
            .iter()
            .map(|f| url_characteristics(&f.url_links))
            .collect();
        matrix.push_column(
            "URL Secured Ratio",
            characteristics.iter().map(|c| c.secure_ratio).collect(),
        );
        matrix.push_column(
            "URL Unicode Ratio",
            characteristics.iter().map(|c| c.unicode_ratio).collect(),
        );
        matrix.push_column(
            "URL Avg Length",
            characteristics.iter().map(|c| c.avg_length).collect(),
        );
        matrix.push_column(
            "URL Avg Levels",
            characteristics.iter().map(|c| c.avg_levels).collect(),
        );

        self.dropout.transform(&mut matrix)?;

        if self.normalize {
            StandardScaler::fit_transform(&mut matrix);
        }

        debug!(
            rows = matrix.n_rows(),
            columns = matrix.n_columns(),
            normalized = self.normalize,
            "Built feature matrix"
        );
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<EmailFieldSet> {
        vec![
            EmailFieldSet {
                x_virus_scanned: "clamav".into(),
                x_priority: "1 (Highest)".into(),
                encoding: "quoted-printable".into(),
                is_html: true,
                url_links: vec!["https://a.com/x".into(), "http://b.com".into()],
                url_count: 2,
                extracted_text: "Verify now".into(),
                ..Default::default()
            },
            EmailFieldSet::default(),
        ]
    }

    #[test]
    fn test_raw_columns() {
        let pipeline = FeaturePipeline::new(&[], false).unwrap();
        let matrix = pipeline.fit_transform(&sample()).unwrap();
        assert_eq!(matrix.columns, FEATURE_COLUMNS.to_vec());
        assert_eq!(
            matrix.rows[0],
            vec![1.0, 1.0, 2.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 10.0, 0.5, 0.0, 13.5, 1.5]
        );
        assert_eq!(
            matrix.rows[1],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_exclusion() {
        let exclude = vec!["Is JavaScript".to_string(), "URL Unicode Ratio".to_string()];
        let pipeline = FeaturePipeline::new(&exclude, false).unwrap();
        let matrix = pipeline.fit_transform(&sample()).unwrap();
        assert_eq!(matrix.columns, pipeline.feature_names());
        assert_eq!(matrix.n_columns(), 13);
    }

    #[test]
    fn test_unknown_exclusion() {
        let err = FeaturePipeline::new(&["Spam Score".to_string()], true).unwrap_err();
        assert!(matches!(err, PhishError::UnknownField(ref c) if c == "Spam Score"));
    }

    #[test]
    fn test_normalized_columns_are_centered() {
        let pipeline = FeaturePipeline::new(&[], true).unwrap();
        let matrix = pipeline.fit_transform(&sample()).unwrap();
        for name in FEATURE_COLUMNS {
            let values = matrix.column(name).unwrap();
            assert!((values[0] + values[1]).abs() < 1e-12, "{name} not centered");
        }
    }

    #[test]
    fn test_empty_batch() {
        let pipeline = FeaturePipeline::new(&[], true).unwrap();
        let matrix = pipeline.fit_transform(&[]).unwrap();
        assert_eq!(matrix.n_rows(), 0);
        assert_eq!(matrix.n_columns(), 15);
    }
}
