//! Feature derivation: numeric encodings, derived URL ratios, scaling, and
//! text assembly for the sequence model.

pub mod encode;
pub mod matrix;
pub mod pipeline;
pub mod text;
pub mod transform;

pub use encode::{url_characteristics, UrlCharacteristics};
pub use matrix::{FeatureMatrix, StandardScaler};
pub use pipeline::{FeaturePipeline, FEATURE_COLUMNS};
pub use text::TextConcat;
pub use transform::{AttributeAdder, AttributeDropout};
