#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/abode/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod column;
pub mod error;
pub mod frequency;
pub mod onehot;
pub mod preprocessor;
pub mod scaler;

pub use error::{EncodingError, Result};
pub use frequency::{FrequencyEncoder, FrequencyTable, UnknownPolicy};
pub use onehot::OneHotEncoder;
pub use preprocessor::{ColumnPlan, FeaturePreprocessor, PreprocessorConfig};
pub use scaler::StandardScaler;
