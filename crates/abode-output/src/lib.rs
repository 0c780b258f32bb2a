#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/abode/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod format;
pub mod report;
pub mod response;
pub mod sample;

pub use export::{ExportError, ExportFormat, Exporter};
pub use format::{format_currency, round_to};
pub use report::{ReportBuilder, ReportError, RowCounts, TrainingReport};
pub use response::{BatchPredictionRow, PerformanceSummary, PredictionResponse};
pub use sample::{SAMPLE_FILE_NAME, sample_csv};
