#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/abode/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;

// Re-export main types from sub-crates
pub use abode_data as data;
pub use abode_encoding as encoding;
pub use abode_model as model;
pub use abode_output as output;

pub use catalog::{EXPECTED_FEATURES, FeatureOptions};
pub use config::{ConfigError, ServiceConfig};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
