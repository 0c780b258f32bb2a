//! Versioned model artifact files.

use crate::error::ModelLoadError;
use crate::pipeline::PricePipeline;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Artifact layout version this build reads and writes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Envelope around a fitted pipeline
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    format_version: u32,
    pipeline: PricePipeline,
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
}

#[derive(Serialize)]
struct BorrowedArtifact<'a> {
    format_version: u32,
    pipeline: &'a PricePipeline,
}

impl ModelArtifact {
    /// Wrap a pipeline at the current format version.
    pub const fn new(pipeline: PricePipeline) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            pipeline,
        }
    }

    /// The wrapped pipeline.
    pub const fn pipeline(&self) -> &PricePipeline {
        &self.pipeline
    }

    /// Unwrap the pipeline.
    pub fn into_pipeline(self) -> PricePipeline {
        self.pipeline
    }

    /// Parse an artifact, checking the version before the body.
    pub fn from_json_str(json: &str) -> Result<Self, ModelLoadError> {
        let parse = |source| ModelLoadError::Parse {
            what: "model artifact",
            source,
        };
        let header: Header = serde_json::from_str(json).map_err(parse)?;
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelLoadError::UnsupportedFormat {
                found: header.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        serde_json::from_str(json).map_err(parse)
    }

    /// Read an artifact file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "loaded model artifact");
        Ok(artifact)
    }

    /// Write the artifact as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        Self::write(&self.pipeline, path)
    }

    /// Write a borrowed pipeline at the current format version.
    pub fn write(pipeline: &PricePipeline, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string(&BorrowedArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            pipeline,
        })?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_format_version() {
        let err = ModelArtifact::from_json_str(r#"{"format_version": 9, "pipeline": {}}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ModelLoadError::UnsupportedFormat { found: 9, expected: 1 }
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            ModelArtifact::from_json_str("not json"),
            Err(ModelLoadError::Parse { .. })
        ));
        assert!(matches!(
            ModelArtifact::from_json_str(r#"{"format_version": 1, "pipeline": {}}"#),
            Err(ModelLoadError::Parse { .. })
        ));
    }
}
