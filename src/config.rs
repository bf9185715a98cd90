// In: src/config.rs

//! The single source of truth for pipeline configuration.
//!
//! A `PipelineConfig` describes the upstream read size and the ordered list of
//! stages to apply. It is usually loaded from JSON at the application boundary:
//!
//! ```json
//! {
//!   "chunk_size": 65536,
//!   "stages": [
//!     { "op": "gzip_decode" },
//!     { "op": "base64_encode" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::kernels;
use crate::pipeline::{Chain, Pipeline, DEFAULT_CHUNK_SIZE};
use crate::traits::Source;

//==================================================================================
// I. Stage Descriptions
//==================================================================================

/// One stage of a pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "op", content = "params", rename_all = "snake_case")]
pub enum StageSpec {
    Base64Encode,
    Base64Decode,
    GzipEncode {
        #[serde(default = "default_gzip_level")]
        level: u32,
    },
    GzipDecode,
    ZstdEncode {
        #[serde(default = "default_zstd_level")]
        level: i32,
    },
    ZstdDecode,
}

//==================================================================================
// II. The Unified PipelineConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Size of each upstream read, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Stages applied in order. An empty list passes bytes through unchanged.
    #[serde(default)]
    pub stages: Vec<StageSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            stages: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self, TransformError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TransformError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), TransformError> {
        if self.chunk_size == 0 {
            return Err(TransformError::Config("chunk_size must be greater than zero".to_string()));
        }
        for (i, stage) in self.stages.iter().enumerate() {
            match *stage {
                StageSpec::GzipEncode { level } if level > 9 => {
                    return Err(TransformError::Config(format!(
                        "stage {}: gzip level {} is outside 0..=9",
                        i, level
                    )));
                }
                StageSpec::ZstdEncode { level } if !zstd::compression_level_range().contains(&level) => {
                    return Err(TransformError::Config(format!(
                        "stage {}: zstd level {} is outside {:?}",
                        i,
                        level,
                        zstd::compression_level_range()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Builds fresh transformers for every stage.
    pub fn build_chain(&self) -> Chain {
        Chain::new(self.stages.iter().map(kernels::build_stage).collect())
    }

    /// Validates the config and attaches a freshly built chain to `source`.
    pub fn open<S: Source>(&self, source: S) -> Result<Pipeline<S>, TransformError> {
        self.validate()?;
        log::debug!(
            "opening pipeline with {} stage(s), chunk_size={}",
            self.stages.len(),
            self.chunk_size
        );
        Ok(Pipeline::with_chunk_size(source, self.build_chain(), self.chunk_size))
    }
}

/// Provides a sensible default for `chunk_size` for serde.
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_gzip_level() -> u32 {
    kernels::gzip::DEFAULT_LEVEL
}

fn default_zstd_level() -> i32 {
    kernels::zstd::DEFAULT_LEVEL
}
