//! This module serves as the public API and dispatcher for the collection of
//! concrete transformers.
//!
//! It declares all kernel sub-modules and provides a single `build_stage`
//! function that turns a stage description from a pipeline config into a
//! ready-to-chain transformer.

use crate::config::StageSpec;
use crate::traits::Transformer;

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Text Encoding (alignment-buffered)
pub mod base64;

/// External Engine Boundary
pub mod engine;

/// Compression Engines
pub mod gzip;
pub mod zstd;

pub use self::base64::{Base64Decoder, Base64Encoder};
pub use self::engine::{CompressionEngine, CompressionTransformer, EngineHandle, EngineStatus};
pub use self::gzip::{gzip_decoder, gzip_encoder, GzipEngine};
pub use self::zstd::{zstd_decoder, zstd_encoder, ZstdEngine};

//==================================================================================
// 2. Public API (Unified Dispatcher)
//==================================================================================

/// Builds a fresh transformer for one pipeline stage.
pub fn build_stage(stage: &StageSpec) -> Box<dyn Transformer> {
    match *stage {
        StageSpec::Base64Encode => Box::new(Base64Encoder::new()),
        StageSpec::Base64Decode => Box::new(Base64Decoder::new()),
        StageSpec::GzipEncode { level } => Box::new(gzip_encoder(level)),
        StageSpec::GzipDecode => Box::new(gzip_decoder()),
        StageSpec::ZstdEncode { level } => Box::new(zstd_encoder(level)),
        StageSpec::ZstdDecode => Box::new(zstd_decoder()),
    }
}
