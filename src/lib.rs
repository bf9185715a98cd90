//! This file is the root of the `tambak_stream` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`pipeline`, `kernels`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Re-exporting the types most callers need, so that a streaming pipeline
//!     can be assembled from `tambak_stream::*` alone.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

pub mod config;
pub mod error;
pub mod kernels;
pub mod pipeline;
pub mod traits;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use config::{PipelineConfig, StageSpec};
pub use error::TransformError;
pub use kernels::{
    build_stage, gzip_decoder, gzip_encoder, zstd_decoder, zstd_encoder, Base64Decoder,
    Base64Encoder, CompressionEngine, CompressionTransformer, EngineHandle, EngineStatus,
    GzipEngine, ZstdEngine,
};
pub use observability::enable_verbose_logging;
pub use pipeline::{
    pipeline, transform_all, Chain, Pipeline, TransformReader, DEFAULT_CHUNK_SIZE,
};
pub use traits::{read_all, ReadOutcome, ReaderSource, Source, Transformer};
