//! This module holds the composition engine: the chain combinator, the
//! buffered reader adapter and the `Pipeline` convenience wrapper built from both.
//!
//! ```text
//!   upstream Source --(chunk)--> TransformReader --(Chain: stage 0 -> .. -> stage N)--> buffer --> caller
//! ```

//==================================================================================
// 1. Module Declarations
//==================================================================================

mod chain;
mod composed;
mod reader;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================

pub use self::chain::Chain;
pub use self::composed::{pipeline, Pipeline};
pub use self::reader::{transform_all, TransformReader, DEFAULT_CHUNK_SIZE};
