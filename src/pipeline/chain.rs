// In: src/pipeline/chain.rs

//! The chain combinator: composes an ordered list of transformers into one.
//!
//! A `Chain` is itself a [`Transformer`], so chains nest. Each call threads the
//! input through every stage in order, using a fresh scratch buffer between
//! stages. Retention across calls is each stage's own business; the chain keeps
//! nothing between calls.

use std::io::Write;

use crate::error::TransformError;
use crate::traits::Transformer;

/// A [`Transformer`] that applies its stages in sequence.
///
/// An empty chain is an identity pass-through.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Box<dyn Transformer>>,
}

impl Chain {
    pub fn new(stages: Vec<Box<dyn Transformer>>) -> Self {
        Self { stages }
    }

    /// Appends `stage` as the new last stage.
    pub fn then<T: Transformer + 'static>(mut self, stage: T) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Transformer>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| s.name()))
            .finish()
    }
}

fn stage_failed(index: usize, name: &str, err: TransformError) -> TransformError {
    log::debug!("chain stage {} ('{}') failed: {}", index, name, err);
    err
}

impl Transformer for Chain {
    fn transform(
        &mut self,
        src: &[u8],
        dst: &mut dyn Write,
        at_eof: bool,
    ) -> Result<usize, TransformError> {
        let Some(last) = self.stages.len().checked_sub(1) else {
            dst.write_all(src)?;
            return Ok(src.len());
        };

        let mut carried: Option<Vec<u8>> = None;
        for (i, stage) in self.stages.iter_mut().enumerate() {
            let input = carried.as_deref().unwrap_or(src);

            // Nothing reached this stage and there is nothing to flush.
            if input.is_empty() && !at_eof {
                return Ok(0);
            }

            if i == last {
                return stage
                    .transform(input, dst, at_eof)
                    .map_err(|err| stage_failed(i, stage.name(), err));
            }

            let mut scratch = Vec::new();
            if let Err(err) = stage.transform(input, &mut scratch, at_eof) {
                return Err(stage_failed(i, stage.name(), err));
            }
            carried = Some(scratch);
        }

        Err(TransformError::InternalError(
            "chain finished without reaching its last stage".to_string(),
        ))
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    fn name(&self) -> &str {
        "chain"
    }
}
