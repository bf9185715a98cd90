// In: src/pipeline/composed.rs

//! A thin wrapper around [`Chain`] + [`TransformReader`] that also knows how to
//! drain itself into a sink.

use std::io::{self, Read, Write};

use crate::error::TransformError;
use crate::pipeline::chain::Chain;
use crate::pipeline::reader::{copy_to_sink, TransformReader, DEFAULT_CHUNK_SIZE};
use crate::traits::{ReadOutcome, Source, Transformer};

/// A source whose bytes have been run through every stage of a chain.
pub struct Pipeline<S> {
    reader: TransformReader<S, Chain>,
}

impl<S: Source> Pipeline<S> {
    pub fn new(source: S, chain: Chain) -> Self {
        Self::with_chunk_size(source, chain, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(source: S, chain: Chain, chunk_size: usize) -> Self {
        Self {
            reader: TransformReader::with_chunk_size(source, chain, chunk_size),
        }
    }

    /// Pulls until end-of-stream, writing everything into `sink`.
    /// Returns the total number of bytes transferred.
    ///
    /// # Errors
    /// The first stage, upstream or sink failure ends the drain. Bytes already
    /// written to `sink` stay there and must be treated as partial output.
    pub fn drain_to(&mut self, sink: &mut dyn Write) -> Result<u64, TransformError> {
        let mut buf = vec![0u8; self.reader.chunk_size()];
        let total = copy_to_sink(&mut self.reader, sink, &mut buf)?;
        sink.flush()?;
        log::debug!(
            "pipeline {:?} drained {} bytes from {} upstream bytes",
            self.reader.transformer(),
            total,
            self.reader.bytes_in()
        );
        Ok(total)
    }

    /// Resets every stage and the end-of-input latch. Rewinding upstream is
    /// the caller's job.
    pub fn reset(&mut self) {
        self.reader.reset();
    }

    pub fn is_exhausted(&self) -> bool {
        self.reader.is_exhausted()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    pub fn into_inner(self) -> (S, Chain) {
        self.reader.into_inner()
    }
}

impl<S: Source> Source for Pipeline<S> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TransformError> {
        self.reader.pull(buf)
    }
}

impl<S: Source> Read for Pipeline<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Builds a [`Pipeline`] that applies `stages` in order to `source`.
pub fn pipeline<S: Source>(source: S, stages: Vec<Box<dyn Transformer>>) -> Pipeline<S> {
    Pipeline::new(source, Chain::new(stages))
}
