//! This module defines the two contracts every part of the library is built on:
//! the [`Transformer`] (a stateful, resettable byte filter) and the [`Source`]
//! (a pull-based byte producer with an explicit end-of-stream signal).

use std::io::{self, Read, Write};

use crate::error::TransformError;

//==================================================================================
// 1. The Transformer Contract
//==================================================================================

/// A stateful unit that converts a chunk of bytes into another chunk of bytes.
///
/// A transformer may hold back undigested input between calls (for example a
/// partial codec unit). It owns that state exclusively and must release all of
/// it into `dst` on the single call where `at_eof` is true.
pub trait Transformer {
    /// Writes the transformed form of `src` into `dst` and returns the number of
    /// bytes written to `dst` (not the number of bytes consumed from `src`).
    ///
    /// * `src` - the next chunk of input. It is only empty on the final call,
    ///   or when an upstream stage produced nothing for this chunk.
    /// * `dst` - append-only sink. Writes are all-or-nothing (`write_all`).
    /// * `at_eof` - true exactly once per stream, on the final call.
    ///
    /// # Errors
    /// Returns a codec-specific error. After a failure the transformer's state is
    /// undefined until [`reset`](Transformer::reset) is called.
    fn transform(
        &mut self,
        src: &[u8],
        dst: &mut dyn Write,
        at_eof: bool,
    ) -> Result<usize, TransformError>;

    /// Clears all retained state, making the instance equivalent to a freshly
    /// constructed one. Stateless transformers can rely on the default no-op.
    fn reset(&mut self) {}

    /// A short name used in log output.
    fn name(&self) -> &str {
        "transformer"
    }
}

impl<T: Transformer + ?Sized> Transformer for Box<T> {
    fn transform(
        &mut self,
        src: &[u8],
        dst: &mut dyn Write,
        at_eof: bool,
    ) -> Result<usize, TransformError> {
        (**self).transform(src, dst, at_eof)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: Transformer + ?Sized> Transformer for &mut T {
    fn transform(
        &mut self,
        src: &[u8],
        dst: &mut dyn Write,
        at_eof: bool,
    ) -> Result<usize, TransformError> {
        (**self).transform(src, dst, at_eof)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

//==================================================================================
// 2. The Upstream Source Contract
//==================================================================================

/// The outcome of a single pull from a [`Source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the front of the caller's buffer.
    Data(usize),
    /// Nothing is available right now, but the stream has not ended.
    Pending,
    /// The stream has ended. Every later pull reports the same.
    Eof,
}

/// A pull-based byte producer.
pub trait Source {
    /// Fills (a prefix of) `buf` with the next bytes of the stream.
    fn pull(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TransformError>;
}

impl<S: Source + ?Sized> Source for &mut S {
    fn pull(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TransformError> {
        (**self).pull(buf)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TransformError> {
        (**self).pull(buf)
    }
}

/// Adapts any [`std::io::Read`] into a [`Source`].
///
/// `Ok(0)` on a non-empty buffer is end-of-stream, `WouldBlock` is reported as
/// [`ReadOutcome::Pending`] and `Interrupted` reads are retried.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Source for ReaderSource<R> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TransformError> {
        if buf.is_empty() {
            return Ok(ReadOutcome::Data(0));
        }
        loop {
            match self.inner.read(buf) {
                Ok(0) => return Ok(ReadOutcome::Eof),
                Ok(n) => return Ok(ReadOutcome::Data(n)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(ReadOutcome::Pending),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Pulls `source` until it ends and collects everything it produced.
/// Pending pulls are retried.
pub fn read_all<S: Source + ?Sized>(source: &mut S) -> Result<Vec<u8>, TransformError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match source.pull(&mut buf)? {
            ReadOutcome::Data(n) => out.extend_from_slice(&buf[..n]),
            ReadOutcome::Pending => continue,
            ReadOutcome::Eof => return Ok(out),
        }
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
