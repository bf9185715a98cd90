// In: src/pipeline/reader.rs

//! The buffered reader adapter: a [`Transformer`] plus an upstream [`Source`]
//! presented as a new [`Source`].
//!
//! The adapter runs a small state machine per instance:
//!
//! ```text
//!   Priming   (buffer empty, latch open)    -> pull one upstream chunk, transform it
//!   Draining  (buffer non-empty)            -> serve the caller from the buffer
//!   Exhausted (buffer empty, latch closed)  -> Eof, until reset()
//! ```
//!
//! A transformer that produces nothing for a non-final chunk never surfaces as
//! an empty read; the adapter keeps pulling until it has bytes to hand out,
//! upstream is pending, or the stream is over.

use std::io::{self, Read, Write};

use crate::error::TransformError;
use crate::traits::{ReadOutcome, Source, Transformer};

/// Size of the scratch buffer used for upstream reads.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// A [`Source`] that yields the bytes of `source` after passing them through `transformer`.
pub struct TransformReader<S, T> {
    source: S,
    transformer: T,
    /// Transformed output not yet handed to the caller. `buffer[pos..]` is live.
    buffer: Vec<u8>,
    pos: usize,
    scratch: Vec<u8>,
    /// Upstream has reported end-of-stream and the transformer has been flushed.
    at_eof: bool,
    bytes_in: u64,
    bytes_out: u64,
}

impl<S: Source, T: Transformer> TransformReader<S, T> {
    /// Wraps `source`, resetting `transformer` so it starts from a clean state.
    pub fn new(source: S, transformer: T) -> Self {
        Self::with_chunk_size(source, transformer, DEFAULT_CHUNK_SIZE)
    }

    /// Same as [`new`](Self::new) with an explicit upstream read size.
    /// A `chunk_size` of zero is treated as one.
    pub fn with_chunk_size(source: S, mut transformer: T, chunk_size: usize) -> Self {
        transformer.reset();
        Self {
            source,
            transformer,
            buffer: Vec::new(),
            pos: 0,
            scratch: vec![0; chunk_size.max(1)],
            at_eof: false,
            bytes_in: 0,
            bytes_out: 0,
        }
    }

    /// Returns to the initial state: buffered output is discarded, the
    /// end-of-input latch is cleared and the transformer is reset.
    /// The upstream position is left as it is.
    pub fn reset(&mut self) {
        self.transformer.reset();
        self.buffer.clear();
        self.pos = 0;
        self.at_eof = false;
        self.bytes_in = 0;
        self.bytes_out = 0;
    }

    /// True once upstream has ended and every transformed byte has been delivered.
    pub fn is_exhausted(&self) -> bool {
        self.at_eof && self.pos == self.buffer.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.scratch.len()
    }

    /// Bytes pulled from upstream since construction or the last reset.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    /// Bytes delivered to the caller since construction or the last reset.
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn transformer(&self) -> &T {
        &self.transformer
    }

    pub fn into_inner(self) -> (S, T) {
        (self.source, self.transformer)
    }

    /// Pulls one upstream chunk and runs it through the transformer.
    /// Returns `Some(Pending)` when upstream has nothing for us right now.
    fn prime(&mut self) -> Result<Option<ReadOutcome>, TransformError> {
        self.buffer.clear();
        self.pos = 0;

        let (len, at_eof) = match self.source.pull(&mut self.scratch)? {
            ReadOutcome::Data(0) | ReadOutcome::Pending => return Ok(Some(ReadOutcome::Pending)),
            ReadOutcome::Data(n) => (n, false),
            ReadOutcome::Eof => (0, true),
        };

        self.at_eof = at_eof;
        self.bytes_in += len as u64;

        let written = self
            .transformer
            .transform(&self.scratch[..len], &mut self.buffer, at_eof)?;
        log::trace!(
            "'{}' turned {} upstream bytes into {} (at_eof={})",
            self.transformer.name(),
            len,
            written,
            at_eof
        );

        if at_eof {
            log_metric!(
                "event" = "upstream_eof",
                "transformer" = self.transformer.name(),
                "bytes_in" = self.bytes_in,
                "bytes_out" = self.bytes_out + self.buffer.len() as u64,
            );
        }
        Ok(None)
    }
}

impl<S: Source, T: Transformer> Source for TransformReader<S, T> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TransformError> {
        if buf.is_empty() {
            return Ok(ReadOutcome::Data(0));
        }

        loop {
            let available = &self.buffer[self.pos..];
            if !available.is_empty() {
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                self.pos += n;
                self.bytes_out += n as u64;
                return Ok(ReadOutcome::Data(n));
            }

            if self.at_eof {
                return Ok(ReadOutcome::Eof);
            }

            if let Some(outcome) = self.prime()? {
                return Ok(outcome);
            }
        }
    }
}

/// `Pending` surfaces as `ErrorKind::WouldBlock`; `Eof` as `Ok(0)`.
impl<S: Source, T: Transformer> Read for TransformReader<S, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.pull(buf)? {
            ReadOutcome::Data(n) => Ok(n),
            ReadOutcome::Pending => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            ReadOutcome::Eof => Ok(0),
        }
    }
}

/// Convenience for running a transformer over an in-memory buffer in one shot.
pub fn transform_all<T: Transformer + ?Sized>(
    transformer: &mut T,
    input: &[u8],
) -> Result<Vec<u8>, TransformError> {
    let mut out = Vec::new();
    transformer.reset();
    if !input.is_empty() {
        transformer.transform(input, &mut out, false)?;
    }
    transformer.transform(&[], &mut out, true)?;
    Ok(out)
}

/// Drains `source` into `sink` until end-of-stream, returning the number of
/// bytes written. Pending pulls are retried.
pub(crate) fn copy_to_sink<S: Source + ?Sized>(
    source: &mut S,
    sink: &mut dyn Write,
    buf: &mut [u8],
) -> Result<u64, TransformError> {
    let mut total = 0u64;
    loop {
        match source.pull(buf)? {
            ReadOutcome::Data(n) => {
                sink.write_all(&buf[..n])?;
                total += n as u64;
            }
            ReadOutcome::Pending => std::thread::yield_now(),
            ReadOutcome::Eof => return Ok(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Chain;
    use crate::traits::{read_all, ReaderSource};
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Yields pre-cut chunks, one per pull, with optional `Pending` gaps.
    struct ScriptedSource {
        script: VecDeque<ReadOutcome>,
        chunks: VecDeque<Vec<u8>>,
    }

    impl ScriptedSource {
        fn new(items: &[&str]) -> Self {
            Self {
                script: items.iter().map(|s| ReadOutcome::Data(s.len())).collect(),
                chunks: items.iter().map(|s| s.as_bytes().to_vec()).collect(),
            }
        }

        fn with_pending_first(mut self) -> Self {
            self.script.push_front(ReadOutcome::Pending);
            self
        }
    }

    impl Source for ScriptedSource {
        fn pull(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TransformError> {
            match self.script.pop_front() {
                None => Ok(ReadOutcome::Eof),
                Some(ReadOutcome::Data(_)) => {
                    let chunk = self.chunks.pop_front().unwrap_or_default();
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(ReadOutcome::Data(chunk.len()))
                }
                Some(other) => Ok(other),
            }
        }
    }

    /// Replaces every byte with `a`.
    struct Blank;

    impl Transformer for Blank {
        fn transform(&mut self, src: &[u8], dst: &mut dyn Write, _: bool) -> Result<usize, TransformError> {
            let out = vec![b'a'; src.len()];
            dst.write_all(&out)?;
            Ok(out.len())
        }
    }

    /// Swallows everything and only emits a byte count at end-of-stream.
    #[derive(Default)]
    struct CountAtEnd {
        seen: usize,
        resets: usize,
    }

    impl Transformer for CountAtEnd {
        fn transform(&mut self, src: &[u8], dst: &mut dyn Write, at_eof: bool) -> Result<usize, TransformError> {
            self.seen += src.len();
            if !at_eof {
                return Ok(0);
            }
            let text = self.seen.to_string();
            dst.write_all(text.as_bytes())?;
            Ok(text.len())
        }

        fn reset(&mut self) {
            self.seen = 0;
            self.resets += 1;
        }
    }

    /// Fails on the first chunk containing `!`.
    struct RejectBang;

    impl Transformer for RejectBang {
        fn transform(&mut self, src: &[u8], dst: &mut dyn Write, _: bool) -> Result<usize, TransformError> {
            if src.contains(&b'!') {
                return Err(TransformError::MalformedInput {
                    codec: "test",
                    reason: "bang".to_string(),
                });
            }
            dst.write_all(src)?;
            Ok(src.len())
        }
    }

    #[test]
    fn test_basic_transformer_over_scripted_chunks() {
        let source = ScriptedSource::new(&["deno.land", "\n", "transformer"]);
        let mut reader = TransformReader::new(source, Blank);
        assert_eq!(read_all(&mut reader).unwrap(), vec![b'a'; 21]);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_zero_output_chunks_do_not_end_the_stream() {
        let source = ScriptedSource::new(&["abc", "de", "f"]);
        let mut reader = TransformReader::new(source, CountAtEnd::default());

        let mut buf = [0u8; 16];
        assert_eq!(reader.pull(&mut buf).unwrap(), ReadOutcome::Data(1));
        assert_eq!(&buf[..1], b"6");
        assert_eq!(reader.pull(&mut buf).unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn test_eof_is_terminal_until_reset() {
        let mut reader = TransformReader::new(ScriptedSource::new(&["x"]), Blank);
        let mut buf = [0u8; 4];
        assert_eq!(reader.pull(&mut buf).unwrap(), ReadOutcome::Data(1));
        for _ in 0..3 {
            assert_eq!(reader.pull(&mut buf).unwrap(), ReadOutcome::Eof);
        }
    }

    #[test]
    fn test_small_caller_buffers_drain_in_order() {
        let source = ReaderSource::new(Cursor::new(b"abcdefghij".to_vec()));
        let mut reader = TransformReader::new(source, Chain::default());

        let mut collected = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            match reader.pull(&mut buf).unwrap() {
                ReadOutcome::Data(n) => {
                    assert!(n <= 3);
                    collected.extend_from_slice(&buf[..n]);
                }
                ReadOutcome::Pending => panic!("in-memory source never pends"),
                ReadOutcome::Eof => break,
            }
        }
        assert_eq!(collected, b"abcdefghij");
        assert_eq!(reader.bytes_in(), 10);
        assert_eq!(reader.bytes_out(), 10);
    }

    #[test]
    fn test_pending_is_passed_through_and_distinct_from_eof() {
        let source = ScriptedSource::new(&["ab"]).with_pending_first();
        let mut reader = TransformReader::new(source, Blank);

        let mut buf = [0u8; 4];
        assert_eq!(reader.pull(&mut buf).unwrap(), ReadOutcome::Pending);
        assert_eq!(reader.pull(&mut buf).unwrap(), ReadOutcome::Data(2));
        assert_eq!(reader.pull(&mut buf).unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn test_io_read_maps_pending_to_would_block() {
        let source = ScriptedSource::new(&["ab"]).with_pending_first();
        let mut reader = TransformReader::new(source, Blank);
        let mut buf = [0u8; 4];
        let err = Read::read(&mut reader, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"aa");
    }

    #[test]
    fn test_construction_and_reset_reset_the_transformer() {
        let mut counter = CountAtEnd::default();
        counter.seen = 99;
        {
            let mut reader = TransformReader::new(ScriptedSource::new(&["abcd"]), &mut counter);
            assert_eq!(read_all(&mut reader).unwrap(), b"4");
            reader.reset();
            assert!(!reader.is_exhausted());
        }
        assert_eq!(counter.resets, 2);
    }

    #[test]
    fn test_transformer_failure_propagates_without_retry() {
        let source = ScriptedSource::new(&["ok", "bad!", "never"]);
        let mut reader = TransformReader::new(source, RejectBang);

        let mut buf = [0u8; 8];
        assert_eq!(reader.pull(&mut buf).unwrap(), ReadOutcome::Data(2));
        assert!(matches!(
            reader.pull(&mut buf),
            Err(TransformError::MalformedInput { codec: "test", .. })
        ));
        assert_eq!(reader.bytes_out(), 2);
    }

    /// Records the length and flag of every call it receives.
    #[derive(Default)]
    struct CallLog {
        calls: Vec<(usize, bool)>,
    }

    impl Transformer for CallLog {
        fn transform(&mut self, src: &[u8], dst: &mut dyn Write, at_eof: bool) -> Result<usize, TransformError> {
            self.calls.push((src.len(), at_eof));
            dst.write_all(src)?;
            Ok(src.len())
        }
    }

    #[test]
    fn test_transform_all_sends_empty_input_only_with_eof() {
        let mut log = CallLog::default();
        assert!(transform_all(&mut log, b"").unwrap().is_empty());
        assert_eq!(log.calls, vec![(0, true)]);

        let mut log = CallLog::default();
        assert_eq!(transform_all(&mut log, b"xy").unwrap(), b"xy");
        assert_eq!(log.calls, vec![(2, false), (0, true)]);
    }

    #[test]
    fn test_transform_all_flushes() {
        let mut counter = CountAtEnd::default();
        assert_eq!(transform_all(&mut counter, b"hello").unwrap(), b"5");
    }
}
