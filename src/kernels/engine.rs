// In: src/kernels/engine.rs

//! The boundary between the transform core and an external compression engine.
//!
//! The core only needs three primitives from an engine:
//!
//! 1. `push(chunk, is_final)` to feed it input,
//! 2. an on-data callback ([`EngineHandle::emit`]) for whatever it produced,
//! 3. an on-completion callback ([`EngineHandle::complete`]) fired exactly once
//!    per session with a status code.
//!
//! [`CompressionTransformer`] adapts any [`CompressionEngine`] to the
//! [`Transformer`] contract. Completion travels over a one-shot channel, and the
//! transformer blocks on it only on the final call, so engines that finish on a
//! different thread work just as well as engines that finish inside `push`.

use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError};

use crate::error::TransformError;
use crate::traits::Transformer;

//==================================================================================
// 1. Status Codes
//==================================================================================

/// zlib-style status codes reported by engine sessions.
pub mod status {
    pub const Z_OK: i32 = 0;
    pub const Z_STREAM_ERROR: i32 = -2;
    pub const Z_DATA_ERROR: i32 = -3;
    pub const Z_BUF_ERROR: i32 = -5;

    pub fn name(code: i32) -> &'static str {
        match code {
            Z_OK => "Z_OK",
            Z_STREAM_ERROR => "Z_STREAM_ERROR",
            Z_DATA_ERROR => "Z_DATA_ERROR",
            Z_BUF_ERROR => "Z_BUF_ERROR",
            _ => "Z_UNKNOWN",
        }
    }
}

/// How an engine session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Ok,
    Failed { code: i32, description: String },
}

impl EngineStatus {
    pub fn failed(code: i32, detail: impl std::fmt::Display) -> Self {
        EngineStatus::Failed {
            code,
            description: format!("{}: {}", status::name(code), detail),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            EngineStatus::Ok => status::Z_OK,
            EngineStatus::Failed { code, .. } => *code,
        }
    }
}

/// Which way an engine session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Compress,
    Decompress,
}

//==================================================================================
// 2. The Engine Contract
//==================================================================================

/// The callbacks an engine session reports through.
pub struct EngineHandle {
    data: Sender<Vec<u8>>,
    done: Option<SyncSender<EngineStatus>>,
}

impl EngineHandle {
    /// On-data: hands produced bytes to the core.
    pub fn emit(&self, bytes: &[u8]) {
        if !bytes.is_empty() {
            // The receiving transformer may already have moved on to a new session.
            let _ = self.data.send(bytes.to_vec());
        }
    }

    /// On-completion: ends the session. Only the first call has any effect.
    pub fn complete(&mut self, status: EngineStatus) {
        if let Some(done) = self.done.take() {
            let _ = done.send(status);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.done.is_none()
    }
}

/// A push-driven compression engine.
///
/// Engines report all failures through [`EngineHandle::complete`]; `push`
/// itself never fails.
pub trait CompressionEngine {
    /// Name used in error messages ("Failed to {name} with: ...").
    fn name(&self) -> &'static str;

    /// Opens a fresh session, discarding any previous one.
    fn start(&mut self, handle: EngineHandle);

    /// Feeds the next chunk of input. `is_final` marks the last chunk, after
    /// which the engine must flush and complete the session.
    fn push(&mut self, chunk: &[u8], is_final: bool);
}

//==================================================================================
// 3. Transformer Adapter
//==================================================================================

/// Runs a [`CompressionEngine`] behind the [`Transformer`] contract.
///
/// A failed session is recovered by `reset()`, which opens a new session on
/// the same engine value.
pub struct CompressionTransformer<E> {
    engine: E,
    data: Receiver<Vec<u8>>,
    done: Receiver<EngineStatus>,
    /// A completion that arrived before the final push.
    early_status: Option<EngineStatus>,
}

impl<E: CompressionEngine> CompressionTransformer<E> {
    pub fn new(mut engine: E) -> Self {
        let (data, done) = open_session(&mut engine);
        Self {
            engine,
            data,
            done,
            early_status: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Copies everything the engine has produced so far into `dst`.
    fn copy_produced(&mut self, dst: &mut dyn Write) -> Result<usize, TransformError> {
        let mut written = 0;
        for chunk in self.data.try_iter() {
            dst.write_all(&chunk)?;
            written += chunk.len();
        }
        Ok(written)
    }

    fn check(&self, status: EngineStatus) -> Result<(), TransformError> {
        match status {
            EngineStatus::Ok => Ok(()),
            EngineStatus::Failed { code, description } => {
                log::debug!("{} session failed with status {}", self.engine.name(), code);
                Err(TransformError::Engine {
                    engine: self.engine.name(),
                    status: code,
                    description,
                })
            }
        }
    }
}

fn open_session<E: CompressionEngine>(
    engine: &mut E,
) -> (Receiver<Vec<u8>>, Receiver<EngineStatus>) {
    let (data_tx, data_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::sync_channel(1);
    engine.start(EngineHandle {
        data: data_tx,
        done: Some(done_tx),
    });
    log::trace!("{} session opened", engine.name());
    (data_rx, done_rx)
}

impl<E: CompressionEngine> Transformer for CompressionTransformer<E> {
    fn transform(
        &mut self,
        src: &[u8],
        dst: &mut dyn Write,
        at_eof: bool,
    ) -> Result<usize, TransformError> {
        if !at_eof && src.is_empty() {
            return Ok(0);
        }

        // The session already ended; nothing may be pushed into it.
        if !src.is_empty() && self.early_status == Some(EngineStatus::Ok) {
            return Err(TransformError::MalformedInput {
                codec: self.engine.name(),
                reason: format!("{} bytes of data after end of stream", src.len()),
            });
        }

        self.engine.push(src, at_eof);

        if at_eof {
            let status = match self.early_status.take() {
                Some(status) => status,
                None => self
                    .done
                    .recv()
                    .map_err(|_| TransformError::EngineDisconnected(self.engine.name()))?,
            };
            self.check(status)?;
            return self.copy_produced(dst);
        }

        if self.early_status.is_some() {
            return self.copy_produced(dst);
        }
        match self.done.try_recv() {
            Ok(status @ EngineStatus::Failed { .. }) => return self.check(status).map(|_| 0),
            Ok(status) => self.early_status = Some(status),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                return Err(TransformError::EngineDisconnected(self.engine.name()))
            }
        }
        self.copy_produced(dst)
    }

    fn reset(&mut self) {
        let (data, done) = open_session(&mut self.engine);
        self.data = data;
        self.done = done;
        self.early_status = None;
    }

    fn name(&self) -> &str {
        self.engine.name()
    }
}

//==================================================================================
// 4. Shared Session Driver for `std::io::Write`-style codecs
//==================================================================================

/// A push-style codec that writes its output into an owned `Vec<u8>`.
pub(crate) trait CodecWriter: Write {
    /// The output produced so far. Callers drain it between pushes.
    fn produced(&mut self) -> &mut Vec<u8>;

    /// Flushes the codec's trailer and returns the last of its output.
    fn finish_stream(self: Box<Self>) -> io::Result<Vec<u8>>;
}

/// Drives one [`CodecWriter`] through a session, reporting through an [`EngineHandle`].
pub(crate) struct WriterSession {
    codec: Option<Box<dyn CodecWriter>>,
    handle: EngineHandle,
    /// Status reported for codec errors that are not about truncated input.
    failure_code: i32,
}

impl WriterSession {
    pub(crate) fn open(
        mut handle: EngineHandle,
        codec: io::Result<Box<dyn CodecWriter>>,
        direction: Direction,
    ) -> Self {
        let failure_code = match direction {
            Direction::Compress => status::Z_STREAM_ERROR,
            Direction::Decompress => status::Z_DATA_ERROR,
        };
        let codec = match codec {
            Ok(codec) => Some(codec),
            Err(e) => {
                handle.complete(EngineStatus::failed(status::Z_STREAM_ERROR, e));
                None
            }
        };
        Self {
            codec,
            handle,
            failure_code,
        }
    }

    pub(crate) fn push(&mut self, chunk: &[u8], is_final: bool) {
        let Some(codec) = self.codec.as_mut() else {
            return;
        };

        if let Err(e) = codec.write_all(chunk) {
            self.fail(e);
            return;
        }
        let produced = std::mem::take(codec.produced());
        self.handle.emit(&produced);

        if !is_final {
            return;
        }
        if let Some(codec) = self.codec.take() {
            match codec.finish_stream() {
                Ok(rest) => {
                    self.handle.emit(&rest);
                    self.handle.complete(EngineStatus::Ok);
                }
                Err(e) => self.fail(e),
            }
        }
    }

    fn fail(&mut self, err: io::Error) {
        self.codec = None;
        let code = match err.kind() {
            io::ErrorKind::UnexpectedEof => status::Z_BUF_ERROR,
            _ => self.failure_code,
        };
        self.handle.complete(EngineStatus::failed(code, err));
    }
}

//==================================================================================
// 5. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::transform_all;
    use std::thread;

    /// Echoes input upper-cased and completes from a worker thread on the final push.
    #[derive(Default)]
    struct ThreadedUpper {
        handle: Option<EngineHandle>,
        starts: usize,
    }

    impl CompressionEngine for ThreadedUpper {
        fn name(&self) -> &'static str {
            "Upper"
        }

        fn start(&mut self, handle: EngineHandle) {
            self.handle = Some(handle);
            self.starts += 1;
        }

        fn push(&mut self, chunk: &[u8], is_final: bool) {
            let Some(handle) = self.handle.as_mut() else {
                return;
            };
            handle.emit(&chunk.to_ascii_uppercase());
            if is_final {
                if let Some(mut handle) = self.handle.take() {
                    thread::spawn(move || {
                        handle.emit(b"!");
                        handle.complete(EngineStatus::Ok);
                    });
                }
            }
        }
    }

    /// Rejects any chunk containing a zero byte, immediately.
    #[derive(Default)]
    struct NoZeros {
        handle: Option<EngineHandle>,
    }

    impl CompressionEngine for NoZeros {
        fn name(&self) -> &'static str {
            "NoZeros"
        }

        fn start(&mut self, handle: EngineHandle) {
            self.handle = Some(handle);
        }

        fn push(&mut self, chunk: &[u8], is_final: bool) {
            let Some(handle) = self.handle.as_mut() else {
                return;
            };
            if chunk.contains(&0) {
                handle.complete(EngineStatus::failed(status::Z_DATA_ERROR, "zero byte"));
                return;
            }
            handle.emit(chunk);
            if is_final {
                handle.complete(EngineStatus::Ok);
            }
        }
    }

    /// Drops its handle on the final push without completing.
    #[derive(Default)]
    struct Vanishing {
        handle: Option<EngineHandle>,
    }

    impl CompressionEngine for Vanishing {
        fn name(&self) -> &'static str {
            "Vanishing"
        }

        fn start(&mut self, handle: EngineHandle) {
            self.handle = Some(handle);
        }

        fn push(&mut self, _: &[u8], is_final: bool) {
            if is_final {
                self.handle = None;
            }
        }
    }

    #[test]
    fn test_final_call_waits_for_threaded_completion() {
        let mut t = CompressionTransformer::new(ThreadedUpper::default());
        let mut out = Vec::new();
        assert_eq!(t.transform(b"abc", &mut out, false).unwrap(), 3);
        assert_eq!(t.transform(b"de", &mut out, true).unwrap(), 3);
        assert_eq!(out, b"ABCDE!");
    }

    #[test]
    fn test_empty_non_final_chunk_is_not_pushed() {
        let mut t = CompressionTransformer::new(ThreadedUpper::default());
        let mut out = Vec::new();
        assert_eq!(t.transform(b"", &mut out, false).unwrap(), 0);
        assert!(t.engine().handle.is_some());
    }

    #[test]
    fn test_failure_status_is_translated() {
        let mut t = CompressionTransformer::new(NoZeros::default());
        let mut out = Vec::new();
        match t.transform(&[1, 0, 2], &mut out, false) {
            Err(TransformError::Engine {
                engine,
                status: code,
                description,
            }) => {
                assert_eq!(engine, "NoZeros");
                assert_eq!(code, status::Z_DATA_ERROR);
                assert_eq!(description, "Z_DATA_ERROR: zero byte");
            }
            other => panic!("Expected an engine error, got {:?}", other),
        }
    }

    #[test]
    fn test_reset_recovers_a_failed_session() {
        let mut t = CompressionTransformer::new(NoZeros::default());
        assert!(transform_all(&mut t, &[0]).is_err());
        // transform_all resets first, so the same transformer works again.
        assert_eq!(transform_all(&mut t, b"ok").unwrap(), b"ok");
    }

    #[test]
    fn test_reset_opens_a_new_session() {
        let mut t = CompressionTransformer::new(ThreadedUpper::default());
        t.reset();
        t.reset();
        assert_eq!(t.engine().starts, 3);
    }

    #[test]
    fn test_dropped_completion_is_reported() {
        let mut t = CompressionTransformer::new(Vanishing::default());
        let mut out = Vec::new();
        assert!(matches!(
            t.transform(b"x", &mut out, true),
            Err(TransformError::EngineDisconnected("Vanishing"))
        ));
    }

    /// Emits its first chunk and ends the session right away.
    #[derive(Default)]
    struct OneShot {
        handle: Option<EngineHandle>,
    }

    impl CompressionEngine for OneShot {
        fn name(&self) -> &'static str {
            "OneShot"
        }

        fn start(&mut self, handle: EngineHandle) {
            self.handle = Some(handle);
        }

        fn push(&mut self, chunk: &[u8], _: bool) {
            if let Some(mut handle) = self.handle.take() {
                handle.emit(chunk);
                handle.complete(EngineStatus::Ok);
            }
        }
    }

    #[test]
    fn test_input_after_early_completion_is_rejected() {
        let mut t = CompressionTransformer::new(OneShot::default());
        let mut out = Vec::new();
        assert_eq!(t.transform(b"first", &mut out, false).unwrap(), 5);
        match t.transform(b"second", &mut out, false) {
            Err(TransformError::MalformedInput { codec, reason }) => {
                assert_eq!(codec, "OneShot");
                assert!(reason.contains("after end of stream"));
            }
            other => panic!("Expected trailing data to be rejected, got {:?}", other),
        }
        assert_eq!(out, b"first");
    }

    #[test]
    fn test_early_completion_with_empty_final_call_succeeds() {
        let mut t = CompressionTransformer::new(OneShot::default());
        let mut out = Vec::new();
        assert_eq!(t.transform(b"only", &mut out, false).unwrap(), 4);
        assert_eq!(t.transform(b"", &mut out, true).unwrap(), 0);
        assert_eq!(out, b"only");
    }

    #[test]
    fn test_handle_completes_only_once() {
        let (data, _data_rx) = mpsc::channel();
        let (done, done_rx) = mpsc::sync_channel(1);
        let mut handle = EngineHandle {
            data,
            done: Some(done),
        };
        handle.complete(EngineStatus::Ok);
        handle.complete(EngineStatus::failed(status::Z_BUF_ERROR, "late"));
        assert!(handle.is_complete());
        assert_eq!(done_rx.recv().unwrap(), EngineStatus::Ok);
        assert!(done_rx.try_recv().is_err());
    }
}
