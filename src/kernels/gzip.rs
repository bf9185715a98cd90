//! Gzip engine backed by `flate2`'s push-style (`write`) encoder and decoder.

use std::io;

use flate2::write::{GzDecoder, GzEncoder};
use flate2::Compression;

use crate::kernels::engine::{
    CodecWriter, CompressionEngine, CompressionTransformer, Direction, EngineHandle, WriterSession,
};

/// Default gzip compression level.
pub const DEFAULT_LEVEL: u32 = 6;

impl CodecWriter for GzEncoder<Vec<u8>> {
    fn produced(&mut self) -> &mut Vec<u8> {
        self.get_mut()
    }

    fn finish_stream(self: Box<Self>) -> io::Result<Vec<u8>> {
        (*self).finish()
    }
}

impl CodecWriter for GzDecoder<Vec<u8>> {
    fn produced(&mut self) -> &mut Vec<u8> {
        self.get_mut()
    }

    /// Fails if the CRC trailer does not match.
    fn finish_stream(self: Box<Self>) -> io::Result<Vec<u8>> {
        (*self).finish()
    }
}

pub struct GzipEngine {
    direction: Direction,
    level: u32,
    session: Option<WriterSession>,
}

impl GzipEngine {
    pub fn compress(level: u32) -> Self {
        Self {
            direction: Direction::Compress,
            level,
            session: None,
        }
    }

    pub fn decompress() -> Self {
        Self {
            direction: Direction::Decompress,
            level: DEFAULT_LEVEL,
            session: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl CompressionEngine for GzipEngine {
    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Compress => "Deflate",
            Direction::Decompress => "Inflate",
        }
    }

    fn start(&mut self, handle: EngineHandle) {
        let codec: Box<dyn CodecWriter> = match self.direction {
            Direction::Compress => Box::new(GzEncoder::new(Vec::new(), Compression::new(self.level))),
            Direction::Decompress => Box::new(GzDecoder::new(Vec::new())),
        };
        self.session = Some(WriterSession::open(handle, Ok(codec), self.direction));
    }

    fn push(&mut self, chunk: &[u8], is_final: bool) {
        if let Some(session) = self.session.as_mut() {
            session.push(chunk, is_final);
        }
    }
}

/// A gzip-compressing transformer.
pub fn gzip_encoder(level: u32) -> CompressionTransformer<GzipEngine> {
    CompressionTransformer::new(GzipEngine::compress(level))
}

/// A gzip-decompressing transformer.
pub fn gzip_decoder() -> CompressionTransformer<GzipEngine> {
    CompressionTransformer::new(GzipEngine::decompress())
}
