//! Zstandard engine backed by the `zstd` crate's push-style streams.
//!
//! Decompression runs the raw decoder through `zio::Writer`, whose `finish`
//! reports a frame cut off before its end as `UnexpectedEof`.

use std::io;

use zstd::stream::raw;
use zstd::stream::write::Encoder;
use zstd::stream::zio;

use crate::kernels::engine::{
    CodecWriter, CompressionEngine, CompressionTransformer, Direction, EngineHandle, WriterSession,
};

/// Default zstd compression level.
pub const DEFAULT_LEVEL: i32 = 3;

impl CodecWriter for Encoder<'static, Vec<u8>> {
    fn produced(&mut self) -> &mut Vec<u8> {
        self.get_mut()
    }

    // `finish` is essential to finalize the Zstd frame.
    fn finish_stream(self: Box<Self>) -> io::Result<Vec<u8>> {
        (*self).finish()
    }
}

impl CodecWriter for zio::Writer<Vec<u8>, raw::Decoder<'static>> {
    fn produced(&mut self) -> &mut Vec<u8> {
        self.writer_mut()
    }

    /// Fails with `UnexpectedEof` if the last frame is incomplete.
    fn finish_stream(self: Box<Self>) -> io::Result<Vec<u8>> {
        let mut decoder = *self;
        decoder.finish()?;
        Ok(decoder.into_inner().0)
    }
}

pub struct ZstdEngine {
    direction: Direction,
    level: i32,
    session: Option<WriterSession>,
}

impl ZstdEngine {
    pub fn compress(level: i32) -> Self {
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

impl CompressionEngine for ZstdEngine {
    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Compress => "ZstdCompress",
            Direction::Decompress => "ZstdDecompress",
        }
    }

    fn start(&mut self, handle: EngineHandle) {
        let codec: io::Result<Box<dyn CodecWriter>> = match self.direction {
            Direction::Compress => {
                Encoder::new(Vec::new(), self.level).map(|e| Box::new(e) as Box<dyn CodecWriter>)
            }
            Direction::Decompress => raw::Decoder::new()
                .map(|d| Box::new(zio::Writer::new(Vec::new(), d)) as Box<dyn CodecWriter>),
        };
        self.session = Some(WriterSession::open(handle, codec, self.direction));
    }

    fn push(&mut self, chunk: &[u8], is_final: bool) {
        if let Some(session) = self.session.as_mut() {
            session.push(chunk, is_final);
        }
    }
}

/// A zstd-compressing transformer.
pub fn zstd_encoder(level: i32) -> CompressionTransformer<ZstdEngine> {
    CompressionTransformer::new(ZstdEngine::compress(level))
}

/// A zstd-decompressing transformer.
pub fn zstd_decoder() -> CompressionTransformer<ZstdEngine> {
    CompressionTransformer::new(ZstdEngine::decompress())
}

//==================================================================================
// Unit Tests
//==================================================================================
