//! Streaming base64 encoder and decoder.
//!
//! Base64 works in fixed units: 3 raw bytes become 4 characters. Upstream chunk
//! boundaries almost never line up with those units, so both directions hold
//! back the trailing partial unit of each chunk and prepend it to the next one.
//! The alphabet itself (standard, canonical `=` padding) comes from the `base64`
//! crate; this module only handles the alignment.

use std::io::Write;

use arrayvec::ArrayVec;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::TransformError;
use crate::traits::Transformer;

const PAD: u8 = b'=';

//==================================================================================
// 1. Alignment Buffer
//==================================================================================

/// Holds the tail of a stream that does not yet form a whole unit.
///
/// The unit size is `KEEP + 1`, so a full unit can never be retained.
#[derive(Debug, Clone, Default)]
struct UnitBuffer<const KEEP: usize> {
    retained: ArrayVec<u8, KEEP>,
}

impl<const KEEP: usize> UnitBuffer<KEEP> {
    const UNIT: usize = KEEP + 1;

    /// Splits `retained ++ src` into whole units, hands them to `emit` in at most
    /// two contiguous runs and keeps the remainder. Returns the sum of what
    /// `emit` reported.
    fn feed(
        &mut self,
        src: &[u8],
        mut emit: impl FnMut(&[u8]) -> Result<usize, TransformError>,
    ) -> Result<usize, TransformError> {
        let mut written = 0;
        let mut rest = src;

        if !self.retained.is_empty() {
            let need = Self::UNIT - self.retained.len();
            if rest.len() < need {
                self.retain(rest)?;
                return Ok(0);
            }

            let held = self.retained.len();
            let mut unit = [0u8; 4];
            unit[..held].copy_from_slice(&self.retained);
            unit[held..Self::UNIT].copy_from_slice(&rest[..need]);
            self.retained.clear();
            rest = &rest[need..];
            written += emit(&unit[..Self::UNIT])?;
        }

        let aligned = rest.len() - rest.len() % Self::UNIT;
        if aligned > 0 {
            written += emit(&rest[..aligned])?;
        }
        self.retain(&rest[aligned..])?;
        Ok(written)
    }

    fn retain(&mut self, bytes: &[u8]) -> Result<(), TransformError> {
        self.retained.try_extend_from_slice(bytes).map_err(|_| {
            TransformError::InternalError(format!(
                "tried to retain more than {} bytes of a {}-byte unit",
                KEEP,
                Self::UNIT
            ))
        })
    }

    fn take(&mut self) -> ArrayVec<u8, KEEP> {
        std::mem::take(&mut self.retained)
    }

    fn len(&self) -> usize {
        self.retained.len()
    }

    fn clear(&mut self) {
        self.retained.clear();
    }
}

//==================================================================================
// 2. Encoder
//==================================================================================

/// Raw bytes in, base64 text out. Retains at most 2 bytes between calls.
#[derive(Debug, Clone, Default)]
pub struct Base64Encoder {
    units: UnitBuffer<2>,
}

impl Base64Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of raw bytes held back waiting for a full 3-byte unit.
    pub fn retained(&self) -> usize {
        self.units.len()
    }
}

fn write_encoded(dst: &mut dyn Write, bytes: &[u8]) -> Result<usize, TransformError> {
    let text = STANDARD.encode(bytes);
    dst.write_all(text.as_bytes())?;
    Ok(text.len())
}

impl Transformer for Base64Encoder {
    fn transform(
        &mut self,
        src: &[u8],
        dst: &mut dyn Write,
        at_eof: bool,
    ) -> Result<usize, TransformError> {
        let mut written = self.units.feed(src, |run| write_encoded(&mut *dst, run))?;

        if at_eof {
            // 0, 1 or 2 bytes left; the encoder pads them out to a full group.
            let tail = self.units.take();
            if !tail.is_empty() {
                written += write_encoded(dst, &tail)?;
            }
        }
        Ok(written)
    }

    fn reset(&mut self) {
        self.units.clear();
    }

    fn name(&self) -> &str {
        "base64-encode"
    }
}

//==================================================================================
// 3. Decoder
//==================================================================================

/// Base64 text in, raw bytes out. Retains at most 3 characters between calls.
///
/// Input is strict: characters outside the standard alphabet (including
/// whitespace), data after a padded group, and a final group that is not a
/// full 4 characters are all malformed.
#[derive(Debug, Clone, Default)]
pub struct Base64Decoder {
    units: UnitBuffer<3>,
    /// A padded group has been decoded; the stream must end here.
    padded: bool,
}

impl Base64Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of characters held back waiting for a full 4-character unit.
    pub fn retained(&self) -> usize {
        self.units.len()
    }
}

fn malformed(reason: impl Into<String>) -> TransformError {
    TransformError::MalformedInput {
        codec: "base64",
        reason: reason.into(),
    }
}

impl Transformer for Base64Decoder {
    fn transform(
        &mut self,
        src: &[u8],
        dst: &mut dyn Write,
        at_eof: bool,
    ) -> Result<usize, TransformError> {
        if self.padded && !src.is_empty() {
            return Err(malformed("data after padding"));
        }

        let padded = &mut self.padded;
        let written = self.units.feed(src, |run| {
            if *padded {
                return Err(malformed("data after padding"));
            }
            let bytes = STANDARD.decode(run)?;
            *padded = run.last() == Some(&PAD);
            dst.write_all(&bytes)?;
            Ok(bytes.len())
        })?;

        if at_eof && self.units.len() > 0 {
            let leftover = self.units.len();
            self.units.clear();
            return Err(malformed(format!(
                "truncated final group ({} trailing characters)",
                leftover
            )));
        }
        Ok(written)
    }

    fn reset(&mut self) {
        self.units.clear();
        self.padded = false;
    }

    fn name(&self) -> &str {
        "base64-decode"
    }
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
