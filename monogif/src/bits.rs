// bits.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Variable-width code reader for LZW image data
use crate::error::{Error, Result};

/// Maximum code bits allowed for GIF
pub const MAX_CODE_BITS: u8 = 12;

/// Reader for variable-width codes packed into a byte slice.
///
/// Codes are packed least-significant bit first: bit 0 of the first byte is
/// bit 0 of the first code, and codes span byte boundaries freely.
#[derive(Debug)]
pub struct BitReader<'a> {
    /// Packed code data
    buf: &'a [u8],
    /// Position, in bits
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader
    pub fn new(buf: &'a [u8]) -> Self {
        BitReader { buf, pos: 0 }
    }

    /// Get the number of bits not yet consumed
    pub fn remaining(&self) -> usize {
        (self.buf.len() * 8).saturating_sub(self.pos)
    }

    /// Check if every bit has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Read one code of `width` bits.
    ///
    /// If fewer than `width` bits remain, the missing high bits read as
    /// zero.  Once every bit has been consumed, `ExhaustedStream` is
    /// returned.
    pub fn read_code(&mut self, width: u8) -> Result<u16> {
        if width == 0 || width > MAX_CODE_BITS {
            return Err(Error::InvalidCodeSize(width));
        }
        if self.is_exhausted() {
            return Err(Error::ExhaustedStream);
        }
        let mut code = 0;
        for bit in 0..width {
            if self.is_exhausted() {
                break;
            }
            let byte = self.buf[self.pos / 8];
            let b = (byte >> (self.pos % 8)) & 1;
            code |= u16::from(b) << bit;
            self.pos += 1;
        }
        Ok(code)
    }
}
