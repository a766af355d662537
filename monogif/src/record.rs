// record.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Frame records and their binary cache encoding
use crate::block::{Delay, ImageDesc};
use crate::error::{Error, Result};
use crate::image::ImageMap;
use crate::table::{Chunk, PixelBlock};
use std::convert::TryFrom;
use std::io::{ErrorKind, Read, Write};

/// Chunk tag for a packed byte
const TAG_PACKED: u8 = 0;

/// Chunk tag for a literal run
const TAG_LITERAL: u8 = 1;

/// One decoded frame, ready for playback.
///
/// The pixels of the frame are found by expanding each index of
/// `image_data` through the shared [ImageMap](struct.ImageMap.html).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameRecord {
    /// Delay from the preceding graphic control extension
    pub play_delay: Option<Delay>,
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Left edge on the screen
    pub left: u16,
    /// Top edge on the screen
    pub top: u16,
    /// Indices into the image map
    pub image_data: Vec<u32>,
}

impl FrameRecord {
    /// Create a frame record from an image descriptor
    pub fn new(
        play_delay: Option<Delay>,
        desc: &ImageDesc,
        image_data: Vec<u32>,
    ) -> Self {
        FrameRecord {
            play_delay,
            width: desc.width(),
            height: desc.height(),
            left: desc.left(),
            top: desc.top(),
            image_data,
        }
    }

    /// Get the number of pixels in the frame
    pub fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Expand into pixels, in row-major order
    pub fn expand(&self, map: &ImageMap) -> Result<Vec<bool>> {
        let pixels = map.expand(&self.image_data)?;
        if pixels.len() != self.pixel_count() {
            return Err(Error::MalformedCache);
        }
        Ok(pixels)
    }

    /// Write the record in cache format
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        match self.play_delay {
            Some(delay) => {
                write_bytes(&mut w, &[1])?;
                write_bytes(&mut w, &delay.bytes())?;
            }
            None => write_bytes(&mut w, &[0])?,
        }
        write_bytes(&mut w, &self.width.to_le_bytes())?;
        write_bytes(&mut w, &self.height.to_le_bytes())?;
        write_bytes(&mut w, &self.left.to_le_bytes())?;
        write_bytes(&mut w, &self.top.to_le_bytes())?;
        let count = u32::try_from(self.image_data.len())?;
        write_bytes(&mut w, &count.to_le_bytes())?;
        for idx in &self.image_data {
            write_bytes(&mut w, &idx.to_le_bytes())?;
        }
        Ok(())
    }

    /// Read a record in cache format
    pub fn read_from<R: Read>(mut r: R) -> Result<Self> {
        let play_delay = match read_u8(&mut r)? {
            0 => None,
            1 => {
                let mut buf = [0; 2];
                read_bytes(&mut r, &mut buf)?;
                Some(Delay::from(buf))
            }
            _ => return Err(Error::MalformedCache),
        };
        let width = read_u16(&mut r)?;
        let height = read_u16(&mut r)?;
        let left = read_u16(&mut r)?;
        let top = read_u16(&mut r)?;
        let count = usize::try_from(read_u32(&mut r)?)?;
        // every index covers at least one pixel
        if count > usize::from(width) * usize::from(height) {
            return Err(Error::MalformedCache);
        }
        let mut image_data = Vec::with_capacity(count);
        for _ in 0..count {
            image_data.push(read_u32(&mut r)?);
        }
        Ok(FrameRecord {
            play_delay,
            width,
            height,
            left,
            top,
            image_data,
        })
    }
}

impl ImageMap {
    /// Write the map in cache format
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        let count = u32::try_from(self.len())?;
        write_bytes(&mut w, &count.to_le_bytes())?;
        for block in self.blocks() {
            let chunks = u16::try_from(block.chunks().len())?;
            write_bytes(&mut w, &chunks.to_le_bytes())?;
            for chunk in block.chunks() {
                match chunk {
                    Chunk::Packed(byte) => {
                        write_bytes(&mut w, &[TAG_PACKED, *byte])?
                    }
                    Chunk::Literal(bits) => {
                        let len = u8::try_from(bits.len())?;
                        write_bytes(&mut w, &[TAG_LITERAL, len])?;
                        for bit in bits {
                            write_bytes(&mut w, &[u8::from(*bit)])?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Read a map in cache format
    pub fn read_from<R: Read>(mut r: R) -> Result<Self> {
        let count = read_u32(&mut r)?;
        let mut blocks = Vec::new();
        for _ in 0..count {
            let n_chunks = read_u16(&mut r)?;
            let mut chunks = Vec::with_capacity(n_chunks.into());
            for _ in 0..n_chunks {
                chunks.push(read_chunk(&mut r)?);
            }
            blocks.push(PixelBlock::from_chunks(chunks));
        }
        ImageMap::from_blocks(blocks)
    }
}

/// Read one chunk of a pixel block
fn read_chunk<R: Read>(r: &mut R) -> Result<Chunk> {
    match read_u8(r)? {
        TAG_PACKED => Ok(Chunk::Packed(read_u8(r)?)),
        TAG_LITERAL => {
            let len = read_u8(r)?;
            let mut bits = Vec::with_capacity(len.into());
            for _ in 0..len {
                match read_u8(r)? {
                    0 => bits.push(false),
                    1 => bits.push(true),
                    _ => return Err(Error::MalformedCache),
                }
            }
            Ok(Chunk::Literal(bits))
        }
        _ => Err(Error::MalformedCache),
    }
}

fn write_bytes<W: Write>(w: &mut W, buf: &[u8]) -> Result<()> {
    w.write_all(buf).map_err(Error::StorageFailure)
}

fn read_bytes<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::MalformedCache,
        _ => Error::StorageFailure(e),
    })
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0; 1];
    read_bytes(r, &mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut buf = [0; 2];
    read_bytes(r, &mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0; 4];
    read_bytes(r, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
