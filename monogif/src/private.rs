// private.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! Private module for top-level items
use crate::record::FrameRecord;
use crate::{decode, Result};
use std::io::{BufReader, Read};

/// GIF file decoder
///
/// Can be converted to one of two `Iterator`s:
/// * [into_iter] / [into_frames] for numbered [FrameRecord]s
/// * [into_blocks] for low-level [Block]s
///
/// Every frame is decoded into indices of one shared
/// [ImageMap](struct.ImageMap.html), which is taken from the iterator once
/// decoding is done.
///
/// ## Example: Decode the frames of a GIF
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let gif = &[
/// #   0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00,
/// #   0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
/// #   0xff, 0xff, 0xff, 0x2c, 0x00, 0x00, 0x00, 0x00,
/// #   0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x42,
/// #   0x06, 0x00, 0x3b,
/// # ][..];
/// // ... open a `File` as "gif"
/// let mut frames = monogif::Decoder::new(gif).into_frames();
/// for frame in frames.by_ref() {
///     // was there a decoding error?
///     let (number, record) = frame?;
///     // ... store the record
/// }
/// let image_map = frames.into_image_map();
/// # assert_eq!(image_map.len(), 2);
/// # Ok(())
/// # }
/// ```
///
/// [Block]: block/enum.Block.html
/// [FrameRecord]: struct.FrameRecord.html
/// [into_blocks]: struct.Decoder.html#method.into_blocks
/// [into_frames]: struct.Decoder.html#method.into_frames
/// [into_iter]: struct.Decoder.html#method.into_iter
///
pub struct Decoder<R: Read> {
    /// Reader for input data
    reader: R,
    /// Maximum image size, in pixels
    max_image_sz: Option<usize>,
}

impl<R: Read> Decoder<BufReader<R>> {
    /// Create a new buffered GIF decoder.
    pub fn new(reader: R) -> Self {
        Self::new_unbuffered(BufReader::new(reader))
    }
}

impl<R: Read> Decoder<R> {
    /// Create a new unbuffered GIF decoder.
    pub fn new_unbuffered(reader: R) -> Self {
        Decoder {
            reader,
            max_image_sz: Some(1 << 25),
        }
    }

    /// Set the maximum image size (in pixels) to allow for decoding.
    pub fn max_image_sz(mut self, max_image_sz: Option<usize>) -> Self {
        self.max_image_sz = max_image_sz;
        self
    }

    /// Convert into a block `Iterator`.
    pub fn into_blocks(self) -> decode::Blocks<R> {
        decode::Blocks::new(self.reader, self.max_image_sz)
    }

    /// Convert into a frame `Iterator`.
    pub fn into_frames(self) -> decode::Frames<R> {
        decode::Frames::new(self.into_blocks())
    }
}

impl<R: Read> IntoIterator for Decoder<R> {
    type Item = Result<(usize, FrameRecord)>;
    type IntoIter = decode::Frames<R>;

    /// Convert into a frame `Iterator`
    fn into_iter(self) -> Self::IntoIter {
        self.into_frames()
    }
}
