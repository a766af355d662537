// image.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Image data decoding into a shared map of pixel blocks
use crate::bits::{BitReader, MAX_CODE_BITS};
use crate::error::{Error, Result};
use crate::table::{Code, CodeTable, PixelBlock};
use std::collections::HashMap;
use std::convert::TryFrom;

/// Deduplicated, append-only store of every distinct [PixelBlock] decoded
/// from one GIF.
///
/// Indices are stable once assigned; frames refer to blocks by index.
#[derive(Debug, Default)]
pub struct ImageMap {
    /// Blocks, in order of first appearance
    blocks: Vec<PixelBlock>,
    /// Index of each distinct block (by expanded value)
    index: HashMap<PixelBlock, u32>,
}

impl ImageMap {
    /// Create an empty image map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an image map from stored blocks, keeping their indices
    pub fn from_blocks(blocks: Vec<PixelBlock>) -> Result<Self> {
        let mut index = HashMap::with_capacity(blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            index.entry(block.clone()).or_insert(u32::try_from(i)?);
        }
        Ok(ImageMap { blocks, index })
    }

    /// Get the number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get a block by index
    pub fn get(&self, idx: u32) -> Option<&PixelBlock> {
        self.blocks.get(idx as usize)
    }

    /// Get all blocks
    pub fn blocks(&self) -> &[PixelBlock] {
        &self.blocks
    }

    /// Get the index of a block, appending it if not yet present
    pub fn insert(&mut self, block: &PixelBlock) -> Result<u32> {
        if let Some(idx) = self.index.get(block) {
            return Ok(*idx);
        }
        let idx = u32::try_from(self.blocks.len())?;
        self.blocks.push(block.clone());
        self.index.insert(block.clone(), idx);
        Ok(idx)
    }

    /// Expand a sequence of indices into pixels
    pub fn expand(&self, image_data: &[u32]) -> Result<Vec<bool>> {
        let mut pixels = Vec::new();
        for idx in image_data {
            let block = self.get(*idx).ok_or(Error::MalformedCache)?;
            pixels.extend(block.bits());
        }
        Ok(pixels)
    }
}

/// Decoder state
#[derive(Clone, Debug)]
enum State {
    /// Accumulating codes; holds the value of the previous code
    Normal(Vec<u8>),
    /// Table just reset; next code has no predecessor
    Cleared,
    /// Draining pending codes; decoding is finished
    Flushing,
}

/// Decoder for the LZW data of one image block.
///
/// Codes are queued as they are read, and resolved into image map indices
/// whenever a clear code, the end code or the end of the data is reached.
pub struct ImageDecoder<'a> {
    /// Code reader
    reader: BitReader<'a>,
    /// Code dictionary
    table: CodeTable,
    /// Code bits after a reset
    min_code_bits: u8,
    /// Current code bits
    code_bits: u8,
    /// Codes read but not yet resolved
    pending: Vec<Code>,
    /// Pixels not yet decoded
    remaining: usize,
    /// Current state
    state: State,
}

impl<'a> ImageDecoder<'a> {
    /// Create a new image decoder.
    ///
    /// * `palette_len`: Number of colors in the palette
    /// * `min_code_bits`: Code bits after a reset (LZW minimum code size + 1)
    /// * `data`: Concatenated image data sub-blocks
    /// * `pixels`: Number of pixels in the image (width * height)
    pub fn new(
        palette_len: usize,
        min_code_bits: u8,
        data: &'a [u8],
        pixels: usize,
    ) -> Result<Self> {
        if min_code_bits < 2 || min_code_bits > MAX_CODE_BITS {
            return Err(Error::InvalidCodeSize(min_code_bits));
        }
        Ok(ImageDecoder {
            reader: BitReader::new(data),
            table: CodeTable::new(palette_len),
            min_code_bits,
            code_bits: min_code_bits,
            pending: Vec::new(),
            remaining: pixels,
            state: State::Cleared,
        })
    }

    /// Decode the image, returning indices into the image map
    pub fn decode(mut self, map: &mut ImageMap) -> Result<Vec<u32>> {
        let mut image_data = Vec::new();
        while !matches!(self.state, State::Flushing) {
            if self.remaining == 0 {
                self.state = State::Flushing;
                break;
            }
            self.grow_code_bits();
            let code = match self.reader.read_code(self.code_bits) {
                Ok(code) => code,
                Err(Error::ExhaustedStream) => {
                    self.state = State::Flushing;
                    break;
                }
                Err(e) => return Err(e),
            };
            trace!("code: {} ({} bits)", code, self.code_bits);
            if self.table.is_end(code) {
                self.state = State::Flushing;
            } else if self.table.is_clear(code) {
                self.flush(map, &mut image_data)?;
                self.reset();
            } else {
                self.push_code(code)?;
            }
        }
        self.flush(map, &mut image_data)?;
        if self.remaining > 0 {
            return Err(Error::IncompleteImageData);
        }
        Ok(image_data)
    }

    /// Grow code bits when the table fills the current width
    fn grow_code_bits(&mut self) {
        if self.table.len() >= 1 << self.code_bits
            && self.code_bits < MAX_CODE_BITS
        {
            self.code_bits += 1;
        }
    }

    /// Reset table after a clear code
    fn reset(&mut self) {
        self.table.reset();
        self.code_bits = self.min_code_bits;
        self.state = State::Cleared;
    }

    /// Push a data code, growing the table
    fn push_code(&mut self, code: Code) -> Result<()> {
        let next_code = self.table.len();
        let c = usize::from(code);
        if c > next_code {
            return Err(Error::InvalidLzwData);
        }
        if c == next_code {
            // code not in table yet: previous value + its first pixel
            let prev = match &self.state {
                State::Normal(prev) => prev,
                _ => return Err(Error::InvalidLzwData),
            };
            let first = *prev.first().ok_or(Error::InvalidLzwData)?;
            let mut value = prev.clone();
            value.push(first);
            self.table.add(&value);
        }
        let value = self.table.get_value(code).ok_or(Error::InvalidLzwData)?;
        let first = *value.first().ok_or(Error::InvalidLzwData)?;
        if value.len() > self.remaining {
            return Err(Error::InvalidLzwData);
        }
        self.remaining -= value.len();
        self.pending.push(code);
        if let State::Normal(prev) = &mut self.state {
            prev.push(first);
            self.table.add(&prev[..]);
        }
        self.state = State::Normal(value);
        Ok(())
    }

    /// Resolve pending codes into image map indices
    fn flush(
        &mut self,
        map: &mut ImageMap,
        image_data: &mut Vec<u32>,
    ) -> Result<()> {
        for code in self.pending.drain(..) {
            let block = self
                .table
                .get_raw_value(code)
                .ok_or(Error::InvalidLzwData)?;
            image_data.push(map.insert(&block)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::table::Chunk;

    fn decode(
        palette_len: usize,
        data: &[u8],
        pixels: usize,
        map: &mut ImageMap,
    ) -> Result<Vec<u32>> {
        ImageDecoder::new(palette_len, 3, data, pixels)?.decode(map)
    }

    #[test]
    fn minimal() -> Result<()> {
        // clear, 0, 1, end
        let mut map = ImageMap::new();
        let data = decode(2, &[0x42, 0x06], 2, &mut map)?;
        assert_eq!(data, [0, 1]);
        assert_eq!(map.len(), 2);
        let off = map.get(0).unwrap();
        assert_eq!(off.chunks(), &[Chunk::Literal(vec![false])]);
        let on = map.get(1).unwrap();
        assert_eq!(on.chunks(), &[Chunk::Literal(vec![true])]);
        assert_eq!(map.expand(&data)?, [false, true]);
        Ok(())
    }

    #[test]
    fn run_of_ones() -> Result<()> {
        // clear, 1, 4, 5, 6, 7, 8, 9, 10, end: 36 "on" pixels, each code
        // one pixel longer than the last (all but the first are KwKwK)
        let mut map = ImageMap::new();
        let data = decode(2, &[10, 235, 99, 234, 0], 36, &mut map)?;
        assert_eq!(data, [0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(map.len(), 8);
        for (i, block) in map.blocks().iter().enumerate() {
            assert_eq!(block.len(), i + 1);
        }
        assert_eq!(map.get(7).unwrap().chunks(), &[Chunk::Packed(0xFF)]);
        assert_eq!(map.expand(&data)?, vec![true; 36]);
        Ok(())
    }

    #[test]
    fn kwkwk() -> Result<()> {
        // clear, 0, 4, end: second code is not in the table yet
        let mut map = ImageMap::new();
        let data = decode(2, &[0x02, 0x07], 3, &mut map)?;
        assert_eq!(map.expand(&data)?, [false, false, false]);
        assert_eq!(data, [0, 1]);
        Ok(())
    }

    #[test]
    fn kwkwk_without_prev() {
        // clear, 4
        let mut map = ImageMap::new();
        let res = decode(2, &[0x22], 1, &mut map);
        assert!(matches!(res, Err(Error::InvalidLzwData)));
    }

    #[test]
    fn code_too_large() {
        // clear, 0, 5
        let mut map = ImageMap::new();
        let res = decode(2, &[0x42, 0x01], 4, &mut map);
        assert!(matches!(res, Err(Error::InvalidLzwData)));
    }

    #[test]
    fn back_to_back_clear() -> Result<()> {
        // clear, 0, clear, clear, 1, end
        let mut map = ImageMap::new();
        let data = decode(2, &[0x82, 0x94, 0x01], 2, &mut map)?;
        assert_eq!(data, [0, 1]);
        assert_eq!(map.len(), 2);
        Ok(())
    }

    #[test]
    fn four_colors() -> Result<()> {
        // clear, 1, 2, 7: code 7 is [2, 2], distinct from [1, 2] at code 6
        let mut map = ImageMap::new();
        let data = decode(4, &[0x8C, 0x0E], 4, &mut map)?;
        assert_eq!(data, [0, 0, 1]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.expand(&data)?, [true; 4]);
        Ok(())
    }

    #[test]
    fn shared_map() -> Result<()> {
        let mut map = ImageMap::new();
        let first = decode(2, &[0x42, 0x06], 2, &mut map)?;
        // clear, 1, 0, end
        let second = decode(2, &[0x0A, 0x06], 2, &mut map)?;
        assert_eq!(first, [0, 1]);
        assert_eq!(second, [1, 0]);
        assert_eq!(map.len(), 2);
        Ok(())
    }

    #[test]
    fn incomplete() {
        let mut map = ImageMap::new();
        let res = decode(2, &[0x42, 0x06], 3, &mut map);
        assert!(matches!(res, Err(Error::IncompleteImageData)));
    }

    #[test]
    fn overflow() {
        // 36 pixels of data into a 30 pixel image
        let mut map = ImageMap::new();
        let res = decode(2, &[10, 235, 99, 234, 0], 30, &mut map);
        assert!(matches!(res, Err(Error::InvalidLzwData)));
    }

    #[test]
    fn missing_end_code() -> Result<()> {
        // clear, 0, 1 with no end code
        let mut map = ImageMap::new();
        let data = decode(2, &[0x42], 2, &mut map)?;
        assert_eq!(data, [0, 1]);
        Ok(())
    }

    #[test]
    fn code_bits_growth() -> Result<()> {
        let mut dec = ImageDecoder::new(2, 3, &[], 0)?;
        dec.grow_code_bits();
        assert_eq!(dec.code_bits, 3);
        let mut n = 0u32;
        let mut last = dec.code_bits;
        while !dec.table.is_full() {
            let v: Vec<u8> = (0..13).map(|i| ((n >> i) & 1) as u8).collect();
            dec.table.add(&v);
            n += 1;
            dec.grow_code_bits();
            assert!(dec.code_bits >= last);
            assert!(dec.table.len() <= 1 << dec.code_bits);
            last = dec.code_bits;
        }
        assert_eq!(dec.code_bits, MAX_CODE_BITS);
        dec.grow_code_bits();
        assert_eq!(dec.code_bits, MAX_CODE_BITS);
        dec.reset();
        assert_eq!(dec.table.len(), 4);
        assert_eq!(dec.code_bits, 3);
        Ok(())
    }

    #[test]
    fn bad_code_size() {
        assert!(matches!(
            ImageDecoder::new(2, 13, &[], 0).err(),
            Some(Error::InvalidCodeSize(13))
        ));
    }

    #[test]
    fn map_dedup() -> Result<()> {
        let mut map = ImageMap::new();
        let a = PixelBlock::from_bits(&[true, false, true]);
        let b = PixelBlock::from_bits(&[true, false]);
        assert_eq!(map.insert(&a)?, 0);
        assert_eq!(map.insert(&b)?, 1);
        assert_eq!(map.insert(&a.clone())?, 0);
        assert_eq!(map.len(), 2);
        assert!(matches!(map.expand(&[2]), Err(Error::MalformedCache)));
        Ok(())
    }

    #[test]
    fn map_from_blocks() -> Result<()> {
        let a = PixelBlock::from_bits(&[true]);
        let b = PixelBlock::from_bits(&[false]);
        let mut map = ImageMap::from_blocks(vec![a.clone(), b])?;
        assert_eq!(map.len(), 2);
        assert_eq!(map.insert(&a)?, 0);
        assert_eq!(map.insert(&PixelBlock::from_bits(&[true; 8]))?, 2);
        Ok(())
    }
}
