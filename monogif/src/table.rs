// table.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Bit-packed LZW code dictionary
use crate::bits::MAX_CODE_BITS;
use std::hash::{Hash, Hasher};

/// Code type
pub type Code = u16;

/// Maximum number of entries in a code table
pub const MAX_ENTRIES: usize = 1 << MAX_CODE_BITS;

/// Piece of a bit-packed [PixelBlock]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// Run of exactly 8 pixels; the first pixel is the high bit
    Packed(u8),
    /// Short run of pixels, one `bool` each
    Literal(Vec<bool>),
}

impl Chunk {
    /// Get the number of pixels in the chunk
    pub fn len(&self) -> usize {
        match self {
            Chunk::Packed(_) => 8,
            Chunk::Literal(bits) => bits.len(),
        }
    }

    /// Check if the chunk has no pixels
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get one pixel from the chunk
    fn bit(&self, i: usize) -> bool {
        match self {
            Chunk::Packed(byte) => (byte >> (7 - i)) & 1 != 0,
            Chunk::Literal(bits) => bits[i],
        }
    }
}

/// Sequence of single-bit pixels, bit-packed.
///
/// Each leading run of 8 pixels is stored as one [Chunk::Packed] byte, and a
/// remaining tail of fewer than 8 pixels as a [Chunk::Literal].  Equality and
/// hashing are defined on the expanded pixel sequence, never on the packed
/// form.
#[derive(Clone, Debug, Default)]
pub struct PixelBlock {
    chunks: Vec<Chunk>,
}

impl PixelBlock {
    /// Pack a pixel sequence
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut chunks = Vec::with_capacity(bits.len() / 8 + 1);
        let mut runs = bits.chunks_exact(8);
        for run in &mut runs {
            let byte = run.iter().fold(0, |b, &p| (b << 1) | u8::from(p));
            chunks.push(Chunk::Packed(byte));
        }
        let tail = runs.remainder();
        if !tail.is_empty() {
            chunks.push(Chunk::Literal(tail.to_vec()));
        }
        PixelBlock { chunks }
    }

    /// Create a block from already packed chunks
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        PixelBlock { chunks }
    }

    /// Get the packed chunks
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Get the number of pixels
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    /// Check if the block has no pixels
    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(Chunk::is_empty)
    }

    /// Iterate over the expanded pixels
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.chunks
            .iter()
            .flat_map(|c| (0..c.len()).map(move |i| c.bit(i)))
    }

    /// Expand into a flat pixel sequence
    pub fn to_bits(&self) -> Vec<bool> {
        self.bits().collect()
    }

    /// Get the first pixel
    pub fn first(&self) -> Option<bool> {
        self.bits().next()
    }
}

impl PartialEq for PixelBlock {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.bits().eq(other.bits())
    }
}

impl Eq for PixelBlock {}

impl Hash for PixelBlock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for bit in self.bits() {
            bit.hash(state);
        }
    }
}

/// Maximum number of palette entries
pub const MAX_COLORS: usize = 256;

/// Value of a code table entry.
///
/// Values holding only palette indices 0 and 1 are bit-packed; any others
/// keep every index, so distinct colors never compare equal.
#[derive(Debug)]
enum Entry {
    /// Indices 0 and 1 only
    Bits(PixelBlock),
    /// Any palette indices
    Colors(Vec<u8>),
}

impl Entry {
    fn new(value: &[u8]) -> Self {
        if value.iter().all(|v| *v <= 1) {
            let bits: Vec<bool> = value.iter().map(|v| *v != 0).collect();
            Entry::Bits(PixelBlock::from_bits(&bits))
        } else {
            Entry::Colors(value.to_vec())
        }
    }

    fn eq_value(&self, value: &[u8]) -> bool {
        match self {
            Entry::Bits(block) => {
                block.len() == value.len()
                    && block.bits().map(u8::from).eq(value.iter().copied())
            }
            Entry::Colors(colors) => colors[..] == *value,
        }
    }

    fn to_value(&self) -> Vec<u8> {
        match self {
            Entry::Bits(block) => block.bits().map(u8::from).collect(),
            Entry::Colors(colors) => colors.clone(),
        }
    }

    /// Reduce to on/off pixels
    fn pixel_block(&self) -> PixelBlock {
        match self {
            Entry::Bits(block) => block.clone(),
            Entry::Colors(colors) => {
                let bits: Vec<bool> = colors.iter().map(|c| *c != 0).collect();
                PixelBlock::from_bits(&bits)
            }
        }
    }
}

/// LZW code table.
///
/// Codes `0..palette_len` are single palette indices, followed by the clear
/// and end codes.  Codes added while decoding are deduplicated: a value
/// equal to an existing (non-seeded) entry is never appended twice.
#[derive(Debug)]
pub struct CodeTable {
    /// Table entries
    entries: Vec<Entry>,
    /// Number of palette entries
    palette_len: usize,
}

impl CodeTable {
    /// Create a new code table seeded for a palette
    pub fn new(palette_len: usize) -> Self {
        let palette_len = palette_len.min(MAX_COLORS);
        let mut table = CodeTable {
            entries: Vec::with_capacity(MAX_ENTRIES),
            palette_len,
        };
        table.reset();
        table
    }

    /// Reset to the seeded state
    pub fn reset(&mut self) {
        self.entries.clear();
        for i in 0..self.palette_len {
            self.entries.push(Entry::new(&[i as u8]));
        }
        self.entries.push(Entry::new(&[])); // clear code
        self.entries.push(Entry::new(&[])); // end code
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty (never true)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the table cannot grow any more
    pub fn is_full(&self) -> bool {
        self.len() >= MAX_ENTRIES
    }

    /// Get the clear code
    pub fn clear_code(&self) -> Code {
        self.palette_len as Code
    }

    /// Get the end code
    pub fn end_code(&self) -> Code {
        self.clear_code() + 1
    }

    /// Check for the clear code
    pub fn is_clear(&self, code: Code) -> bool {
        code == self.clear_code()
    }

    /// Check for the end code
    pub fn is_end(&self, code: Code) -> bool {
        code == self.end_code()
    }

    /// Add a value of palette indices, unless an equal one was already
    /// added.
    ///
    /// Returns `true` if the value was appended.
    pub fn add(&mut self, value: &[u8]) -> bool {
        if self.is_full() {
            return false;
        }
        let start = usize::from(self.end_code()) + 1;
        if self.entries[start..].iter().any(|e| e.eq_value(value)) {
            return false;
        }
        self.entries.push(Entry::new(value));
        true
    }

    /// Get the palette indices of a code
    pub fn get_value(&self, code: Code) -> Option<Vec<u8>> {
        self.entries.get(usize::from(code)).map(Entry::to_value)
    }

    /// Get the packed on/off pixels of a code
    pub fn get_raw_value(&self, code: Code) -> Option<PixelBlock> {
        self.entries.get(usize::from(code)).map(Entry::pixel_block)
    }
}
