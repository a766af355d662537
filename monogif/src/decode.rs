// decode.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! Iterators over GIF blocks and frames
use crate::bits::MAX_CODE_BITS;
use crate::block::*;
use crate::error::{Error, Result};
use crate::image::{ImageDecoder, ImageMap};
use crate::record::FrameRecord;
use std::io::{ErrorKind, Read};

/// Next expected part of the stream
#[derive(Clone, Copy, Debug, PartialEq)]
enum Expected {
    Header,
    GlobalColorTable(usize),
    Body,
    Done,
}

/// An `Iterator` for [Block]s within a GIF file.
///
/// Image blocks are decoded as they are read; every image shares one
/// [ImageMap], which can be taken with [into_image_map] once the trailer is
/// reached.
///
/// Build with Decoder.[into_blocks].
///
/// [Block]: block/enum.Block.html
/// [ImageMap]: struct.ImageMap.html
/// [into_blocks]: struct.Decoder.html#method.into_blocks
/// [into_image_map]: #method.into_image_map
pub struct Blocks<R: Read> {
    /// Reader for input data
    reader: R,
    /// Maximum image size, in pixels
    max_image_sz: Option<usize>,
    /// Buffer for the block being parsed
    buffer: Vec<u8>,
    /// Next expected part
    expected: Expected,
    /// Number of colors in the global color table
    global_len: Option<usize>,
    /// Shared pixel block map
    image_map: ImageMap,
    /// Number of images decoded
    frame_count: usize,
}

impl<R: Read> Iterator for Blocks<R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.expected == Expected::Done {
            return None;
        }
        let res = self.next_block();
        if let Ok(Block::Trailer) | Err(_) = res {
            self.expected = Expected::Done;
        }
        Some(res)
    }
}

impl<R: Read> Blocks<R> {
    /// Create a new block iterator
    pub(crate) fn new(reader: R, max_image_sz: Option<usize>) -> Self {
        Blocks {
            reader,
            max_image_sz,
            buffer: Vec::with_capacity(256 * 3),
            expected: Expected::Header,
            global_len: None,
            image_map: ImageMap::new(),
            frame_count: 0,
        }
    }

    /// Get the shared image map
    pub fn image_map(&self) -> &ImageMap {
        &self.image_map
    }

    /// Take the shared image map
    pub fn into_image_map(self) -> ImageMap {
        self.image_map
    }

    /// Check if the preamble has been read
    fn has_preamble(&self) -> bool {
        matches!(self.expected, Expected::Body | Expected::Done)
    }

    /// Fill the buffer with exactly `sz` bytes
    fn fill(&mut self, sz: usize) -> Result<()> {
        self.buffer.resize(sz, 0);
        let mut len = 0;
        while len < sz {
            match self.reader.read(&mut self.buffer[len..]) {
                Ok(0) => return Err(Error::UnexpectedEndOfFile),
                Ok(n) => len += n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Read one byte
    fn read_u8(&mut self) -> Result<u8> {
        self.fill(1)?;
        Ok(self.buffer[0])
    }

    /// Decode the next block
    fn next_block(&mut self) -> Result<Block> {
        match self.expected {
            Expected::Header => self.decode_header(),
            Expected::GlobalColorTable(sz) => {
                self.fill(sz)?;
                debug!("  block  : GlobalColorTable {}", sz);
                self.expected = Expected::Body;
                Ok(Palette::with_colors(&self.buffer).into())
            }
            Expected::Body => self.decode_body(),
            Expected::Done => Err(Error::UnexpectedEndOfFile),
        }
    }

    /// Decode header and logical screen descriptor
    fn decode_header(&mut self) -> Result<Block> {
        let sz =
            BlockCode::Header_.size() + BlockCode::LogicalScreenDesc_.size();
        self.fill(sz)?;
        let header = GifHeader::from_buf(&self.buffer)?;
        debug!("  block  : {:?}", header);
        let tbl = header.color_table_config();
        if tbl.is_empty() {
            self.expected = Expected::Body;
        } else {
            self.global_len = Some(tbl.len());
            self.expected = Expected::GlobalColorTable(tbl.size_bytes());
        }
        Ok(header.into())
    }

    /// Decode one block after the preamble
    fn decode_body(&mut self) -> Result<Block> {
        let t = self.read_u8()?;
        match BlockCode::from_u8(t) {
            Some(BlockCode::Extension_) => self.decode_extension(),
            Some(BlockCode::ImageDesc_) => self.decode_image(),
            Some(BlockCode::Trailer_) => {
                debug!("  block  : Trailer");
                Ok(Block::Trailer)
            }
            _ => Err(Error::InvalidBlockCode(t)),
        }
    }

    /// Decode an extension block
    fn decode_extension(&mut self) -> Result<Block> {
        let et: ExtensionCode = self.read_u8()?.into();
        debug!("  block  : Extension {:?}", et);
        if let ExtensionCode::GraphicControl_ = et {
            let sz = self.read_u8()?;
            self.fill(sz.into())?;
            let gc = GraphicControl::from_buf(&self.buffer)?;
            let term = self.read_u8()?;
            if term != 0 {
                warn!("Graphic control has extra sub-blocks");
                self.skip_sub_blocks(term)?;
            }
            Ok(gc.into())
        } else {
            let sz = self.read_u8()?;
            self.skip_sub_blocks(sz)?;
            Ok(Block::Extension(et))
        }
    }

    /// Skip a chain of sub-blocks, starting with the first size
    fn skip_sub_blocks(&mut self, mut sz: u8) -> Result<()> {
        while sz > 0 {
            let n = usize::from(sz);
            self.fill(n + 1)?;
            debug!("sub-block: skipped {}", n);
            sz = self.buffer[n];
        }
        Ok(())
    }

    /// Read a chain of sub-blocks into one buffer
    fn read_sub_blocks(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut sz = self.read_u8()?;
        while sz > 0 {
            let n = usize::from(sz);
            self.fill(n + 1)?;
            debug!("sub-block: {}", n);
            data.extend_from_slice(&self.buffer[..n]);
            sz = self.buffer[n];
        }
        Ok(data)
    }

    /// Decode an image block (descriptor, local table and image data)
    fn decode_image(&mut self) -> Result<Block> {
        self.fill(BlockCode::ImageDesc_.size())?;
        let desc = ImageDesc::from_buf(&self.buffer);
        debug!("  block  : {:?}", desc);
        if let Some(sz) = self.max_image_sz {
            if desc.image_sz() > sz {
                return Err(Error::TooLargeImage);
            }
        }
        let local = desc.color_table_config();
        if !local.is_empty() {
            warn!("Local color table skipped ({} colors)", local.len());
            self.fill(local.size_bytes())?;
        }
        if desc.interlaced() {
            warn!("Interlaced image decoded in stream order");
        }
        let palette_len = match (self.global_len, local.len()) {
            (Some(len), _) => len,
            (None, len) if len > 0 => len,
            _ => return Err(Error::MissingColorTable),
        };
        let min_code_size = self.read_u8()?;
        if min_code_size == 0 || min_code_size >= MAX_CODE_BITS {
            return Err(Error::InvalidCodeSize(min_code_size));
        }
        let data = self.read_sub_blocks()?;
        let dec = ImageDecoder::new(
            palette_len,
            min_code_size + 1,
            &data,
            desc.image_sz(),
        )?;
        let image_data = dec.decode(&mut self.image_map)?;
        self.frame_count += 1;
        debug!(
            "image {}: {} indices, map {}",
            self.frame_count,
            image_data.len(),
            self.image_map.len()
        );
        Ok(Image {
            number: self.frame_count,
            desc,
            image_data,
        }
        .into())
    }
}

/// An `Iterator` for frames within a GIF file.
///
/// Each item is the frame number (starting from 1) and its
/// [FrameRecord](struct.FrameRecord.html).  A frame takes the delay of the
/// most recent graphic control extension before it, if any.
///
/// Build with Decoder.[into_frames](struct.Decoder.html#method.into_frames).
pub struct Frames<R: Read> {
    /// Block iterator
    blocks: Blocks<R>,
    /// Preamble blocks
    preamble: Option<Preamble>,
    /// Delay waiting for the next image
    pending_delay: Option<Delay>,
}

impl<R: Read> Iterator for Frames<R> {
    type Item = Result<(usize, FrameRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(block) = self.blocks.next() {
            match block {
                Ok(b) => {
                    if let Some(f) = self.handle_block(b) {
                        return Some(Ok(f));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

impl<R: Read> Frames<R> {
    /// Create a new frame iterator
    pub(crate) fn new(blocks: Blocks<R>) -> Self {
        Frames {
            blocks,
            preamble: None,
            pending_delay: None,
        }
    }

    /// Read preamble blocks.  These are the header and global color table,
    /// at the beginning of the file.
    pub fn preamble(&mut self) -> Result<Option<Preamble>> {
        while !self.blocks.has_preamble() {
            match self.blocks.next() {
                Some(block) => {
                    self.handle_block(block?);
                }
                None => break,
            }
        }
        Ok(self.preamble.clone())
    }

    /// Get the shared image map
    pub fn image_map(&self) -> &ImageMap {
        self.blocks.image_map()
    }

    /// Take the shared image map
    pub fn into_image_map(self) -> ImageMap {
        self.blocks.into_image_map()
    }

    /// Handle one block
    fn handle_block(&mut self, block: Block) -> Option<(usize, FrameRecord)> {
        match block {
            Block::Header(header) => {
                self.preamble = Some(Preamble {
                    header,
                    global_color_table: None,
                });
            }
            Block::GlobalColorTable(tbl) => {
                if let Some(p) = &mut self.preamble {
                    p.global_color_table = Some(tbl);
                }
            }
            Block::GraphicControl(gc) => {
                self.pending_delay = Some(gc.delay());
            }
            Block::Image(image) => {
                let delay = self.pending_delay.take();
                let record =
                    FrameRecord::new(delay, &image.desc, image.image_data);
                return Some((image.number, record));
            }
            Block::Extension(_) | Block::Trailer => {}
        }
        None
    }
}

impl GifHeader {
    /// Decode a Header and Logical Screen Descriptor from a buffer
    fn from_buf(buf: &[u8]) -> Result<Self> {
        if &buf[..3] != b"GIF" {
            return Err(Error::MalformedHeader);
        }
        let version = [buf[3], buf[4], buf[5]];
        match &version {
            b"87a" | b"89a" => (),
            _ => return Err(Error::UnsupportedVersion(version)),
        }
        let width = u16::from_le_bytes([buf[6], buf[7]]);
        let height = u16::from_le_bytes([buf[8], buf[9]]);
        Ok(GifHeader::default()
            .with_version(version)
            .with_screen_width(width)
            .with_screen_height(height)
            .with_flags(buf[10])
            .with_background_color_idx(buf[11])
            .with_pixel_aspect_ratio(buf[12]))
    }
}

impl ImageDesc {
    /// Decode an Image Descriptor from a buffer (after the separator)
    fn from_buf(buf: &[u8]) -> Self {
        let left = u16::from_le_bytes([buf[0], buf[1]]);
        let top = u16::from_le_bytes([buf[2], buf[3]]);
        let width = u16::from_le_bytes([buf[4], buf[5]]);
        let height = u16::from_le_bytes([buf[6], buf[7]]);
        Self::default()
            .with_left(left)
            .with_top(top)
            .with_width(width)
            .with_height(height)
            .with_flags(buf[8])
    }
}

impl GraphicControl {
    /// Decode a Graphic Control extension payload
    fn from_buf(buf: &[u8]) -> Result<Self> {
        let len = buf.len();
        if len < 3 {
            return Err(Error::MalformedGraphicControlExtension);
        }
        let flags = if len >= 4 { buf[len - 4] } else { 0 };
        let delay = Delay::from([buf[len - 3], buf[len - 2]]);
        Ok(GraphicControl::new(flags, delay, buf[len - 1]))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Decoder;
    use std::collections::HashSet;
    use std::error::Error as _;

    const PATTERN: &[u8] = include_bytes!("../res/pattern.gif");

    /// Header for a 2x1 screen with a black / white global table
    const HEADER: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80,
        0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF,
    ];

    /// 2x1 image: clear, 0, 1, end
    const IMAGE: &[u8] = &[
        0x2C, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02,
        0x02, 0x42, 0x06, 0x00,
    ];

    fn gif(parts: &[&[u8]]) -> Vec<u8> {
        let mut v = HEADER.to_vec();
        for p in parts {
            v.extend_from_slice(p);
        }
        v
    }

    fn first_error(gif: &[u8]) -> Option<Error> {
        Decoder::new(gif).into_frames().find_map(|f| f.err())
    }

    #[test]
    fn minimal() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let gif = gif(&[IMAGE, b";"]);
        let mut frames = Decoder::new(&gif[..]).into_frames();
        let (number, record) = frames.next().ok_or("no frame")??;
        assert_eq!(number, 1);
        assert_eq!(record.play_delay, None);
        assert_eq!((record.width, record.height), (2, 1));
        assert_eq!(record.image_data, [0, 1]);
        assert!(frames.next().is_none());
        let map = frames.into_image_map();
        assert_eq!(map.expand(&record.image_data)?, [false, true]);
        Ok(())
    }

    #[test]
    fn blocks() -> Result<()> {
        let gce = [0x21, 0xF9, 0x04, 0x00, 0x0A, 0x00, 0x00, 0x00];
        let comment = b"\x21\xFE\x05hello\x00";
        let gif = gif(&[&gce, comment, IMAGE, b";"]);
        let blocks: Vec<Block> =
            Decoder::new(&gif[..]).into_blocks().collect::<Result<_>>()?;
        assert_eq!(blocks.len(), 6);
        assert!(matches!(blocks[0], Block::Header(_)));
        assert!(matches!(
            &blocks[1],
            Block::GlobalColorTable(p) if p.len() == 2
        ));
        match &blocks[2] {
            Block::GraphicControl(gc) => assert_eq!(gc.delay().centis(), 10),
            b => panic!("unexpected block {:?}", b),
        }
        assert_eq!(blocks[3], Block::Extension(ExtensionCode::Comment_));
        match &blocks[4] {
            Block::Image(img) => {
                assert_eq!(img.number, 1);
                assert_eq!(img.image_data, [0, 1]);
            }
            b => panic!("unexpected block {:?}", b),
        }
        assert_eq!(blocks[5], Block::Trailer);
        Ok(())
    }

    #[test]
    fn pending_delay() -> Result<()> {
        let gce = [0x21, 0xF9, 0x04, 0x00, 0x2C, 0x01, 0x00, 0x00];
        let gif = gif(&[&gce, IMAGE, IMAGE, b";"]);
        let frames: Vec<_> =
            Decoder::new(&gif[..]).into_frames().collect::<Result<_>>()?;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, 1);
        assert_eq!(frames[0].1.play_delay, Some(Delay::from_centis(300)));
        assert_eq!(frames[1].0, 2);
        assert_eq!(frames[1].1.play_delay, None);
        Ok(())
    }

    #[test]
    fn preamble() -> Result<()> {
        let mut frames = Decoder::new(PATTERN).into_frames();
        let preamble = frames.preamble()?.ok_or(Error::MalformedHeader)?;
        assert_eq!(&preamble.header.version(), b"89a");
        assert_eq!(preamble.screen_width(), 64);
        assert_eq!(preamble.screen_height(), 32);
        assert_eq!(preamble.header.color_resolution(), 2);
        let tbl = preamble.global_color_table.ok_or(Error::MissingColorTable)?;
        assert_eq!(tbl.len(), 4);
        assert_eq!(frames.count(), 4);
        Ok(())
    }

    fn pattern_pixel(frame: usize, x: usize, y: usize) -> bool {
        ((x + frame * 4) / 8 + y / 8) % 2 == 0
    }

    #[test]
    fn pattern() -> Result<()> {
        let mut frames = Decoder::new(PATTERN).into_frames();
        let mut records = vec![];
        for f in frames.by_ref() {
            records.push(f?);
        }
        let map = frames.into_image_map();
        assert_eq!(records.len(), 4);
        assert_eq!(map.len(), 244);
        let lens: Vec<_> =
            records.iter().map(|(_, r)| r.image_data.len()).collect();
        assert_eq!(lens, [206, 207, 206, 16]);
        for (n, (number, rec)) in records.iter().enumerate() {
            assert_eq!(*number, n + 1);
            let pixels = rec.expand(&map)?;
            assert_eq!(pixels.len(), rec.pixel_count());
            if n < 3 {
                let centis = 10 * (n as u16 + 1);
                assert_eq!(rec.play_delay, Some(Delay::from_centis(centis)));
                assert_eq!((rec.width, rec.height), (64, 32));
                for (i, p) in pixels.iter().enumerate() {
                    assert_eq!(*p, pattern_pixel(n, i % 64, i / 64));
                }
            } else {
                assert_eq!(rec.play_delay, Some(Delay::from_centis(300)));
                assert_eq!((rec.left, rec.top), (8, 4));
                assert_eq!((rec.width, rec.height), (16, 8));
                assert!(pixels.iter().all(|p| *p));
            }
        }
        Ok(())
    }

    #[test]
    fn map_is_deduplicated() -> Result<()> {
        let mut frames = Decoder::new(PATTERN).into_frames();
        for f in frames.by_ref() {
            f?;
        }
        let map = frames.into_image_map();
        let distinct: HashSet<Vec<bool>> =
            map.blocks().iter().map(|b| b.to_bits()).collect();
        assert_eq!(distinct.len(), map.len());
        Ok(())
    }

    #[test]
    fn wide_screen() -> Result<()> {
        let mut gif = gif(&[b";"]);
        gif[6] = 0x01;
        gif[7] = 0x01;
        let mut frames = Decoder::new(&gif[..]).into_frames();
        let preamble = frames.preamble()?.ok_or(Error::MalformedHeader)?;
        assert_eq!(preamble.screen_width(), 257);
        Ok(())
    }

    #[test]
    fn local_color_table() -> Result<()> {
        let mut image = IMAGE.to_vec();
        image[9] = 0x80; // local table, 2 colors
        image.splice(10..10, [0, 0, 0, 1, 1, 1].iter().copied());
        let gif = gif(&[&image, b";"]);
        let frames: Vec<_> =
            Decoder::new(&gif[..]).into_frames().collect::<Result<_>>()?;
        assert_eq!(frames[0].1.image_data, [0, 1]);
        Ok(())
    }

    #[test]
    fn missing_color_table() {
        let mut gif = gif(&[IMAGE, b";"]);
        gif[10] = 0x00;
        gif.drain(13..19);
        assert!(matches!(first_error(&gif), Some(Error::MissingColorTable)));
    }

    #[test]
    fn malformed_header() {
        let mut gif = gif(&[b";"]);
        gif[0] = b'J';
        assert!(matches!(first_error(&gif), Some(Error::MalformedHeader)));
        let mut gif = gif.clone();
        gif[0] = b'G';
        gif[4] = b'8';
        assert!(matches!(
            first_error(&gif),
            Some(Error::UnsupportedVersion(v)) if &v == b"88a"
        ));
    }

    #[test]
    fn invalid_block_code() {
        let gif = gif(&[b"\x99"]);
        assert!(matches!(
            first_error(&gif),
            Some(Error::InvalidBlockCode(0x99))
        ));
        let mut blocks = Decoder::new(&gif[..]).into_blocks();
        assert!(blocks.by_ref().any(|b| b.is_err()));
        assert!(blocks.next().is_none());
    }

    #[test]
    fn truncated() -> Result<()> {
        let gif = gif(&[&IMAGE[..12]]);
        let err = first_error(&gif).ok_or(Error::MalformedHeader)?;
        assert!(matches!(err, Error::UnexpectedEndOfFile));
        assert!(err.is_corrupt_stream());
        assert!(err.source().is_none());
        Ok(())
    }

    #[test]
    fn malformed_graphic_control() {
        let gce = [0x21, 0xF9, 0x02, 0x00, 0x00, 0x00];
        let gif = gif(&[&gce, IMAGE, b";"]);
        assert!(matches!(
            first_error(&gif),
            Some(Error::MalformedGraphicControlExtension)
        ));
    }

    #[test]
    fn too_large() {
        let gif = gif(&[IMAGE, b";"]);
        let err = Decoder::new(&gif[..])
            .max_image_sz(Some(1))
            .into_frames()
            .find_map(|f| f.err());
        assert!(matches!(err, Some(Error::TooLargeImage)));
    }

    #[test]
    fn invalid_code_size() {
        let mut image = IMAGE.to_vec();
        image[10] = 12;
        let gif = gif(&[&image, b";"]);
        assert!(matches!(first_error(&gif), Some(Error::InvalidCodeSize(12))));
    }
}
