// block.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! GIF container blocks
use pix::rgb::SRgb8;
use std::time::Duration;

/// Number of channels in a color table entry
const CHANNELS: usize = 3;

/// Color table existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTableExistence {
    Absent,
    Present,
}

/// Color table ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTableOrdering {
    NotSorted,
    Sorted,
}

/// Color table configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTableConfig {
    existence: ColorTableExistence,
    ordering: ColorTableOrdering,
    table_len: usize, // must be between 2...256
}

impl Default for ColorTableConfig {
    fn default() -> Self {
        let existence = ColorTableExistence::Absent;
        let ordering = ColorTableOrdering::NotSorted;
        let table_len = 2;
        ColorTableConfig {
            existence,
            ordering,
            table_len,
        }
    }
}

impl ColorTableConfig {
    /// Create a color table config from a flags size field
    fn from_flags(present: bool, sorted: bool, size_bits: u8) -> Self {
        let existence = if present {
            ColorTableExistence::Present
        } else {
            ColorTableExistence::Absent
        };
        let ordering = if sorted {
            ColorTableOrdering::Sorted
        } else {
            ColorTableOrdering::NotSorted
        };
        let table_len = 2 << (size_bits & 0b0111);
        ColorTableConfig {
            existence,
            ordering,
            table_len,
        }
    }
    pub fn existence(&self) -> ColorTableExistence {
        self.existence
    }
    pub fn ordering(&self) -> ColorTableOrdering {
        self.ordering
    }
    /// Get the number of colors (0 if absent)
    pub fn len(&self) -> usize {
        match self.existence {
            ColorTableExistence::Absent => 0,
            ColorTableExistence::Present => self.table_len,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Get the size of the table in bytes
    pub fn size_bytes(&self) -> usize {
        self.len() * CHANNELS
    }
}

/// Block marker codes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BlockCode {
    Header_,
    LogicalScreenDesc_,
    Extension_,
    ImageDesc_,
    Trailer_,
}

impl BlockCode {
    pub fn from_u8(t: u8) -> Option<Self> {
        use self::BlockCode::*;
        match t {
            b',' => Some(ImageDesc_), // (0x2C) Image separator
            b'!' => Some(Extension_), // (0x21) Extension introducer
            b';' => Some(Trailer_),   // (0x3B) GIF trailer
            _ => None,
        }
    }
    /// Get the fixed size (after the marker byte)
    pub fn size(&self) -> usize {
        use self::BlockCode::*;
        match self {
            Header_ => 6,
            LogicalScreenDesc_ => 7,
            ImageDesc_ => 9,
            Trailer_ => 0,
            Extension_ => 1, // +sub-blocks
        }
    }
}

/// Extension labels
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExtensionCode {
    PlainText_,
    GraphicControl_,
    Comment_,
    Application_,
    Unknown_(u8),
}

impl From<u8> for ExtensionCode {
    fn from(n: u8) -> Self {
        use self::ExtensionCode::*;
        match n {
            0x01 => PlainText_,
            0xF9 => GraphicControl_,
            0xFE => Comment_,
            0xFF => Application_,
            _ => Unknown_(n),
        }
    }
}

impl From<ExtensionCode> for u8 {
    fn from(t: ExtensionCode) -> Self {
        use self::ExtensionCode::*;
        match t {
            PlainText_ => 0x01,
            GraphicControl_ => 0xF9,
            Comment_ => 0xFE,
            Application_ => 0xFF,
            Unknown_(n) => n,
        }
    }
}

/// GIF header and logical screen descriptor
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GifHeader {
    version: [u8; 3],
    screen_width: u16,
    screen_height: u16,
    flags: u8,
    background_color_idx: u8, // index into global color table
    pixel_aspect_ratio: u8,
}

impl GifHeader {
    const COLOR_TABLE_PRESENT: u8 = 0b1000_0000;
    const COLOR_RESOLUTION: u8 = 0b0111_0000;
    const COLOR_TABLE_ORDERING: u8 = 0b0000_1000;
    const COLOR_TABLE_SIZE: u8 = 0b0000_0111;

    pub fn with_version(mut self, version: [u8; 3]) -> Self {
        self.version = version;
        self
    }
    /// Get the version ("87a" or "89a")
    pub fn version(&self) -> [u8; 3] {
        self.version
    }
    pub fn with_screen_width(mut self, screen_width: u16) -> Self {
        self.screen_width = screen_width;
        self
    }
    pub fn screen_width(&self) -> u16 {
        self.screen_width
    }
    pub fn with_screen_height(mut self, screen_height: u16) -> Self {
        self.screen_height = screen_height;
        self
    }
    pub fn screen_height(&self) -> u16 {
        self.screen_height
    }
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }
    pub fn flags(&self) -> u8 {
        self.flags
    }
    /// Get the color resolution (bits per primary color)
    pub fn color_resolution(&self) -> u8 {
        ((self.flags & Self::COLOR_RESOLUTION) >> 4) + 1
    }
    pub fn color_table_config(&self) -> ColorTableConfig {
        ColorTableConfig::from_flags(
            self.flags & Self::COLOR_TABLE_PRESENT != 0,
            self.flags & Self::COLOR_TABLE_ORDERING != 0,
            self.flags & Self::COLOR_TABLE_SIZE,
        )
    }
    pub fn with_background_color_idx(mut self, background_color_idx: u8)
        -> Self
    {
        self.background_color_idx = background_color_idx;
        self
    }
    pub fn background_color_idx(&self) -> u8 {
        self.background_color_idx
    }
    pub fn with_pixel_aspect_ratio(mut self, pixel_aspect_ratio: u8)
        -> Self
    {
        self.pixel_aspect_ratio = pixel_aspect_ratio;
        self
    }
    pub fn pixel_aspect_ratio(&self) -> u8 {
        self.pixel_aspect_ratio
    }
}

/// Color table (global or local)
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<SRgb8>,
}

impl Palette {
    /// Create a palette from packed RGB triples
    pub fn with_colors(colors: &[u8]) -> Self {
        let colors = colors
            .chunks_exact(CHANNELS)
            .map(|c| SRgb8::new(c[0], c[1], c[2]))
            .collect();
        Palette { colors }
    }
    /// Get the number of colors
    pub fn len(&self) -> usize {
        self.colors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
    pub fn colors(&self) -> &[SRgb8] {
        &self.colors
    }
    pub fn entry(&self, idx: usize) -> Option<SRgb8> {
        self.colors.get(idx).copied()
    }
}

/// Frame delay, as stored in a graphic control extension
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delay([u8; 2]);

impl From<[u8; 2]> for Delay {
    fn from(bytes: [u8; 2]) -> Self {
        Delay(bytes)
    }
}

impl Delay {
    /// Create a delay from centiseconds (hundredths of a second)
    pub fn from_centis(centis: u16) -> Self {
        Delay(centis.to_le_bytes())
    }
    /// Get the raw bytes
    pub fn bytes(self) -> [u8; 2] {
        self.0
    }
    /// Get the delay in centiseconds (little-endian)
    pub fn centis(self) -> u16 {
        u16::from_le_bytes(self.0)
    }
    /// Get the delay as a duration
    pub fn duration(self) -> Duration {
        Duration::from_millis(u64::from(self.centis()) * 10)
    }
}

/// Graphic control extension
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GraphicControl {
    flags: u8,
    delay: Delay,
    transparent_color_idx: u8,
}

impl GraphicControl {
    const TRANSPARENT_COLOR: u8 = 0b0000_0001;

    pub fn new(flags: u8, delay: Delay, transparent_color_idx: u8) -> Self {
        GraphicControl {
            flags,
            delay,
            transparent_color_idx,
        }
    }
    pub fn flags(&self) -> u8 {
        self.flags
    }
    pub fn delay(&self) -> Delay {
        self.delay
    }
    pub fn transparent_color(&self) -> Option<u8> {
        if self.flags & Self::TRANSPARENT_COLOR != 0 {
            Some(self.transparent_color_idx)
        } else {
            None
        }
    }
    pub fn transparent_color_idx(&self) -> u8 {
        self.transparent_color_idx
    }
}

/// Image descriptor
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageDesc {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    flags: u8,
}

impl ImageDesc {
    const COLOR_TABLE_PRESENT: u8 = 0b1000_0000;
    const INTERLACED: u8 = 0b0100_0000;
    const COLOR_TABLE_ORDERING: u8 = 0b0010_0000;
    const COLOR_TABLE_SIZE: u8 = 0b0000_0111;

    pub fn with_left(mut self, left: u16) -> Self {
        self.left = left;
        self
    }
    pub fn left(&self) -> u16 {
        self.left
    }
    pub fn with_top(mut self, top: u16) -> Self {
        self.top = top;
        self
    }
    pub fn top(&self) -> u16 {
        self.top
    }
    pub fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }
    pub fn width(&self) -> u16 {
        self.width
    }
    pub fn with_height(mut self, height: u16) -> Self {
        self.height = height;
        self
    }
    pub fn height(&self) -> u16 {
        self.height
    }
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }
    pub fn flags(&self) -> u8 {
        self.flags
    }
    pub fn interlaced(&self) -> bool {
        (self.flags & Self::INTERLACED) != 0
    }
    pub fn color_table_config(&self) -> ColorTableConfig {
        ColorTableConfig::from_flags(
            self.flags & Self::COLOR_TABLE_PRESENT != 0,
            self.flags & Self::COLOR_TABLE_ORDERING != 0,
            self.flags & Self::COLOR_TABLE_SIZE,
        )
    }
    /// Get the number of pixels
    pub fn image_sz(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Decoded image block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Image {
    /// Frame number (starting from 1)
    pub number: usize,
    /// Placement and size
    pub desc: ImageDesc,
    /// Indices into the image map
    pub image_data: Vec<u32>,
}

/// Blocks of a GIF file, in stream order
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Header(GifHeader),
    GlobalColorTable(Palette),
    GraphicControl(GraphicControl),
    /// Any other extension (skipped)
    Extension(ExtensionCode),
    Image(Image),
    Trailer,
}

impl From<GifHeader> for Block {
    fn from(b: GifHeader) -> Self {
        Block::Header(b)
    }
}

impl From<Palette> for Block {
    fn from(b: Palette) -> Self {
        Block::GlobalColorTable(b)
    }
}

impl From<GraphicControl> for Block {
    fn from(b: GraphicControl) -> Self {
        Block::GraphicControl(b)
    }
}

impl From<Image> for Block {
    fn from(b: Image) -> Self {
        Block::Image(b)
    }
}

/// Blocks at the beginning of the file, before any frame blocks
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Preamble {
    pub header: GifHeader,
    pub global_color_table: Option<Palette>,
}

impl Preamble {
    pub fn screen_width(&self) -> u16 {
        self.header.screen_width()
    }
    pub fn screen_height(&self) -> u16 {
        self.header.screen_height()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn color_table_len() {
        let h = GifHeader::default().with_flags(0x80);
        assert_eq!(h.color_table_config().len(), 2);
        let h = GifHeader::default().with_flags(0x91);
        assert_eq!(h.color_table_config().len(), 4);
        assert_eq!(h.color_table_config().size_bytes(), 12);
        assert_eq!(h.color_resolution(), 2);
        let h = GifHeader::default().with_flags(0xF7);
        assert_eq!(h.color_table_config().len(), 256);
        assert_eq!(h.color_resolution(), 8);
        let h = GifHeader::default().with_flags(0x07);
        assert_eq!(h.color_table_config().len(), 0);
        assert_eq!(
            h.color_table_config().existence(),
            ColorTableExistence::Absent
        );
        let h = GifHeader::default().with_flags(0x88);
        assert_eq!(
            h.color_table_config().ordering(),
            ColorTableOrdering::Sorted
        );
    }

    #[test]
    fn local_table() {
        let d = ImageDesc::default().with_flags(0b1100_0010);
        assert!(d.interlaced());
        assert_eq!(d.color_table_config().len(), 8);
        let d = ImageDesc::default().with_width(16).with_height(8);
        assert_eq!(d.color_table_config().len(), 0);
        assert_eq!(d.image_sz(), 128);
    }

    #[test]
    fn delay() {
        let d = Delay::from([10, 0]);
        assert_eq!(d.centis(), 10);
        assert_eq!(d.duration(), Duration::from_millis(100));
        let d = Delay::from([44, 1]);
        assert_eq!(d.centis(), 300);
        assert_eq!(d.duration(), Duration::from_secs(3));
        assert_eq!(Delay::from_centis(300), d);
    }

    #[test]
    fn transparent() {
        let gc = GraphicControl::new(0x05, Delay::default(), 3);
        assert_eq!(gc.transparent_color(), Some(3));
        let gc = GraphicControl::new(0x04, Delay::default(), 3);
        assert_eq!(gc.transparent_color(), None);
    }

    #[test]
    fn palette() {
        let p = Palette::with_colors(&[0, 0, 0, 255, 255, 255]);
        assert_eq!(p.len(), 2);
        assert_eq!(p.entry(1), Some(SRgb8::new(255, 255, 255)));
        assert_eq!(p.entry(2), None);
    }
}
