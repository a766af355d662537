// lib.rs      monogif crate.
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! A GIF decoder and player for small monochrome displays.
//!
//! Decoding is done once: every frame becomes a [FrameRecord] of indices
//! into one deduplicated [ImageMap] of bit-packed pixel blocks.  Both are
//! written to a [Store], from which a [Player] later shows the frames with
//! only one record in memory at a time.
//!
//! [FrameRecord]: struct.FrameRecord.html
//! [ImageMap]: struct.ImageMap.html
//! [Player]: struct.Player.html
//! [Store]: trait.Store.html
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

mod bits;
pub mod block;
mod cache;
mod decode;
mod error;
mod image;
mod play;
mod private;
mod record;
mod table;

pub use crate::bits::{BitReader, MAX_CODE_BITS};
pub use crate::cache::{build_cache, open_or_build, DirStore, MemStore, Store};
pub use crate::decode::{Blocks, Frames};
pub use crate::error::{Error, Result};
pub use crate::image::{ImageDecoder, ImageMap};
pub use crate::play::{
    Clock, Display, Player, RasterDisplay, Rotated, SystemClock,
};
pub use crate::private::Decoder;
pub use crate::record::FrameRecord;
pub use crate::table::{Chunk, Code, CodeTable, PixelBlock};
