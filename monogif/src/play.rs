// play.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Playback of cached frames on a monochrome display
use crate::cache::Store;
use crate::error::Result;
use crate::image::ImageMap;
use crate::record::FrameRecord;
use pix::gray::{Gray, Gray8};
use pix::Raster;
use std::thread;
use std::time::{Duration, Instant};

/// Monochrome display
pub trait Display {
    /// Get the width and height, in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Set one pixel (not shown until `present`)
    fn set_pixel(&mut self, x: u32, y: u32, on: bool);

    /// Show all pixels set since the last `present`
    fn present(&mut self) -> Result<()>;

    /// Turn every pixel off
    fn clear(&mut self);
}

/// Monotonic clock
pub trait Clock {
    /// Get the time since an arbitrary fixed start
    fn now(&self) -> Duration;

    /// Sleep for a duration
    fn sleep(&mut self, dur: Duration);
}

/// Display backed by a `Raster`; "on" pixels are 255, "off" pixels 0
pub struct RasterDisplay {
    raster: Raster<Gray8>,
}

impl RasterDisplay {
    /// Create a new raster display
    pub fn new(width: u32, height: u32) -> Self {
        RasterDisplay {
            raster: Raster::with_clear(width, height),
        }
    }

    /// Get the raster
    pub fn raster(&self) -> &Raster<Gray8> {
        &self.raster
    }

    /// Check if a pixel is on
    pub fn is_on(&self, x: u32, y: u32) -> bool {
        let (width, height) = self.dimensions();
        if x >= width || y >= height {
            return false;
        }
        let p = self.raster.pixel(x as i32, y as i32);
        u8::from(Gray::value(p)) > 0
    }
}

impl Display for RasterDisplay {
    fn dimensions(&self) -> (u32, u32) {
        (self.raster.width(), self.raster.height())
    }

    fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        let v: u8 = if on { 255 } else { 0 };
        *self.raster.pixel_mut(x as i32, y as i32) = Gray8::new(v);
    }

    fn present(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) {
        let (width, height) = self.dimensions();
        self.raster = Raster::with_clear(width, height);
    }
}

/// Display turned a quarter turn, for a panel mounted on its side.
///
/// Pixel (x, y) is plotted at (width - 1 - y, x) of the inner display, so a
/// 128x64 panel shows 64x128 frames.
pub struct Rotated<D: Display> {
    display: D,
}

impl<D: Display> Rotated<D> {
    /// Wrap a display
    pub fn new(display: D) -> Self {
        Rotated { display }
    }

    /// Get the inner display
    pub fn inner(&self) -> &D {
        &self.display
    }
}

impl<D: Display> Display for Rotated<D> {
    fn dimensions(&self) -> (u32, u32) {
        let (width, height) = self.display.dimensions();
        (height, width)
    }

    fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        let (width, height) = self.display.dimensions();
        if x < height && y < width {
            self.display.set_pixel(width - 1 - y, x, on);
        }
    }

    fn present(&mut self) -> Result<()> {
        self.display.present()
    }

    fn clear(&mut self) {
        self.display.clear();
    }
}

/// Clock using `Instant` and `thread::sleep`
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, dur: Duration) {
        thread::sleep(dur);
    }
}

/// Frame player.
///
/// Frames are read from a [Store](trait.Store.html) one at a time, so only
/// the image map and one record are held in memory.
#[derive(Clone, Debug)]
pub struct Player {
    /// Delay for frames without one
    default_delay: Duration,
    /// Pause before looping back to the first frame
    loop_pause: Duration,
    /// Number of passes (`None` for no limit)
    loops: Option<usize>,
}

impl Default for Player {
    fn default() -> Self {
        Player {
            default_delay: Duration::from_millis(50),
            loop_pause: Duration::from_secs(5),
            loops: None,
        }
    }
}

impl Player {
    /// Create a new player
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay for frames with no (or a zero) delay
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Set the pause before looping
    pub fn with_loop_pause(mut self, pause: Duration) -> Self {
        self.loop_pause = pause;
        self
    }

    /// Set the number of passes (`None` for no limit)
    pub fn with_loops(mut self, loops: Option<usize>) -> Self {
        self.loops = loops;
        self
    }

    /// Get the display time of a frame
    pub fn frame_delay(&self, record: &FrameRecord) -> Duration {
        match record.play_delay {
            Some(delay) if delay.centis() > 0 => delay.duration(),
            _ => self.default_delay,
        }
    }

    /// Plot one frame and present it.
    ///
    /// Pixels are plotted row by row inside the frame rectangle; any outside
    /// the display are clipped.
    pub fn play_frame<D: Display>(
        &self,
        record: &FrameRecord,
        map: &ImageMap,
        display: &mut D,
    ) -> Result<()> {
        let pixels = record.expand(map)?;
        let (width, height) = display.dimensions();
        if record.width > 0 {
            let rows = pixels.chunks(usize::from(record.width));
            for (row, line) in rows.enumerate() {
                let y = u32::from(record.top) + row as u32;
                if y >= height {
                    break;
                }
                for (col, on) in line.iter().enumerate() {
                    let x = u32::from(record.left) + col as u32;
                    if x < width {
                        display.set_pixel(x, y, *on);
                    }
                }
            }
        }
        display.present()
    }

    /// Play frames from a store.
    ///
    /// Frames 1, 2, ... are shown until a record is missing, then playback
    /// pauses and starts over from frame 1.  Each frame is shown for its
    /// delay, measured from the start of plotting.  Returns the number of
    /// frames shown.
    pub fn run<S, D, C>(
        &self,
        store: &S,
        display: &mut D,
        clock: &mut C,
    ) -> Result<usize>
    where
        S: Store,
        D: Display,
        C: Clock,
    {
        let map = store.read_table()?;
        let mut shown = 0;
        let mut pass = 0;
        while self.loops.map_or(true, |n| pass < n) {
            let mut number = 1;
            while let Some(record) = store.read_record(number)? {
                let start = clock.now();
                self.play_frame(&record, &map, display)?;
                let elapsed = clock.now().saturating_sub(start);
                let delay = self.frame_delay(&record);
                trace!("frame {} plotted in {:?}", number, elapsed);
                if delay > elapsed {
                    clock.sleep(delay - elapsed);
                }
                number += 1;
                shown += 1;
            }
            pass += 1;
            if number == 1 {
                warn!("No frames to play");
                break;
            }
            debug!("pass {}: {} frames", pass, number - 1);
            if self.loops.map_or(true, |n| pass < n) {
                clock.sleep(self.loop_pause);
                display.clear();
            }
        }
        Ok(shown)
    }
}
