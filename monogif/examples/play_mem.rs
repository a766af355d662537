// Decode into memory, then play one pass on a raster display
use monogif::{build_cache, Decoder, MemStore, Player, RasterDisplay};
use monogif::{Display, SystemClock};
use std::env;
use std::error::Error;
use std::fs::File;

fn main() -> Result<(), Box<dyn Error>> {
    let path = env::args().nth(1).ok_or("usage: play_mem [filename]")?;
    let mut store = MemStore::new();
    let frames = build_cache(Decoder::new(File::open(path)?), &mut store)?;
    let mut display = RasterDisplay::new(128, 64);
    let mut clock = SystemClock::default();
    let player = Player::new().with_loops(Some(1));
    let shown = player.run(&store, &mut display, &mut clock)?;
    let (width, height) = display.dimensions();
    let on = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|(x, y)| display.is_on(*x, *y))
        .count();
    println!("{shown} of {frames} frames shown, {on} pixels on");
    Ok(())
}
