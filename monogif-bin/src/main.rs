// main.rs      monogif command
//
// Copyright (c) 2019-2026  Douglas Lau
//
#![forbid(unsafe_code)]

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use monogif::{
    build_cache, open_or_build, Decoder, DirStore, Display, FrameRecord,
    Player, RasterDisplay, Rotated, SystemClock,
};
use std::error::Error;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Crate version
const VERSION: &str = std::env!("CARGO_PKG_VERSION");

/// Main entry point
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().format_timestamp(None).init();
    let mut out = StandardStream::stdout(ColorChoice::Auto);
    match create_app().get_matches().subcommand() {
        ("show", Some(matches)) => show(&mut out, matches)?,
        ("cache", Some(matches)) => cache(&mut out, matches)?,
        ("play", Some(matches)) => play(matches)?,
        _ => unreachable!("subcommand required"),
    }
    out.reset()?;
    Ok(())
}

/// Create clap App
fn create_app() -> App<'static, 'static> {
    App::new("monogif")
        .version(VERSION)
        .setting(AppSettings::GlobalVersion)
        .about("GIF player for monochrome displays")
        .setting(AppSettings::ArgRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("show")
                .about("Show GIF frame table")
                .arg(
                    Arg::with_name("files")
                        .required(true)
                        .min_values(1)
                        .help("input file(s)"),
                ),
        )
        .subcommand(
            SubCommand::with_name("cache")
                .about("Decode a GIF into a frame cache")
                .arg(Arg::with_name("file").required(true).help("input file"))
                .arg(dir_arg()),
        )
        .subcommand(
            SubCommand::with_name("play")
                .about("Play a GIF from its frame cache")
                .arg(Arg::with_name("file").required(true).help("input file"))
                .arg(dir_arg())
                .arg(
                    Arg::with_name("loops")
                        .short("l")
                        .long("loops")
                        .takes_value(true)
                        .help("number of passes (default: forever)"),
                )
                .arg(
                    Arg::with_name("width")
                        .long("width")
                        .takes_value(true)
                        .default_value("128")
                        .help("panel width"),
                )
                .arg(
                    Arg::with_name("height")
                        .long("height")
                        .takes_value(true)
                        .default_value("64")
                        .help("panel height"),
                )
                .arg(
                    Arg::with_name("rotate")
                        .short("r")
                        .long("rotate")
                        .help("display mounted on its side (quarter turn)"),
                ),
        )
}

/// Cache directory argument
fn dir_arg() -> Arg<'static, 'static> {
    Arg::with_name("dir")
        .short("d")
        .long("dir")
        .takes_value(true)
        .help("cache directory (default: cache_<name>)")
}

/// Get the frame store for a subcommand
fn dir_store(
    matches: &ArgMatches,
    path: &Path,
) -> monogif::Result<DirStore> {
    let store = DirStore::for_gif(path)?;
    Ok(match matches.value_of_os("dir") {
        Some(dir) => store.with_dir(dir),
        None => store,
    })
}

/// Get the input file path
fn file_path<'a>(
    matches: &'a ArgMatches,
) -> Result<&'a Path, Box<dyn Error>> {
    let file = matches.value_of_os("file").ok_or("no input file")?;
    Ok(Path::new(file))
}

/// Handle cache subcommand
fn cache(
    out: &mut StandardStream,
    matches: &ArgMatches,
) -> Result<(), Box<dyn Error>> {
    let path = file_path(matches)?;
    let mut store = dir_store(matches, path)?;
    let decoder = Decoder::new(File::open(path)?);
    let frames = build_cache(decoder, &mut store)?;
    let mut bold = ColorSpec::new();
    bold.set_fg(Some(Color::White))
        .set_intense(true)
        .set_bold(true);
    out.set_color(&bold)?;
    writeln!(out, "{} frames cached in {:?}", frames, store.dir())?;
    Ok(())
}

/// Handle play subcommand
fn play(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let path = file_path(matches)?;
    let mut store = dir_store(matches, path)?;
    let loops = matches.value_of("loops").map(str::parse).transpose()?;
    let width = matches.value_of("width").unwrap_or("128").parse()?;
    let height = matches.value_of("height").unwrap_or("64").parse()?;
    open_or_build(path, &mut store)?;
    let mut display = TermDisplay::new(width, height);
    let mut clock = SystemClock::default();
    let player = Player::new().with_loops(loops);
    if matches.is_present("rotate") {
        player.run(&store, &mut Rotated::new(display), &mut clock)?;
    } else {
        player.run(&store, &mut display, &mut clock)?;
    }
    Ok(())
}

/// Display drawn in a terminal, two pixel rows per line
struct TermDisplay {
    raster: RasterDisplay,
    out: StandardStream,
}

impl TermDisplay {
    fn new(width: u32, height: u32) -> Self {
        TermDisplay {
            raster: RasterDisplay::new(width, height),
            out: StandardStream::stdout(ColorChoice::Auto),
        }
    }
}

impl Display for TermDisplay {
    fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        self.raster.set_pixel(x, y, on);
    }

    fn present(&mut self) -> monogif::Result<()> {
        let (width, height) = self.dimensions();
        let mut cyan = ColorSpec::new();
        cyan.set_fg(Some(Color::Cyan)).set_intense(true);
        self.out.set_color(&cyan)?;
        for y in (0..height).step_by(2) {
            let r = &self.raster;
            let line: String = (0..width)
                .map(|x| match (r.is_on(x, y), r.is_on(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect();
            writeln!(self.out, "{}", line)?;
        }
        self.out.reset()?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    fn clear(&mut self) {
        self.raster.clear();
    }
}

/// Handle show subcommand
fn show(
    out: &mut StandardStream,
    matches: &ArgMatches,
) -> Result<(), Box<dyn Error>> {
    let values = matches.values_of_os("files").ok_or("no input files")?;
    for path in values {
        show_file(out, path)?;
    }
    Ok(())
}

/// Show one GIF file
fn show_file(
    out: &mut StandardStream,
    path: &OsStr,
) -> Result<(), Box<dyn Error>> {
    let mut magenta = ColorSpec::new();
    magenta.set_fg(Some(Color::Magenta));
    let mut red = ColorSpec::new();
    red.set_fg(Some(Color::Red)).set_intense(true);
    let mut yellow = ColorSpec::new();
    yellow.set_fg(Some(Color::Yellow)).set_intense(true);
    let mut bold = ColorSpec::new();
    bold.set_fg(Some(Color::White))
        .set_intense(true)
        .set_bold(true);
    let mut frame_dec = Decoder::new(File::open(path)?).into_frames();
    let preamble = if let Some(p) = frame_dec.preamble()? {
        p
    } else {
        out.set_color(&red)?;
        writeln!(out, "no preamble!")?;
        return Ok(());
    };
    let mut frames = vec![];
    for f in frame_dec.by_ref() {
        frames.push(f?);
    }
    let map = frame_dec.into_image_map();
    let frame_digits = digits(frames.len()).max(3);
    let width = preamble.screen_width();
    let height = preamble.screen_height();
    let size_digits = 4.max(1 + digits(width) + digits(height));
    let gif = String::from_utf8_lossy(&preamble.header.version()).to_string();
    out.set_color(&magenta)?;
    writeln!(out, "{:?}", path)?;
    out.set_color(&bold)?;
    write!(out, "GIF{}, {}x{}", gif, width, height)?;
    writeln!(out, ", frames: {}, blocks: {}", frames.len(), map.len())?;
    out.set_color(&yellow)?;
    write!(out, "{:>w$}", "Fr#", w = frame_digits)?;
    write!(out, "  Delay")?;
    write!(out, " {:>w$}", "Size", w = size_digits)?;
    write!(out, " {:>w$}", "X,Y", w = size_digits)?;
    writeln!(out, "   Data")?;
    for (number, record) in &frames {
        show_frame(
            out,
            record,
            width,
            height,
            *number,
            frame_digits,
            size_digits,
        )?;
    }
    Ok(())
}

/// Show one frame of a GIF file
fn show_frame(
    out: &mut StandardStream,
    record: &FrameRecord,
    width: u16,
    height: u16,
    number: usize,
    frame_digits: usize,
    size_digits: usize,
) -> Result<(), Box<dyn Error>> {
    let mut dflt = ColorSpec::new();
    dflt.set_fg(Some(Color::White));
    let mut bold = ColorSpec::new();
    bold.set_fg(Some(Color::White))
        .set_intense(true)
        .set_bold(true);
    out.set_color(&bold)?;
    write!(out, "{:>w$}", number, w = frame_digits)?;
    match record.play_delay {
        Some(d) => write!(out, " {:6.2}", f32::from(d.centis()) / 100.0)?,
        None => {
            out.set_color(&dflt)?;
            write!(out, " {:>6}", "-")?;
        }
    }
    if width == record.width && height == record.height {
        out.set_color(&dflt)?;
    } else {
        out.set_color(&bold)?;
    }
    write!(
        out,
        " {:>w$}",
        &format!("{}x{}", record.width, record.height),
        w = size_digits
    )?;
    if record.left == 0 && record.top == 0 {
        out.set_color(&dflt)?;
    } else {
        out.set_color(&bold)?;
    }
    write!(
        out,
        " {:>w$}",
        &format!("{},{}", record.left, record.top),
        w = size_digits
    )?;
    out.set_color(&dflt)?;
    writeln!(out, " {:>6}", record.image_data.len())?;
    Ok(())
}

/// Calculate digits in a number
fn digits<T: Into<usize>>(v: T) -> usize {
    let v = v.into();
    match v {
        0..=9 => 1,
        10..=99 => 2,
        100..=999 => 3,
        1000..=9999 => 4,
        _ => 5,
    }
}
