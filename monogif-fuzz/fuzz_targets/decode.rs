// cargo fuzz run decode corpus/decode -- -timeout=30

#![no_main]

use std::io::Cursor;
use libfuzzer_sys::fuzz_target;

use monogif::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut frames = Decoder::new(Cursor::new(data)).into_frames();
    for frame in frames.by_ref() {
        if frame.is_err() {
            return;
        }
    }
    let map = frames.into_image_map();
    let mut buf = vec![];
    if map.write_to(&mut buf).is_ok() {
        assert!(monogif::ImageMap::read_from(&buf[..]).is_ok());
    }
});
