// Block decoding example
use std::env;
use std::error::Error;
use std::fs::File;

fn main() -> Result<(), Box<dyn Error>> {
    let path = env::args().nth(1).ok_or("usage: dec_block [filename]")?;
    decode(&path)
}

fn decode(path: &str) -> Result<(), Box<dyn Error>> {
    let f = File::open(path)?;
    let block_dec = monogif::Decoder::new(f).into_blocks();
    for block in block_dec {
        println!("block: {:?}", block?);
    }
    Ok(())
}
