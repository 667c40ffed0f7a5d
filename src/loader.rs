//! Parses a big-endian LC-3 object file into memory at its origin
//! (C3). Word 0 of the file is the origin address; every word after
//! that is placed starting at `memory[origin]`. Short files are
//! fine; words beyond `0x10000 - origin` are truncated. The loader
//! never touches `PC` — the run loop owns that.

use crate::memory::Memory;
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader};

pub fn load_image(path: &str, memory: &mut Memory) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(path)?);

    let origin = reader.read_u16::<BigEndian>()?;
    let mut addr = origin;

    loop {
        match reader.read_u16::<BigEndian>() {
            Ok(word) => {
                memory.write(addr, word);
                // Truncate rather than wrap once the address space is full.
                match addr.checked_add(1) {
                    Some(next) => addr = next,
                    None => break,
                }
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
