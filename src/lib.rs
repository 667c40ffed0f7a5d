mod config;
mod cpu;
mod error;
mod input;
mod instruction;
mod loader;
mod memory;
mod opcode;
mod output;
mod registers;
mod sign_extend;
mod trap;

pub use crate::config::Config;
pub use crate::error::Error;
use crate::cpu::Cpu;
use crate::input::Stdin;
use crate::memory::Memory;
use crate::output::Stdout;

/// The conventional LC-3 user-program origin; the run loop starts
/// here regardless of what any loaded image's own origin word said.
const PC_START: u16 = 0x3000;

/// Loads every image in `config.image_paths`, in order, into one
/// shared memory space, then runs the fetch-decode-execute loop to
/// completion. Later images overwrite overlapping regions of earlier
/// ones.
pub fn run(config: Config) -> Result<(), Error> {
    let mut memory = Memory::new();

    for path in &config.image_paths {
        loader::load_image(path, &mut memory).map_err(|source| Error::Load {
            path: path.clone(),
            source,
        })?;
    }

    let mut cpu = Cpu::new(memory, Stdin::new(), Stdout::new());
    cpu.set_pc(PC_START);
    cpu.run()
}
