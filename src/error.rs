//! The error taxonomy this emulator surfaces to its host: usage,
//! image-load, and illegal-instruction failures. `InterruptError` is
//! handled outside this type (see `main.rs`'s `SIGINT` handler),
//! since by the time it would be represented here the process has
//! already decided to exit.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// No image argument was supplied. Exit code 2.
    Usage,
    /// An image file couldn't be opened or read. Exit code 1.
    Load { path: String, source: io::Error },
    /// RTI, the reserved opcode, or an unknown TRAP vector was
    /// executed. This crate treats all three as fatal, the stricter
    /// of the two options the instruction set reference leaves open.
    IllegalInstruction { pc: u16, detail: String },
    /// The input or output channel failed mid-run (e.g. stdin closed
    /// during a `GETC`). Not a guest-triggered condition, but still
    /// fatal to the run.
    Io { pc: u16, source: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Usage => write!(f, "usage: lc3 <image-file> [<image-file> ...]"),
            Error::Load { path, source } => write!(f, "failed to load image {}: {}", path, source),
            Error::IllegalInstruction { pc, detail } => {
                write!(f, "illegal instruction at {:#06x}: {}", pc, detail)
            }
            Error::Io { pc, source } => write!(f, "I/O error at {:#06x}: {}", pc, source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Load { source, .. } => Some(source),
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The process's documented exit code for each error variant (§7).
impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage => 2,
            Error::Load { .. } => 1,
            Error::IllegalInstruction { .. } => 1,
            Error::Io { .. } => 1,
        }
    }
}
