//! The input device: a non-blocking key-available probe plus a
//! blocking byte read, the two primitives the core's MMIO contract
//! and trap service need from the host's terminal.

use nix::sys::select::{select, FdSet};
use nix::sys::time::{TimeVal, TimeValLike};
use std::io::{self, Read};
use std::os::unix::io::RawFd;

/// Host collaborator: delivers keyboard input to the core. The core
/// never blocks except where the instruction set says it should
/// (`GETC`/`IN`); everything else is a non-blocking poll.
pub trait Input {
    /// Non-blocking readiness probe, backing the `KBSR` MMIO read.
    fn key_available(&mut self) -> bool;

    /// Blocking read of a single byte, backing `GETC`/`IN`.
    fn read_byte(&mut self) -> io::Result<u8>;
}

/// Reads from the process's stdin, assumed by the host to already be
/// in non-canonical, non-echoing mode for the run's duration.
pub struct Stdin {
    fd: RawFd,
}

impl Stdin {
    pub fn new() -> Self {
        Self { fd: libc::STDIN_FILENO }
    }
}

impl Input for Stdin {
    fn key_available(&mut self) -> bool {
        let mut readfds = FdSet::new();
        readfds.insert(self.fd);
        let mut timeout = TimeVal::zero();

        match select(None, &mut readfds, None, None, &mut timeout) {
            Ok(ready) => ready > 0,
            Err(_) => false,
        }
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buffer = [0u8; 1];
        io::stdin().read_exact(&mut buffer)?;
        Ok(buffer[0])
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::VecDeque;

    /// An input device fed from an in-memory queue, for deterministic
    /// unit tests of the MMIO gating and trap behaviour.
    pub struct Fake {
        pending: VecDeque<u8>,
    }

    impl Fake {
        pub fn new(bytes: &[u8]) -> Self {
            Self { pending: bytes.iter().copied().collect() }
        }

        pub fn empty() -> Self {
            Self { pending: VecDeque::new() }
        }

        pub fn push(&mut self, byte: u8) {
            self.pending.push_back(byte);
        }
    }

    impl Input for Fake {
        fn key_available(&mut self) -> bool {
            !self.pending.is_empty()
        }

        fn read_byte(&mut self) -> io::Result<u8> {
            self.pending.pop_front().ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "no input pending")
            })
        }
    }
}
