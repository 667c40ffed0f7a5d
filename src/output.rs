//! The output device: a byte-writing channel with explicit flush, as
//! used by the `OUT`/`PUTS`/`PUTSP`/`IN`/`HALT` traps.

use std::io::{self, Write};

/// Host collaborator: the console the trap service writes to.
pub trait Output {
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;

    fn write_str(&mut self, s: &str) -> io::Result<()> {
        for byte in s.bytes() {
            self.write_byte(byte)?;
        }
        Ok(())
    }
}

pub struct Stdout;

impl Stdout {
    pub fn new() -> Self {
        Self
    }
}

impl Output for Stdout {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        io::stdout().write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// An output device that records bytes in memory, for assertions
    /// on what the trap service would have printed.
    #[derive(Default)]
    pub struct Fake {
        pub bytes: Vec<u8>,
    }

    impl Fake {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn as_string(&self) -> String {
            String::from_utf8_lossy(&self.bytes).into_owned()
        }
    }

    impl Output for Fake {
        fn write_byte(&mut self, byte: u8) -> io::Result<()> {
            self.bytes.push(byte);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
