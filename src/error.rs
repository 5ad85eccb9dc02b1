use std::io;

/// Errors surfaced by the virtual machine.
///
/// Construction-time variants abort building (or reloading) a VM; runtime
/// variants stop the execution loop. Recoverable conditions such as an
/// out-of-bounds data access never show up here, they are reported through
/// [`crate::diag::Diagnostics`] and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("ROM length {size} is not a multiple of 2")]
    RomOddLength { size: usize },

    #[error("ROM is empty")]
    RomEmpty,

    #[error("unable to read ROM: {source}")]
    RomUnreadable {
        #[source]
        source: io::Error,
    },

    #[error("instruction fetch out of bounds at {pc:#06X}")]
    FetchOutOfBounds { pc: u16 },

    #[error("stack overflow: CALL at {pc:#06X} with {depth} return addresses already pushed")]
    StackOverflow { pc: u16, depth: usize },

    #[error("stack underflow: RETURN at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("host I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Chip8Error {
    /// true for the errors that can only come out of building a VM
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Chip8Error::RomTooLarge { .. }
                | Chip8Error::RomOddLength { .. }
                | Chip8Error::RomEmpty
                | Chip8Error::RomUnreadable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_addresses() {
        let e = Chip8Error::FetchOutOfBounds { pc: 0x0fff };
        assert_eq!(e.to_string(), "instruction fetch out of bounds at 0x0FFF");
        let e = Chip8Error::RomTooLarge {
            size: 4000,
            max_size: 3584,
        };
        assert!(e.to_string().contains("3584"));
    }

    #[test]
    fn test_construction_classification() {
        assert!(Chip8Error::RomOddLength { size: 3 }.is_construction_error());
        assert!(!Chip8Error::StackUnderflow { pc: 0x200 }.is_construction_error());
        let io_err: Chip8Error = io::Error::new(io::ErrorKind::Other, "tty").into();
        assert!(!io_err.is_construction_error());
    }
}
