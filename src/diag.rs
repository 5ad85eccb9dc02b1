/// Runtime switch for the interpreter's chatter on stderr.
///
/// Everything recoverable (stray memory accesses, unknown opcodes, odd key
/// indices) goes through here so that a buggy ROM can be investigated with
/// `--debug` but stays silent otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Diagnostics { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// report a condition the VM absorbed
    pub fn warn(&self, msg: std::fmt::Arguments) {
        if self.enabled {
            eprintln!("Warning: {}", msg);
        }
    }

    /// per-instruction trace
    pub fn trace(&self, msg: std::fmt::Arguments) {
        if self.enabled {
            eprintln!("Trace: {}", msg);
        }
    }
}
