use std::time::Duration;

/// default number of instructions executed between two presented frames
pub const DEFAULT_INSTRUCTIONS_PER_FRAME: u16 = 256;

/// default display refresh rate, Hz
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Runtime settings threaded through VM construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// print recoverable faults and an instruction trace to stderr
    pub debug: bool,
    /// reject ROMs with an odd number of bytes
    pub check_rom_integrity: bool,
    pub instructions_per_frame: u16,
    pub frame_rate: u32,
    /// FX55/FX65 leave I pointing past the last register touched, as the
    /// COSMAC VIP interpreter did
    pub index_increment_quirk: bool,
    /// fixed seed for CXNN; `None` seeds from the OS
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debug: false,
            check_rom_integrity: true,
            instructions_per_frame: DEFAULT_INSTRUCTIONS_PER_FRAME,
            frame_rate: DEFAULT_FRAME_RATE,
            index_increment_quirk: false,
            rng_seed: None,
        }
    }
}

impl Config {
    /// wall-clock length of one frame
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert!(!c.debug);
        assert!(c.check_rom_integrity);
        assert_eq!(c.instructions_per_frame, 256);
        assert!(!c.index_increment_quirk);
    }

    #[test]
    fn test_frame_duration() {
        let c = Config::default();
        assert_eq!(c.frame_duration(), Duration::from_micros(16_666) + Duration::from_nanos(666));
        let c = Config {
            frame_rate: 0,
            ..Config::default()
        };
        assert_eq!(c.frame_duration(), Duration::from_secs(1));
    }
}
