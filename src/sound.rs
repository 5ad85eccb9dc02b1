use beep::beep;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// The host tone the sound timer switches on and off. Implementations are
/// driven from the sound timer's own thread, hence `Send`.
pub trait Sound: Send {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;

    fn set_tone(&mut self, on: bool) -> Result<(), Box<dyn Error>> {
        if on {
            self.beep()
        } else {
            self.stop()
        }
    }
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// PC speaker tone through the `beep` crate
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        beep(SIMPLEBEEP_PITCH)?;
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        if !self.is_beeping {
            return Ok(());
        }
        beep(0)?;
        self.is_beeping = false;
        Ok(())
    }
}

#[derive(Default)]
pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// records every tone change; the log is shared so it can be inspected
/// after the sound has been handed to a timer thread
#[derive(Clone, Default)]
pub struct ToneLog {
    changes: Arc<Mutex<Vec<bool>>>,
}

impl ToneLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<bool> {
        match self.changes.lock() {
            Ok(changes) => changes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, on: bool) -> Result<(), Box<dyn Error>> {
        self.changes
            .lock()
            .map_err(|e| format!("tone log poisoned: {}", e))?
            .push(on);
        Ok(())
    }
}

impl Sound for ToneLog {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        self.record(true)
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        self.record(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_tone_dispatches() -> Result<(), Box<dyn Error>> {
        let log = ToneLog::new();
        let mut sound = log.clone();
        sound.set_tone(true)?;
        sound.set_tone(false)?;
        assert_eq!(log.changes(), vec![true, false]);
        Ok(())
    }

    #[test]
    fn test_simplebeep_stop_when_silent_is_noop() -> Result<(), Box<dyn Error>> {
        // never touches the speaker, so safe without one
        let mut b = SimpleBeep::new();
        b.stop()?;
        b.set_tone(false)
    }

    #[test]
    fn test_mute_is_silent() -> Result<(), Box<dyn Error>> {
        let mut m = Mute::new();
        m.set_tone(true)?;
        m.set_tone(false)
    }
}
