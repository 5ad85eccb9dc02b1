use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

pub const NUM_KEYS: usize = 16;

/// left-hand side of a qwerty keyboard mapped onto the hex keypad
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals report presses (and auto-repeat) but rarely releases, so a key
/// counts as down for this long after its last press event
const KEY_HOLD: Duration = Duration::from_millis(150);

/// Pressed state of the 16 hex keys. Written only by an `Input`, read by
/// the interpreter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; NUM_KEYS],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: u8, down: bool) {
        if let Some(k) = self.keys.get_mut(usize::from(key)) {
            *k = down;
        }
    }

    pub fn press(&mut self, key: u8) {
        self.set(key, true)
    }

    pub fn release(&mut self, key: u8) {
        self.set(key, false)
    }

    /// `None` if `key` isn't on the keypad
    pub fn is_pressed(&self, key: u8) -> Option<bool> {
        self.keys.get(usize::from(key)).copied()
    }

    /// lowest numbered key that is down now but was up in `before`
    pub fn first_pressed_since(&self, before: &Keypad) -> Option<u8> {
        self.keys
            .iter()
            .zip(before.keys.iter())
            .position(|(now, was)| *now && !*was)
            .map(|k| k as u8)
    }

    pub fn clear(&mut self) {
        self.keys = [false; NUM_KEYS];
    }
}

/// reads keypresses
pub trait Input {
    /// apply key events that arrived since the last call to `keypad`.
    /// Returns `Ok(false)` once the host has asked the emulator to stop.
    fn poll(&mut self, keypad: &mut Keypad) -> Result<bool, io::Error>;
}

/// keyboard input from the terminal via crossterm, in raw mode while alive
pub struct StdinInput {
    keymap: HashMap<char, u8>,
    held_until: [Option<Instant>; NUM_KEYS],
    quit: bool,
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held_until: [None; NUM_KEYS],
            quit: false,
        })
    }

    fn read_stdin(&mut self) -> Result<(), io::Error> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                match evt.code {
                    KeyCode::Esc => self.quit = true,
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.quit = true
                    }
                    KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                        Some(mapped_key) => {
                            self.held_until[usize::from(*mapped_key)] = Some(Instant::now() + KEY_HOLD)
                        }
                        None => {
                            eprintln!("Warning: can't map {:?} to a CHIP-8 key", key);
                        }
                    },
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn poll(&mut self, keypad: &mut Keypad) -> Result<bool, io::Error> {
        self.read_stdin()?;
        let now = Instant::now();
        for (key, until) in self.held_until.iter_mut().enumerate() {
            let down = matches!(until, Some(t) if *t > now);
            if !down {
                *until = None;
            }
            keypad.set(key as u8, down);
        }
        Ok(!self.quit)
    }
}

/// dummy Input implementation for testing: `keys` are held up for the first
/// `press_after` polls, then go down and stay down; optionally asks to stop
/// after `quit_after` polls
pub struct DummyInput {
    keys: Vec<u8>,
    press_after: usize,
    quit_after: Option<usize>,
    polls: usize,
}

impl DummyInput {
    pub fn new(keys: &[u8]) -> Self {
        DummyInput {
            keys: Vec::from(keys),
            press_after: 0,
            quit_after: None,
            polls: 0,
        }
    }

    pub fn press_after(mut self, polls: usize) -> Self {
        self.press_after = polls;
        self
    }

    pub fn quit_after(mut self, polls: usize) -> Self {
        self.quit_after = Some(polls);
        self
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl Input for DummyInput {
    fn poll(&mut self, keypad: &mut Keypad) -> Result<bool, io::Error> {
        self.polls += 1;
        let down = self.polls > self.press_after;
        for key in &self.keys {
            if down {
                keypad.press(*key);
            } else {
                keypad.release(*key);
            }
        }
        Ok(self.quit_after.map_or(true, |limit| self.polls < limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypad_press_release() {
        let mut k = Keypad::new();
        assert_eq!(k.first_pressed_since(&Keypad::new()), None);
        k.press(0xe);
        k.press(0x3);
        assert_eq!(k.is_pressed(0xe), Some(true));
        assert_eq!(k.first_pressed_since(&Keypad::new()), Some(0x3));
        k.release(0x3);
        assert_eq!(k.first_pressed_since(&Keypad::new()), Some(0xe));
        k.clear();
        assert_eq!(k.is_pressed(0xe), Some(false));
    }

    #[test]
    fn test_keypad_pressed_since() {
        let mut before = Keypad::new();
        before.press(0x2);
        let mut now = before;
        assert_eq!(now.first_pressed_since(&before), None);
        now.press(0x9);
        assert_eq!(now.first_pressed_since(&before), Some(0x9));
        // a key released and pressed again counts once `before` saw it up
        before.release(0x2);
        assert_eq!(now.first_pressed_since(&before), Some(0x2));
    }

    #[test]
    fn test_keypad_out_of_range() {
        let mut k = Keypad::new();
        k.press(0x10);
        assert_eq!(k, Keypad::new());
        assert_eq!(k.is_pressed(0x10), None);
    }

    #[test]
    fn test_keymap_covers_keypad() {
        let map = HashMap::from(CHIP8_CONVENTIONAL_KEYMAP);
        let mut seen: Vec<u8> = map.values().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_dummy_input_script() -> Result<(), io::Error> {
        let mut input = DummyInput::new(&[0x5]).press_after(2).quit_after(4);
        let mut k = Keypad::new();
        k.press(0x5);
        assert!(input.poll(&mut k)?);
        assert_eq!(k.first_pressed_since(&Keypad::new()), None);
        assert!(input.poll(&mut k)?);
        assert_eq!(k.first_pressed_since(&Keypad::new()), None);
        assert!(input.poll(&mut k)?);
        assert_eq!(k.first_pressed_since(&Keypad::new()), Some(0x5));
        assert!(!input.poll(&mut k)?);
        assert_eq!(input.polls(), 4);
        Ok(())
    }
}
