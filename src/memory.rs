use std::io::{self, Read};

use crate::config::Config;
use crate::diag::Diagnostics;
use crate::error::Chip8Error;

// NB. addresses are usize here so that I + offset never wraps back into low
//     memory; callers convert from the chip-8's u16 at the edge

/// A byte array whose indexing never panics: a stray read yields 0 and a
/// stray write is dropped, both reported through `Diagnostics`.
pub struct SafeArray<const N: usize> {
    bytes: Box<[u8; N]>,
    name: &'static str,
    diag: Diagnostics,
}

impl<const N: usize> SafeArray<N> {
    pub fn new(name: &'static str, diag: Diagnostics) -> Self {
        SafeArray {
            bytes: Box::new([0u8; N]),
            name,
            diag,
        }
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn get(&self, index: usize) -> u8 {
        match self.bytes.get(index) {
            Some(b) => *b,
            None => {
                self.out_of_bounds("read", index);
                0
            }
        }
    }

    pub fn set(&mut self, index: usize, val: u8) {
        match self.bytes.get_mut(index) {
            Some(b) => *b = val,
            None => self.out_of_bounds("write", index),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..]
    }

    fn out_of_bounds(&self, access: &str, index: usize) {
        self.diag.warn(format_args!(
            "out-of-bounds {} {} at 0x{:x} for size 0x{:x}",
            self.name, access, index, N
        ));
    }
}

/// Represents the interpreter's view of memory
pub trait MemoryMap {
    /// read one byte; out of range reads as 0
    fn read(&self, addr: usize) -> u8;

    /// write one byte; out of range is discarded
    fn write(&mut self, addr: usize, val: u8);

    /// write a chunk of bytes, byte by byte, with the same bounds policy
    fn write_slice(&mut self, addr: usize, data: &[u8]) {
        for (offset, byte) in data.iter().enumerate() {
            self.write(addr + offset, *byte);
        }
    }

    /// get a big-endian two-byte word; `None` unless both bytes are in range
    fn get_word(&self, addr: usize) -> Option<u16>;

    /// get a r/o slice of the underlying memory, clamped to its end
    fn get_ro_slice(&self, addr: usize, len: usize) -> &[u8];
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: usize = 0x0200;

/// largest ROM that fits between the program address and the top of RAM
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR;

pub const CHIP8_FONT_ADDR: usize = 0x050;

/// bytes per font glyph
pub const CHIP8_FONT_GLYPH_BYTES: usize = 5;

pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// CHIP-8 memory map, 4K configuration:
///   0x0000-0x004f  unused (interpreter on real hardware)
///   0x0050-0x009f  font glyphs 0-F
///   0x00a0-0x01ff  unused
///   0x0200-0x0fff  program
///
/// the stack, registers and display live outside addressable memory
pub struct Chip8MemoryMap {
    bytes: SafeArray<CHIP8_RAM_SIZE_BYTES>,
    pub program_addr: usize,
    pub program_len: usize,
}

impl MemoryMap for Chip8MemoryMap {
    fn read(&self, addr: usize) -> u8 {
        self.bytes.get(addr)
    }

    fn write(&mut self, addr: usize, val: u8) {
        self.bytes.set(addr, val)
    }

    fn get_word(&self, addr: usize) -> Option<u16> {
        let word = self.bytes.as_slice().get(addr..addr.checked_add(2)?)?;
        Some(u16::from(word[0]) << 8 | u16::from(word[1]))
    }

    fn get_ro_slice(&self, addr: usize, len: usize) -> &[u8] {
        let all = self.bytes.as_slice();
        let start = addr.min(all.len());
        let end = addr.saturating_add(len).min(all.len());
        &all[start..end]
    }
}

impl Chip8MemoryMap {
    /// initialises memory with the font and nothing else
    pub fn new(diag: Diagnostics) -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: SafeArray::new("memory", diag),
            program_addr: CHIP8_PROGRAM_ADDR,
            program_len: 0,
        };
        mm.write_slice(CHIP8_FONT_ADDR, &CHIP8_FONT);
        mm
    }

    /// fresh memory holding the font and a ROM that already passed
    /// `read_rom`
    pub fn with_program(rom: &[u8], diag: Diagnostics) -> Self {
        let mut mm = Chip8MemoryMap::new(diag);
        mm.write_slice(mm.program_addr, rom);
        mm.program_len = rom.len();
        mm
    }

    /// first address past the last program instruction
    pub fn program_end(&self) -> usize {
        self.program_addr + self.program_len
    }

    /// address of the glyph for the low nibble of `digit`
    pub fn font_glyph_addr(digit: u8) -> usize {
        CHIP8_FONT_ADDR + CHIP8_FONT_GLYPH_BYTES * usize::from(digit & 0x0f)
    }
}

/// Pull a whole ROM out of `reader` and check that it can be loaded.
pub fn read_rom(reader: &mut impl io::Read, config: &Config) -> Result<Vec<u8>, Chip8Error> {
    // read one byte past the limit so oversize is detectable without
    // slurping an arbitrarily large stream
    let mut rom = Vec::with_capacity(CHIP8_MAX_PROGRAM_BYTES);
    reader
        .take(CHIP8_MAX_PROGRAM_BYTES as u64 + 1)
        .read_to_end(&mut rom)
        .map_err(|source| Chip8Error::RomUnreadable { source })?;
    validate_rom(&rom, config)?;
    Ok(rom)
}

fn validate_rom(rom: &[u8], config: &Config) -> Result<(), Chip8Error> {
    if rom.is_empty() {
        return Err(Chip8Error::RomEmpty);
    }
    if rom.len() > CHIP8_MAX_PROGRAM_BYTES {
        return Err(Chip8Error::RomTooLarge {
            size: rom.len(),
            max_size: CHIP8_MAX_PROGRAM_BYTES,
        });
    }
    if config.check_rom_integrity && rom.len() % 2 != 0 {
        return Err(Chip8Error::RomOddLength { size: rom.len() });
    }
    Ok(())
}
