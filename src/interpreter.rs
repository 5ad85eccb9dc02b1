/// # interpreter
///
/// The fetch-decode-execute engine and the frame loop around it.
///
/// Each frame the loop
///  1. applies queued `Command`s (ROM reloads, quit)
///  2. runs up to `Config::instructions_per_frame` instructions, polling the
///     input before each one, unless the program counter has run past the end
///     of the ROM, in which case the machine idles
///  3. presents the display and sleeps to the next frame boundary
///
/// The delay and sound timers tick on their own threads (see `timer`) and
/// only their counters are shared with this one. Memory, registers, the
/// stack and the display belong to the thread running the loop.
///
/// Faults split three ways:
///  - a bad ROM never produces an interpreter (`new` / reload fails)
///  - stray data accesses and unknown opcodes are reported and skipped
///  - an out-of-bounds fetch or a broken call stack ends the run with `Err`
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::diag::Diagnostics;
use crate::display::Display;
use crate::error::Chip8Error;
use crate::input::{Input, Keypad};
use crate::memory::{read_rom, Chip8MemoryMap, MemoryMap};
use crate::opcode::Instruction;
use crate::registers::{Registers, VF};
use crate::sound::Sound;
use crate::timer::Timer;

/// how often FX0A rechecks the keypad while it blocks
const KEY_WAIT_POLL: Duration = Duration::from_millis(1);

/// Requests delivered into a running interpreter between frames.
#[derive(Debug)]
pub enum Command {
    /// replace the running program with the ROM at this path
    LoadRom(PathBuf),
    /// replace the running program with these bytes
    LoadRomBytes(Vec<u8>),
    Quit,
}

/// Cloneable stop flag; the loop (including a blocked FX0A) notices it
/// within one poll.
#[derive(Clone, Debug, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the machine is doing after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Running,
    /// the program counter is past the last ROM instruction
    Idle,
    Stopped,
}

/// Read-only snapshot for inspection.
#[derive(Debug)]
pub struct MachineView<'a> {
    pub memory: &'a [u8],
    pub registers: &'a [u8],
    pub pc: u16,
    pub index: u16,
    pub stack_depth: usize,
    pub delay_timer: u8,
    pub sound_timer: u8,
}

pub struct Chip8Interpreter<'a> {
    config: Config,
    diag: Diagnostics,
    memory: Chip8MemoryMap,
    registers: Registers,
    keypad: Keypad,
    delay_timer: Timer,
    sound_timer: Timer,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    rng: StdRng,
    /// set by instructions that moved the program counter themselves
    pc_updated: bool,
    shutdown: Shutdown,
    commands: Receiver<Command>,
    command_tx: Sender<Command>,
}

impl<'a> Chip8Interpreter<'a> {
    /// Build a VM around `rom`. Fails without side effects on the display if
    /// the ROM can't be read or doesn't fit.
    pub fn new(
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: Box<dyn Sound>,
        rom: &mut impl io::Read,
        config: Config,
    ) -> Result<Chip8Interpreter<'a>, Chip8Error> {
        let rom = read_rom(rom, &config)?;
        let diag = Diagnostics::new(config.debug);
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (command_tx, commands) = mpsc::channel();
        Ok(Chip8Interpreter {
            memory: Chip8MemoryMap::with_program(&rom, diag),
            registers: Registers::new(diag),
            keypad: Keypad::new(),
            delay_timer: Timer::delay()?,
            sound_timer: Timer::sound(sound)?,
            display,
            input,
            rng,
            pc_updated: false,
            shutdown: Shutdown::default(),
            commands,
            command_tx,
            config,
            diag,
        })
    }

    /// Replace the running program. The new ROM is checked before anything
    /// is touched, so on `Err` the old program is still intact.
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<(), Chip8Error> {
        let rom = read_rom(reader, &self.config)?;
        self.memory = Chip8MemoryMap::with_program(&rom, self.diag);
        self.registers = Registers::new(self.diag);
        self.keypad.clear();
        self.display.clear();
        self.delay_timer.reset()?;
        self.sound_timer.reset()?;
        self.pc_updated = false;
        Ok(())
    }

    /// sender for `Command`s, usable from any thread
    pub fn commands(&self) -> Sender<Command> {
        self.command_tx.clone()
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn view(&self) -> MachineView<'_> {
        MachineView {
            memory: self.memory.get_ro_slice(0, usize::MAX),
            registers: self.registers.v_slice(),
            pc: self.registers.pc,
            index: self.registers.i,
            stack_depth: self.registers.stack_depth(),
            delay_timer: self.delay_timer.get(),
            sound_timer: self.sound_timer.get(),
        }
    }

    /// true once the program counter has run off the end of the ROM
    pub fn is_idle(&self) -> bool {
        usize::from(self.registers.pc) >= self.memory.program_end()
    }

    /// Run frames until shutdown or a fatal error.
    pub fn main_loop(&mut self) -> Result<(), Chip8Error> {
        let frame = self.config.frame_duration();
        let mut next_frame = Instant::now();
        loop {
            if self.run_frame()? == FrameState::Stopped {
                return Ok(());
            }
            next_frame += frame;
            let now = Instant::now();
            if next_frame > now {
                spin_sleep::sleep(next_frame - now);
            } else {
                // fell behind; don't try to catch up with a burst
                next_frame = now;
            }
        }
    }

    /// One frame: commands, an instruction budget, then presentation.
    pub fn run_frame(&mut self) -> Result<FrameState, Chip8Error> {
        self.service_commands()?;
        // input is polled even when idle so the quit key still works
        for _ in 0..self.config.instructions_per_frame {
            if !self.input.poll(&mut self.keypad)? {
                self.shutdown.request();
            }
            if self.shutdown.is_requested() || self.is_idle() {
                break;
            }
            self.cycle()?;
        }
        self.display.present()?;

        Ok(if self.shutdown.is_requested() {
            FrameState::Stopped
        } else if self.is_idle() {
            FrameState::Idle
        } else {
            FrameState::Running
        })
    }

    /// fetch, decode and execute a single instruction
    pub fn cycle(&mut self) -> Result<(), Chip8Error> {
        let pc = self.registers.pc;
        let op = self
            .memory
            .get_word(usize::from(pc))
            .ok_or(Chip8Error::FetchOutOfBounds { pc })?;

        self.pc_updated = false;
        match Instruction::decode(op) {
            Some(ins) => {
                if self.diag.enabled() {
                    self.trace(pc, op, ins);
                }
                self.execute(ins)?;
            }
            None => self
                .diag
                .warn(format_args!("unknown opcode {:04x} at {:04x}", op, pc)),
        }
        if !self.pc_updated {
            self.registers.pc = self.registers.pc.wrapping_add(2);
        }
        Ok(())
    }

    fn trace(&self, pc: u16, op: u16, ins: Instruction) {
        self.diag.trace(format_args!(
            "{:04x}: {:04x} {:<16} v{:02x?} i{:04x}",
            pc,
            op,
            ins.to_string(),
            self.registers.v_slice(),
            self.registers.i
        ));
    }

    /// drain the command queue; true if a new program was loaded
    fn service_commands(&mut self) -> Result<bool, Chip8Error> {
        let mut reloaded = false;
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                Command::Quit => self.shutdown.request(),
                Command::LoadRom(path) => match File::open(&path) {
                    Ok(mut f) => reloaded |= self.reload(&mut f, &path.display().to_string())?,
                    Err(e) => eprintln!("Warning: unable to open {}: {}", path.display(), e),
                },
                Command::LoadRomBytes(bytes) => {
                    reloaded |= self.reload(&mut bytes.as_slice(), "ROM bytes")?
                }
            }
        }
        Ok(reloaded)
    }

    // a ROM that fails validation is reported and the old one keeps running
    fn reload(&mut self, reader: &mut impl io::Read, what: &str) -> Result<bool, Chip8Error> {
        match self.load_program(reader) {
            Ok(()) => Ok(true),
            Err(e) if e.is_construction_error() => {
                eprintln!("Warning: not loading {}: {}", what, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn v(&self, x: u8) -> u8 {
        self.registers.v(usize::from(x))
    }

    fn set_v(&mut self, x: u8, val: u8) {
        self.registers.set_v(usize::from(x), val)
    }

    fn set_flag(&mut self, set: bool) {
        self.registers.set_v(VF, u8::from(set))
    }

    fn jump(&mut self, addr: u16) {
        self.registers.pc = addr;
        self.pc_updated = true;
    }

    /// step over the next instruction; the usual +2 still follows
    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.registers.pc = self.registers.pc.wrapping_add(2);
        }
    }

    fn index(&self) -> usize {
        usize::from(self.registers.i)
    }

    fn execute(&mut self, ins: Instruction) -> Result<(), Chip8Error> {
        use Instruction::*;

        match ins {
            Sys(addr) => self
                .diag
                .warn(format_args!("ignoring machine code routine at {:03x}", addr)),
            Cls => self.display.clear(),
            Ret => {
                self.registers.ret()?;
                self.pc_updated = true;
            }
            Jump(addr) => self.jump(addr),
            Call(addr) => {
                self.registers.call(addr)?;
                self.pc_updated = true;
            }
            SkipEqImm(x, kk) => self.skip_if(self.v(x) == kk),
            SkipNeImm(x, kk) => self.skip_if(self.v(x) != kk),
            SkipEqReg(x, y) => self.skip_if(self.v(x) == self.v(y)),
            SkipNeReg(x, y) => self.skip_if(self.v(x) != self.v(y)),
            LoadImm(x, kk) => self.set_v(x, kk),
            AddImm(x, kk) => self.set_v(x, self.v(x).wrapping_add(kk)),
            Move(x, y) => self.set_v(x, self.v(y)),
            Or(x, y) => self.set_v(x, self.v(x) | self.v(y)),
            And(x, y) => self.set_v(x, self.v(x) & self.v(y)),
            Xor(x, y) => self.set_v(x, self.v(x) ^ self.v(y)),
            // VF is written last in the arithmetic group so that when X is F
            // the flag is what survives
            AddReg(x, y) => {
                let sum = u16::from(self.v(x)) + u16::from(self.v(y));
                self.set_v(x, sum as u8);
                self.set_flag(sum > 0xff);
            }
            Sub(x, y) => {
                let diff = i16::from(self.v(x)) - i16::from(self.v(y));
                self.set_v(x, diff as u8);
                self.set_flag(diff >= 0);
            }
            SubFrom(x, y) => {
                let diff = i16::from(self.v(y)) - i16::from(self.v(x));
                self.set_v(x, diff as u8);
                self.set_flag(diff >= 0);
            }
            ShiftRight(x, _) => {
                let vx = self.v(x);
                self.set_v(x, vx >> 1);
                self.set_flag(vx & 0x01 != 0);
            }
            ShiftLeft(x, _) => {
                let wide = u16::from(self.v(x)) << 1;
                self.set_v(x, wide as u8);
                self.set_flag(wide > 0xff);
            }
            LoadIndex(addr) => self.registers.i = addr,
            JumpOffset(addr) => self.jump(u16::from(self.v(0)) + addr),
            Random(x, kk) => {
                let r: u8 = self.rng.gen();
                self.set_v(x, r & kk);
            }
            Draw(x, y, n) => self.draw(x, y, n),
            SkipKeyDown(x) => {
                let down = self.key_down(self.v(x));
                self.skip_if(down);
            }
            SkipKeyUp(x) => {
                let down = self.key_down(self.v(x));
                self.skip_if(!down);
            }
            ReadDelay(x) => self.set_v(x, self.delay_timer.get()),
            AwaitKey(x) => self.await_key(x)?,
            SetDelay(x) => self.delay_timer.set(self.v(x)),
            SetSound(x) => self.sound_timer.set(self.v(x)),
            AddIndex(x) => self.registers.i = self.registers.i.wrapping_add(u16::from(self.v(x))),
            FontGlyph(x) => self.registers.i = Chip8MemoryMap::font_glyph_addr(self.v(x)) as u16,
            Bcd(x) => {
                let vx = self.v(x);
                let i = self.index();
                self.memory.write_slice(i, &[vx / 100, vx / 10 % 10, vx % 10]);
            }
            StoreRegs(x) => {
                let i = self.index();
                for r in 0..=x {
                    self.memory.write(i + usize::from(r), self.v(r));
                }
                self.bump_index(x);
            }
            LoadRegs(x) => {
                let i = self.index();
                for r in 0..=x {
                    let val = self.memory.read(i + usize::from(r));
                    self.set_v(r, val);
                }
                self.bump_index(x);
            }
        }
        Ok(())
    }

    fn bump_index(&mut self, x: u8) {
        if self.config.index_increment_quirk {
            self.registers.i = self.registers.i.wrapping_add(u16::from(x) + 1);
        }
    }

    /// DXYN: XOR `n` sprite rows from memory at I onto the display
    fn draw(&mut self, x: u8, y: u8, n: u8) {
        let vx = usize::from(self.v(x));
        let vy = usize::from(self.v(y));
        let i = self.index();

        let mut collided = false;
        for row in 0..usize::from(n) {
            let bits = self.memory.read(i + row);
            collided |= self.display.draw_row(vx, vy + row, bits);
        }
        self.set_flag(collided);
    }

    fn key_down(&self, key: u8) -> bool {
        match self.keypad.is_pressed(key) {
            Some(down) => down,
            None => {
                self.diag
                    .warn(format_args!("key {:#04x} is not on the keypad", key));
                false
            }
        }
    }

    /// FX0A: block until a key goes down, still honouring shutdown and
    /// commands, and keep the screen fresh meanwhile. A key already held when
    /// the wait starts has to be released and pressed again.
    fn await_key(&mut self, x: u8) -> Result<(), Chip8Error> {
        let frame = self.config.frame_duration();
        let mut last_present = Instant::now();
        let mut before = self.keypad;
        loop {
            if !self.input.poll(&mut self.keypad)? {
                self.shutdown.request();
            }
            if let Some(key) = self.keypad.first_pressed_since(&before) {
                self.set_v(x, key);
                return Ok(());
            }
            before = self.keypad;
            // leave PC on this instruction; a reload has already reset it
            if self.shutdown.is_requested() || self.service_commands()? {
                self.pc_updated = true;
                return Ok(());
            }
            if last_present.elapsed() >= frame {
                self.display.present()?;
                last_present = Instant::now();
            }
            spin_sleep::sleep(KEY_WAIT_POLL);
        }
    }
}
