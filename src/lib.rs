//! A CHIP-8 virtual machine.
//!
//! ## Design
//!
//! * the machine is the 4K memory map, sixteen V registers, I, PC and a
//!   16-deep call stack; everything else is plugged in through traits
//! * instructions run in batches per 60Hz frame, then the loop sleeps to the
//!   frame boundary; so not cycle-accurate
//! * the delay and sound timers each count down on their own thread and
//!   share nothing with the CPU but an atomic counter
//! * display, input and audio are traits so the interpreter doesn't need to
//!   know how any of them work; the terminal ones use TUI and crossterm
//! * bad ROMs are rejected before a machine exists; bad data accesses and
//!   unknown opcodes are absorbed; a wild PC or a broken stack ends the run
//!
//! Model
//!
//! ```text
//! main
//!  |-- config, display, input, sound
//!  |-- interpreter(display, input, sound, rom, config)
//!  |    |-- memory map (font + program)
//!  |    |-- registers + call stack
//!  |    |-- delay timer thread, sound timer thread(sound)
//!  |    `-- command queue (reload ROM, quit)
//!  `-- main loop
//!       |-- apply commands
//!       |-- up to N x { poll input; fetch; decode; execute }
//!       |-- present display
//!       `-- sleep to next frame
//! ```
pub mod config;
pub mod diag;
pub mod display;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod interpreter;
pub mod memory;
pub mod opcode;
pub mod registers;
pub mod sound;
pub mod timer;

pub use config::Config;
pub use error::Chip8Error;
pub use interpreter::{Chip8Interpreter, Command, FrameState, MachineView, Shutdown};
