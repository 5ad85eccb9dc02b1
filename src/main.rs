use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use chip8::config::{Config, DEFAULT_FRAME_RATE, DEFAULT_INSTRUCTIONS_PER_FRAME};
use chip8::display::MonoTermDisplay;
use chip8::input::StdinInput;
use chip8::interpreter::Chip8Interpreter;
use chip8::sound::{Mute, SimpleBeep, Sound};

/// Run a CHIP-8 ROM in the terminal. Esc quits.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// path to the ROM file to run
    rom: PathBuf,

    /// report absorbed faults and trace every instruction on stderr. stderr
    /// shares the terminal with the display, so redirect it (`2>trace.log`)
    #[arg(short, long)]
    debug: bool,

    #[arg(short, long, default_value_t = DEFAULT_INSTRUCTIONS_PER_FRAME)]
    instructions_per_frame: u16,

    #[arg(short, long, default_value_t = DEFAULT_FRAME_RATE)]
    frame_rate: u32,

    /// accept ROMs with an odd number of bytes
    #[arg(long)]
    lax: bool,

    /// FX55/FX65 advance I past the registers they touch
    #[arg(long)]
    index_quirk: bool,

    /// seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long)]
    mute: bool,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Config {
        Config {
            debug: args.debug,
            check_rom_integrity: !args.lax,
            instructions_per_frame: args.instructions_per_frame,
            frame_rate: args.frame_rate,
            index_increment_quirk: args.index_quirk,
            rng_seed: args.seed,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::from(&args);

    // open the ROM before touching the terminal so errors print cleanly
    let mut f = File::open(&args.rom)?;

    let sound: Box<dyn Sound> = if args.mute {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };
    let mut display = MonoTermDisplay::new()?;
    let mut input = StdinInput::new()?;
    let mut interpreter = Chip8Interpreter::new(&mut display, &mut input, sound, &mut f, config)?;

    interpreter.main_loop()?;
    drop(interpreter);

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..12 {
        println!();
    }
    Ok(())
}
