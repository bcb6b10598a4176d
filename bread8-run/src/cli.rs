use std::path::PathBuf;
use std::time::Duration;

pub use clap::Parser;

use bread8_sim::image::{DEFAULT_CTRL_LSB, DEFAULT_CTRL_MSB, DEFAULT_ROM};
use bread8_sim::MachineConfig;

/// Paths of the three images the board boots from.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Images {
    pub rom: PathBuf,
    pub ctrl_lsb: PathBuf,
    pub ctrl_msb: PathBuf
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSettings {
    /// Stop after this many cycles.
    pub limit: Option<u64>,
    /// Time between two cycles; unpaced when `None`.
    pub period: Option<Duration>,
    pub stop_on_halt: bool
}
impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            limit: None,
            period: None,
            stop_on_halt: true
        }
    }
}

pub enum Mode {
    Run {
        images: Images,
        config: MachineConfig,
        settings: RunSettings
    },
    Listing {
        images: Images,
        opcode: u8
    }
}

/// Runs the breadboard computer from its ROM and microcode images.
///
/// Keyboard input goes to the memory-mapped terminal; whatever the program writes there is
/// printed on standard output. Press Ctrl-C to stop.
#[derive(Parser, Debug)]
#[command(name = "bread8", version)]
pub struct Options {
    /// Program ROM image, loaded at address 0.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_ROM)]
    rom: PathBuf,
    /// Low byte plane of the microcode.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CTRL_LSB)]
    ctrl_lsb: PathBuf,
    /// High byte plane of the microcode.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CTRL_MSB)]
    ctrl_msb: PathBuf,
    /// Stops after the given number of clock cycles.
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,
    /// Clock frequency in hertz. Runs as fast as possible when omitted.
    #[arg(long = "hz", value_name = "F", value_parser = parse_period)]
    period: Option<Duration>,
    /// Fails as soon as two components drive the data port in the same phase.
    #[arg(long)]
    check_bus: bool,
    /// Keeps clocking after the program halts.
    #[arg(long)]
    no_halt: bool,
    /// Prints the microcode of one opcode (decimal or `0x` hex) and exits.
    #[arg(long, value_name = "OPCODE", value_parser = parse_opcode)]
    listing: Option<u8>,
    /// Increases log verbosity; repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8
}

fn parse_opcode(s: &str) -> Result<u8, String> {
    let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        s.parse()
    };

    match value {
        Ok(opcode) if opcode < 64 => Ok(opcode),
        Ok(opcode) => Err(format!("opcode {} does not fit in 6 bits", opcode)),
        Err(e) => Err(e.to_string())
    }
}

/// Turns a clock frequency into the time between two cycles.
fn parse_period(s: &str) -> Result<Duration, String> {
    let hz: f64 = s.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
    if !(hz.is_finite() && hz > 0.0) {
        return Err(format!("`{}` is not a positive frequency", s));
    }

    match Duration::try_from_secs_f64(1.0 / hz) {
        Ok(period) if !period.is_zero() => Ok(period),
        Ok(_) => Err(format!("{} Hz is faster than the timer resolution", s)),
        Err(_) => Err(format!("{} Hz is too slow to time", s))
    }
}

impl Options {
    pub fn from_command_line() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    pub fn into_mode(self) -> Mode {
        let images = Images {
            rom: self.rom,
            ctrl_lsb: self.ctrl_lsb,
            ctrl_msb: self.ctrl_msb
        };

        if let Some(opcode) = self.listing {
            Mode::Listing { images, opcode }
        } else {
            Mode::Run {
                images,
                config: MachineConfig {
                    check_bus_contention: self.check_bus
                },
                settings: RunSettings {
                    limit: self.cycles,
                    period: self.period,
                    stop_on_halt: !self.no_halt
                }
            }
        }
    }
}
