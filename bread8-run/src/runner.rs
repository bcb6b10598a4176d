//! Clocks a machine, feeding keyboard bytes into its terminal and printing what comes out.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io::{self, IsTerminal, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use bread8_sim::error::SimulationResult;
use bread8_sim::sequencer::Microcode;
use bread8_sim::{ControlWord, Machine, MachineConfig, Terminal};

use crate::cli::{Images, RunSettings};
use crate::tty::{self, Console, Input};

/// Unpaced runs hand control back to the scheduler this often.
const YIELD_INTERVAL: u64 = 4096;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StopReason {
    Halted,
    CycleLimit,
    Interrupted
}
impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match *self {
            StopReason::Halted => "halted",
            StopReason::CycleLimit => "cycle limit reached",
            StopReason::Interrupted => "interrupted"
        }
    }
}
impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    pub reason: StopReason,
    pub elapsed: Duration
}
impl RunSummary {
    /// Effective clock frequency in hertz.
    pub fn frequency(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.cycles as f64 / secs
        } else {
            0.0
        }
    }
}

pub fn build(images: &Images, config: MachineConfig) -> SimulationResult<Machine> {
    Machine::from_images(&images.rom, &images.ctrl_lsb, &images.ctrl_msb, Rc::new(Terminal::new()), config)
}

/// Moves pending input into the terminal. Returns `true` once an interrupt shows up.
fn feed(machine: &Machine, input: &mut UnboundedReceiver<Input>) -> bool {
    loop {
        match input.try_recv() {
            Ok(Input::Byte(byte)) => machine.terminal().push_input(byte),
            Ok(Input::Interrupt) => return true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return false
        }
    }
}

/// Clocks `machine` until it halts, hits the cycle limit, or an interrupt arrives.
pub async fn drive<W: Write>(
    machine: &mut Machine,
    input: &mut UnboundedReceiver<Input>,
    console: &mut Console<W>,
    settings: &RunSettings
) -> Result<RunSummary, Box<dyn Error>> {
    let started = Instant::now();
    let first_cycle = machine.cycles();
    // a zero period means unpaced
    let mut ticker = settings.period.filter(|period| !period.is_zero()).map(|period| {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let reason = loop {
        if feed(machine, input) {
            break StopReason::Interrupted;
        }
        if settings.stop_on_halt && machine.halted() {
            break StopReason::Halted;
        }
        if let Some(limit) = settings.limit {
            if machine.cycles() - first_cycle >= limit {
                break StopReason::CycleLimit;
            }
        }

        match ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => {
                if machine.cycles() % YIELD_INTERVAL == 0 {
                    task::yield_now().await;
                }
            }
        }

        machine.cycle()?;
        console.write_bytes(&machine.terminal().take_output())?;
    };

    let summary = RunSummary {
        cycles: machine.cycles() - first_cycle,
        reason,
        elapsed: started.elapsed()
    };
    debug!("{}", machine.state());
    info!("{} after {} cycles", summary.reason, summary.cycles);
    Ok(summary)
}

/// Loads the images, resets the board and runs it against the process' standard streams.
pub async fn run(images: Images, config: MachineConfig, settings: RunSettings) -> Result<RunSummary, Box<dyn Error>> {
    let mut machine = build(&images, config)?;
    machine.reset();

    let interactive = io::stdin().is_terminal();
    debug!("standard input is {}", if interactive { "a terminal" } else { "piped" });

    let (mut input, guard) = tty::open_input(interactive)?;
    let mut console = Console::new(io::stdout(), guard.is_some());
    drive(&mut machine, &mut input, &mut console, &settings).await
}

/// Prints the micro-steps of `opcode` for every flag combination that changes them.
pub fn listing<W: Write>(microcode: &Microcode, opcode: u8, out: &mut W) -> io::Result<()> {
    let steps = |flags: u16| -> Vec<ControlWord> {
        let mut words = Vec::new();
        for step in 0..16 {
            let word = microcode.lookup(flags, opcode as u16, step);
            words.push(word);
            if word.intersects(ControlWord::IC) {
                break;
            }
        }
        words
    };

    let base = steps(0);
    writeln!(out, "opcode {:#04X}", opcode)?;
    for flags in 0..8u16 {
        let words = steps(flags);
        if flags != 0 && words == base {
            continue;
        }

        writeln!(out, "  flags {:03b} (NCZ)", flags)?;
        for (step, word) in words.iter().enumerate() {
            writeln!(out, "    {:>2}  {}", step, word)?;
        }
    }
    out.flush()
}
