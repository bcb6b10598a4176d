//! Microcode sequencer.
//!
//! The control word of a cycle is looked up in a pair of 8 KiB EEPROMs addressed by
//! `flags:3 | opcode:6 | step:4`.

use std::fmt::{self, Debug, Formatter};

use tracing::warn;

use crate::clock::Clock;
use crate::control::ControlWord;
use crate::error::{SimulationError, SimulationResult};
use crate::line::{Probe, Socket};

pub const MICROCODE_SIZE: usize = 0x2000;

/// Port level while the board is halted.
pub const PORT_HALT: u8 = 0x7F;
/// Port level with nothing driving it (pull-ups).
pub const PORT_IDLE: u8 = 0xFF;

/// Decoded contents of the two microcode EEPROMs. Immutable once built.
#[derive(Clone)]
pub struct Microcode {
    words: Box<[ControlWord]>
}
impl Microcode {
    /// Combines the low and high byte planes, converting every word to active-high.
    pub fn from_planes(lsb: &[u8], msb: &[u8]) -> SimulationResult<Self> {
        for &(name, plane) in [("low", lsb), ("high", msb)].iter() {
            if plane.len() < MICROCODE_SIZE {
                return Err(SimulationError::ImageTruncated {
                    plane: name,
                    len: plane.len(),
                    expected: MICROCODE_SIZE
                });
            }
            if plane.len() > MICROCODE_SIZE {
                warn!("{} byte plane is {} bytes, only the first {} are used", name, plane.len(), MICROCODE_SIZE);
            }
        }

        let words = lsb.iter()
            .zip(msb.iter())
            .take(MICROCODE_SIZE)
            .map(|(&lo, &hi)| ControlWord::from_raw((lo as u16) | ((hi as u16) << 8)))
            .collect();

        Ok(Microcode { words })
    }

    /// Builds a table from active-high words; missing trailing entries are left empty.
    pub fn from_words<I>(words: I) -> Self
        where
            I: IntoIterator<Item = ControlWord>
    {
        let mut table = vec![ControlWord::NONE; MICROCODE_SIZE];
        for (entry, word) in table.iter_mut().zip(words) {
            *entry = word;
        }

        Microcode { words: table.into_boxed_slice() }
    }

    /// Encodes the table back into EEPROM byte planes `(lsb, msb)`.
    pub fn to_planes(&self) -> (Vec<u8>, Vec<u8>) {
        self.words.iter()
            .map(|word| {
                let raw = word.to_raw();
                ((raw & 0xFF) as u8, (raw >> 8) as u8)
            })
            .unzip()
    }

    pub fn index(flags: u16, opcode: u16, step: u16) -> usize {
        (((flags & 0b111) << 10) | ((opcode & 0b11_1111) << 4) | (step & 0b1111)) as usize
    }

    pub fn word(&self, index: usize) -> ControlWord {
        self.words[index % MICROCODE_SIZE]
    }

    pub fn lookup(&self, flags: u16, opcode: u16, step: u16) -> ControlWord {
        self.word(Self::index(flags, opcode, step))
    }
}
impl Debug for Microcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let used = self.words.iter().filter(|word| !word.is_empty()).count();
        f.debug_struct("Microcode").field("used", &used).finish()
    }
}

pub struct Sequencer {
    port: Socket<u8, u8>,
    ctrl: Socket<ControlWord, ControlWord>,
    reg_instr: Probe<u16, u16>,
    reg_flags: Probe<u16, u16>,
    reg_steps: Socket<u16, u16>,
    microcode: Microcode
}
impl Sequencer {
    pub fn new(
        port: Socket<u8, u8>,
        ctrl: Socket<ControlWord, ControlWord>,
        reg_instr: Probe<u16, u16>,
        reg_flags: Probe<u16, u16>,
        reg_steps: Socket<u16, u16>,
        microcode: Microcode
    ) -> Self {
        Sequencer { port, ctrl, reg_instr, reg_flags, reg_steps, microcode }
    }

    fn fetch(&self) -> ControlWord {
        self.microcode.lookup(self.reg_flags.read(), self.reg_instr.read(), self.reg_steps.read())
    }
}
impl Clock for Sequencer {
    fn falling_edge(&mut self) -> SimulationResult<()> {
        let mut word = self.fetch();

        // Asynchronous reset of the step counter: step 0 of the same instruction is
        // presented within the same phase.
        if word.intersects(ControlWord::IC) {
            self.reg_steps.write(0);
            word = self.fetch();
        }
        self.ctrl.write(word);

        if word.intersects(ControlWord::HI) {
            self.port.write(PORT_HALT);
        } else {
            self.port.write(PORT_IDLE);
        }
        Ok(())
    }
}
