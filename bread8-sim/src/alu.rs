//! 8-bit adder with subtract and carry-in, modeled after a pair of 74HC283.

use crate::clock::Clock;
use crate::control::{ControlWord, Mask};
use crate::error::SimulationResult;
use crate::line::{Probe, Socket};

pub const ZERO: u8 = 0b001;
pub const CARRY: u8 = 0b010;
pub const NEGATIVE: u8 = 0b100;

/// Control signals the ALU reacts to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AluMasks {
    /// Drive the result onto the port.
    pub output: Mask,
    /// Invert B before adding.
    pub invert: Mask,
    /// Add one (carry in).
    pub carry: Mask
}

/// Result of one evaluation of the adder.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Sum {
    pub value: u8,
    pub flags: u8
}
impl Sum {
    pub fn compute(a: u8, b: u8, invert: bool, carry_in: bool) -> Self {
        let b = if invert { !b } else { b };
        let result = a as u16 + b as u16 + carry_in as u16;

        let mut flags = 0;
        if result & 0xFF == 0 { flags |= ZERO; }
        if result > 0xFF { flags |= CARRY; }
        if result & 0x80 != 0 { flags |= NEGATIVE; }

        Sum {
            value: result as u8,
            flags
        }
    }
}

pub struct Alu {
    port: Socket<u8, u8>,
    ctrl: Probe<ControlWord, ControlWord>,
    reg_a: Probe<u16, u16>,
    reg_b: Probe<u16, u16>,
    flags: Socket<u8, u8>,
    masks: AluMasks
}
impl Alu {
    pub fn new(
        port: Socket<u8, u8>,
        ctrl: Probe<ControlWord, ControlWord>,
        reg_a: Probe<u16, u16>,
        reg_b: Probe<u16, u16>,
        flags: Socket<u8, u8>,
        masks: AluMasks
    ) -> Self {
        Alu { port, ctrl, reg_a, reg_b, flags, masks }
    }

    fn evaluate(&self) {
        let ctrl = self.ctrl.read();
        let sum = Sum::compute(
            (self.reg_a.read() & 0xFF) as u8,
            (self.reg_b.read() & 0xFF) as u8,
            self.masks.invert.is_active(ctrl),
            self.masks.carry.is_active(ctrl)
        );

        self.flags.write(sum.flags);
        if self.masks.output.is_active(ctrl) {
            self.port.write(sum.value);
        }
    }
}
impl Clock for Alu {
    fn being_low(&mut self) -> SimulationResult<()> {
        self.evaluate();
        Ok(())
    }

    fn getting_high(&mut self) -> SimulationResult<()> {
        // The adder is asynchronous: a register latched on the rising edge feeds straight back
        // into the sum, so "EOFI|AI|RI" stores the updated sum in memory.
        self.evaluate();
        Ok(())
    }
}
