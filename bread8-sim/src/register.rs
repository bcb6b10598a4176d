//! Generic register, modeled after the 74HC161 counter / 74HC173 latch pair.

use crate::clock::Clock;
use crate::control::{ControlWord, Mask};
use crate::error::SimulationResult;
use crate::line::{Line, Probe, Socket};

/// Control signals a register reacts to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RegisterMasks {
    /// Latch the port into the selected byte.
    pub input: Mask,
    /// Drive the selected byte onto the port.
    pub output: Mask,
    /// Increment the full 16-bit value.
    pub count: Mask,
    /// Select the high byte instead of the low byte.
    pub high: Mask
}
impl RegisterMasks {
    pub fn new(input: Mask, output: Mask, count: Mask, high: Mask) -> Self {
        RegisterMasks { input, output, count, high }
    }
}

pub struct Register {
    data: Line<u16>,
    low: Socket<u16, u8>,
    high: Socket<u16, u8>,
    port: Socket<u8, u8>,
    ctrl: Probe<ControlWord, ControlWord>,
    masks: RegisterMasks
}
impl Register {
    pub fn new(port: Socket<u8, u8>, ctrl: Probe<ControlWord, ControlWord>, masks: RegisterMasks) -> Self {
        let data = Line::new();
        let low = data.socket_low8();
        let high = data.socket_high8();

        Register {
            data,
            low,
            high,
            port,
            ctrl,
            masks
        }
    }

    pub fn get(&self) -> u16 {
        self.data.get()
    }

    /// Read-only view of the register contents, for components wired to its outputs.
    pub fn probe(&self) -> Probe<u16, u16> {
        self.data.probe()
    }

    /// Write handle on the register contents, for asynchronous clear/load pins.
    pub fn socket(&self) -> Socket<u16, u16> {
        self.data.socket()
    }

    fn selected(&self, ctrl: ControlWord) -> &Socket<u16, u8> {
        if self.masks.high.is_active(ctrl) { &self.high } else { &self.low }
    }
}
impl Clock for Register {
    fn reset(&mut self) {
        self.data.reset();
    }

    fn being_low(&mut self) -> SimulationResult<()> {
        let ctrl = self.ctrl.read();
        if self.masks.output.is_active(ctrl) {
            self.port.write(self.selected(ctrl).read());
        }
        Ok(())
    }

    fn rising_edge(&mut self) -> SimulationResult<()> {
        let ctrl = self.ctrl.read();
        if self.masks.input.is_active(ctrl) {
            self.selected(ctrl).write(self.port.read());
        } else if self.masks.count.is_active(ctrl) {
            self.data.set(self.data.get().wrapping_add(1));
        }
        Ok(())
    }
}
