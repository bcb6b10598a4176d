//! 32 KiB memory: program ROM, RAM and the terminal window.
//!
//! | range           | contents                                   |
//! |-----------------|--------------------------------------------|
//! | `0x0000-0x1FFF` | program ROM, loaded at startup, read-only  |
//! | `0x2000-0x7FFF` | RAM                                        |
//! | `0x8000-0xFFFF` | terminal: read pops input, write prints    |

use std::rc::Rc;

use tracing::warn;

use crate::clock::Clock;
use crate::control::{ControlWord, Mask};
use crate::error::SimulationResult;
use crate::line::{Probe, Socket};
use crate::terminal::Terminal;

pub const MEMORY_SIZE: usize = 0x8000;
pub const ROM_SIZE: usize = 0x2000;
pub const RAM_START: u16 = 0x2000;
pub const TERMINAL_SELECT: u16 = 0x8000;

/// Control signals the memory reacts to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MemoryMasks {
    /// Store the port at the current address.
    pub input: Mask,
    /// Drive the byte at the current address onto the port.
    pub output: Mask
}

pub struct Memory {
    data: Box<[u8; MEMORY_SIZE]>,
    port: Socket<u8, u8>,
    ctrl: Probe<ControlWord, ControlWord>,
    mar: Probe<u16, u16>,
    terminal: Rc<Terminal>,
    masks: MemoryMasks
}
impl Memory {
    pub fn new(
        port: Socket<u8, u8>,
        ctrl: Probe<ControlWord, ControlWord>,
        mar: Probe<u16, u16>,
        terminal: Rc<Terminal>,
        masks: MemoryMasks
    ) -> Self {
        Memory {
            data: Box::new([0; MEMORY_SIZE]),
            port,
            ctrl,
            mar,
            terminal,
            masks
        }
    }

    /// Seeds the ROM region; anything past the first 8 KiB is dropped.
    pub fn with_rom(mut self, rom: &[u8]) -> Self {
        if rom.len() > ROM_SIZE {
            warn!("ROM image is {} bytes, only the first {} are used", rom.len(), ROM_SIZE);
        }
        let len = rom.len().min(ROM_SIZE);
        self.data[..len].copy_from_slice(&rom[..len]);
        self
    }

    /// Reads the array without side effects; the terminal window is not visible here.
    pub fn peek(&self, addr: u16) -> u8 {
        self.data[(addr & 0x7FFF) as usize]
    }

    pub fn terminal(&self) -> &Rc<Terminal> {
        &self.terminal
    }
}
impl Clock for Memory {
    // Reset does not touch the array: ROM stays loaded and RAM keeps its contents.

    fn being_low(&mut self) -> SimulationResult<()> {
        if self.masks.output.is_active(self.ctrl.read()) {
            let addr = self.mar.read();
            let value = if addr & TERMINAL_SELECT != 0 {
                self.terminal.pop_input().unwrap_or(0)
            } else {
                self.data[(addr & 0x7FFF) as usize]
            };
            self.port.write(value);
        }
        Ok(())
    }

    fn being_high(&mut self) -> SimulationResult<()> {
        if self.masks.input.is_active(self.ctrl.read()) {
            let addr = self.mar.read();
            let value = self.port.read();
            if addr & TERMINAL_SELECT != 0 {
                if value != 0 {
                    self.terminal.emit(value);
                }
            } else if addr >= RAM_START {
                self.data[addr as usize] = value;
            }
        }
        Ok(())
    }
}
