//! Cycle-level simulation of an 8-bit breadboard computer.
//!
//! Components communicate only through shared lines (the data port, the control word
//! and the ALU flags) and react to the five phases of each clock cycle.

pub mod alu;
pub mod clock;
pub mod control;
pub mod error;
pub mod image;
pub mod line;
pub mod machine;
pub mod memory;
pub mod register;
pub mod sequencer;
pub mod terminal;

pub use control::ControlWord;
pub use machine::{Machine, MachineConfig, MachineState};
pub use terminal::Terminal;
