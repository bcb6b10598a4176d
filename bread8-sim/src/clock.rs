use std::fmt::{self, Display, Formatter};

use crate::error::SimulationResult;

/// The five phases a clock cycle is broken into, in the order they are broadcast.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    FallingEdge,
    BeingLow,
    RisingEdge,
    GettingHigh,
    BeingHigh
}
impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::FallingEdge,
        Phase::BeingLow,
        Phase::RisingEdge,
        Phase::GettingHigh,
        Phase::BeingHigh
    ];

    pub(self) fn as_str(&self) -> &'static str {
        match *self {
            Phase::FallingEdge => "falling edge",
            Phase::BeingLow => "being low",
            Phase::RisingEdge => "rising edge",
            Phase::GettingHigh => "getting high",
            Phase::BeingHigh => "being high"
        }
    }
}
impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A component stepped by the cycle driver.
///
/// The driver broadcasts one phase to every component before moving on to the next one, so a
/// component observes everything written by the components visited before it in the same phase.
pub trait Clock {
    fn reset(&mut self) {}

    fn falling_edge(&mut self) -> SimulationResult<()> { Ok(()) }
    fn being_low(&mut self) -> SimulationResult<()> { Ok(()) }
    fn rising_edge(&mut self) -> SimulationResult<()> { Ok(()) }
    fn getting_high(&mut self) -> SimulationResult<()> { Ok(()) }
    fn being_high(&mut self) -> SimulationResult<()> { Ok(()) }

    fn phase(&mut self, phase: Phase) -> SimulationResult<()> {
        match phase {
            Phase::FallingEdge => self.falling_edge(),
            Phase::BeingLow => self.being_low(),
            Phase::RisingEdge => self.rising_edge(),
            Phase::GettingHigh => self.getting_high(),
            Phase::BeingHigh => self.being_high()
        }
    }
}
