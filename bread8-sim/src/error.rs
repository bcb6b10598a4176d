use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

use crate::clock::Phase;
use crate::control::ControlWord;

pub type SimulationResult<T> = std::result::Result<T, SimulationError>;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SimulationErrorKind {
    ImageNotFound,
    ImageTruncated,
    BusContention
}

/// Error raised while building or clocking a machine.
///
/// Image errors are fatal for initialization; bus contention is only ever reported when the
/// machine was configured to check it.
#[derive(Debug)]
pub enum SimulationError {
    /// An image file could not be read.
    ImageNotFound {
        path: PathBuf,
        cause: io::Error
    },
    /// A microcode byte plane holds fewer than 8 KiB.
    ImageTruncated {
        plane: &'static str,
        len: usize,
        expected: usize
    },
    /// More than one component drove the port within a single phase.
    BusContention {
        cycle: u64,
        phase: Phase,
        ctrl: ControlWord,
        drivers: u32
    }
}
impl SimulationError {
    pub fn kind(&self) -> SimulationErrorKind {
        match *self {
            SimulationError::ImageNotFound { .. } => SimulationErrorKind::ImageNotFound,
            SimulationError::ImageTruncated { .. } => SimulationErrorKind::ImageTruncated,
            SimulationError::BusContention { .. } => SimulationErrorKind::BusContention
        }
    }
}
impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            SimulationError::ImageNotFound { ref path, ref cause } => {
                write!(f, "cannot read image `{}`: {}", path.display(), cause)
            }
            SimulationError::ImageTruncated { plane, len, expected } => {
                write!(f, "{} byte plane holds {} of {} bytes", plane, len, expected)
            }
            SimulationError::BusContention { cycle, phase, ctrl, drivers } => {
                write!(f, "{} drivers on the port during {} of cycle {} [{}]", drivers, phase, cycle, ctrl)
            }
        }
    }
}
impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            SimulationError::ImageNotFound { ref cause, .. } => Some(cause),
            _ => None
        }
    }
}
