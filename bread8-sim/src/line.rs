//! Shared lines connecting the components.
//!
//! A line is a single value visible to every component wired to it. Components never hold the
//! line itself: they are handed a [`Socket`] when they may drive it, or a [`Probe`] when they
//! may only look at it.

use std::cell::Cell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use crate::control::ControlWord;

struct Contents<T> {
    value: Cell<T>,
    drivers: Cell<u32>
}

/// Read/write handle on a line, optionally restricted to a part of its value.
pub struct Socket<T, S> {
    pub(self) contents: Rc<Contents<T>>,
    pub(self) reader: fn(T) -> S,
    pub(self) writer: fn(T, S) -> T
}
impl<T, S> Socket<T, S> where
    T: Copy
{
    pub fn read(&self) -> S {
        (self.reader)(self.contents.value.get())
    }

    pub fn write(&self, v: S) {
        let old_v = self.contents.value.get();
        self.contents.value.set((self.writer)(old_v, v));
        self.contents.drivers.set(self.contents.drivers.get() + 1);
    }

    /// Downgrades a copy of this socket to a read-only handle.
    pub fn probe(&self) -> Probe<T, S> {
        Probe {
            contents: self.contents.clone(),
            reader: self.reader
        }
    }
}
impl<T, S> Clone for Socket<T, S> {
    fn clone(&self) -> Self {
        Socket {
            contents: self.contents.clone(),
            reader: self.reader,
            writer: self.writer
        }
    }
}
impl<T, S> Debug for Socket<T, S> where
    T: Copy + Debug
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Socket").field(&self.contents.value.get()).finish()
    }
}

/// Read-only handle on a line.
pub struct Probe<T, S> {
    pub(self) contents: Rc<Contents<T>>,
    pub(self) reader: fn(T) -> S
}
impl<T, S> Probe<T, S> where
    T: Copy
{
    pub fn read(&self) -> S {
        (self.reader)(self.contents.value.get())
    }
}
impl<T, S> Clone for Probe<T, S> {
    fn clone(&self) -> Self {
        Probe {
            contents: self.contents.clone(),
            reader: self.reader
        }
    }
}
impl<T, S> Debug for Probe<T, S> where
    T: Copy + Debug
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Probe").field(&self.contents.value.get()).finish()
    }
}

pub struct Line<T> {
    contents: Rc<Contents<T>>
}
impl<T> Line<T> where
    T: Copy + Default
{
    pub fn new() -> Self {
        Line {
            contents: Rc::new(Contents {
                value: Cell::new(T::default()),
                drivers: Cell::new(0)
            })
        }
    }

    pub fn get(&self) -> T {
        self.contents.value.get()
    }

    pub fn set(&self, v: T) {
        self.socket().write(v)
    }

    pub fn reset(&self) {
        self.contents.value.set(T::default());
        self.contents.drivers.set(0);
    }

    pub fn make_socket<S>(&self, reader: fn(T) -> S, writer: fn(T, S) -> T) -> Socket<T, S> {
        Socket {
            contents: self.contents.clone(),
            reader,
            writer
        }
    }

    pub fn socket(&self) -> Socket<T, T> {
        self.make_socket(|v| v, |_, v| v)
    }

    pub fn probe(&self) -> Probe<T, T> {
        Probe {
            contents: self.contents.clone(),
            reader: |v| v
        }
    }

    /// Forgets the writes counted so far; called by the machine before every phase.
    pub fn begin_phase(&self) {
        self.contents.drivers.set(0);
    }

    /// Number of writes since the last [`Line::begin_phase`].
    pub fn drivers(&self) -> u32 {
        self.contents.drivers.get()
    }
}
impl Line<u16> {
    pub fn socket_low8(&self) -> Socket<u16, u8> {
        self.make_socket(|v| (v & 0xFF) as u8, |old_v, v| (old_v & 0xFF00) | (v as u16))
    }

    pub fn socket_high8(&self) -> Socket<u16, u8> {
        self.make_socket(|v| (v >> 8) as u8, |old_v, v| (old_v & 0x00FF) | ((v as u16) << 8))
    }
}
impl<T> Default for Line<T> where
    T: Copy + Default
{
    fn default() -> Self {
        Self::new()
    }
}
impl<T> Clone for Line<T> {
    fn clone(&self) -> Self {
        Line {
            contents: self.contents.clone()
        }
    }
}
impl<T> Debug for Line<T> where
    T: Copy + Debug
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Line").field(&self.contents.value.get()).finish()
    }
}

/// 8-bit data bus between registers, ALU and memory.
pub type PortLine = Line<u8>;
/// Zero/carry/negative flags produced by the ALU; only the low three bits are significant.
pub type FlagLine = Line<u8>;
/// Decoded (active-high) control word of the current cycle.
pub type ControlLine = Line<ControlWord>;
