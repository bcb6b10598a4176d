use std::cell::RefCell;
use std::collections::VecDeque;

/// Memory-mapped terminal shared between the memory and the cycle driver.
///
/// The driver pushes keyboard bytes in and drains console bytes out; memory does the reverse.
#[derive(Debug, Default)]
pub struct Terminal {
    input: RefCell<VecDeque<u8>>,
    output: RefCell<VecDeque<u8>>
}
impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&self, byte: u8) {
        self.input.borrow_mut().push_back(byte);
    }

    pub fn extend_input<I>(&self, bytes: I)
        where
            I: IntoIterator<Item = u8>
    {
        self.input.borrow_mut().extend(bytes);
    }

    pub fn pop_input(&self) -> Option<u8> {
        self.input.borrow_mut().pop_front()
    }

    pub fn pending_input(&self) -> usize {
        self.input.borrow().len()
    }

    pub fn emit(&self, byte: u8) {
        self.output.borrow_mut().push_back(byte);
    }

    /// Drains everything written to the console since the last call.
    pub fn take_output(&self) -> Vec<u8> {
        self.output.borrow_mut().drain(..).collect()
    }
}
