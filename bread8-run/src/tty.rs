//! Keyboard feed and console output for the memory-mapped terminal.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task;
use tracing::{debug, warn};

const KEY_POLL: Duration = Duration::from_millis(50);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Input {
    Byte(u8),
    Interrupt
}

/// Keeps the terminal in raw mode for as long as it lives.
pub struct RawModeGuard {
    _private: ()
}
impl RawModeGuard {
    pub fn enter() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(RawModeGuard { _private: () })
    }
}
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

/// Translates a key press into what the board's terminal receives.
pub fn key_to_input(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Input::Interrupt),
            KeyCode::Char(ch) if ch.is_ascii_alphabetic() => Some(Input::Byte(ch.to_ascii_uppercase() as u8 & 0x1F)),
            _ => None
        };
    }

    match key.code {
        KeyCode::Char(ch) if ch.is_ascii() => Some(Input::Byte(ch as u8)),
        KeyCode::Enter => Some(Input::Byte(b'\n')),
        KeyCode::Tab => Some(Input::Byte(b'\t')),
        KeyCode::Backspace => Some(Input::Byte(0x08)),
        KeyCode::Esc => Some(Input::Byte(0x1B)),
        _ => None
    }
}

/// Reads key events on a blocking task until the receiving side goes away.
pub fn spawn_keyboard(tx: UnboundedSender<Input>) -> task::JoinHandle<()> {
    task::spawn_blocking(move || {
        while !tx.is_closed() {
            match event::poll(KEY_POLL) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!("keyboard poll failed: {}", e);
                    break;
                }
            }

            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(input) = key_to_input(key) {
                        if tx.send(input).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("keyboard read failed: {}", e);
                    break;
                }
            }
        }
        debug!("keyboard reader stopped");
    })
}

/// Forwards piped standard input byte by byte.
///
/// Runs on a detached thread: a read blocked on an idle pipe must not hold up runtime shutdown.
pub fn spawn_stdin(tx: UnboundedSender<Input>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut buffer = [0u8; 256];
        let mut handle = stdin.lock();

        loop {
            match handle.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    if buffer[..n].iter().any(|&byte| tx.send(Input::Byte(byte)).is_err()) {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
        debug!("stdin reader stopped");
    });
}

/// Turns SIGINT into an interrupt when the terminal is not in raw mode.
pub fn spawn_ctrl_c(tx: UnboundedSender<Input>) -> task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Input::Interrupt);
        }
    })
}

/// Starts the input source that fits standard input and returns its channel.
///
/// The guard is `Some` when the terminal was switched to raw mode.
pub fn open_input(interactive: bool) -> io::Result<(UnboundedReceiver<Input>, Option<RawModeGuard>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    if interactive {
        let guard = RawModeGuard::enter()?;
        spawn_keyboard(tx);
        Ok((rx, Some(guard)))
    } else {
        spawn_ctrl_c(tx.clone());
        spawn_stdin(tx);
        Ok((rx, None))
    }
}

/// Console side of the terminal.
pub struct Console<W> {
    out: W,
    raw: bool
}
impl<W: Write> Console<W> {
    pub fn new(out: W, raw: bool) -> Self {
        Console { out, raw }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        if self.raw {
            // raw mode does not return the carriage on its own
            for line in bytes.split_inclusive(|&byte| byte == b'\n') {
                match line.split_last() {
                    Some((&b'\n', text)) => {
                        self.out.write_all(text)?;
                        self.out.write_all(b"\r\n")?;
                    }
                    _ => self.out.write_all(line)?
                }
            }
        } else {
            self.out.write_all(bytes)?;
        }
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
