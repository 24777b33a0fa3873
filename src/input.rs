//! Keyboard input for the detection loop.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

const ESCAPE: u8 = 0x1b;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Lowercase `q` or a lone escape.
    Quit,
    /// Space.
    ToggleMode,
    Other(char),
}

impl Key {
    /// Map a raw terminal byte; line endings are not keys.
    pub fn from_byte(byte: u8) -> Option<Key> {
        match byte {
            b'q' | ESCAPE => Some(Key::Quit),
            b' ' => Some(Key::ToggleMode),
            b'\n' | b'\r' => None,
            other => Some(Key::Other(other as char)),
        }
    }
}

/// Map a window-system key code (negative when no key was pressed).
///
/// Only the low byte identifies the key, so cursor keys alias onto letters;
/// that is why quitting takes lowercase `q` alone.
pub fn key_from_wait_code(code: i32) -> Option<Key> {
    if code < 0 {
        return None;
    }
    Key::from_byte((code & 0xff) as u8)
}

/// Keys in a chunk of terminal input.
///
/// Cursor and function keys arrive as `ESC [ ...` or `ESC O ...` sequences
/// and are skipped whole; only an escape that starts no sequence quits.
pub fn decode_keys(bytes: &[u8]) -> Vec<Key> {
    let mut keys = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        i += 1;
        if byte == ESCAPE && matches!(bytes.get(i), Some(b'[') | Some(b'O')) {
            i += 1;
            // parameters and intermediates, then one final byte
            while i < bytes.len() && !(0x40..=0x7e).contains(&bytes[i]) {
                i += 1;
            }
            i += 1;
            continue;
        }
        keys.extend(Key::from_byte(byte));
    }
    keys
}

pub trait KeySource {
    /// Wait up to `timeout` for one key. A zero timeout never blocks.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>>;
}

/// Keys typed on stdin, read on a background thread.
///
/// Terminals deliver input line by line unless put in raw mode, so keys
/// arrive once Enter is pressed.
pub struct TerminalKeys {
    tx: Sender<Key>,
    rx: Receiver<Key>,
}

impl TerminalKeys {
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = unbounded();
        let reader_tx = tx.clone();
        std::thread::Builder::new()
            .name("stdin-keys".to_string())
            .spawn(move || {
                let mut stdin = std::io::stdin().lock();
                let mut buf = [0u8; 64];
                'read: loop {
                    let n = match stdin.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    for key in decode_keys(&buf[..n]) {
                        if reader_tx.send(key).is_err() {
                            break 'read;
                        }
                    }
                }
                log::debug!("stdin closed; key reader exiting");
            })
            .context("spawn stdin key reader")?;
        Ok(Self { tx, rx })
    }

    /// Deliver Ctrl-C as a quit key so the loop stops after its current cycle.
    pub fn quit_on_ctrlc(&self) -> Result<()> {
        let tx = self.tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx.send(Key::Quit);
        })
        .context("install Ctrl-C handler")
    }
}

impl<K: KeySource + ?Sized> KeySource for Box<K> {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        (**self).poll_key(timeout)
    }
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if timeout.is_zero() {
            return match self.rx.try_recv() {
                Ok(key) => Ok(Some(key)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
            };
        }
        match self.rx.recv_timeout(timeout) {
            Ok(key) => Ok(Some(key)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

/// Replays one scripted poll result per call, then reports no keys.
#[derive(Clone, Debug, Default)]
pub struct ScriptedKeys {
    script: VecDeque<Option<Key>>,
    polls: u64,
}

impl ScriptedKeys {
    pub fn new(script: impl IntoIterator<Item = Option<Key>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            polls: 0,
        }
    }

    /// No keys at all.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl KeySource for ScriptedKeys {
    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<Key>> {
        self.polls += 1;
        Ok(self.script.pop_front().flatten())
    }
}
