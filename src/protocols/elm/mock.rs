//! Scripted in-memory adapter for tests.
//!
//! Behaves like an ELM327 with echo off: every command terminated by `\r`
//! queues a reply ending in the `>` prompt. Replies are handed out a few bytes
//! per read so the drain loop has to accumulate them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::protocols::Transport;

const READ_CHUNK: usize = 4;

type Handler = Box<dyn FnMut(&str) -> Option<String>>;

#[derive(Default)]
struct ScriptState {
    replies: Vec<(String, String)>,
    handler: Option<Handler>,
    silent: bool,
    pending: VecDeque<u8>,
    partial: String,
    commands: Vec<String>,
    bytes_written: usize,
    closed: bool,
    fail_reads: bool,
}

impl ScriptState {
    fn respond(&mut self, command: &str) -> Option<String> {
        if let Some(handler) = self.handler.as_mut() {
            if let Some(reply) = handler(command) {
                return Some(reply);
            }
        }
        if let Some((_, reply)) = self.replies.iter().find(|(cmd, _)| cmd == command) {
            return Some(reply.clone());
        }
        if self.silent {
            return None;
        }
        Some(match command {
            "ATZ" => "\r\rELM327 v1.5\r\r>".to_string(),
            c if c.starts_with("AT") => "OK\r\r>".to_string(),
            _ => "NO DATA\r\r>".to_string(),
        })
    }
}

/// Cloning yields another handle onto the same script, so a test can keep one
/// handle for inspection after moving the other into a link.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Rc<RefCell<ScriptState>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter that never answers.
    pub fn silent() -> Self {
        let transport = Self::default();
        transport.state.borrow_mut().silent = true;
        transport
    }

    /// Fixed reply for an exact (trimmed, uppercased) command.
    pub fn reply(self, command: &str, response: &str) -> Self {
        self.state
            .borrow_mut()
            .replies
            .push((command.to_uppercase(), response.to_string()));
        self
    }

    /// Dynamic replies; returning `None` falls back to the fixed table.
    pub fn with_handler(self, handler: impl FnMut(&str) -> Option<String> + 'static) -> Self {
        self.state.borrow_mut().handler = Some(Box::new(handler));
        self
    }

    pub fn fail_reads(&self) {
        self.state.borrow_mut().fail_reads = true;
    }

    /// Every complete command received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    pub fn bytes_written(&self) -> usize {
        self.state.borrow().bytes_written
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(Error::Transport("mock adapter closed".to_string()));
        }
        state.bytes_written += bytes.len();

        for &b in bytes {
            match b {
                b'\r' => {
                    let command = std::mem::take(&mut state.partial).trim().to_uppercase();
                    if command.is_empty() {
                        continue;
                    }
                    if let Some(reply) = state.respond(&command) {
                        state.pending.extend(reply.bytes());
                    }
                    state.commands.push(command);
                }
                b'\n' => {}
                other => state.partial.push(other as char),
            }
        }
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        if state.fail_reads {
            return Err(Error::Transport("mock adapter unplugged".to_string()));
        }
        let n = state.pending.len().min(READ_CHUNK);
        Ok(state.pending.drain(..n).collect())
    }

    fn close(&mut self) -> Result<()> {
        self.state.borrow_mut().closed = true;
        Ok(())
    }

    fn name(&self) -> String {
        "mock-elm327".to_string()
    }
}
