//! Frame decoding
//!
//! Turns arbitrary socket reads into complete `!`-prefixed records. Bytes after
//! the last newline are carried into the next call.

use log::{debug, warn};

use crate::protocol::COMMAND_MARKER;

/// A carry that grows past this without a newline is discarded
const MAX_CARRY: usize = 1024 * 1024;

#[derive(Debug, Default)]
pub struct FrameDecoder {
    carry: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read and return every record it completed, in arrival order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(bytes);

        let mut records = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.carry[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let mut line = &self.carry[start..end];
            if let [rest @ .., b'\r'] = line {
                line = rest;
            }

            if line.first() == Some(&COMMAND_MARKER) {
                records.push(String::from_utf8_lossy(line).into_owned());
            } else if !line.is_empty() {
                debug!("Dropping record without command marker ({} bytes)", line.len());
            }
            start = end + 1;
        }
        self.carry.drain(..start);

        if self.carry.len() > MAX_CARRY {
            warn!(
                "Discarding {} bytes received without a record terminator",
                self.carry.len()
            );
            self.carry.clear();
        }

        records
    }

    /// Bytes waiting for their terminator
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    pub fn reset(&mut self) {
        self.carry.clear();
    }
}
