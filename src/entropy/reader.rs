//! Round-robin reader: fair per-word sampling across enabled sources.
//!
//! The reader fills one mix block slot per tick. A persistent cursor
//! rotates over the source list; each slot is served by the first
//! enabled-and-presenting source at or after the cursor, and the cursor
//! then moves one past the serving source. The next scan therefore
//! starts behind the remaining sources, so a fast producer cannot claim
//! more than its rotation share of any slot window.

use super::SourcePort;
use crate::mixer::block::MixBlock;

/// Fills mix blocks by polling source ports in rotation.
pub struct BlockReader {
    cursor: usize,
}

impl BlockReader {
    pub fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Current cursor position, for status reporting.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Attempts to fill the next slot of `block` from the ports.
    ///
    /// Scans from the cursor, skipping ports that are disabled or have
    /// no word pending, and consumes the first hit. On success the
    /// cursor lands one past the serving port, modulo the port count.
    ///
    /// # Returns
    /// * `true` when a slot was filled.
    /// * `false` on a stall: the block is already full, there are no
    ///   ports, or every enabled port is empty. The cursor does not move
    ///   on a stall, so the same rotation is retried next tick.
    pub fn step(&mut self, ports: &mut [SourcePort], block: &mut MixBlock) -> bool {
        if block.is_full() || ports.is_empty() {
            return false;
        }

        let count = ports.len();
        for offset in 0..count {
            let idx = (self.cursor + offset) % count;
            if let Some(word) = ports[idx].take() {
                // A full block was ruled out above, so the push cannot fail.
                if block.push(word).is_ok() {
                    self.cursor = (idx + 1) % count;
                    return true;
                }
                return false;
            }
        }
        false
    }
}

impl Default for BlockReader {
    fn default() -> Self {
        Self::new()
    }
}
