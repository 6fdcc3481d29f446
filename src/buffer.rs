//! Rate-decoupling output buffer.
//!
//! A bounded ring of 512-bit slots between the expansion stage and the
//! consumer. The producer writes whole keystream blocks; the consumer
//! drains 32-bit words lane by lane. `needs_more` is the backpressure
//! level that gates generation, `rnd_valid` the consumer-side level.
//!
//! # Design
//! - **Single Writer, Single Reader**: The expansion stage is the only
//!   writer, the external consumer the only reader.
//! - **Lane Order**: Words leave a slot in ascending lane order, lane 0
//!   being the low 32 bits of the block.
//! - **Scrub on Release**: A slot is wiped as soon as its last lane is
//!   consumed, and the whole ring is wiped on discard.

extern crate alloc;
use alloc::vec::Vec;

use crate::scrub::scrub_slice;

/// Size of one buffer slot in bytes.
pub const SLOT_BYTES: usize = 64;

/// 32-bit lanes per slot.
pub const WORDS_PER_SLOT: usize = 16;

/// Errors from the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Every slot is occupied; the block was not accepted.
    Full,
}

impl core::fmt::Display for BufferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BufferError::Full => write!(f, "output buffer full"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BufferError {}

/// Bounded ring of 512-bit slots with 32-bit word extraction.
pub struct OutputBuffer {
    slots: Vec<[u8; SLOT_BYTES]>,
    read: usize,
    write: usize,
    fill: usize,
    word_index: usize,
}

impl OutputBuffer {
    /// Creates a ring with `depth` slots. `depth` is validated by the
    /// configuration layer and must be nonzero.
    pub fn new(depth: usize) -> Self {
        let mut slots = Vec::with_capacity(depth);
        slots.resize(depth, [0u8; SLOT_BYTES]);
        Self {
            slots,
            read: 0,
            write: 0,
            fill: 0,
            word_index: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    pub fn fill(&self) -> usize {
        self.fill
    }

    /// Lane index of the next word to emit, 0..=15.
    pub fn word_index(&self) -> usize {
        self.word_index
    }

    /// Backpressure level toward the producer.
    pub fn needs_more(&self) -> bool {
        self.fill < self.slots.len()
    }

    /// Consumer-side level: a word is available.
    pub fn rnd_valid(&self) -> bool {
        self.fill > 0
    }

    /// Accepts one 512-bit block.
    pub fn push(&mut self, block: &[u8; SLOT_BYTES]) -> Result<(), BufferError> {
        if self.fill >= self.slots.len() {
            return Err(BufferError::Full);
        }
        self.slots[self.write] = *block;
        self.write = (self.write + 1) % self.slots.len();
        self.fill += 1;
        Ok(())
    }

    /// The word at the current lane, without consuming it.
    pub fn peek_word(&self) -> Option<u32> {
        if self.fill == 0 {
            return None;
        }
        let slot = &self.slots[self.read];
        let base = self.word_index * 4;
        Some(u32::from_le_bytes([
            slot[base],
            slot[base + 1],
            slot[base + 2],
            slot[base + 3],
        ]))
    }

    /// Consumes one word. When the last lane of a slot is taken, the
    /// slot is scrubbed, the read pointer advances and the lane index
    /// resets to zero.
    pub fn ack_word(&mut self) -> Option<u32> {
        let word = self.peek_word()?;
        if self.word_index == WORDS_PER_SLOT - 1 {
            scrub_slice(&mut self.slots[self.read]);
            self.word_index = 0;
            self.read = (self.read + 1) % self.slots.len();
            self.fill -= 1;
        } else {
            self.word_index += 1;
        }
        Some(word)
    }

    /// Flushes the ring: every slot is scrubbed and both pointers, the
    /// fill count and the lane index reset in one step.
    pub fn discard(&mut self) {
        for slot in self.slots.iter_mut() {
            scrub_slice(slot);
        }
        self.read = 0;
        self.write = 0;
        self.fill = 0;
        self.word_index = 0;
    }

    #[cfg(test)]
    pub(crate) fn slot_bytes(&self, index: usize) -> &[u8; SLOT_BYTES] {
        &self.slots[index]
    }
}

impl Drop for OutputBuffer {
    fn drop(&mut self) {
        self.discard();
    }
}
