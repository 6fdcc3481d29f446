//! Mix block: the 1024-bit accumulation buffer fed to the hash.

use crate::scrub::Scrub;

use super::MixerError;

/// Number of 32-bit slots in one mix block.
pub const MIX_BLOCK_SLOTS: usize = 32;

/// Size of a serialized mix block in bytes.
pub const MIX_BLOCK_BYTES: usize = 128;

/// A 1024-bit entropy accumulation buffer.
///
/// Slots are filled strictly in ascending index; the block is full only
/// when all 32 slots have been written since the last reset.
#[derive(Debug)]
pub struct MixBlock {
    slots: [u32; MIX_BLOCK_SLOTS],
    filled: usize,
}

impl MixBlock {
    pub fn new() -> Self {
        Self {
            slots: [0; MIX_BLOCK_SLOTS],
            filled: 0,
        }
    }

    /// Writes the next slot in ascending order.
    ///
    /// # Errors
    /// `MixerError::BlockFull` when all 32 slots are already written.
    pub fn push(&mut self, word: u32) -> Result<(), MixerError> {
        if self.filled >= MIX_BLOCK_SLOTS {
            return Err(MixerError::BlockFull);
        }
        self.slots[self.filled] = word;
        self.filled += 1;
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.filled == MIX_BLOCK_SLOTS
    }

    /// Number of slots written since the last reset.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// View of the slot words. Only the first [`filled`] entries carry
    /// data.
    ///
    /// [`filled`]: MixBlock::filled
    pub fn slots(&self) -> &[u32; MIX_BLOCK_SLOTS] {
        &self.slots
    }

    /// Serializes the block for hashing: slot 0 first, each word
    /// big-endian.
    pub fn to_bytes(&self) -> [u8; MIX_BLOCK_BYTES] {
        let mut out = [0u8; MIX_BLOCK_BYTES];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.slots.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Scrubs the slot contents and rewinds the fill index.
    pub fn reset(&mut self) {
        self.slots.scrub();
        self.filled = 0;
    }
}

impl Default for MixBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MixBlock {
    fn drop(&mut self) {
        self.reset();
    }
}
