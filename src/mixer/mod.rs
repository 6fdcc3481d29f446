//! Conditioning stage: hash-chained seed derivation.
//!
//! The mixer accumulates entropy words into 1024-bit blocks and folds
//! each full block into a persistent SHA-512 chain, emitting snapshot
//! digests as 512-bit seed fragments. Two fragments make one downstream
//! reseed.
//!
//! # Design
//! - **One Message**: The hash is initialized once per lifetime; every
//!   block extends it. Fragments are intermediate digests over all
//!   entropy seen so far.
//! - **Level Handshakes**: Demand arrives as the polled `more_seed`
//!   signal; fragments park in the Emit state until acknowledged.
//! - **Cancel Scope**: Cancellation scrubs the in-flight block and any
//!   unclaimed fragment. The chain state survives; only an operator
//!   restart reinitializes it.

pub mod block;
pub mod sha512;

use crate::scrub::scrub_slice;

use block::MixBlock;
use sha512::{Sha512Chain, DIGEST_BYTES};

/// Errors from the conditioning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerError {
    /// All 32 slots of the current mix block are already written.
    BlockFull,
}

impl core::fmt::Display for MixerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MixerError::BlockFull => write!(f, "mix block already full"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MixerError {}

/// States of the mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerState {
    /// Waiting for downstream seed demand.
    Idle,
    /// Accumulating entropy words into the current block.
    Collect,
    /// Folding the full block into the hash chain.
    Absorb,
    /// Holding a seed fragment until downstream takes it.
    Emit,
    /// Wiping in-flight material before returning to Idle.
    Cancel,
}

/// The conditioning state machine.
pub struct Mixer {
    state: MixerState,
    block: MixBlock,
    chain: Sha512Chain,
    fragment: Option<[u8; DIGEST_BYTES]>,
    fragments_emitted: u64,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            state: MixerState::Idle,
            block: MixBlock::new(),
            chain: Sha512Chain::new(),
            fragment: None,
            fragments_emitted: 0,
        }
    }

    pub fn state(&self) -> MixerState {
        self.state
    }

    /// Seed fragments handed downstream since startup or restart.
    pub fn fragments_emitted(&self) -> u64 {
        self.fragments_emitted
    }

    /// Blocks folded into the chain so far.
    pub fn blocks_absorbed(&self) -> u64 {
        self.chain.blocks_absorbed()
    }

    /// The block currently open for the reader, if the mixer is
    /// collecting. This is the reader's gate: `None` stalls it.
    pub fn collect_target(&mut self) -> Option<&mut MixBlock> {
        if self.state == MixerState::Collect && !self.block.is_full() {
            Some(&mut self.block)
        } else {
            None
        }
    }

    /// Advances the state machine by one tick.
    ///
    /// `more_seed` is the downstream demand level; it is only sampled in
    /// Idle, so demand dropping mid-cycle finishes the block in flight.
    pub fn tick(&mut self, more_seed: bool) {
        match self.state {
            MixerState::Idle => {
                if more_seed {
                    self.state = MixerState::Collect;
                }
            }
            MixerState::Collect => {
                if self.block.is_full() {
                    self.state = MixerState::Absorb;
                }
            }
            MixerState::Absorb => {
                let mut bytes = self.block.to_bytes();
                self.chain.absorb(&bytes);
                scrub_slice(&mut bytes);
                self.block.reset();
                self.fragment = Some(self.chain.snapshot_digest());
                self.state = MixerState::Emit;
            }
            MixerState::Emit => {
                // Parked until take_fragment or cancel.
            }
            MixerState::Cancel => {
                self.state = MixerState::Idle;
            }
        }
    }

    /// Acknowledges and removes the parked seed fragment.
    ///
    /// On success the mixer moves straight back to Collect and starts
    /// the next block.
    pub fn take_fragment(&mut self) -> Option<[u8; DIGEST_BYTES]> {
        if self.state != MixerState::Emit {
            return None;
        }
        let fragment = self.fragment.take()?;
        self.fragments_emitted += 1;
        self.state = MixerState::Collect;
        Some(fragment)
    }

    /// Cancels the current cycle: scrubs the partial block and any
    /// unclaimed fragment. The hash chain is left untouched.
    pub fn cancel(&mut self) {
        self.block.reset();
        if let Some(mut fragment) = self.fragment.take() {
            scrub_slice(&mut fragment);
        }
        self.state = MixerState::Cancel;
    }

    /// Operator-issued full restart: cancels and reinitializes the hash
    /// chain. The only path that resets the chain.
    pub fn restart(&mut self) {
        self.cancel();
        self.chain.restart();
        self.fragments_emitted = 0;
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}
