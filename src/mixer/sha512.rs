//! Streaming SHA-512 chain with snapshot digests.
//!
//! The conditioning hash is one unbounded message: every absorbed block
//! extends the same chaining state, and seed fragments are snapshots of
//! that state rather than finalized digests. No padding is ever applied;
//! callers hand in exact 1024-bit blocks. This is what makes successive
//! seeds depend on all prior entropy, not just their own input block.

use sha2::compress512;
use sha2::digest::consts::U128;
use sha2::digest::generic_array::GenericArray;

use super::block::MIX_BLOCK_BYTES;

/// SHA-512 initial hash values, FIPS 180-4 section 5.3.5.
const H0: [u64; 8] = [
    0x6a09_e667_f3bc_c908,
    0xbb67_ae85_84ca_a73b,
    0x3c6e_f372_fe94_f82b,
    0xa54f_f53a_5f1d_36f1,
    0x510e_527f_ade6_82d1,
    0x9b05_688c_2b3e_6c1f,
    0x1f83_d9ab_fb41_bd6b,
    0x5be0_cd19_137e_2179,
];

/// Digest size in bytes.
pub const DIGEST_BYTES: usize = 64;

/// The mixer's persistent hash state.
///
/// Initialized exactly once per TRNG lifetime; [`restart`] exists only
/// for the operator-issued full restart and is never called on discard.
///
/// [`restart`]: Sha512Chain::restart
pub struct Sha512Chain {
    state: [u64; 8],
    blocks_absorbed: u64,
}

impl Sha512Chain {
    pub fn new() -> Self {
        Self {
            state: H0,
            blocks_absorbed: 0,
        }
    }

    /// Extends the chain with one 1024-bit block.
    pub fn absorb(&mut self, block: &[u8; MIX_BLOCK_BYTES]) {
        let ga: &GenericArray<u8, U128> = GenericArray::from_slice(block);
        compress512(&mut self.state, core::slice::from_ref(ga));
        self.blocks_absorbed = self.blocks_absorbed.wrapping_add(1);
    }

    /// Serializes the current chaining state as a 512-bit digest.
    ///
    /// Does not finalize or disturb the chain; absorbing further blocks
    /// continues from the same interior state.
    pub fn snapshot_digest(&self) -> [u8; DIGEST_BYTES] {
        let mut out = [0u8; DIGEST_BYTES];
        for (chunk, word) in out.chunks_exact_mut(8).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Blocks absorbed since initialization or the last restart.
    pub fn blocks_absorbed(&self) -> u64 {
        self.blocks_absorbed
    }

    /// Reinitializes the chain. Operator restart only.
    pub fn restart(&mut self) {
        self.state = H0;
        self.blocks_absorbed = 0;
    }
}

impl Default for Sha512Chain {
    fn default() -> Self {
        Self::new()
    }
}
