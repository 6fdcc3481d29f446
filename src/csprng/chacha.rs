//! ChaCha block function with a configurable round count.
//!
//! The expansion stage runs at round counts the registry
//! implementations do not offer (24 by default), so the block function
//! lives here. Layout follows the classic stream cipher: four constant
//! words, eight key words, a 64-bit block counter and a 64-bit IV, all
//! little-endian, with the feed-forward addition after the rounds.

use zeroize::Zeroize;

use crate::scrub::scrub_slice;

/// "expand 32-byte k", the 256-bit-key domain constants.
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

/// Keystream block size in bytes.
pub const BLOCK_BYTES: usize = 64;

/// Key size in bytes.
pub const KEY_BYTES: usize = 32;

/// IV size in bytes.
pub const IV_BYTES: usize = 8;

#[inline(always)]
fn quarter_round(state: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(16);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(12);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(8);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(7);
}

fn double_round(state: &mut [u32; 16]) {
    quarter_round(state, 0, 4, 8, 12);
    quarter_round(state, 1, 5, 9, 13);
    quarter_round(state, 2, 6, 10, 14);
    quarter_round(state, 3, 7, 11, 15);

    quarter_round(state, 0, 5, 10, 15);
    quarter_round(state, 1, 6, 11, 12);
    quarter_round(state, 2, 7, 8, 13);
    quarter_round(state, 3, 4, 9, 14);
}

/// Generates one 64-byte keystream block.
///
/// `rounds` is processed as `rounds / 2` double rounds; odd values
/// round down.
pub fn keystream_block(
    key: &[u8; KEY_BYTES],
    iv: &[u8; IV_BYTES],
    counter: u64,
    rounds: u8,
) -> [u8; BLOCK_BYTES] {
    let mut state = [0u32; 16];

    state[0..4].copy_from_slice(&SIGMA);
    for (s, chunk) in state[4..12].iter_mut().zip(key.chunks_exact(4)) {
        *s = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    state[12] = counter as u32;
    state[13] = (counter >> 32) as u32;
    state[14] = u32::from_le_bytes([iv[0], iv[1], iv[2], iv[3]]);
    state[15] = u32::from_le_bytes([iv[4], iv[5], iv[6], iv[7]]);

    let original = state;
    for _ in 0..(rounds / 2) {
        double_round(&mut state);
    }
    for (s, o) in state.iter_mut().zip(&original) {
        *s = s.wrapping_add(*o);
    }

    let mut out = [0u8; BLOCK_BYTES];
    for (chunk, word) in out.chunks_exact_mut(4).zip(&state) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }

    state.zeroize();
    out
}

/// The expansion stage's active cipher state.
///
/// Derivable only from a two-fragment seed: the first fragment becomes
/// the 512-bit working block the cipher encrypts, the second supplies
/// key, IV and counter from its low 384 bits. The top 128 bits of the
/// second fragment are discarded by construction.
pub struct CipherState {
    key: [u8; KEY_BYTES],
    iv: [u8; IV_BYTES],
    counter: u64,
    working: [u8; BLOCK_BYTES],
}

impl CipherState {
    /// Builds cipher state from one seed pair.
    pub fn from_fragments(working: &[u8; 64], keying: &[u8; 64]) -> Self {
        let mut key = [0u8; KEY_BYTES];
        key.copy_from_slice(&keying[0..32]);
        let mut iv = [0u8; IV_BYTES];
        iv.copy_from_slice(&keying[32..40]);
        let mut ctr = [0u8; 8];
        ctr.copy_from_slice(&keying[40..48]);

        Self {
            key,
            iv,
            counter: u64::from_le_bytes(ctr),
            working: *working,
        }
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Produces the next 512-bit output block: the working block
    /// encrypted under the current counter. The counter increments
    /// afterwards, so consecutive blocks never reuse a keystream.
    pub fn next_block(&mut self, rounds: u8) -> [u8; BLOCK_BYTES] {
        let mut keystream = keystream_block(&self.key, &self.iv, self.counter, rounds);
        let mut out = [0u8; BLOCK_BYTES];
        for ((o, w), k) in out.iter_mut().zip(&self.working).zip(&keystream) {
            *o = w ^ k;
        }
        scrub_slice(&mut keystream);
        self.counter = self.counter.wrapping_add(1);
        out
    }
}

impl Zeroize for CipherState {
    fn zeroize(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
        self.counter.zeroize();
        self.working.zeroize();
    }
}

impl Drop for CipherState {
    fn drop(&mut self) {
        self.zeroize();
    }
}
