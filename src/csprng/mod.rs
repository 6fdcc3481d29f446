//! Expansion stage: seeded keystream generation with reseed scheduling.
//!
//! The CSPRNG pulls seed pairs from the conditioning stage, initializes
//! its cipher state from them and expands 512-bit keystream blocks into
//! the output buffer until the per-epoch block budget is spent or the
//! buffer fills. A two-fragment seeding transaction is atomic: no block
//! leaves the stage unless both fragments were consumed since the most
//! recent idle or reset.
//!
//! # Design
//! - **Polled Handshakes**: `more_seed` toward the mixer and
//!   `needs_more` from the buffer are level signals sampled on ticks.
//! - **Idle Invalidates Seeding**: Returning to Idle always forces a
//!   full reseed before the next block, which keeps the
//!   seeded-before-output ordering trivially true.
//! - **Cancel Is Total**: Key, IV, counter, working block and budget are
//!   scrubbed and the buffer is told to discard.

pub mod budget;
pub mod chacha;

use zeroize::Zeroize;

use crate::buffer::OutputBuffer;
use crate::mixer::Mixer;
use crate::scrub::scrub_slice;

use budget::BlockBudget;
use chacha::CipherState;

/// States of the expansion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsprngState {
    /// No demand, or disabled. Seeding is invalidated here.
    Idle,
    /// Waiting for the first seed fragment.
    Seed0,
    /// First fragment staged; raising demand for the second.
    Await1,
    /// Waiting for the second seed fragment.
    Seed1,
    /// Loading cipher state and resetting the block budget.
    InitBlock,
    /// Letting the cipher settle before generation.
    InitWait,
    /// Commanding one keystream step.
    Gen,
    /// Collecting the finished block.
    GenWait,
    /// Deciding between further generation, reseed and idling.
    More,
    /// Wiping state before returning to Idle.
    Cancel,
}

/// The expansion state machine.
pub struct Csprng {
    state: CsprngState,
    staged: Option<[u8; 64]>,
    cipher: Option<CipherState>,
    budget: BlockBudget,
    num_rounds: u8,
    num_blocks: u64,
    seed_transactions: u64,
}

impl Csprng {
    /// `num_rounds` and `num_blocks` come pre-validated from the
    /// configuration layer; the budget clamps the threshold to the hard
    /// cap on every epoch regardless.
    pub fn new(num_rounds: u8, num_blocks: u64) -> Self {
        Self {
            state: CsprngState::Idle,
            staged: None,
            cipher: None,
            budget: BlockBudget::new(num_blocks),
            num_rounds,
            num_blocks,
            seed_transactions: 0,
        }
    }

    pub fn state(&self) -> CsprngState {
        self.state
    }

    /// Whether a seeded cipher state is loaded.
    pub fn ready(&self) -> bool {
        self.cipher.is_some()
    }

    /// Demand level toward the mixer. High exactly while a seeding
    /// transaction is in progress.
    pub fn more_seed(&self) -> bool {
        matches!(
            self.state,
            CsprngState::Seed0 | CsprngState::Await1 | CsprngState::Seed1
        )
    }

    /// Blocks generated in the current epoch.
    pub fn blocks_this_epoch(&self) -> u64 {
        self.budget.generated()
    }

    /// Completed two-fragment seeding transactions since startup.
    pub fn seed_transactions(&self) -> u64 {
        self.seed_transactions
    }

    /// Updates the round count. Takes effect from the next keystream
    /// block; blocks already buffered are unaffected.
    pub fn set_num_rounds(&mut self, num_rounds: u8) {
        self.num_rounds = num_rounds;
    }

    /// Updates the reseed threshold. Applies when the budget is next
    /// reset, so the running epoch finishes under its old limit.
    pub fn set_num_blocks(&mut self, num_blocks: u64) {
        self.num_blocks = num_blocks;
    }

    /// Advances the state machine by one tick.
    pub fn tick(&mut self, mixer: &mut Mixer, buffer: &mut OutputBuffer, enable: bool) {
        match self.state {
            CsprngState::Idle => {
                if enable && buffer.needs_more() {
                    self.state = CsprngState::Seed0;
                }
            }
            CsprngState::Seed0 => {
                if let Some(fragment) = mixer.take_fragment() {
                    self.staged = Some(fragment);
                    self.state = CsprngState::Await1;
                }
            }
            CsprngState::Await1 => {
                self.state = CsprngState::Seed1;
            }
            CsprngState::Seed1 => {
                if let Some(mut keying) = mixer.take_fragment() {
                    let mut working = match self.staged.take() {
                        Some(w) => w,
                        // Unreachable: Seed1 is only entered with a
                        // staged fragment. Restart the transaction.
                        None => {
                            scrub_slice(&mut keying);
                            self.state = CsprngState::Seed0;
                            return;
                        }
                    };

                    if let Some(mut old) = self.cipher.take() {
                        old.zeroize();
                    }
                    self.cipher = Some(CipherState::from_fragments(&working, &keying));
                    scrub_slice(&mut working);
                    scrub_slice(&mut keying);
                    self.seed_transactions += 1;
                    self.state = CsprngState::InitBlock;
                }
            }
            CsprngState::InitBlock => {
                self.budget.reset(self.num_blocks);
                self.state = CsprngState::InitWait;
            }
            CsprngState::InitWait => {
                self.state = CsprngState::Gen;
            }
            CsprngState::Gen => {
                self.state = CsprngState::GenWait;
            }
            CsprngState::GenWait => {
                if let Some(cipher) = &mut self.cipher {
                    let mut block = cipher.next_block(self.num_rounds);
                    if buffer.push(&block).is_ok() {
                        self.budget.record_block();
                    }
                    scrub_slice(&mut block);
                    self.state = CsprngState::More;
                } else {
                    self.state = CsprngState::Idle;
                }
            }
            CsprngState::More => {
                if self.budget.exhausted() {
                    self.state = CsprngState::Seed0;
                } else if buffer.needs_more() {
                    self.state = CsprngState::Gen;
                } else {
                    self.state = CsprngState::Idle;
                }
            }
            CsprngState::Cancel => {
                self.state = CsprngState::Idle;
            }
        }
    }

    /// Cancels the current epoch: scrubs every piece of cipher state and
    /// the staged fragment, resets the budget and flushes the output
    /// buffer. Used for both the reseed and discard commands.
    pub fn cancel(&mut self, buffer: &mut OutputBuffer) {
        if let Some(mut staged) = self.staged.take() {
            scrub_slice(&mut staged);
        }
        if let Some(mut cipher) = self.cipher.take() {
            cipher.zeroize();
        }
        self.budget.reset(self.num_blocks);
        buffer.discard();
        self.state = CsprngState::Cancel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::block::MIX_BLOCK_SLOTS;
    use crate::mixer::MixerState;

    /// Steps mixer and csprng together, feeding the mixer constant
    /// words whenever it is collecting.
    fn step(csprng: &mut Csprng, mixer: &mut Mixer, buffer: &mut OutputBuffer, word: u32) {
        csprng.tick(mixer, buffer, true);
        mixer.tick(csprng.more_seed());
        if let Some(block) = mixer.collect_target() {
            if !block.is_full() {
                block.push(word).unwrap();
            }
        }
    }

    fn run_until<F>(
        csprng: &mut Csprng,
        mixer: &mut Mixer,
        buffer: &mut OutputBuffer,
        max_ticks: usize,
        mut done: F,
    ) where
        F: FnMut(&Csprng, &OutputBuffer) -> bool,
    {
        for _ in 0..max_ticks {
            if done(csprng, buffer) {
                return;
            }
            step(csprng, mixer, buffer, 0xAAAA_AAAA);
        }
        panic!("condition not reached in {} ticks", max_ticks);
    }

    // Generous bound: seeding needs two full mix blocks at one word per
    // tick plus state machine overhead.
    const SEED_TICKS: usize = MIX_BLOCK_SLOTS * 2 + 64;

    #[test]
    fn test_no_output_before_two_fragments() {
        let mut csprng = Csprng::new(24, 8);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(4);

        run_until(&mut csprng, &mut mixer, &mut buffer, SEED_TICKS, |c, b| {
            b.rnd_valid() || c.seed_transactions() > 0
        });

        // The first observable event is the completed transaction, not
        // an output word.
        assert_eq!(csprng.seed_transactions(), 1);
        assert!(!buffer.rnd_valid());
        assert!(csprng.ready());

        run_until(&mut csprng, &mut mixer, &mut buffer, 16, |_, b| b.rnd_valid());
        assert!(buffer.rnd_valid());
    }

    #[test]
    fn test_fills_buffer_then_idles() {
        let mut csprng = Csprng::new(24, 1 << 20);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(4);

        run_until(
            &mut csprng,
            &mut mixer,
            &mut buffer,
            SEED_TICKS + 64,
            |_, b| !b.needs_more(),
        );
        assert_eq!(buffer.fill(), 4);

        run_until(&mut csprng, &mut mixer, &mut buffer, 8, |c, _| {
            c.state() == CsprngState::Idle
        });
        assert_eq!(csprng.blocks_this_epoch(), 4);
    }

    #[test]
    fn test_budget_forces_reseed() {
        let mut csprng = Csprng::new(24, 2);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(4);

        run_until(&mut csprng, &mut mixer, &mut buffer, SEED_TICKS, |c, _| {
            c.seed_transactions() == 1
        });

        // Two blocks spend the epoch; the machine must head into a
        // second seeding transaction instead of idling.
        run_until(
            &mut csprng,
            &mut mixer,
            &mut buffer,
            SEED_TICKS * 2,
            |c, _| c.seed_transactions() == 2,
        );
        assert!(buffer.fill() >= 2);
    }

    #[test]
    fn test_epoch_blocks_differ_after_reseed() {
        let mut csprng = Csprng::new(24, 1);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(4);

        // Budget of one: every block comes from its own seeding epoch.
        run_until(&mut csprng, &mut mixer, &mut buffer, SEED_TICKS * 3, |_, b| {
            b.fill() == 2
        });

        let mut first = [0u32; 16];
        let mut second = [0u32; 16];
        for lane in first.iter_mut() {
            *lane = buffer.ack_word().unwrap();
        }
        for lane in second.iter_mut() {
            *lane = buffer.ack_word().unwrap();
        }
        assert_ne!(first, second);
    }

    #[test]
    fn test_idle_resume_requires_fresh_seeding() {
        let mut csprng = Csprng::new(24, 1 << 20);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(1);

        run_until(&mut csprng, &mut mixer, &mut buffer, SEED_TICKS + 16, |c, _| {
            c.state() == CsprngState::Idle && c.seed_transactions() == 1
        });

        // Drain the single slot so demand returns.
        for _ in 0..16 {
            buffer.ack_word().unwrap();
        }
        run_until(&mut csprng, &mut mixer, &mut buffer, SEED_TICKS * 2, |_, b| {
            b.rnd_valid()
        });
        assert_eq!(csprng.seed_transactions(), 2);
    }

    #[test]
    fn test_cancel_scrubs_and_flushes() {
        let mut csprng = Csprng::new(24, 1 << 20);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(4);

        run_until(&mut csprng, &mut mixer, &mut buffer, SEED_TICKS + 64, |_, b| {
            b.fill() >= 2
        });
        assert!(csprng.ready());

        csprng.cancel(&mut buffer);
        assert_eq!(csprng.state(), CsprngState::Cancel);
        assert!(!csprng.ready());
        assert_eq!(csprng.blocks_this_epoch(), 0);
        assert!(!buffer.rnd_valid());

        // Cancel drops back to Idle on the next tick.
        csprng.tick(&mut mixer, &mut buffer, true);
        assert_eq!(csprng.state(), CsprngState::Idle);
    }

    #[test]
    fn test_cancel_mid_seeding_scrubs_staged_fragment() {
        let mut csprng = Csprng::new(24, 8);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(4);

        // Stop with the first fragment staged and the second pending.
        run_until(&mut csprng, &mut mixer, &mut buffer, SEED_TICKS, |c, _| {
            c.state() == CsprngState::Seed1
        });

        csprng.cancel(&mut buffer);
        assert!(!csprng.ready());
        assert_eq!(csprng.seed_transactions(), 0);

        // The restarted transaction still needs two fragments of its
        // own before any block appears.
        csprng.tick(&mut mixer, &mut buffer, true);
        run_until(
            &mut csprng,
            &mut mixer,
            &mut buffer,
            SEED_TICKS * 2,
            |c, b| c.seed_transactions() == 1 && b.rnd_valid(),
        );
    }

    #[test]
    fn test_more_seed_level_tracks_seeding_states() {
        let mut csprng = Csprng::new(24, 8);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(4);

        assert!(!csprng.more_seed());
        csprng.tick(&mut mixer, &mut buffer, true);
        assert_eq!(csprng.state(), CsprngState::Seed0);
        assert!(csprng.more_seed());

        // The level stays high across the whole transaction and drops
        // the moment the second fragment is in.
        run_until(&mut csprng, &mut mixer, &mut buffer, SEED_TICKS, |c, _| {
            c.state() == CsprngState::InitBlock
        });
        assert!(!csprng.more_seed());
    }

    #[test]
    fn test_disabled_stays_idle() {
        let mut csprng = Csprng::new(24, 8);
        let mut mixer = Mixer::new();
        let mut buffer = OutputBuffer::new(4);

        for _ in 0..32 {
            csprng.tick(&mut mixer, &mut buffer, false);
            mixer.tick(csprng.more_seed());
        }
        assert_eq!(csprng.state(), CsprngState::Idle);
        assert_eq!(mixer.state(), MixerState::Idle);
        assert!(!csprng.more_seed());
    }
}
