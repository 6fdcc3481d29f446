//! Pipeline assembly: sources, reader, mixer, CSPRNG and buffer on one
//! logical tick.
//!
//! The core never blocks. [`Trng::step`] advances every stage by one
//! tick; stages that are starved or backpressured simply do not move.
//! Commands latched in the mailbox are consumed at the start of the
//! next tick, which is also the command visibility boundary.
//!
//! Tick order is fixed: commands, expansion, conditioning, ingestion.
//! Handshakes between stages settle across successive ticks, matching
//! the level-triggered signals of the design.

extern crate alloc;
use alloc::boxed::Box;
use alloc::vec::Vec;

use rand_core::RngCore;

use crate::buffer::OutputBuffer;
use crate::config::{ConfigError, TrngConfig};
use crate::control::{CommandMailbox, SourceStatus, Status};
use crate::csprng::Csprng;
use crate::entropy::{BlockReader, EntropyError, SourcePort, WordSource};
use crate::mixer::Mixer;

/// Consecutive empty ticks after which `try_fill_bytes` reports a stall
/// instead of spinning on starved sources.
const STALL_STEP_LIMIT: usize = 1 << 16;

/// The assembled TRNG core.
pub struct Trng {
    config: TrngConfig,
    mailbox: CommandMailbox,
    ports: Vec<SourcePort>,
    reader: BlockReader,
    mixer: Mixer,
    csprng: Csprng,
    buffer: OutputBuffer,
    security_error: bool,
    halted: bool,
}

impl Trng {
    /// Builds the pipeline from a validated configuration. Sources are
    /// registered afterwards with [`add_source`].
    ///
    /// [`add_source`]: Trng::add_source
    pub fn new(config: TrngConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let buffer = OutputBuffer::new(config.buffer_slots);
        let csprng = Csprng::new(config.num_rounds, config.num_blocks);
        let mailbox = CommandMailbox::new(config.enable);
        Ok(Self {
            config,
            mailbox,
            ports: Vec::new(),
            reader: BlockReader::new(),
            mixer: Mixer::new(),
            csprng,
            buffer,
            security_error: false,
            halted: false,
        })
    }

    /// Registers an entropy producer and returns its port id.
    pub fn add_source<S>(&mut self, source: S) -> usize
    where
        S: WordSource + Send + 'static,
    {
        let id = self.ports.len();
        self.ports.push(SourcePort::new(id, Box::new(source)));
        id
    }

    /// Sets the operator enable bit of one source port.
    pub fn set_source_enabled(&mut self, id: usize, enabled: bool) -> Result<(), EntropyError> {
        let port = self.ports.get_mut(id).ok_or(EntropyError::UnknownPort)?;
        port.set_enabled(enabled);
        Ok(())
    }

    pub fn config(&self) -> &TrngConfig {
        &self.config
    }

    /// Rewrites the round count at runtime. Takes effect from the next
    /// keystream block.
    ///
    /// # Errors
    /// `ConfigError::RoundsOutOfRange` outside 8..=31; the running
    /// configuration is left untouched.
    pub fn set_num_rounds(&mut self, num_rounds: u8) -> Result<(), ConfigError> {
        let mut candidate = self.config.clone();
        candidate.num_rounds = num_rounds;
        candidate.validate()?;
        self.config.num_rounds = num_rounds;
        self.csprng.set_num_rounds(num_rounds);
        Ok(())
    }

    /// Rewrites the reseed threshold at runtime. Applies from the next
    /// seeding epoch and is still subject to the hard cap.
    pub fn set_num_blocks(&mut self, num_blocks: u64) -> Result<(), ConfigError> {
        let mut candidate = self.config.clone();
        candidate.num_blocks = num_blocks;
        candidate.validate()?;
        self.config.num_blocks = num_blocks;
        self.csprng.set_num_blocks(num_blocks);
        Ok(())
    }

    /// Sets the pipeline enable level. Taking it low cancels the
    /// conditioning and expansion stages at the next tick.
    pub fn set_enable(&mut self, enable: bool) {
        self.mailbox.set_enable(enable);
    }

    /// Requests a fresh seeding epoch; current output is discarded.
    pub fn pulse_reseed(&mut self) {
        self.mailbox.pulse_reseed();
    }

    /// Requests a full flush of buffered output and in-flight state.
    pub fn pulse_discard(&mut self) {
        self.mailbox.pulse_discard();
    }

    /// Advances the whole pipeline by one logical tick.
    pub fn step(&mut self) {
        if self.mailbox.take_discard() {
            self.csprng.cancel(&mut self.buffer);
            self.mixer.cancel();
        }
        if self.mailbox.take_reseed() {
            self.csprng.cancel(&mut self.buffer);
        }

        let enable = self.mailbox.enable();
        if !enable {
            if !self.halted {
                self.csprng.cancel(&mut self.buffer);
                self.mixer.cancel();
                self.halted = true;
            }
        } else {
            self.halted = false;
        }

        for port in &self.ports {
            if !port.healthy() {
                self.security_error = true;
            }
        }

        self.csprng.tick(&mut self.mixer, &mut self.buffer, enable);
        self.mixer.tick(self.csprng.more_seed());
        if let Some(block) = self.mixer.collect_target() {
            self.reader.step(&mut self.ports, block);
        }
    }

    /// Operator-issued full restart: flushes the pipeline AND
    /// reinitializes the hash chain. The only path that resets the
    /// chain.
    pub fn restart(&mut self) {
        self.csprng.cancel(&mut self.buffer);
        self.mixer.restart();
    }

    /// Consumer level: a word is available.
    pub fn rnd_valid(&self) -> bool {
        self.buffer.rnd_valid()
    }

    /// The next word, without consuming it.
    pub fn rnd_peek(&self) -> Option<u32> {
        self.buffer.peek_word()
    }

    /// Consumes one word.
    pub fn rnd_ack(&mut self) -> Option<u32> {
        self.buffer.ack_word()
    }

    /// Steps the pipeline until a word is available, up to `max_ticks`.
    ///
    /// # Returns
    /// `None` when the pipeline stayed starved for the whole window.
    pub fn try_next_word(&mut self, max_ticks: usize) -> Option<u32> {
        for _ in 0..max_ticks {
            if let Some(word) = self.rnd_ack() {
                return Some(word);
            }
            self.step();
        }
        self.rnd_ack()
    }

    /// Drains words into `out`, stepping the pipeline as needed, with at
    /// most `max_ticks` ticks spent waiting overall.
    ///
    /// # Returns
    /// The number of words written, which is short only when the tick
    /// window ran out.
    pub fn read_words(&mut self, out: &mut [u32], max_ticks: usize) -> usize {
        let mut filled = 0;
        let mut ticks = 0;
        while filled < out.len() {
            if let Some(word) = self.rnd_ack() {
                out[filled] = word;
                filled += 1;
                continue;
            }
            if ticks >= max_ticks {
                break;
            }
            ticks += 1;
            self.step();
        }
        filled
    }

    /// Read-only snapshot of the pipeline between ticks.
    pub fn status(&self) -> Status {
        let sources: Vec<SourceStatus> = self
            .ports
            .iter()
            .map(|p| SourceStatus {
                id: p.id(),
                name: p.name(),
                enabled: p.operator_enabled(),
                healthy: p.healthy(),
            })
            .collect();
        Status {
            csprng_ready: self.csprng.ready(),
            rnd_valid: self.buffer.rnd_valid(),
            security_error: self.security_error || sources.iter().any(|s| !s.healthy),
            sources,
            block_budget: self.csprng.blocks_this_epoch(),
            seed_transactions: self.csprng.seed_transactions(),
            seed_fragments: self.mixer.fragments_emitted(),
        }
    }
}

impl RngCore for Trng {
    /// Steps the pipeline until a word arrives. Spins forever if every
    /// enabled source is dead; hosts that cannot guarantee live sources
    /// should use [`Trng::try_next_word`] or `try_fill_bytes`.
    fn next_u32(&mut self) -> u32 {
        loop {
            if let Some(word) = self.rnd_ack() {
                return word;
            }
            self.step();
        }
    }

    fn next_u64(&mut self) -> u64 {
        let low = self.next_u32() as u64;
        let high = self.next_u32() as u64;
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        for chunk in dest.chunks_mut(4) {
            match self.try_next_word(STALL_STEP_LIMIT) {
                Some(word) => {
                    let bytes = word.to_le_bytes();
                    chunk.copy_from_slice(&bytes[..chunk.len()]);
                }
                None => return Err(stall_error()),
            }
        }
        Ok(())
    }
}

fn stall_error() -> rand_core::Error {
    let code = core::num::NonZeroU32::new(rand_core::Error::CUSTOM_START + 1)
        .unwrap_or(core::num::NonZeroU32::MIN);
    rand_core::Error::from(code)
}
