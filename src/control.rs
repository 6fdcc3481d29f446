//! Command mailbox and read-only status surface.
//!
//! The register-mapped bus decoder lives outside the core; this module
//! is the small command/status contract it talks to. Commands are
//! level-or-pulse writes that the pipeline consumes at its next tick,
//! never retroactively.

extern crate alloc;
use alloc::vec::Vec;

/// Core name, first half.
pub const CORE_NAME0: &str = "trng";

/// Core name, second half (padding).
pub const CORE_NAME1: &str = "    ";

/// Core version string.
pub const CORE_VERSION: &str = "0.01";

/// Pending commands toward the core.
///
/// `enable` is a level; `reseed` and `discard` are pulses that latch
/// until the pipeline consumes them on a tick.
#[derive(Debug, Clone, Default)]
pub struct CommandMailbox {
    enable: bool,
    reseed: bool,
    discard: bool,
}

impl CommandMailbox {
    pub fn new(enable: bool) -> Self {
        Self {
            enable,
            reseed: false,
            discard: false,
        }
    }

    pub fn enable(&self) -> bool {
        self.enable
    }

    pub fn set_enable(&mut self, enable: bool) {
        self.enable = enable;
    }

    /// Latches a reseed request for the next tick.
    pub fn pulse_reseed(&mut self) {
        self.reseed = true;
    }

    /// Latches a discard request for the next tick.
    pub fn pulse_discard(&mut self) {
        self.discard = true;
    }

    /// Consumes the latched reseed pulse.
    pub fn take_reseed(&mut self) -> bool {
        core::mem::take(&mut self.reseed)
    }

    /// Consumes the latched discard pulse.
    pub fn take_discard(&mut self) -> bool {
        core::mem::take(&mut self.discard)
    }
}

/// Per-port slice of the status surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub id: usize,
    pub name: &'static str,
    /// Operator enable bit, as last written.
    pub enabled: bool,
    /// Producer-reported health, forwarded unmodified.
    pub healthy: bool,
}

/// Read-only snapshot of the pipeline, taken between ticks.
#[derive(Debug, Clone)]
pub struct Status {
    /// A seeded cipher state is loaded in the expansion stage.
    pub csprng_ready: bool,
    /// A 32-bit word is available to the consumer.
    pub rnd_valid: bool,
    /// OR of all producer-reported health failures. Never cleared by
    /// the core itself.
    pub security_error: bool,
    /// One entry per source port, in port id order.
    pub sources: Vec<SourceStatus>,
    /// Keystream blocks generated in the current epoch.
    pub block_budget: u64,
    /// Completed two-fragment seeding transactions.
    pub seed_transactions: u64,
    /// Seed fragments handed to the expansion stage since startup.
    pub seed_fragments: u64,
}

impl Status {
    /// Health flag per source port, in port id order.
    pub fn source_health(&self) -> Vec<bool> {
        self.sources.iter().map(|s| s.healthy).collect()
    }
}
