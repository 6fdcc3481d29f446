//! Source port: operator-facing handle over one entropy producer.

extern crate alloc;
use alloc::boxed::Box;

use super::WordSource;

/// One entry in the core's source list.
///
/// A port layers the operator enable bit on top of the producer's own
/// readiness. Both must be set for the port to take part in round-robin
/// sampling; a disabled port is never acked, even if the producer keeps
/// presenting words.
pub struct SourcePort {
    id: usize,
    enabled: bool,
    source: Box<dyn WordSource + Send>,
}

impl SourcePort {
    /// Wraps a producer. Ports start enabled.
    pub fn new(id: usize, source: Box<dyn WordSource + Send>) -> Self {
        Self {
            id,
            enabled: true,
            source,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.source.name()
    }

    /// Sets the operator enable bit.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The operator enable bit alone, ignoring producer readiness.
    pub fn operator_enabled(&self) -> bool {
        self.enabled
    }

    /// Effective enable: operator bit AND producer readiness.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.source.ready()
    }

    /// Producer health flag, forwarded unmodified.
    pub fn healthy(&self) -> bool {
        self.source.healthy()
    }

    /// The pending word, without consuming it. `None` when the port is
    /// disabled or the producer has nothing to offer.
    pub fn pending(&mut self) -> Option<u32> {
        if !self.is_enabled() {
            return None;
        }
        self.source.peek()
    }

    /// Consumes and returns the pending word.
    ///
    /// The ack reaches the producer only when the effective enable is
    /// set, so a disabled producer spuriously presenting words is left
    /// untouched.
    pub fn take(&mut self) -> Option<u32> {
        if !self.is_enabled() {
            return None;
        }
        let word = self.source.peek()?;
        self.source.ack();
        Some(word)
    }
}
