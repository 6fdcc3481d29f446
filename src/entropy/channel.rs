//! Threaded driver boundary.
//!
//! Physical source drivers may run on their own threads and deliver
//! digitized words through a bounded queue. The core side stays
//! non-blocking: an empty queue is an ordinary stall, a full queue
//! pushes back on the driver.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};

use super::{EntropyError, WordSource};

/// Driver-side handle for delivering words into the core.
#[derive(Clone)]
pub struct WordSender {
    tx: SyncSender<u32>,
}

impl WordSender {
    /// Offers one word to the core.
    ///
    /// # Returns
    /// * `Err(EntropyError::QueueFull)` when the bounded queue is at
    ///   capacity; the driver should retry after the reader drains.
    pub fn send(&self, word: u32) -> Result<(), EntropyError> {
        self.tx.try_send(word).map_err(|_| EntropyError::QueueFull)
    }
}

/// Core-side endpoint of a driver queue.
///
/// Reports `ready = false` once every sender is dropped, which the port
/// layer treats like a producer that disabled itself.
pub struct ChannelSource {
    name: &'static str,
    rx: Receiver<u32>,
    pending: Option<u32>,
    online: bool,
}

impl ChannelSource {
    /// Creates a bounded queue of `capacity` words and returns the core
    /// endpoint together with the driver handle.
    pub fn bounded(name: &'static str, capacity: usize) -> (Self, WordSender) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (
            Self {
                name,
                rx,
                pending: None,
                online: true,
            },
            WordSender { tx },
        )
    }
}

impl WordSource for ChannelSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn ready(&self) -> bool {
        self.online
    }

    fn peek(&mut self) -> Option<u32> {
        if self.pending.is_none() {
            match self.rx.try_recv() {
                Ok(word) => self.pending = Some(word),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.online = false,
            }
        }
        self.pending
    }

    fn ack(&mut self) {
        self.pending = None;
    }
}
