//! Entropy source registry.
//!
//! Re-exports the producer-side building blocks for convenient access.

pub use super::port::SourcePort;
pub use super::reader::BlockReader;

#[cfg(feature = "pseudo-source")]
pub use super::pseudo::PseudoSource;

#[cfg(feature = "std")]
pub use super::channel::{ChannelSource, WordSender};
