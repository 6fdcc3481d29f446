#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod buffer;
pub mod config;
pub mod control;
pub mod csprng;
pub mod entropy;
pub mod mixer;
pub mod scrub;
pub mod trng;

pub use config::TrngConfig;
pub use trng::Trng;

#[no_mangle]
pub extern "C" fn trng_core_version() -> u32 {
    0x000100
}
