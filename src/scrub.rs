//! Explicit scrubbing of sensitive material.
//!
//! Every discard, reseed and cancellation path wipes key material through
//! this module rather than relying on drop semantics the compiler may
//! elide.
//!
//! # Security
//! - **Volatile Writes**: Uses `ptr::write_volatile` to prevent optimization.
//! - **Memory Barriers**: Compiler fences ensure writes are committed
//!   (best effort in portable Rust).
//! - **Paranoid Mode**: Optional multi-pass overwriting when the
//!   `paranoid` feature is enabled.

use zeroize::Zeroize;

/// Overwrites the provided slice and guarantees the writes happen.
///
/// With the `paranoid` feature the slice is flooded with ones and a
/// rolling pattern before the final zero pass.
#[inline(never)]
pub fn scrub_slice(slice: &mut [u8]) {
    #[cfg(feature = "paranoid")]
    {
        for byte in slice.iter_mut() {
            unsafe { core::ptr::write_volatile(byte, 0xFF) };
        }
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);

        for (i, byte) in slice.iter_mut().enumerate() {
            unsafe { core::ptr::write_volatile(byte, (i % 255) as u8) };
        }
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);

        slice.zeroize();
    }

    #[cfg(not(feature = "paranoid"))]
    {
        slice.zeroize();
    }

    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}

/// Trait for values holding material that must be wiped in place.
pub trait Scrub {
    /// Destroys the value's sensitive contents.
    fn scrub(&mut self);
}

impl<T: Zeroize> Scrub for T {
    fn scrub(&mut self) {
        self.zeroize();
    }
}
