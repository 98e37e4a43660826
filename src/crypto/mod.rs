//! Driver for the on-chip cryptographic accelerator.
//!
//! The host side keeps the PSA-style multipart state machines; the
//! accelerator does the math behind small per-domain traits
//! (`*Accel`/`*Ctx`). The AEAD engine in [`aead`] is fully modeled;
//! the remaining primitives are thin wrappers whose contract is their
//! signature.
//!
//! Failure semantics: any error aborts the operation and zeroizes its
//! context before returning.

pub mod aead;
pub mod asymmetric;
pub mod cipher;
pub mod drbg;
pub mod hash;
pub mod kmu;
pub mod mac;
pub mod pake;

/// Direction of a cipher/AEAD operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Encrypt,
	Decrypt,
}

/// Overwrites secret material before a context is dropped or reused.
pub(crate) fn wipe(bytes: &mut [u8]) {
	for b in bytes.iter_mut() {
		// Volatile so the wipe is not optimized away on the way out.
		unsafe { core::ptr::write_volatile(b, 0) };
	}
}
