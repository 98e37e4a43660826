//! Key Management Unit: provisioned key slots with push-to-register
//! semantics. Key material never crosses the driver; slots are pushed
//! straight into the accelerator's key registers.

use crate::error::Error;

/// Usage policy bound to a provisioned key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
	Encryption,
	Signing,
	Derivation,
}

/// A provisioned slot index in the KMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySlot(pub u16);

/// The KMU itself.
///
/// `provision` fails with [`Error::AlreadyExists`] for an occupied slot;
/// `push`/`revoke` fail with [`Error::DoesNotExist`] for an empty one.
pub trait Kmu {
	/// Burns key material into `slot` with the given usage policy.
	fn provision(&self, slot: KeySlot, usage: KeyUsage, key: &[u8]) -> Result<(), Error>;

	/// Pushes the slot's key into the accelerator key register.
	fn push(&self, slot: KeySlot) -> Result<(), Error>;

	/// Permanently invalidates the slot.
	fn revoke(&self, slot: KeySlot) -> Result<(), Error>;

	/// Clears the accelerator key register after use.
	fn clear_register(&self) -> Result<(), Error>;
}

/// Runs `f` with the slot's key loaded, clearing the register afterwards
/// even when `f` fails.
pub fn with_key<K: Kmu, T>(
	kmu: &K,
	slot: KeySlot,
	f: impl FnOnce() -> Result<T, Error>,
) -> Result<T, Error> {
	kmu.push(slot)?;
	let result = f();
	kmu.clear_register()?;
	result
}
