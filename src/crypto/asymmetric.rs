//! Asymmetric primitives (RSA, ECDSA), interface level only.

use crate::error::Error;

/// Supported signature schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignAlgorithm {
	RsaPkcs1v15,
	RsaPss,
	EcdsaP256,
	EcdsaP384,
}

/// Supported asymmetric encryption schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsymEncAlgorithm {
	RsaPkcs1v15Crypt,
	RsaOaep,
}

/// The asymmetric half of the accelerator. Keys are opaque handles the
/// embedder obtained from provisioning or import.
pub trait AsymAccel {
	type KeyRef;

	fn sign_hash(
		&self,
		alg: SignAlgorithm,
		key: &Self::KeyRef,
		hash: &[u8],
		signature: &mut [u8],
	) -> Result<usize, Error>;

	/// Fails with [`Error::InvalidSignature`] on mismatch.
	fn verify_hash(
		&self,
		alg: SignAlgorithm,
		key: &Self::KeyRef,
		hash: &[u8],
		signature: &[u8],
	) -> Result<(), Error>;

	fn encrypt(
		&self,
		alg: AsymEncAlgorithm,
		key: &Self::KeyRef,
		plaintext: &[u8],
		ciphertext: &mut [u8],
	) -> Result<usize, Error>;

	fn decrypt(
		&self,
		alg: AsymEncAlgorithm,
		key: &Self::KeyRef,
		ciphertext: &[u8],
		plaintext: &mut [u8],
	) -> Result<usize, Error>;
}
