//! Message authentication (CMAC, HMAC) against the accelerator.

use super::wipe;
use crate::crypto::hash::HashAlgorithm;
use crate::error::Error;

pub const MAX_MAC_SIZE: usize = 64;

/// Supported MAC constructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
	CmacAes,
	Hmac(HashAlgorithm),
}

impl MacAlgorithm {
	pub fn mac_size(self) -> usize {
		match self {
			MacAlgorithm::CmacAes => 16,
			MacAlgorithm::Hmac(hash) => hash.digest_size(),
		}
	}
}

/// The MAC half of the accelerator.
pub trait MacAccel {
	type Ctx: MacCtx;

	fn mac_create(&self, alg: MacAlgorithm, key: &[u8]) -> Result<Self::Ctx, Error>;
}

pub trait MacCtx {
	fn update(&mut self, data: &[u8]) -> Result<(), Error>;
	fn finish(&mut self, mac: &mut [u8]) -> Result<(), Error>;
}

/// A multipart MAC operation. The key lives inside the accelerator
/// context; no copy is retained here.
pub struct MacOperation<C: MacCtx> {
	ctx: Option<C>,
	alg: MacAlgorithm,
}

impl<C: MacCtx> MacOperation<C> {
	pub fn setup<A: MacAccel<Ctx = C>>(
		accel: &A,
		alg: MacAlgorithm,
		key: &[u8],
	) -> Result<Self, Error> {
		Ok(Self {
			ctx: Some(accel.mac_create(alg, key)?),
			alg,
		})
	}

	pub fn update(&mut self, data: &[u8]) -> Result<(), Error> {
		let Some(ctx) = self.ctx.as_mut() else {
			return Err(Error::BadState);
		};

		if let Err(err) = ctx.update(data) {
			self.abort();
			return Err(err);
		}
		Ok(())
	}

	/// Produces the MAC and retires the operation.
	pub fn sign_finish(&mut self, mac: &mut [u8]) -> Result<usize, Error> {
		let mac_size = self.alg.mac_size();
		if mac.len() < mac_size {
			self.abort();
			return Err(Error::BufferTooSmall);
		}

		let result = match self.ctx.as_mut() {
			Some(ctx) => ctx.finish(&mut mac[..mac_size]),
			None => Err(Error::BadState),
		};

		self.abort();
		result.map(|()| mac_size)
	}

	/// Recomputes the MAC and compares it against `expected` in constant
	/// time.
	pub fn verify_finish(&mut self, expected: &[u8]) -> Result<(), Error> {
		let mut computed = [0u8; MAX_MAC_SIZE];
		let mac_size = self.sign_finish(&mut computed)?;

		if expected.len() != mac_size {
			return Err(Error::InvalidSignature);
		}

		let mut diff = 0u8;
		for (a, b) in computed[..mac_size].iter().zip(expected) {
			diff |= a ^ b;
		}
		wipe(&mut computed);

		if diff == 0 {
			Ok(())
		} else {
			Err(Error::InvalidSignature)
		}
	}

	pub fn abort(&mut self) {
		self.ctx = None;
	}
}

#[cfg(test)]
mod tests {
	use alloc::vec::Vec;

	use super::*;

	/// Keyed FNV stand-in for the CMAC engine.
	struct SoftMac;

	struct SoftMacCtx {
		acc: u64,
	}

	impl SoftMacCtx {
		fn absorb(&mut self, byte: u8) {
			self.acc ^= u64::from(byte);
			self.acc = self.acc.wrapping_mul(0x0100_0000_01b3);
		}
	}

	impl MacAccel for SoftMac {
		type Ctx = SoftMacCtx;

		fn mac_create(&self, _alg: MacAlgorithm, key: &[u8]) -> Result<SoftMacCtx, Error> {
			let mut ctx = SoftMacCtx {
				acc: 0xcbf2_9ce4_8422_2325,
			};
			for &b in key {
				ctx.absorb(b);
			}
			Ok(ctx)
		}
	}

	impl MacCtx for SoftMacCtx {
		fn update(&mut self, data: &[u8]) -> Result<(), Error> {
			for &b in data {
				self.absorb(b);
			}
			Ok(())
		}

		fn finish(&mut self, mac: &mut [u8]) -> Result<(), Error> {
			let mut full = [0u8; 16];
			full[..8].copy_from_slice(&self.acc.to_le_bytes());
			full[8..].copy_from_slice(&self.acc.rotate_left(19).to_le_bytes());
			mac.copy_from_slice(&full[..mac.len()]);
			Ok(())
		}
	}

	fn sign(key: &[u8], data: &[u8]) -> Vec<u8> {
		let mut op = MacOperation::setup(&SoftMac, MacAlgorithm::CmacAes, key).unwrap();
		op.update(data).unwrap();

		let mut mac = [0u8; MAX_MAC_SIZE];
		let len = op.sign_finish(&mut mac).unwrap();
		mac[..len].to_vec()
	}

	#[test]
	fn verify_accepts_matching_mac() {
		let mac = sign(b"key-bytes", b"message");

		let mut op = MacOperation::setup(&SoftMac, MacAlgorithm::CmacAes, b"key-bytes").unwrap();
		op.update(b"message").unwrap();
		op.verify_finish(&mac).unwrap();
	}

	#[test]
	fn verify_rejects_flipped_bit() {
		let mut mac = sign(b"key-bytes", b"message");
		mac[5] ^= 0x10;

		let mut op = MacOperation::setup(&SoftMac, MacAlgorithm::CmacAes, b"key-bytes").unwrap();
		op.update(b"message").unwrap();
		assert_eq!(op.verify_finish(&mac), Err(Error::InvalidSignature));
	}

	#[test]
	fn verify_rejects_wrong_length() {
		let mac = sign(b"key-bytes", b"message");

		// A truncated MAC must not pass, even as a prefix match.
		let mut op = MacOperation::setup(&SoftMac, MacAlgorithm::CmacAes, b"key-bytes").unwrap();
		op.update(b"message").unwrap();
		assert_eq!(
			op.verify_finish(&mac[..8]),
			Err(Error::InvalidSignature)
		);
	}

	#[test]
	fn finish_retires_the_operation() {
		let mut op = MacOperation::setup(&SoftMac, MacAlgorithm::CmacAes, b"key").unwrap();
		let mut mac = [0u8; MAX_MAC_SIZE];
		op.sign_finish(&mut mac).unwrap();

		assert_eq!(op.update(b"late"), Err(Error::BadState));
	}
}
