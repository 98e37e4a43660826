//! Unauthenticated block-cipher modes against the accelerator.

use heapless::Vec as StackVec;

use super::{Direction, wipe};
use crate::error::Error;

pub const AES_BLOCK_SIZE: usize = 16;
pub const MAX_KEY_SIZE: usize = 32;
pub const MAX_IV_SIZE: usize = 16;

/// Supported cipher modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
	EcbNoPadding,
	CbcNoPadding,
	Ctr,
	Stream,
}

impl CipherAlgorithm {
	pub fn needs_iv(self) -> bool {
		!matches!(self, CipherAlgorithm::EcbNoPadding)
	}
}

/// The block-cipher half of the accelerator.
pub trait CipherAccel {
	type Ctx: CipherCtx;

	fn cipher_create(
		&self,
		alg: CipherAlgorithm,
		dir: Direction,
		key: &[u8],
		iv: &[u8],
	) -> Result<Self::Ctx, Error>;
}

pub trait CipherCtx {
	fn crypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), Error>;
	fn finish(&mut self) -> Result<(), Error>;
}

/// A multipart cipher operation. Input must arrive block-aligned for the
/// ECB/CBC modes; the stream modes take arbitrary segment lengths.
pub struct CipherOperation<C: CipherCtx> {
	ctx: Option<C>,
	alg: CipherAlgorithm,
	key: StackVec<u8, MAX_KEY_SIZE>,
}

impl<C: CipherCtx> CipherOperation<C> {
	pub fn setup<A: CipherAccel<Ctx = C>>(
		accel: &A,
		alg: CipherAlgorithm,
		dir: Direction,
		key: &[u8],
		iv: &[u8],
	) -> Result<Self, Error> {
		if alg.needs_iv() && iv.is_empty() {
			return Err(Error::InvalidArgument);
		}

		let mut key_buffer = StackVec::new();
		key_buffer
			.extend_from_slice(key)
			.map_err(|_| Error::InvalidArgument)?;

		Ok(Self {
			ctx: Some(accel.cipher_create(alg, dir, key, iv)?),
			alg,
			key: key_buffer,
		})
	}

	pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
		if output.len() < input.len() {
			return Err(Error::BufferTooSmall);
		}

		if matches!(
			self.alg,
			CipherAlgorithm::EcbNoPadding | CipherAlgorithm::CbcNoPadding
		) && !input.len().is_multiple_of(AES_BLOCK_SIZE)
		{
			self.abort();
			return Err(Error::InvalidArgument);
		}

		let Some(ctx) = self.ctx.as_mut() else {
			return Err(Error::BadState);
		};

		if let Err(err) = ctx.crypt(input, &mut output[..input.len()]) {
			self.abort();
			return Err(err);
		}

		Ok(input.len())
	}

	pub fn finish(&mut self) -> Result<(), Error> {
		let result = match self.ctx.as_mut() {
			Some(ctx) => ctx.finish(),
			None => Err(Error::BadState),
		};
		self.abort();
		result
	}

	pub fn abort(&mut self) {
		wipe(&mut self.key);
		self.key.clear();
		self.ctx = None;
	}
}
