//! Multipart hashing against the accelerator.

use crate::error::Error;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
	Sha1,
	Sha224,
	Sha256,
	Sha384,
	Sha512,
}

impl HashAlgorithm {
	pub fn digest_size(self) -> usize {
		match self {
			HashAlgorithm::Sha1 => 20,
			HashAlgorithm::Sha224 => 28,
			HashAlgorithm::Sha256 => 32,
			HashAlgorithm::Sha384 => 48,
			HashAlgorithm::Sha512 => 64,
		}
	}
}

/// The hashing half of the accelerator.
pub trait HashAccel {
	type Ctx: HashCtx;

	fn hash_create(&self, alg: HashAlgorithm) -> Result<Self::Ctx, Error>;
}

pub trait HashCtx {
	fn update(&mut self, data: &[u8]) -> Result<(), Error>;
	fn finish(&mut self, digest: &mut [u8]) -> Result<(), Error>;
}

/// A multipart hash operation.
pub struct HashOperation<C: HashCtx> {
	ctx: C,
	alg: HashAlgorithm,
	finished: bool,
}

impl<C: HashCtx> HashOperation<C> {
	pub fn setup<A: HashAccel<Ctx = C>>(accel: &A, alg: HashAlgorithm) -> Result<Self, Error> {
		Ok(Self {
			ctx: accel.hash_create(alg)?,
			alg,
			finished: false,
		})
	}

	pub fn update(&mut self, data: &[u8]) -> Result<(), Error> {
		if self.finished {
			return Err(Error::BadState);
		}
		self.ctx.update(data)
	}

	pub fn finish(&mut self, digest: &mut [u8]) -> Result<usize, Error> {
		if self.finished {
			return Err(Error::BadState);
		}
		if digest.len() < self.alg.digest_size() {
			return Err(Error::BufferTooSmall);
		}

		self.finished = true;
		self.ctx.finish(&mut digest[..self.alg.digest_size()])?;
		Ok(self.alg.digest_size())
	}
}

/// One-shot hash.
pub fn hash_compute<A: HashAccel>(
	accel: &A,
	alg: HashAlgorithm,
	input: &[u8],
	digest: &mut [u8],
) -> Result<usize, Error> {
	let mut operation = HashOperation::setup(accel, alg)?;
	operation.update(input)?;
	operation.finish(digest)
}
