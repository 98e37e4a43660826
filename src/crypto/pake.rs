//! Password-authenticated key exchange (SPAKE2+, SRP-6a, J-PAKE),
//! interface level only: the message schedule is the contract, the
//! group arithmetic lives in the accelerator.

use super::wipe;
use crate::error::Error;

/// Supported PAKE protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PakeAlgorithm {
	Spake2p,
	Srp6a,
	Jpake,
}

/// Which side of the exchange this operation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PakeRole {
	Client,
	Server,
}

/// The PAKE half of the accelerator.
pub trait PakeAccel {
	type Ctx: PakeCtx;

	fn pake_create(
		&self,
		alg: PakeAlgorithm,
		role: PakeRole,
		password: &[u8],
	) -> Result<Self::Ctx, Error>;
}

pub trait PakeCtx {
	/// Produces the next outgoing protocol message.
	fn output(&mut self, message: &mut [u8]) -> Result<usize, Error>;

	/// Consumes the peer's next protocol message. A confirmation value
	/// that fails to check yields [`Error::InvalidSignature`].
	fn input(&mut self, message: &[u8]) -> Result<(), Error>;

	/// Extracts the shared secret once both confirmations passed.
	fn get_shared_key(&mut self, secret: &mut [u8]) -> Result<usize, Error>;
}

/// A PAKE operation; message order is driven by the caller according to
/// the protocol it speaks.
pub struct PakeOperation<C: PakeCtx> {
	ctx: Option<C>,
}

impl<C: PakeCtx> PakeOperation<C> {
	pub fn setup<A: PakeAccel<Ctx = C>>(
		accel: &A,
		alg: PakeAlgorithm,
		role: PakeRole,
		password: &[u8],
	) -> Result<Self, Error> {
		Ok(Self {
			ctx: Some(accel.pake_create(alg, role, password)?),
		})
	}

	pub fn output(&mut self, message: &mut [u8]) -> Result<usize, Error> {
		match self.ctx.as_mut() {
			Some(ctx) => ctx.output(message),
			None => Err(Error::BadState),
		}
	}

	pub fn input(&mut self, message: &[u8]) -> Result<(), Error> {
		let result = match self.ctx.as_mut() {
			Some(ctx) => ctx.input(message),
			None => Err(Error::BadState),
		};

		if result.is_err() {
			self.abort();
		}
		result
	}

	/// Extracts the shared secret and retires the operation.
	pub fn get_shared_key(&mut self, secret: &mut [u8]) -> Result<usize, Error> {
		let result = match self.ctx.as_mut() {
			Some(ctx) => ctx.get_shared_key(secret),
			None => Err(Error::BadState),
		};

		if result.is_err() {
			wipe(secret);
		}
		self.abort();
		result
	}

	pub fn abort(&mut self) {
		self.ctx = None;
	}
}
