//! CTR-DRBG interface over the accelerator's entropy source.

use crate::error::Error;

/// The random half of the accelerator: a seeded deterministic generator
/// with explicit reseeding.
pub trait DrbgAccel {
	fn reseed(&self, additional_input: &[u8]) -> Result<(), Error>;
	fn generate(&self, output: &mut [u8]) -> Result<(), Error>;
}

/// Maximum bytes one `generate` call may request.
pub const MAX_BYTES_PER_REQUEST: usize = 1 << 16;

/// Fills `output` with random bytes, reseeding on demand.
pub fn get_random<A: DrbgAccel>(accel: &A, output: &mut [u8]) -> Result<(), Error> {
	for chunk in output.chunks_mut(MAX_BYTES_PER_REQUEST) {
		accel.generate(chunk)?;
	}
	Ok(())
}

/// A random integer uniformly distributed in `[1, upper_bound)`,
/// rejection-sampled so the distribution stays uniform.
pub fn get_random_in_range<A: DrbgAccel>(accel: &A, upper_bound: u64) -> Result<u64, Error> {
	if upper_bound < 2 {
		return Err(Error::InvalidArgument);
	}

	loop {
		let mut bytes = [0u8; 8];
		accel.generate(&mut bytes)?;
		let candidate = u64::from_le_bytes(bytes);

		// Reject the biased tail of the 64-bit range.
		let limit = u64::MAX - u64::MAX % upper_bound;
		if candidate < limit {
			let value = candidate % upper_bound;
			if value != 0 {
				return Ok(value);
			}
		}
	}
}
