//! Multipart AEAD engine (CCM, GCM, ChaCha20-Poly1305).
//!
//! The accelerator consumes whole blocks and keeps its running state in
//! hardware; the operation context here stages partial blocks, tracks
//! the AD→payload transition and, for CCM, withholds the last payload
//! block so the hardware can close the CBC-MAC when the tag is
//! requested. Between feeds the hardware context is saved and resumed,
//! so several operations can share the accelerator.

use heapless::Vec as StackVec;

use super::{Direction, wipe};
use crate::error::Error;

/// CCM, GCM and ChaCha20-Poly1305 carry 16-byte tags by default.
pub const DEFAULT_TAG_SIZE: usize = 16;
/// Largest supported key (AES-256, ChaCha20).
pub const MAX_KEY_SIZE: usize = 32;
/// Largest supported nonce (CCM allows up to 13 bytes).
pub const MAX_NONCE_SIZE: usize = 13;
/// ChaCha20 works on 64-byte blocks; the AES modes on 16-byte blocks.
pub const MAX_BLOCK_SIZE: usize = 64;

/// Supported AEAD algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
	Ccm,
	Gcm,
	ChaCha20Poly1305,
}

impl AeadAlgorithm {
	pub fn block_size(self) -> usize {
		match self {
			AeadAlgorithm::Ccm | AeadAlgorithm::Gcm => 16,
			AeadAlgorithm::ChaCha20Poly1305 => 64,
		}
	}

	fn nonce_length_supported(self, nonce_length: usize) -> bool {
		match self {
			AeadAlgorithm::Gcm | AeadAlgorithm::ChaCha20Poly1305 => nonce_length == 12,
			AeadAlgorithm::Ccm => (7..=13).contains(&nonce_length),
		}
	}

	fn key_size_supported(self, key_size: usize) -> bool {
		match self {
			AeadAlgorithm::Ccm | AeadAlgorithm::Gcm => {
				matches!(key_size, 16 | 24 | 32)
			}
			AeadAlgorithm::ChaCha20Poly1305 => key_size == 32,
		}
	}
}

/// Everything the accelerator needs to start one AEAD stream.
#[derive(Debug)]
pub struct AeadRequest<'a> {
	pub alg: AeadAlgorithm,
	pub dir: Direction,
	pub key: &'a [u8],
	pub nonce: &'a [u8],
	pub tag_size: usize,
	/// Total AD length; only CCM needs it up front.
	pub ad_length: usize,
	/// Total plaintext length; only CCM needs it up front.
	pub plaintext_length: usize,
}

/// The AEAD half of the accelerator.
pub trait AeadAccel {
	type Ctx: AeadCtx;

	fn aead_create(&self, req: &AeadRequest<'_>) -> Result<Self::Ctx, Error>;
}

/// One hardware AEAD stream.
///
/// `feed_aad`/`crypt` queue block-aligned work; `save_state`/`wait`
/// retire it and release the hardware, `resume_state` picks the stream
/// back up.
pub trait AeadCtx {
	fn feed_aad(&mut self, aad: &[u8]) -> Result<(), Error>;
	fn crypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), Error>;
	fn save_state(&mut self) -> Result<(), Error>;
	fn resume_state(&mut self) -> Result<(), Error>;
	fn produce_tag(&mut self, tag: &mut [u8]) -> Result<(), Error>;
	fn verify_tag(&mut self, tag: &[u8]) -> Result<(), Error>;
	fn wait(&mut self) -> Result<(), Error>;
}

/// Where the hardware context currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ContextState {
	#[default]
	NotInitialized,
	/// State saved off the hardware between feeds.
	ContextInitialized,
	HwReserved,
}

/// A multipart AEAD operation.
pub struct AeadOperation<'a, A: AeadAccel> {
	accel: &'a A,
	ctx: Option<A::Ctx>,
	alg: AeadAlgorithm,
	dir: Direction,
	tag_size: usize,
	block_size: usize,
	key: StackVec<u8, MAX_KEY_SIZE>,
	nonce: StackVec<u8, MAX_NONCE_SIZE>,
	ad_length: usize,
	plaintext_length: usize,
	/// Staging buffer for input that has not filled a block yet.
	unprocessed: StackVec<u8, MAX_BLOCK_SIZE>,
	ad_finished: bool,
	state: ContextState,
}

impl<'a, A: AeadAccel> AeadOperation<'a, A> {
	fn setup(
		accel: &'a A,
		dir: Direction,
		key: &[u8],
		alg: AeadAlgorithm,
	) -> Result<Self, Error> {
		if !alg.key_size_supported(key.len()) {
			return Err(Error::NotSupported);
		}

		let mut key_buffer = StackVec::new();
		key_buffer
			.extend_from_slice(key)
			.map_err(|_| Error::InvalidArgument)?;

		Ok(Self {
			accel,
			ctx: None,
			alg,
			dir,
			tag_size: DEFAULT_TAG_SIZE,
			block_size: alg.block_size(),
			key: key_buffer,
			nonce: StackVec::new(),
			ad_length: 0,
			plaintext_length: 0,
			unprocessed: StackVec::new(),
			ad_finished: false,
			state: ContextState::NotInitialized,
		})
	}

	pub fn encrypt_setup(accel: &'a A, key: &[u8], alg: AeadAlgorithm) -> Result<Self, Error> {
		Self::setup(accel, Direction::Encrypt, key, alg)
	}

	pub fn decrypt_setup(accel: &'a A, key: &[u8], alg: AeadAlgorithm) -> Result<Self, Error> {
		Self::setup(accel, Direction::Decrypt, key, alg)
	}

	pub fn tag_size(&self) -> usize {
		self.tag_size
	}

	/// Total AD and plaintext lengths. CCM needs them before any data.
	pub fn set_lengths(&mut self, ad_length: usize, plaintext_length: usize) -> Result<(), Error> {
		self.ad_length = ad_length;
		self.plaintext_length = plaintext_length;
		Ok(())
	}

	/// Records the nonce; for CCM this also synthesizes and absorbs the
	/// RFC 3610 first block (and AD length encoding).
	pub fn set_nonce(&mut self, nonce: &[u8]) -> Result<(), Error> {
		if !self.alg.nonce_length_supported(nonce.len()) {
			return self.fail(Error::NotSupported);
		}

		self.nonce.clear();
		self.nonce
			.extend_from_slice(nonce)
			.map_err(|_| Error::InvalidArgument)?;

		if self.alg == AeadAlgorithm::Ccm {
			return self.create_ccm_header();
		}

		Ok(())
	}

	/// RFC 3610 §2.2: flags byte, nonce, message length in `l` bytes,
	/// then the encoded AD length. Streamed through the AD path so it is
	/// authenticated like ordinary AD.
	fn create_ccm_header(&mut self) -> Result<(), Error> {
		let mut header = [0u8; 26];
		let mut header_size = 16;

		// The length field occupies the bytes the nonce leaves free.
		let l = 15 - self.nonce.len();

		let mut flags: u8 = if self.ad_length > 0 { 1 << 6 } else { 0 };
		let m = (self.tag_size - 2) / 2;
		flags |= ((m & 0x7) << 3) as u8;
		flags |= ((l - 1) & 0x7) as u8;
		header[0] = flags;

		header[1..1 + self.nonce.len()].copy_from_slice(&self.nonce);
		write_be(
			&mut header[1 + self.nonce.len()..16],
			self.plaintext_length as u64,
		);

		if self.ad_length > 0 {
			if self.ad_length < 0xff00 {
				write_be(&mut header[16..18], self.ad_length as u64);
				header_size += 2;
			} else if self.ad_length <= 0xffff_ffff {
				header[16] = 0xff;
				header[17] = 0xfe;
				write_be(&mut header[18..22], self.ad_length as u64);
				header_size += 6;
			} else {
				header[16] = 0xff;
				header[17] = 0xff;
				write_be(&mut header[18..26], self.ad_length as u64);
				header_size += 10;
			}
		}

		let header = header;
		self.update_ad(&header[..header_size])
	}

	fn initialize_or_resume(&mut self) -> Result<(), Error> {
		match self.state {
			ContextState::NotInitialized => {
				// A wrong nonce length at this point means set_nonce never
				// ran for this algorithm.
				if !self.alg.nonce_length_supported(self.nonce.len()) {
					return Err(Error::BadState);
				}

				let req = AeadRequest {
					alg: self.alg,
					dir: self.dir,
					key: &self.key,
					nonce: &self.nonce,
					tag_size: self.tag_size,
					ad_length: self.ad_length,
					plaintext_length: self.plaintext_length,
				};
				self.ctx = Some(self.accel.aead_create(&req)?);
				self.state = ContextState::HwReserved;
				Ok(())
			}
			ContextState::ContextInitialized => {
				self.ctx
					.as_mut()
					.ok_or(Error::BadState)?
					.resume_state()?;
				self.state = ContextState::HwReserved;
				Ok(())
			}
			ContextState::HwReserved => Ok(()),
		}
	}

	fn feed_data_to_hw(
		&mut self,
		input: &[u8],
		output: &mut [u8],
		is_ad: bool,
	) -> Result<(), Error> {
		self.initialize_or_resume()?;
		let ctx = self.ctx.as_mut().ok_or(Error::BadState)?;

		if is_ad {
			ctx.feed_aad(input)
		} else {
			ctx.crypt(input, output)
		}
	}

	fn process_on_hw(&mut self) -> Result<(), Error> {
		let ctx = self.ctx.as_mut().ok_or(Error::BadState)?;
		ctx.save_state()?;
		ctx.wait()?;
		self.state = ContextState::ContextInitialized;
		Ok(())
	}

	fn update_internal(
		&mut self,
		mut input: &[u8],
		output: &mut [u8],
		is_ad: bool,
	) -> Result<usize, Error> {
		if input.is_empty() {
			return Ok(0);
		}

		let block = self.block_size;
		let mut out_bytes = 0;

		if !self.unprocessed.is_empty() || input.len() < block {
			let remaining = block - self.unprocessed.len();

			if input.len() <= remaining {
				self.unprocessed
					.extend_from_slice(input)
					.map_err(|_| Error::InvalidArgument)?;
				return Ok(0);
			}

			self.unprocessed
				.extend_from_slice(&input[..remaining])
				.map_err(|_| Error::InvalidArgument)?;
			input = &input[remaining..];
		}

		if self.unprocessed.len() == block {
			if !is_ad && output.len() < block {
				return Err(Error::BufferTooSmall);
			}

			// Copied out of the staging buffer so the context can be
			// borrowed for the feed.
			let mut staged = [0u8; MAX_BLOCK_SIZE];
			staged[..block].copy_from_slice(&self.unprocessed);
			self.feed_data_to_hw(&staged[..block], output, is_ad)?;

			out_bytes = block;
			self.unprocessed.clear();
		}

		// Clamp to whole blocks; CCM keeps one block back so the tag can
		// be produced at finish time.
		let mut blk_bytes = input.len() & !(block - 1);
		if self.alg == AeadAlgorithm::Ccm && !input.is_empty() && blk_bytes == input.len() {
			blk_bytes -= block;
		}

		if blk_bytes > 0 {
			if !is_ad && output.len() < blk_bytes + out_bytes {
				return Err(Error::BufferTooSmall);
			}

			let (head, rest) = input.split_at(blk_bytes);
			if is_ad {
				self.feed_data_to_hw(head, &mut [], true)?;
			} else {
				self.feed_data_to_hw(
					head,
					&mut output[out_bytes..out_bytes + blk_bytes],
					false,
				)?;
			}

			input = rest;
			out_bytes += blk_bytes;
		}

		if out_bytes != 0 {
			self.process_on_hw()?;
		}

		if !input.is_empty() {
			self.unprocessed.clear();
			self.unprocessed
				.extend_from_slice(input)
				.map_err(|_| Error::InvalidArgument)?;
		}

		Ok(if is_ad { 0 } else { out_bytes })
	}

	/// Absorbs additional data. All AD must precede the payload.
	pub fn update_ad(&mut self, input: &[u8]) -> Result<(), Error> {
		if self.ad_finished {
			return self.fail(Error::BadState);
		}

		match self.update_internal(input, &mut [], true) {
			Ok(_) => Ok(()),
			Err(err) => self.fail(err),
		}
	}

	/// Encrypts or decrypts a payload segment into `output`, returning
	/// the number of bytes produced.
	pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
		if input.is_empty() {
			return Ok(0);
		}

		// Flush any partial AD block before the first payload byte; from
		// here on update_ad is rejected.
		if !self.unprocessed.is_empty() && !self.ad_finished {
			let mut staged = [0u8; MAX_BLOCK_SIZE];
			let len = self.unprocessed.len();
			staged[..len].copy_from_slice(&self.unprocessed);

			if let Err(err) = self.feed_data_to_hw(&staged[..len], &mut [], true) {
				return self.fail(err);
			}
			if let Err(err) = self.process_on_hw() {
				return self.fail(err);
			}

			self.unprocessed.clear();
		}

		self.ad_finished = true;

		match self.update_internal(input, output, false) {
			Ok(written) => Ok(written),
			Err(err) => self.fail(err),
		}
	}

	/// Flushes buffered payload, produces the tag and retires the
	/// operation. Returns `(ciphertext_written, tag_length)`.
	pub fn finish(&mut self, ciphertext: &mut [u8], tag: &mut [u8]) -> Result<(usize, usize), Error> {
		if tag.len() < self.tag_size
			|| (self.ad_finished && ciphertext.len() < self.unprocessed.len())
		{
			return self.fail(Error::BufferTooSmall);
		}

		let mut ciphertext_length = 0;

		if !self.unprocessed.is_empty() {
			let mut staged = [0u8; MAX_BLOCK_SIZE];
			let len = self.unprocessed.len();
			staged[..len].copy_from_slice(&self.unprocessed);

			let is_ad = !self.ad_finished;
			if let Err(err) = self.feed_data_to_hw(&staged[..len], ciphertext, is_ad) {
				return self.fail(err);
			}
			if self.ad_finished {
				ciphertext_length = len;
			}
		} else {
			// Zero-length AD and payload: nothing created the context
			// yet, but the tag still has to come from somewhere.
			if let Err(err) = self.initialize_or_resume() {
				return self.fail(err);
			}
		}

		let tag_size = self.tag_size;
		let result = (|| {
			let ctx = self.ctx.as_mut().ok_or(Error::BadState)?;
			ctx.produce_tag(&mut tag[..tag_size])?;
			ctx.wait()
		})();

		if let Err(err) = result {
			return self.fail(err);
		}

		self.wipe_context();
		Ok((ciphertext_length, tag_size))
	}

	/// Flushes buffered ciphertext, verifies the tag and retires the
	/// operation. Returns the number of plaintext bytes written.
	pub fn verify(&mut self, plaintext: &mut [u8], tag: &[u8]) -> Result<usize, Error> {
		if self.ad_finished && plaintext.len() < self.unprocessed.len() {
			return self.fail(Error::BufferTooSmall);
		}

		let mut plaintext_length = 0;

		if !self.unprocessed.is_empty() {
			let mut staged = [0u8; MAX_BLOCK_SIZE];
			let len = self.unprocessed.len();
			staged[..len].copy_from_slice(&self.unprocessed);

			let is_ad = !self.ad_finished;
			if let Err(err) = self.feed_data_to_hw(&staged[..len], plaintext, is_ad) {
				return self.fail(err);
			}
			if self.ad_finished {
				plaintext_length = len;
			}
		} else if let Err(err) = self.initialize_or_resume() {
			return self.fail(err);
		}

		let result = (|| {
			let ctx = self.ctx.as_mut().ok_or(Error::BadState)?;
			ctx.verify_tag(tag)?;
			ctx.wait()
		})();

		if let Err(err) = result {
			return self.fail(err);
		}

		self.wipe_context();
		Ok(plaintext_length)
	}

	/// Aborts the operation, zeroizing all secret material.
	pub fn abort(&mut self) {
		self.wipe_context();
	}

	fn wipe_context(&mut self) {
		wipe(&mut self.key);
		wipe(&mut self.nonce);
		wipe(&mut self.unprocessed);
		self.key.clear();
		self.nonce.clear();
		self.unprocessed.clear();
		self.ctx = None;
		self.ad_finished = false;
		self.ad_length = 0;
		self.plaintext_length = 0;
		self.state = ContextState::NotInitialized;
	}

	fn fail<T>(&mut self, err: Error) -> Result<T, Error> {
		self.wipe_context();
		Err(err)
	}
}

fn write_be(out: &mut [u8], value: u64) {
	for (i, byte) in out.iter_mut().rev().enumerate() {
		*byte = if i < 8 { (value >> (i * 8)) as u8 } else { 0 };
	}
}

/// One-shot AEAD encryption: `output` receives ciphertext followed by
/// the tag; returns the total length.
pub fn aead_encrypt<A: AeadAccel>(
	accel: &A,
	alg: AeadAlgorithm,
	key: &[u8],
	nonce: &[u8],
	additional_data: &[u8],
	plaintext: &[u8],
	output: &mut [u8],
) -> Result<usize, Error> {
	let mut operation = AeadOperation::encrypt_setup(accel, key, alg)?;
	operation.set_lengths(additional_data.len(), plaintext.len())?;
	operation.set_nonce(nonce)?;
	operation.update_ad(additional_data)?;

	let mut written = operation.update(plaintext, output)?;

	let tag_size = operation.tag_size();
	if output.len() < written + tag_size {
		operation.abort();
		return Err(Error::BufferTooSmall);
	}

	let mut tag = [0u8; DEFAULT_TAG_SIZE];
	let (flushed, tag_length) = {
		let tail = &mut output[written..];
		operation.finish(tail, &mut tag[..tag_size])?
	};
	written += flushed;

	if output.len() < written + tag_length {
		return Err(Error::BufferTooSmall);
	}
	output[written..written + tag_length].copy_from_slice(&tag[..tag_length]);

	Ok(written + tag_length)
}

/// One-shot AEAD decryption: `ciphertext` carries the tag at its end;
/// returns the plaintext length.
pub fn aead_decrypt<A: AeadAccel>(
	accel: &A,
	alg: AeadAlgorithm,
	key: &[u8],
	nonce: &[u8],
	additional_data: &[u8],
	ciphertext: &[u8],
	output: &mut [u8],
) -> Result<usize, Error> {
	let mut operation = AeadOperation::decrypt_setup(accel, key, alg)?;

	let tag_size = operation.tag_size();
	if ciphertext.len() < tag_size {
		operation.abort();
		return Err(Error::InvalidArgument);
	}
	let (ct, tag) = ciphertext.split_at(ciphertext.len() - tag_size);

	operation.set_lengths(additional_data.len(), ct.len())?;
	operation.set_nonce(nonce)?;
	operation.update_ad(additional_data)?;

	let mut written = operation.update(ct, output)?;
	written += operation.verify(&mut output[written..], tag)?;

	Ok(written)
}

#[cfg(test)]
mod tests {
	use alloc::sync::Arc;
	use alloc::vec::Vec;

	use hermit_sync::SpinMutex;

	use super::*;

	/// A software stand-in for the accelerator: XOR keystream plus an
	/// FNV-based tag over key, nonce, AD and ciphertext. Cryptographically
	/// worthless, but it honors the streaming contract and detects any
	/// single-bit change.
	#[derive(Default)]
	struct SoftAead {
		/// Every AAD byte fed to the hardware, in feed order.
		aad_log: Arc<SpinMutex<Vec<u8>>>,
	}

	struct SoftCtx {
		dir: Direction,
		key: Vec<u8>,
		nonce: Vec<u8>,
		tag_size: usize,
		pos: usize,
		acc: u64,
		aad_log: Arc<SpinMutex<Vec<u8>>>,
	}

	impl SoftCtx {
		fn absorb(&mut self, byte: u8) {
			self.acc ^= u64::from(byte);
			self.acc = self.acc.wrapping_mul(0x0100_0000_01b3);
		}

		fn tag(&self) -> [u8; 16] {
			let mut tag = [0u8; 16];
			tag[..8].copy_from_slice(&self.acc.to_le_bytes());
			tag[8..].copy_from_slice(&self.acc.rotate_left(17).to_le_bytes());
			tag
		}
	}

	impl AeadAccel for SoftAead {
		type Ctx = SoftCtx;

		fn aead_create(&self, req: &AeadRequest<'_>) -> Result<SoftCtx, Error> {
			let mut ctx = SoftCtx {
				dir: req.dir,
				key: req.key.to_vec(),
				nonce: req.nonce.to_vec(),
				tag_size: req.tag_size,
				pos: 0,
				acc: 0xcbf2_9ce4_8422_2325,
				aad_log: self.aad_log.clone(),
			};
			for &b in req.key {
				ctx.absorb(b);
			}
			for &b in req.nonce {
				ctx.absorb(b);
			}
			Ok(ctx)
		}
	}

	impl AeadCtx for SoftCtx {
		fn feed_aad(&mut self, aad: &[u8]) -> Result<(), Error> {
			self.aad_log.lock().extend_from_slice(aad);
			for &b in aad {
				self.absorb(b);
			}
			Ok(())
		}

		fn crypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), Error> {
			if output.len() < input.len() {
				return Err(Error::BufferTooSmall);
			}

			for (i, &b) in input.iter().enumerate() {
				let ks = self.key[self.pos % self.key.len()]
					^ self.nonce[self.pos % self.nonce.len()]
					^ (self.pos as u8)
					^ 0x5a;
				output[i] = b ^ ks;

				// The tag always covers the ciphertext side.
				let ct = match self.dir {
					Direction::Encrypt => output[i],
					Direction::Decrypt => b,
				};
				self.absorb(ct);
				self.pos += 1;
			}
			Ok(())
		}

		fn save_state(&mut self) -> Result<(), Error> {
			Ok(())
		}

		fn resume_state(&mut self) -> Result<(), Error> {
			Ok(())
		}

		fn produce_tag(&mut self, tag: &mut [u8]) -> Result<(), Error> {
			let full = self.tag();
			tag.copy_from_slice(&full[..tag.len()]);
			Ok(())
		}

		fn verify_tag(&mut self, tag: &[u8]) -> Result<(), Error> {
			let full = self.tag();
			if tag == &full[..self.tag_size.min(tag.len())] {
				Ok(())
			} else {
				Err(Error::InvalidSignature)
			}
		}

		fn wait(&mut self) -> Result<(), Error> {
			Ok(())
		}
	}

	fn round_trip(alg: AeadAlgorithm, key: &[u8], nonce: &[u8], ad: &[u8], pt: &[u8]) {
		let accel = SoftAead::default();

		let mut ct = vec![0u8; pt.len() + DEFAULT_TAG_SIZE];
		let ct_len = aead_encrypt(&accel, alg, key, nonce, ad, pt, &mut ct).unwrap();
		assert_eq!(ct_len, pt.len() + DEFAULT_TAG_SIZE);

		let mut out = vec![0u8; pt.len()];
		let pt_len = aead_decrypt(&accel, alg, key, nonce, ad, &ct[..ct_len], &mut out).unwrap();
		assert_eq!(&out[..pt_len], pt);
	}

	#[test]
	fn gcm_round_trip() {
		round_trip(
			AeadAlgorithm::Gcm,
			&[0u8; 32],
			&[0u8; 12],
			b"header",
			b"hello",
		);
	}

	#[test]
	fn ccm_round_trip_multi_block() {
		let pt: Vec<u8> = (0u8..40).collect();
		let ad: Vec<u8> = (100u8..120).collect();
		round_trip(AeadAlgorithm::Ccm, &[7u8; 16], &[9u8; 13], &ad, &pt);
	}

	#[test]
	fn chacha20poly1305_round_trip() {
		let pt: Vec<u8> = (0u8..100).collect();
		round_trip(
			AeadAlgorithm::ChaCha20Poly1305,
			&[3u8; 32],
			&[1u8; 12],
			&[],
			&pt,
		);
	}

	#[test]
	fn empty_payload_still_produces_a_tag() {
		round_trip(AeadAlgorithm::Gcm, &[0u8; 16], &[0u8; 12], b"", b"");
	}

	#[test]
	fn bit_flip_in_ciphertext_fails_verification() {
		let accel = SoftAead::default();
		let pt = b"attack at dawn";

		let mut ct = vec![0u8; pt.len() + DEFAULT_TAG_SIZE];
		let ct_len = aead_encrypt(
			&accel,
			AeadAlgorithm::Gcm,
			&[0u8; 32],
			&[0u8; 12],
			b"ad",
			pt,
			&mut ct,
		)
		.unwrap();

		ct[3] ^= 0x01;
		let mut out = vec![0u8; pt.len()];
		assert_eq!(
			aead_decrypt(
				&accel,
				AeadAlgorithm::Gcm,
				&[0u8; 32],
				&[0u8; 12],
				b"ad",
				&ct[..ct_len],
				&mut out,
			),
			Err(Error::InvalidSignature)
		);
	}

	#[test]
	fn bit_flip_in_tag_fails_verification() {
		let accel = SoftAead::default();
		let pt = b"attack at dawn";

		let mut ct = vec![0u8; pt.len() + DEFAULT_TAG_SIZE];
		let ct_len = aead_encrypt(
			&accel,
			AeadAlgorithm::Ccm,
			&[0u8; 16],
			&[0u8; 12],
			b"",
			pt,
			&mut ct,
		)
		.unwrap();

		ct[ct_len - 1] ^= 0x80;
		let mut out = vec![0u8; pt.len()];
		assert_eq!(
			aead_decrypt(
				&accel,
				AeadAlgorithm::Ccm,
				&[0u8; 16],
				&[0u8; 12],
				b"",
				&ct[..ct_len],
				&mut out,
			),
			Err(Error::InvalidSignature)
		);
	}

	#[test]
	fn ccm_header_follows_rfc3610() {
		let accel = SoftAead::default();
		let nonce = [0u8; 12];
		let ad = b"header";
		let pt = b"hello";

		let mut ct = vec![0u8; pt.len() + DEFAULT_TAG_SIZE];
		aead_encrypt(
			&accel,
			AeadAlgorithm::Ccm,
			&[0u8; 16],
			&nonce,
			ad,
			pt,
			&mut ct,
		)
		.unwrap();

		let log = accel.aad_log.lock();
		// Flags: AD present, M' = (16-2)/2, L' = 15-12-1.
		assert_eq!(log[0], 0x40 | (7 << 3) | 2);
		assert_eq!(&log[1..13], &nonce);
		// Three length bytes for a 5-byte message.
		assert_eq!(&log[13..16], &[0, 0, 5]);
		// Two-byte AD length, then the AD itself.
		assert_eq!(&log[16..18], &[0, 6]);
		assert_eq!(&log[18..24], ad);
	}

	#[test]
	fn ad_after_payload_is_rejected() {
		let accel = SoftAead::default();
		let mut op =
			AeadOperation::encrypt_setup(&accel, &[0u8; 32], AeadAlgorithm::Gcm).unwrap();
		op.set_lengths(4, 32).unwrap();
		op.set_nonce(&[0u8; 12]).unwrap();
		op.update_ad(b"aad!").unwrap();

		let mut out = [0u8; 32];
		op.update(&[0u8; 32], &mut out).unwrap();
		assert_eq!(op.update_ad(b"late"), Err(Error::BadState));
	}

	#[test]
	fn wrong_nonce_length_is_rejected() {
		let accel = SoftAead::default();
		let mut op =
			AeadOperation::encrypt_setup(&accel, &[0u8; 32], AeadAlgorithm::Gcm).unwrap();
		assert_eq!(op.set_nonce(&[0u8; 7]), Err(Error::NotSupported));
	}

	#[test]
	fn small_output_buffer_is_detected() {
		let accel = SoftAead::default();
		let mut op =
			AeadOperation::encrypt_setup(&accel, &[0u8; 32], AeadAlgorithm::Gcm).unwrap();
		op.set_nonce(&[0u8; 12]).unwrap();

		let mut out = [0u8; 8];
		assert_eq!(
			op.update(&[0u8; 16], &mut out),
			Err(Error::BufferTooSmall)
		);
	}

	#[test]
	fn small_tag_buffer_is_detected() {
		let accel = SoftAead::default();
		let mut op =
			AeadOperation::encrypt_setup(&accel, &[0u8; 32], AeadAlgorithm::Gcm).unwrap();
		op.set_nonce(&[0u8; 12]).unwrap();

		let mut ct = [0u8; 16];
		let mut tag = [0u8; 8];
		assert_eq!(
			op.finish(&mut ct, &mut tag),
			Err(Error::BufferTooSmall)
		);
	}

	#[test]
	fn errors_zeroize_the_context() {
		let accel = SoftAead::default();
		let mut op =
			AeadOperation::encrypt_setup(&accel, &[0xaau8; 32], AeadAlgorithm::Gcm).unwrap();
		op.set_nonce(&[0u8; 12]).unwrap();

		let mut ct = [0u8; 16];
		let mut tag = [0u8; 8];
		let _ = op.finish(&mut ct, &mut tag);

		assert!(op.key.is_empty());
		assert!(op.nonce.is_empty());
		assert!(op.unprocessed.is_empty());
	}

	#[test]
	fn multipart_matches_one_shot() {
		let accel = SoftAead::default();
		let key = [5u8; 32];
		let nonce = [6u8; 12];
		let pt: Vec<u8> = (0u8..75).collect();

		let mut one_shot = vec![0u8; pt.len() + DEFAULT_TAG_SIZE];
		let total =
			aead_encrypt(&accel, AeadAlgorithm::Gcm, &key, &nonce, b"ad", &pt, &mut one_shot)
				.unwrap();

		let mut op = AeadOperation::encrypt_setup(&accel, &key, AeadAlgorithm::Gcm).unwrap();
		op.set_lengths(2, pt.len()).unwrap();
		op.set_nonce(&nonce).unwrap();
		op.update_ad(b"ad").unwrap();

		let mut ct = vec![0u8; pt.len() + DEFAULT_TAG_SIZE];
		let mut written = 0;
		for chunk in pt.chunks(13) {
			written += op.update(chunk, &mut ct[written..]).unwrap();
		}
		let mut tag = [0u8; DEFAULT_TAG_SIZE];
		let (flushed, tag_len) = op.finish(&mut ct[written..], &mut tag).unwrap();
		written += flushed;
		ct[written..written + tag_len].copy_from_slice(&tag[..tag_len]);

		assert_eq!(&ct[..written + tag_len], &one_shot[..total]);
	}
}
