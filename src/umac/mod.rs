//! Host ↔ RPU message envelope and wire helpers.
//!
//! Every message between host and RPU travels in a common envelope:
//!
//! ```text
//! offset 0  u32 LE  total length, envelope included
//! offset 4  u32 LE  message type (system / UMAC control / data)
//! offset 8  ...     typed body
//! ```
//!
//! Bodies begin with a per-class fixed header (see [`SysHead`],
//! [`UmacHdr`], [`DataHead`]). All integers are little-endian on the wire
//! and are read and written through [`MsgWriter`]/[`MsgReader`]; struct
//! layout and host endianness never leak into the byte stream.

pub mod cmd;
pub mod event;

use alloc::vec::Vec;

use num_enum::TryFromPrimitive;

use crate::error::Error;

/// Length of the common envelope.
pub const ENVELOPE_LEN: usize = 8;
/// Length of a system command/event header.
pub const SYS_HDR_LEN: usize = 8;
/// Length of a UMAC control command/event header.
pub const UMAC_HDR_LEN: usize = 16;
/// Length of a data-path sub-event header.
pub const DATA_HDR_LEN: usize = 8;

/// Top-level message classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum MessageType {
	System = 0,
	Umac = 1,
	Data = 2,
}

/// Identifiers shared by the data-path command and event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum DataMsgId {
	TxBuff = 1,
	TxBuffDone = 2,
	RxBuff = 3,
	CarrierOn = 4,
	CarrierOff = 5,
	PmMode = 6,
	PsGetFrames = 7,
}

/// Allocates a zeroed envelope of `ENVELOPE_LEN + body_len` bytes with
/// length and type filled in.
pub fn umac_cmd_alloc(msg_type: MessageType, body_len: usize) -> Vec<u8> {
	let total = ENVELOPE_LEN + body_len;
	let mut msg = vec![0u8; total];
	msg[0..4].copy_from_slice(&(total as u32).to_le_bytes());
	msg[4..8].copy_from_slice(&(msg_type as u32).to_le_bytes());
	msg
}

/// Splits an incoming message into its type and body.
pub fn envelope_parse(msg: &[u8]) -> Result<(MessageType, &[u8]), Error> {
	if msg.len() < ENVELOPE_LEN {
		return Err(Error::InvalidArgument);
	}

	let len = u32::from_le_bytes([msg[0], msg[1], msg[2], msg[3]]) as usize;
	if len < ENVELOPE_LEN || len > msg.len() {
		return Err(Error::InvalidArgument);
	}

	let raw_type = u32::from_le_bytes([msg[4], msg[5], msg[6], msg[7]]);
	let msg_type = MessageType::try_from(raw_type).map_err(|_| Error::InvalidArgument)?;

	Ok((msg_type, &msg[ENVELOPE_LEN..len]))
}

/// Little-endian wire writer over a growable buffer.
#[derive(Debug, Default)]
pub struct MsgWriter {
	buf: Vec<u8>,
}

impl MsgWriter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(cap: usize) -> Self {
		Self {
			buf: Vec::with_capacity(cap),
		}
	}

	pub fn put_u8(&mut self, v: u8) {
		self.buf.push(v);
	}

	pub fn put_u16(&mut self, v: u16) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn put_u32(&mut self, v: u32) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn put_i32(&mut self, v: i32) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn put_u64(&mut self, v: u64) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn put_bytes(&mut self, v: &[u8]) {
		self.buf.extend_from_slice(v);
	}

	/// Pads with zeroes up to `len` total bytes.
	pub fn pad_to(&mut self, len: usize) {
		if self.buf.len() < len {
			self.buf.resize(len, 0);
		}
	}

	pub fn len(&self) -> usize {
		self.buf.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}

	pub fn into_vec(self) -> Vec<u8> {
		self.buf
	}

	/// Wraps the accumulated body into a full envelope.
	pub fn into_envelope(self, msg_type: MessageType) -> Vec<u8> {
		let mut msg = umac_cmd_alloc(msg_type, self.buf.len());
		msg[ENVELOPE_LEN..].copy_from_slice(&self.buf);
		msg
	}
}

/// Little-endian wire reader; every read is bounds-checked.
#[derive(Debug, Clone)]
pub struct MsgReader<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> MsgReader<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	pub fn remaining(&self) -> usize {
		self.data.len() - self.pos
	}

	fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
		if self.remaining() < n {
			return Err(Error::InvalidArgument);
		}
		let chunk = &self.data[self.pos..self.pos + n];
		self.pos += n;
		Ok(chunk)
	}

	pub fn get_u8(&mut self) -> Result<u8, Error> {
		Ok(self.take(1)?[0])
	}

	pub fn get_u16(&mut self) -> Result<u16, Error> {
		let b = self.take(2)?;
		Ok(u16::from_le_bytes([b[0], b[1]]))
	}

	pub fn get_u32(&mut self) -> Result<u32, Error> {
		let b = self.take(4)?;
		Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
	}

	pub fn get_i32(&mut self) -> Result<i32, Error> {
		Ok(self.get_u32()? as i32)
	}

	pub fn get_u64(&mut self) -> Result<u64, Error> {
		let b = self.take(8)?;
		Ok(u64::from_le_bytes([
			b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
		]))
	}

	pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
		self.take(n)
	}

	pub fn get_mac(&mut self) -> Result<[u8; 6], Error> {
		let b = self.take(6)?;
		let mut mac = [0u8; 6];
		mac.copy_from_slice(b);
		Ok(mac)
	}

	/// Remaining unread bytes.
	pub fn rest(&self) -> &'a [u8] {
		&self.data[self.pos..]
	}
}

/// The fixed header of a system command or event body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysHead {
	pub cmd_event: u32,
	pub len: u32,
}

impl SysHead {
	pub fn write(&self, w: &mut MsgWriter) {
		w.put_u32(self.cmd_event);
		w.put_u32(self.len);
	}

	pub fn parse(r: &mut MsgReader<'_>) -> Result<Self, Error> {
		Ok(Self {
			cmd_event: r.get_u32()?,
			len: r.get_u32()?,
		})
	}
}

/// The fixed header of a UMAC control command or event body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UmacHdr {
	pub cmd_evnt: u32,
	pub len: u32,
	pub wdev_id: u32,
	pub seq: u32,
}

impl UmacHdr {
	pub fn new(cmd_evnt: u32, wdev_id: u32) -> Self {
		Self {
			cmd_evnt,
			len: 0,
			wdev_id,
			seq: 0,
		}
	}

	pub fn write(&self, w: &mut MsgWriter) {
		w.put_u32(self.cmd_evnt);
		w.put_u32(self.len);
		w.put_u32(self.wdev_id);
		w.put_u32(self.seq);
	}

	pub fn parse(r: &mut MsgReader<'_>) -> Result<Self, Error> {
		Ok(Self {
			cmd_evnt: r.get_u32()?,
			len: r.get_u32()?,
			wdev_id: r.get_u32()?,
			seq: r.get_u32()?,
		})
	}
}

/// The fixed header of one data-path sub-event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHead {
	pub cmd: u32,
	/// Length of the sub-event, header included. The event iterator
	/// advances by this much.
	pub len: u32,
}

impl DataHead {
	pub fn write(&self, w: &mut MsgWriter) {
		w.put_u32(self.cmd);
		w.put_u32(self.len);
	}

	pub fn parse(r: &mut MsgReader<'_>) -> Result<Self, Error> {
		Ok(Self {
			cmd: r.get_u32()?,
			len: r.get_u32()?,
		})
	}
}
