//! Parsing and dispatch types for RPU → host events.
//!
//! The encode halves mirror what the RPU firmware emits; they exist so
//! test rigs and bus simulators can produce byte-exact event streams.

use alloc::vec::Vec;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::{DATA_HDR_LEN, DataHead, DataMsgId, MessageType, MsgReader, MsgWriter, SysHead, UmacHdr};
use crate::error::Error;

/// System channel events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum SystemEvent {
	InitDone = 1,
	Stats = 2,
	DeinitDone = 3,
	RfTest = 4,
	RadiocmdStatus = 5,
}

/// UMAC control events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum UmacEvent {
	TriggerScanStart = 0,
	ScanDone = 1,
	ScanAborted = 2,
	ScanResult = 3,
	ScanDisplayResult = 4,
	Authenticate = 5,
	Associate = 6,
	Deauthenticate = 7,
	Disassociate = 8,
	Frame = 9,
	FrameTxStatus = 10,
	UnprotDeauthenticate = 11,
	UnprotDisassociate = 12,
	NewStation = 13,
	DelStation = 14,
	IfflagsStatus = 15,
	NewInterface = 16,
	SetInterface = 17,
	CookieResp = 18,
	GetTxPower = 19,
	GetChannel = 20,
	GetStation = 21,
	NewWiphy = 22,
	CmdStatus = 23,
	BeaconHint = 24,
	Connect = 25,
	Disconnect = 26,
	GetReg = 27,
	RegChange = 28,
	GetPowerSaveInfo = 29,
	TwtSleep = 30,
	ConfigTwt = 31,
	TeardownTwt = 32,
	RemainOnChannel = 33,
	CancelRemainOnChannel = 34,
	GetConnectionInfo = 35,
}

/// TWT sleep states carried by [`UmacEvent::TwtSleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum TwtSleepType {
	BlockTx = 0,
	UnblockTx = 1,
}

/// A decoded UMAC control event.
///
/// Events the driver reacts to are parsed into fields; events that are
/// only forwarded keep their raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtrlEvent<'a> {
	TriggerScanStart(&'a [u8]),
	ScanDone(&'a [u8]),
	ScanAborted(&'a [u8]),
	ScanResult(&'a [u8]),
	ScanDisplayResult(&'a [u8]),
	Authenticate(&'a [u8]),
	Associate(&'a [u8]),
	Deauthenticate(&'a [u8]),
	Disassociate(&'a [u8]),
	Frame(&'a [u8]),
	FrameTxStatus(&'a [u8]),
	UnprotDeauthenticate(&'a [u8]),
	UnprotDisassociate(&'a [u8]),
	NewStation {
		mac_addr: [u8; 6],
		is_sta_legacy: bool,
		wme: bool,
	},
	DelStation {
		mac_addr: [u8; 6],
	},
	IfflagsStatus {
		status: i32,
	},
	NewInterface(&'a [u8]),
	SetInterface(&'a [u8]),
	CookieResp(&'a [u8]),
	GetTxPower(&'a [u8]),
	GetChannel(&'a [u8]),
	GetStation(&'a [u8]),
	NewWiphy(&'a [u8]),
	CmdStatus(&'a [u8]),
	BeaconHint(&'a [u8]),
	Connect(&'a [u8]),
	Disconnect(&'a [u8]),
	GetReg(&'a [u8]),
	RegChange(&'a [u8]),
	GetPowerSaveInfo(&'a [u8]),
	TwtSleep {
		sleep_type: TwtSleepType,
	},
	ConfigTwt(&'a [u8]),
	TeardownTwt(&'a [u8]),
	RemainOnChannel(&'a [u8]),
	CancelRemainOnChannel(&'a [u8]),
	GetConnectionInfo(&'a [u8]),
	/// Event number not known to this driver; logged, never fatal.
	Unknown {
		event_num: u32,
	},
}

/// Parses a UMAC control event body (header included).
pub fn parse_ctrl_event(body: &[u8]) -> Result<(UmacHdr, CtrlEvent<'_>), Error> {
	let mut r = MsgReader::new(body);
	let hdr = UmacHdr::parse(&mut r)?;
	let payload = r.rest();

	let Ok(event) = UmacEvent::try_from(hdr.cmd_evnt) else {
		return Ok((hdr, CtrlEvent::Unknown {
			event_num: hdr.cmd_evnt,
		}));
	};

	let parsed = match event {
		UmacEvent::TriggerScanStart => CtrlEvent::TriggerScanStart(payload),
		UmacEvent::ScanDone => CtrlEvent::ScanDone(payload),
		UmacEvent::ScanAborted => CtrlEvent::ScanAborted(payload),
		UmacEvent::ScanResult => CtrlEvent::ScanResult(payload),
		UmacEvent::ScanDisplayResult => CtrlEvent::ScanDisplayResult(payload),
		UmacEvent::Authenticate => CtrlEvent::Authenticate(payload),
		UmacEvent::Associate => CtrlEvent::Associate(payload),
		UmacEvent::Deauthenticate => CtrlEvent::Deauthenticate(payload),
		UmacEvent::Disassociate => CtrlEvent::Disassociate(payload),
		UmacEvent::Frame => CtrlEvent::Frame(payload),
		UmacEvent::FrameTxStatus => CtrlEvent::FrameTxStatus(payload),
		UmacEvent::UnprotDeauthenticate => CtrlEvent::UnprotDeauthenticate(payload),
		UmacEvent::UnprotDisassociate => CtrlEvent::UnprotDisassociate(payload),
		UmacEvent::NewStation => {
			let mut r = MsgReader::new(payload);
			let mac_addr = r.get_mac()?;
			let is_sta_legacy = r.get_u8()? != 0;
			let wme = r.get_u8()? != 0;
			CtrlEvent::NewStation {
				mac_addr,
				is_sta_legacy,
				wme,
			}
		}
		UmacEvent::DelStation => {
			let mut r = MsgReader::new(payload);
			CtrlEvent::DelStation {
				mac_addr: r.get_mac()?,
			}
		}
		UmacEvent::IfflagsStatus => {
			let mut r = MsgReader::new(payload);
			CtrlEvent::IfflagsStatus {
				status: r.get_i32()?,
			}
		}
		UmacEvent::NewInterface => CtrlEvent::NewInterface(payload),
		UmacEvent::SetInterface => CtrlEvent::SetInterface(payload),
		UmacEvent::CookieResp => CtrlEvent::CookieResp(payload),
		UmacEvent::GetTxPower => CtrlEvent::GetTxPower(payload),
		UmacEvent::GetChannel => CtrlEvent::GetChannel(payload),
		UmacEvent::GetStation => CtrlEvent::GetStation(payload),
		UmacEvent::NewWiphy => CtrlEvent::NewWiphy(payload),
		UmacEvent::CmdStatus => CtrlEvent::CmdStatus(payload),
		UmacEvent::BeaconHint => CtrlEvent::BeaconHint(payload),
		UmacEvent::Connect => CtrlEvent::Connect(payload),
		UmacEvent::Disconnect => CtrlEvent::Disconnect(payload),
		UmacEvent::GetReg => CtrlEvent::GetReg(payload),
		UmacEvent::RegChange => CtrlEvent::RegChange(payload),
		UmacEvent::GetPowerSaveInfo => CtrlEvent::GetPowerSaveInfo(payload),
		UmacEvent::TwtSleep => {
			let mut r = MsgReader::new(payload);
			let sleep_type = TwtSleepType::try_from(r.get_u32()?)
				.map_err(|_| Error::InvalidArgument)?;
			CtrlEvent::TwtSleep { sleep_type }
		}
		UmacEvent::ConfigTwt => CtrlEvent::ConfigTwt(payload),
		UmacEvent::TeardownTwt => CtrlEvent::TeardownTwt(payload),
		UmacEvent::RemainOnChannel => CtrlEvent::RemainOnChannel(payload),
		UmacEvent::CancelRemainOnChannel => CtrlEvent::CancelRemainOnChannel(payload),
		UmacEvent::GetConnectionInfo => CtrlEvent::GetConnectionInfo(payload),
	};

	Ok((hdr, parsed))
}

/// Builds a UMAC control event body for the given header and payload.
pub fn encode_ctrl_event(event: UmacEvent, wdev_id: u32, seq: u32, payload: &[u8]) -> Vec<u8> {
	let mut w = MsgWriter::new();
	let hdr = UmacHdr {
		cmd_evnt: event.into(),
		len: (super::UMAC_HDR_LEN + payload.len()) as u32,
		wdev_id,
		seq,
	};
	hdr.write(&mut w);
	w.put_bytes(payload);
	w.into_envelope(MessageType::Umac)
}

/// Builds a system event envelope.
pub fn encode_sys_event(event: SystemEvent, payload: &[u8]) -> Vec<u8> {
	let mut w = MsgWriter::new();
	SysHead {
		cmd_event: event.into(),
		len: (super::SYS_HDR_LEN + payload.len()) as u32,
	}
	.write(&mut w);
	w.put_bytes(payload);
	w.into_envelope(MessageType::System)
}

/// Top-level kind of a received cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum RxPktType {
	Data = 0,
	BcnPrbRsp = 1,
	Raw = 2,
}

/// Per-packet data sub-type inside an `RX_BUFF` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RxDataPktType {
	Mpdu = 0,
	MsduWithMac = 1,
	Msdu = 2,
}

/// One received packet described by an `RX_BUFF` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxPktInfo {
	pub descriptor_id: u16,
	pub pkt_len: u16,
	pub pkt_type: u8,
}

/// `RX_BUFF`: a cluster of received packets sharing RSSI and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxBuffEvent {
	pub wdev_id: u32,
	pub rx_pkt_type: RxPktType,
	pub mac_header_len: u32,
	pub frequency: u32,
	pub signal: i16,
	pub pkts: Vec<RxPktInfo>,
}

impl RxBuffEvent {
	pub fn parse(body: &[u8]) -> Result<Self, Error> {
		let mut r = MsgReader::new(body);
		let _head = DataHead::parse(&mut r)?;
		let wdev_id = r.get_u32()?;
		let rx_pkt_type =
			RxPktType::try_from(r.get_u32()?).map_err(|_| Error::InvalidArgument)?;
		let mac_header_len = r.get_u32()?;
		let frequency = r.get_u32()?;
		let signal = r.get_u16()? as i16;
		let pkt_cnt = r.get_u16()? as usize;

		let mut pkts = Vec::with_capacity(pkt_cnt);
		for _ in 0..pkt_cnt {
			let descriptor_id = r.get_u16()?;
			let pkt_len = r.get_u16()?;
			let pkt_type = r.get_u8()?;
			let _pad = r.get_bytes(3)?;
			pkts.push(RxPktInfo {
				descriptor_id,
				pkt_len,
				pkt_type,
			});
		}

		Ok(Self {
			wdev_id,
			rx_pkt_type,
			mac_header_len,
			frequency,
			signal,
			pkts,
		})
	}

	pub fn encode(&self) -> Vec<u8> {
		let len = DATA_HDR_LEN + 20 + self.pkts.len() * 8;
		let mut w = MsgWriter::with_capacity(len);
		DataHead {
			cmd: DataMsgId::RxBuff as u32,
			len: len as u32,
		}
		.write(&mut w);
		w.put_u32(self.wdev_id);
		w.put_u32(self.rx_pkt_type as u32);
		w.put_u32(self.mac_header_len);
		w.put_u32(self.frequency);
		w.put_u16(self.signal as u16);
		w.put_u16(self.pkts.len() as u16);
		for pkt in &self.pkts {
			w.put_u16(pkt.descriptor_id);
			w.put_u16(pkt.pkt_len);
			w.put_u8(pkt.pkt_type);
			w.put_bytes(&[0; 3]);
		}
		w.into_vec()
	}
}

/// `TX_BUFF_DONE`: the RPU released one TX descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxBuffDoneEvent {
	pub tx_desc_num: u32,
	pub status: u32,
}

impl TxBuffDoneEvent {
	pub fn parse(body: &[u8]) -> Result<Self, Error> {
		let mut r = MsgReader::new(body);
		let _head = DataHead::parse(&mut r)?;
		Ok(Self {
			tx_desc_num: r.get_u32()?,
			status: r.get_u32()?,
		})
	}

	pub fn encode(&self) -> Vec<u8> {
		let len = DATA_HDR_LEN + 8;
		let mut w = MsgWriter::with_capacity(len);
		DataHead {
			cmd: DataMsgId::TxBuffDone as u32,
			len: len as u32,
		}
		.write(&mut w);
		w.put_u32(self.tx_desc_num);
		w.put_u32(self.status);
		w.into_vec()
	}
}

/// `CARRIER_ON` / `CARRIER_OFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierEvent {
	pub wdev_id: u32,
}

impl CarrierEvent {
	pub fn parse(body: &[u8]) -> Result<Self, Error> {
		let mut r = MsgReader::new(body);
		let _head = DataHead::parse(&mut r)?;
		Ok(Self {
			wdev_id: r.get_u32()?,
		})
	}

	pub fn encode(&self, on: bool) -> Vec<u8> {
		let len = DATA_HDR_LEN + 4;
		let mut w = MsgWriter::with_capacity(len);
		let cmd = if on {
			DataMsgId::CarrierOn
		} else {
			DataMsgId::CarrierOff
		};
		DataHead {
			cmd: cmd as u32,
			len: len as u32,
		}
		.write(&mut w);
		w.put_u32(self.wdev_id);
		w.into_vec()
	}
}

/// `PM_MODE`: a peer changed its power-save state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmModeEvent {
	pub wdev_id: u32,
	pub mac_addr: [u8; 6],
	/// 0 = active, 1 = power save.
	pub sta_ps_state: u8,
}

impl PmModeEvent {
	pub fn parse(body: &[u8]) -> Result<Self, Error> {
		let mut r = MsgReader::new(body);
		let _head = DataHead::parse(&mut r)?;
		let wdev_id = r.get_u32()?;
		let mac_addr = r.get_mac()?;
		let sta_ps_state = r.get_u8()?;
		Ok(Self {
			wdev_id,
			mac_addr,
			sta_ps_state,
		})
	}

	pub fn encode(&self) -> Vec<u8> {
		let len = DATA_HDR_LEN + 12;
		let mut w = MsgWriter::with_capacity(len);
		DataHead {
			cmd: DataMsgId::PmMode as u32,
			len: len as u32,
		}
		.write(&mut w);
		w.put_u32(self.wdev_id);
		w.put_bytes(&self.mac_addr);
		w.put_u8(self.sta_ps_state);
		w.put_u8(0);
		w.into_vec()
	}
}

/// `PS_GET_FRAMES`: a sleeping peer polled for buffered frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsGetFramesEvent {
	pub wdev_id: u32,
	pub mac_addr: [u8; 6],
	pub num_frames: u32,
}

impl PsGetFramesEvent {
	pub fn parse(body: &[u8]) -> Result<Self, Error> {
		let mut r = MsgReader::new(body);
		let _head = DataHead::parse(&mut r)?;
		let wdev_id = r.get_u32()?;
		let mac_addr = r.get_mac()?;
		let _pad = r.get_bytes(2)?;
		let num_frames = r.get_u32()?;
		Ok(Self {
			wdev_id,
			mac_addr,
			num_frames,
		})
	}

	pub fn encode(&self) -> Vec<u8> {
		let len = DATA_HDR_LEN + 16;
		let mut w = MsgWriter::with_capacity(len);
		DataHead {
			cmd: DataMsgId::PsGetFrames as u32,
			len: len as u32,
		}
		.write(&mut w);
		w.put_u32(self.wdev_id);
		w.put_bytes(&self.mac_addr);
		w.put_bytes(&[0; 2]);
		w.put_u32(self.num_frames);
		w.into_vec()
	}
}
