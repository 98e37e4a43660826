//! Construction and sizing of host → RPU commands.

use alloc::vec::Vec;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::{DATA_HDR_LEN, DataHead, DataMsgId, MessageType, MsgWriter, SysHead, UMAC_HDR_LEN, UmacHdr};
use crate::config::{BCN_TIMEOUT_MS, HW_DELAY_US, RF_PARAMS_SIZE, SW_DELAY_US};
use crate::device::DeviceParams;

/// System (bring-up) channel commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum SystemCommand {
	Init = 1,
	Deinit = 2,
	StatsGet = 3,
}

/// UMAC control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum UmacCommand {
	Scan = 0,
	AbortScan = 1,
	GetScanResults = 2,
	Auth = 3,
	Assoc = 4,
	Deauth = 5,
	Disassoc = 6,
	NewKey = 7,
	DelKey = 8,
	SetKey = 9,
	SetStation = 10,
	NewStation = 11,
	DelStation = 12,
	StartAp = 13,
	StopAp = 14,
	SetBss = 15,
	SetBeacon = 16,
	SetWiphy = 17,
	SetInterface = 18,
	NewInterface = 19,
	DelInterface = 20,
	SetIfflags = 21,
	RegisterFrame = 22,
	Frame = 23,
	SetPowerSave = 24,
	ConfigTwt = 25,
	TeardownTwt = 26,
	GetReg = 27,
	GetWiphy = 28,
	GetStation = 29,
	GetInterface = 30,
	GetTxPower = 31,
	GetChannel = 32,
	GetPowerSaveInfo = 33,
	RemainOnChannel = 34,
	CancelRemainOnChannel = 35,
	McastFilter = 36,
	SetQosMap = 37,
	ChangeMacaddr = 38,
	ConfigUapsd = 39,
	SetPowerSaveTimeout = 40,
	SetListenInterval = 41,
	ConfigExtendedPs = 42,
	PsExitStrategy = 43,
	Btcoex = 44,
	HeGiLtfConfig = 45,
	TxFixDataRate = 46,
	RawConfigMode = 47,
	RawConfigFilter = 48,
	Channel = 49,
}

/// Wraps `payload` into a UMAC control command envelope.
pub fn cfg(cmd: UmacCommand, wdev_id: u32, payload: &[u8]) -> Vec<u8> {
	let mut w = MsgWriter::with_capacity(UMAC_HDR_LEN + payload.len());
	let mut hdr = UmacHdr::new(cmd.into(), wdev_id);
	hdr.len = (UMAC_HDR_LEN + payload.len()) as u32;
	hdr.write(&mut w);
	w.put_bytes(payload);
	w.into_envelope(MessageType::Umac)
}

/// `CMD_SET_IFFLAGS`: request an interface state change; completion is
/// signalled by `IFFLAGS_STATUS`.
pub fn chg_vif_state(wdev_id: u32, state: i32) -> Vec<u8> {
	let mut w = MsgWriter::new();
	w.put_i32(state);
	w.put_u8(wdev_id as u8);
	w.pad_to(8);
	cfg(UmacCommand::SetIfflags, wdev_id, w.into_vec().as_slice())
}

/// `CMD_NEW_INTERFACE`: create a non-default virtual interface.
pub fn new_interface(wdev_id: u32, if_type: u32, mac_addr: &[u8; 6]) -> Vec<u8> {
	let mut w = MsgWriter::new();
	w.put_u32(if_type);
	w.put_bytes(mac_addr);
	w.pad_to(12);
	cfg(UmacCommand::NewInterface, wdev_id, w.into_vec().as_slice())
}

/// `CMD_DEL_INTERFACE`.
pub fn del_interface(wdev_id: u32) -> Vec<u8> {
	cfg(UmacCommand::DelInterface, wdev_id, &[])
}

/// `CMD_SET_INTERFACE`: change the type of an existing interface.
pub fn chg_vif(wdev_id: u32, if_type: u32) -> Vec<u8> {
	let mut w = MsgWriter::new();
	w.put_u32(if_type);
	cfg(UmacCommand::SetInterface, wdev_id, w.into_vec().as_slice())
}

/// `CMD_CHANGE_MACADDR`.
pub fn change_macaddr(wdev_id: u32, mac_addr: &[u8; 6]) -> Vec<u8> {
	let mut w = MsgWriter::new();
	w.put_bytes(mac_addr);
	w.pad_to(8);
	cfg(UmacCommand::ChangeMacaddr, wdev_id, w.into_vec().as_slice())
}

/// `CMD_INIT` on the system channel: firmware bring-up parameters, RX
/// buffer pool geometry and the data-path configuration.
pub fn sys_init(params: &DeviceParams, rf_params: Option<&[u8]>, phy_calib: u32) -> Vec<u8> {
	let mut w = MsgWriter::new();

	let mut rf_blob = [0u8; RF_PARAMS_SIZE];
	let rf_params_valid = match rf_params {
		Some(blob) => {
			rf_blob[..blob.len().min(RF_PARAMS_SIZE)]
				.copy_from_slice(&blob[..blob.len().min(RF_PARAMS_SIZE)]);
			true
		}
		None => false,
	};

	let body_len = 8 + 4 + RF_PARAMS_SIZE + 16 + params.rx_buf_pools.len() * 8 + 20;

	SysHead {
		cmd_event: SystemCommand::Init.into(),
		len: body_len as u32,
	}
	.write(&mut w);

	w.put_u8(u8::from(rf_params_valid));
	w.pad_to(12);
	w.put_bytes(&rf_blob);

	w.put_u32(phy_calib);
	w.put_u32(HW_DELAY_US);
	w.put_u32(SW_DELAY_US);
	w.put_u32(BCN_TIMEOUT_MS);

	for pool in &params.rx_buf_pools {
		w.put_u32(pool.num_bufs as u32);
		w.put_u32(pool.buf_sz as u32);
	}

	w.put_u32(params.max_tx_aggregation as u32);
	w.put_u32(params.avail_ampdu_len_per_token as u32);
	w.put_u32(params.num_tx_tokens as u32);
	w.put_u32(params.num_tx_tokens_per_ac as u32);
	w.put_u32(0);

	w.into_envelope(MessageType::System)
}

/// `CMD_DEINIT` on the system channel.
pub fn sys_deinit() -> Vec<u8> {
	let mut w = MsgWriter::new();
	SysHead {
		cmd_event: SystemCommand::Deinit.into(),
		len: 8,
	}
	.write(&mut w);
	w.into_envelope(MessageType::System)
}

/// Statistics request on the system channel.
pub fn sys_stats_get(stats_type: u32) -> Vec<u8> {
	let mut w = MsgWriter::new();
	SysHead {
		cmd_event: SystemCommand::StatsGet.into(),
		len: 12,
	}
	.write(&mut w);
	w.put_u32(stats_type);
	w.into_envelope(MessageType::System)
}

/// MAC header descriptor carried in a `CMD_TX_BUFF`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxMacHdrInfo {
	pub dest: [u8; 6],
	pub src: [u8; 6],
	pub etype: u16,
	pub dscp_or_tos: u16,
	pub more_data: bool,
	pub eosp: bool,
}

/// One bus-mapped frame inside a `CMD_TX_BUFF`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxBuffInfo {
	pub ddr_ptr: u64,
	pub pkt_length: u32,
}

/// `CMD_TX_BUFF`: one descriptor worth of coalesced frames.
#[derive(Debug, Clone, Default)]
pub struct TxBuffCmd {
	pub wdev_id: u32,
	pub tx_desc_num: u32,
	pub mac_hdr: TxMacHdrInfo,
	pub frames: Vec<TxBuffInfo>,
}

impl TxBuffCmd {
	/// Sub-event length: data head, ids, MAC header descriptor and the
	/// per-frame table.
	pub fn wire_len(num_frames: usize) -> usize {
		DATA_HDR_LEN + 8 + 20 + 4 + num_frames * 12
	}

	pub fn encode(&self) -> Vec<u8> {
		let len = Self::wire_len(self.frames.len());
		let mut w = MsgWriter::with_capacity(len);

		DataHead {
			cmd: DataMsgId::TxBuff as u32,
			len: len as u32,
		}
		.write(&mut w);

		w.put_u32(self.wdev_id);
		w.put_u32(self.tx_desc_num);

		w.put_bytes(&self.mac_hdr.dest);
		w.put_bytes(&self.mac_hdr.src);
		w.put_u16(self.mac_hdr.etype);
		w.put_u16(self.mac_hdr.dscp_or_tos);
		w.put_u8(u8::from(self.mac_hdr.more_data));
		w.put_u8(u8::from(self.mac_hdr.eosp));
		w.put_u16(0);

		w.put_u32(self.frames.len() as u32);
		for frame in &self.frames {
			w.put_u64(frame.ddr_ptr);
			w.put_u32(frame.pkt_length);
		}

		w.into_envelope(MessageType::Data)
	}
}

/// RX buffer arm command: the bus address of a freshly mapped buffer.
/// Sent bare on the data channel (descriptor and pool travel out of
/// band).
pub fn rx_buf_arm(addr: u32) -> Vec<u8> {
	let mut w = MsgWriter::with_capacity(4);
	w.put_u32(addr);
	w.into_vec()
}
