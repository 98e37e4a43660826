//! 802.11 ↔ Ethernet frame utilities.
//!
//! Wire structs are read and written field-by-field with the endianness
//! spelled out; nothing here relies on struct layout. The Ethernet side
//! leans on [`smoltcp::wire`], the 802.11 side is hand-decoded.

use bitflags::bitflags;
use smoltcp::wire::EthernetFrame;

use crate::config::{
	AMSDU_HDR_LEN, ETH_ALEN, ETH_HDR_LEN, ETH_P_80221, ETH_P_802_3_MIN, ETH_P_8021AD,
	ETH_P_8021Q, ETH_P_AARP, ETH_P_IP, ETH_P_IPV6, ETH_P_IPX, ETH_P_MPLS_MC, ETH_P_MPLS_UC,
	IEEE80211_HDR_LEN, IPV6_TOS_MASK, IPV6_TOS_SHIFT, MPLS_LS_TC_MASK, MPLS_LS_TC_SHIFT,
	VLAN_PRIO_MASK, VLAN_PRIO_SHIFT,
};
use crate::nbuf::NetBuf;

bitflags! {
	/// 802.11 frame-control bits (little-endian u16 on the wire).
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct FrameControl: u16 {
		const TO_DS = 0x0100;
		const FROM_DS = 0x0200;
		const MORE_DATA = 0x2000;
		const PROTECTED = 0x4000;
	}
}

/// 802.11 frame type extracted from the frame-control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
	Mgmt,
	Ctrl,
	Data,
	Reserved,
}

impl FrameType {
	pub fn from_frame_control(fc: u16) -> Self {
		match (fc >> 2) & 0x3 {
			0 => FrameType::Mgmt,
			1 => FrameType::Ctrl,
			2 => FrameType::Data,
			_ => FrameType::Reserved,
		}
	}
}

/// The modeled 4-address IEEE 802.11 MAC header.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ieee80211Hdr {
	pub fc: u16,
	pub duration: u16,
	pub addr1: [u8; ETH_ALEN],
	pub addr2: [u8; ETH_ALEN],
	pub addr3: [u8; ETH_ALEN],
	pub seq_ctrl: u16,
	pub addr4: [u8; ETH_ALEN],
}

impl Ieee80211Hdr {
	/// Reads the header from the start of `data`.
	pub fn parse(data: &[u8]) -> Option<Self> {
		if data.len() < IEEE80211_HDR_LEN {
			return None;
		}

		let mut hdr = Self {
			fc: u16::from_le_bytes([data[0], data[1]]),
			duration: u16::from_le_bytes([data[2], data[3]]),
			seq_ctrl: u16::from_le_bytes([data[22], data[23]]),
			..Self::default()
		};
		hdr.addr1.copy_from_slice(&data[4..10]);
		hdr.addr2.copy_from_slice(&data[10..16]);
		hdr.addr3.copy_from_slice(&data[16..22]);
		hdr.addr4.copy_from_slice(&data[24..30]);

		Some(hdr)
	}
}

pub fn is_multicast_addr(addr: &[u8]) -> bool {
	addr[0] & 0x01 != 0
}

pub fn is_unicast_addr(addr: &[u8]) -> bool {
	!is_multicast_addr(addr)
}

pub fn ether_addr_equal(addr_1: &[u8], addr_2: &[u8]) -> bool {
	addr_1[..ETH_ALEN] == addr_2[..ETH_ALEN]
}

/// Ethertype of an outgoing Ethernet frame (bytes 12..14, big-endian).
pub fn tx_get_eth_type(frame: &[u8]) -> u16 {
	EthernetFrame::new_unchecked(frame).ethertype().into()
}

/// Ethertype inside an LLC/SNAP area (bytes 6..8, big-endian).
pub fn rx_get_eth_type(llc: &[u8]) -> u16 {
	u16::from_be_bytes([llc[6], llc[7]])
}

/// Number of bytes between the 802.11 header and the payload proper.
///
/// AARP and IPX use the Bridge-Tunnel SNAP header, all other DIX
/// ethertypes the RFC 1042 one; 802.3 length frames carry only the two
/// length bytes.
pub fn get_skip_header_bytes(eth_type: u16) -> usize {
	let mut skip = 2;

	if eth_type == ETH_P_AARP || eth_type == ETH_P_IPX {
		skip += 6;
	} else if eth_type >= ETH_P_802_3_MIN {
		skip += 6;
	}

	skip
}

fn write_eth_header(
	ehdr: &mut [u8],
	dst: &[u8; ETH_ALEN],
	src: &[u8; ETH_ALEN],
	eth_type: u16,
	len: usize,
) {
	ehdr[..ETH_ALEN].copy_from_slice(dst);
	ehdr[ETH_ALEN..2 * ETH_ALEN].copy_from_slice(src);

	if eth_type >= ETH_P_802_3_MIN {
		ehdr[12..14].copy_from_slice(&eth_type.to_be_bytes());
	} else {
		// 802.3 length frames carry the accumulated length host-order.
		ehdr[12..14].copy_from_slice(&(len as u16).to_le_bytes());
	}
}

/// Replaces an already stripped 802.11 header with an Ethernet one.
///
/// Source and destination are picked from the four addresses according to
/// the ToDS/FromDS bits.
pub fn convert_to_eth(nwb: &mut NetBuf, hdr: &Ieee80211Hdr, eth_type: u16) {
	let len = nwb.len();
	let fc = FrameControl::from_bits_truncate(hdr.fc);

	let (src, dst) = match (
		fc.contains(FrameControl::TO_DS),
		fc.contains(FrameControl::FROM_DS),
	) {
		(true, true) => (hdr.addr4, hdr.addr1),
		(false, true) => (hdr.addr3, hdr.addr1),
		(true, false) => (hdr.addr2, hdr.addr3),
		(false, false) => (hdr.addr2, hdr.addr1),
	};

	let ehdr = nwb.push(ETH_HDR_LEN);
	write_eth_header(ehdr, &dst, &src, eth_type, len);
}

/// Converts an AMSDU sub-frame ({dst, src, length, LLC/SNAP, payload}) in
/// place into an Ethernet frame.
pub fn convert_amsdu_to_eth(nwb: &mut NetBuf) {
	let data = nwb.data();
	let mut dst = [0u8; ETH_ALEN];
	let mut src = [0u8; ETH_ALEN];
	dst.copy_from_slice(&data[..ETH_ALEN]);
	src.copy_from_slice(&data[ETH_ALEN..2 * ETH_ALEN]);

	let eth_type = rx_get_eth_type(&data[AMSDU_HDR_LEN..]);

	nwb.pull(AMSDU_HDR_LEN + get_skip_header_bytes(eth_type));
	let len = nwb.len();

	let ehdr = nwb.push(ETH_HDR_LEN);
	write_eth_header(ehdr, &dst, &src, eth_type, len);
}

/// Derives the 802.1D user priority (TID) of an outgoing Ethernet frame
/// from its L2/L3 headers.
pub fn get_tid(frame: &[u8]) -> u8 {
	let ether_type = tx_get_eth_type(frame);
	let l3 = &frame[ETH_HDR_LEN..];

	match ether_type {
		ETH_P_8021Q | ETH_P_8021AD => {
			let vlan_tci = u16::from_be_bytes([l3[4], l3[5]]);
			((vlan_tci & VLAN_PRIO_MASK) >> VLAN_PRIO_SHIFT) as u8
		}
		ETH_P_MPLS_UC | ETH_P_MPLS_MC => {
			let mpls_hdr = u32::from_be_bytes([l3[0], l3[1], l3[2], l3[3]]);
			((mpls_hdr & MPLS_LS_TC_MASK) >> MPLS_LS_TC_SHIFT) as u8
		}
		ETH_P_IP => {
			let tos = l3[1];
			let dscp = tos & 0xfc;
			dscp >> 5
		}
		ETH_P_IPV6 => {
			let ipv6_hdr = u16::from_be_bytes([l3[0], l3[1]]);
			let dscp = (((ipv6_hdr & IPV6_TOS_MASK) >> IPV6_TOS_SHIFT) & 0xfc) as u8;
			dscp >> 5
		}
		// 802.21 is always network control traffic.
		ETH_P_80221 => 0x07,
		_ => 0,
	}
}

/// Destination address of an Ethernet frame held in `nwb`.
pub fn get_dest(nwb: &NetBuf) -> &[u8] {
	&nwb.data()[..ETH_ALEN]
}

/// Source address of an Ethernet frame held in `nwb`.
pub fn get_src(nwb: &NetBuf) -> &[u8] {
	&nwb.data()[ETH_ALEN..2 * ETH_ALEN]
}

/// Checks a frame-control word against a monitor-mode packet filter.
///
/// Bit 0 of the filter admits everything; bits 1..3 admit management,
/// data and control frames respectively.
pub fn check_filter_setting(packet_filter: u8, fc: u16) -> bool {
	if packet_filter & 0x1 != 0 || packet_filter == 0 {
		return true;
	}

	match FrameType::from_frame_control(fc) {
		FrameType::Mgmt => packet_filter & 0x2 != 0,
		FrameType::Data => packet_filter & 0x4 != 0,
		FrameType::Ctrl => packet_filter & 0x8 != 0,
		FrameType::Reserved => false,
	}
}
