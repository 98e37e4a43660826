//! Peer table: MAC address → peer id, plus per-peer power-save state.
//!
//! The table is owned by the TX state and mutated only under the TX lock,
//! including mutations driven by `NEW_STATION`/`DEL_STATION` events.

use crate::config::{
	ETH_ALEN, MAX_PEERS, MAX_SW_PEERS, PEND_Q_BMP_ENTRY_LEN, RPU_MEM_UMAC_PEND_Q_BMP,
};
use crate::error::Error;
use crate::hal::Bus;
use crate::util::{ether_addr_equal, is_multicast_addr};
use crate::vif::VifType;

/// Client power-save state reported through `PM_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsState {
	#[default]
	Active,
	PowerSave,
}

/// One peer slot. `used == false` means the slot is free.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerEntry {
	pub used: bool,
	pub if_idx: u8,
	pub ra_addr: [u8; ETH_ALEN],
	pub is_legacy: bool,
	pub qos_supported: bool,
	pub ps_state: PsState,
	pub ps_token_count: u32,
	/// Per-AC pending bitmap, mirrored to RPU memory on an AP.
	pub pend_q_bmp: u8,
}

/// The peer arena. Slot `MAX_PEERS` is the broadcast/multicast
/// pseudo-peer of an AP interface.
#[derive(Debug)]
pub struct PeerTable {
	pub(crate) entries: [PeerEntry; MAX_SW_PEERS],
}

/// RPU address of one pending-bitmap mirror entry (MAC, then bitmap byte).
pub(crate) fn pend_q_bmp_addr(peer_id: usize) -> u32 {
	RPU_MEM_UMAC_PEND_Q_BMP + PEND_Q_BMP_ENTRY_LEN * peer_id as u32
}

impl PeerTable {
	pub fn new() -> Self {
		Self {
			entries: [PeerEntry::default(); MAX_SW_PEERS],
		}
	}

	/// Resolves a receiver address to a peer id.
	///
	/// Multicast addresses map to the pseudo-peer unconditionally.
	pub fn get_id(&self, mac_addr: &[u8]) -> Option<usize> {
		if is_multicast_addr(mac_addr) {
			return Some(MAX_PEERS);
		}

		self.entries[..MAX_PEERS]
			.iter()
			.position(|peer| peer.used && ether_addr_equal(mac_addr, &peer.ra_addr))
	}

	/// Adds a peer for `if_idx` and returns its id.
	///
	/// On an AP interface a multicast address claims the reserved
	/// pseudo-peer slot, and real peers get their MAC mirrored into the
	/// RPU pending-bitmap region.
	pub fn add(
		&mut self,
		bus: &dyn Bus,
		if_type: VifType,
		if_idx: u8,
		mac_addr: &[u8; ETH_ALEN],
		is_legacy: bool,
		qos_supported: bool,
	) -> Result<usize, Error> {
		if is_multicast_addr(mac_addr) && if_type == VifType::Ap {
			let bcast = &mut self.entries[MAX_PEERS];
			bcast.used = true;
			bcast.if_idx = if_idx;
			bcast.is_legacy = true;
			return Ok(MAX_PEERS);
		}

		let Some(id) = self.entries[..MAX_PEERS].iter().position(|peer| !peer.used) else {
			error!("peer table full, cannot add {mac_addr:02x?}");
			return Err(Error::InsufficientMemory);
		};

		let peer = &mut self.entries[id];
		*peer = PeerEntry {
			used: true,
			if_idx,
			ra_addr: *mac_addr,
			is_legacy,
			qos_supported,
			..PeerEntry::default()
		};

		if if_type == VifType::Ap {
			bus.rpu_mem_write(pend_q_bmp_addr(id), mac_addr)?;
		}

		Ok(id)
	}

	/// Frees a peer slot; on an AP the RPU mirror entry is zeroed. The
	/// pseudo-peer has no mirror entry.
	pub fn remove(&mut self, bus: &dyn Bus, if_type: VifType, peer_id: usize) {
		let peer = &mut self.entries[peer_id];
		*peer = PeerEntry::default();

		if if_type == VifType::Ap && peer_id < MAX_PEERS {
			let _ = bus.rpu_mem_write(pend_q_bmp_addr(peer_id), &peer.ra_addr);
		}
	}

	/// Interface index owning the peer with this MAC address.
	pub fn vif_index_for(&self, mac_addr: &[u8]) -> Option<u8> {
		self.entries[..MAX_PEERS]
			.iter()
			.find(|peer| peer.used && ether_addr_equal(mac_addr, &peer.ra_addr))
			.map(|peer| peer.if_idx)
	}

	/// Removes every peer owned by `if_idx`, including the pseudo-peer.
	pub fn flush(&mut self, bus: &dyn Bus, if_type: VifType, if_idx: u8) {
		self.entries[MAX_PEERS].used = false;

		for peer_id in 0..MAX_PEERS {
			if self.entries[peer_id].used && self.entries[peer_id].if_idx == if_idx {
				self.remove(bus, if_type, peer_id);
			}
		}
	}
}

impl Default for PeerTable {
	fn default() -> Self {
		Self::new()
	}
}
