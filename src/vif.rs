//! Virtual-interface state.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::callbacks::CarrierState;
use crate::config::{ETH_ALEN, MAX_NUM_APS, MAX_NUM_STAS, MAX_NUM_VIFS};
use crate::error::Error;

/// Interface roles, matching the wire encoding of `CMD_NEW_INTERFACE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum VifType {
	Unspecified = 0,
	Adhoc = 1,
	Station = 2,
	Ap = 3,
	ApVlan = 4,
	Wds = 5,
	Monitor = 6,
	MeshPoint = 7,
	P2pClient = 8,
	P2pGo = 9,
	P2pDevice = 10,
	Ocb = 11,
	/// Station with raw TX injection.
	StationTxInjection = 12,
	/// Monitor with raw TX injection.
	MonitorTxInjection = 13,
	/// Promiscuous RX on top of a station role.
	PromiscuousMode = 14,
	PromiscuousTxInjection = 15,
}

impl VifType {
	/// Roles counted against `MAX_NUM_STAS`.
	pub fn is_sta_like(self) -> bool {
		matches!(
			self,
			VifType::Station
				| VifType::P2pClient
				| VifType::StationTxInjection
				| VifType::PromiscuousMode
				| VifType::PromiscuousTxInjection
		)
	}

	/// Roles counted against `MAX_NUM_APS`.
	pub fn is_ap_like(self) -> bool {
		matches!(self, VifType::Ap | VifType::P2pGo)
	}

	/// Roles that set `more_data` hints towards power-saving clients.
	pub fn buffers_for_clients(self) -> bool {
		matches!(self, VifType::Ap | VifType::ApVlan | VifType::MeshPoint)
	}
}

/// Operational state of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VifState {
	Down = 0,
	Up = 1,
}

/// Per-interface context.
#[derive(Debug, Clone)]
pub struct VifCtx {
	pub if_type: VifType,
	pub mac_addr: [u8; ETH_ALEN],
	pub bssid: [u8; ETH_ALEN],
	pub state: VifState,
	pub carrier: CarrierState,
	/// Set by the event thread when the RPU acknowledges a state change;
	/// polled by `chg_vif_state` as a completion.
	pub ifflags: bool,
	/// Groupwise cipher suite negotiated for this interface.
	pub groupwise_cipher: u32,
	/// Monitor-mode packet filter, see [`crate::util::check_filter_setting`].
	pub packet_filter: u8,
}

impl VifCtx {
	pub fn new(if_type: VifType, mac_addr: [u8; ETH_ALEN]) -> Self {
		Self {
			if_type,
			mac_addr,
			bssid: [0; ETH_ALEN],
			state: VifState::Down,
			carrier: CarrierState::Off,
			ifflags: false,
			groupwise_cipher: 0,
			packet_filter: 0,
		}
	}
}

/// Copy of the per-slot interface roles, safe to consult while the TX
/// lock is held.
pub type VifTypeSnapshot = [Option<VifType>; MAX_NUM_VIFS];

/// The interface table. A slot is `Some` exactly while the interface has
/// been added; removal clears the slot.
#[derive(Debug)]
pub struct VifTable {
	slots: [Option<VifCtx>; MAX_NUM_VIFS],
	num_sta: usize,
	num_ap: usize,
}

impl VifTable {
	pub fn new() -> Self {
		Self {
			slots: [const { None }; MAX_NUM_VIFS],
			num_sta: 0,
			num_ap: 0,
		}
	}

	pub fn get(&self, if_idx: u8) -> Option<&VifCtx> {
		self.slots.get(usize::from(if_idx))?.as_ref()
	}

	pub fn get_mut(&mut self, if_idx: u8) -> Option<&mut VifCtx> {
		self.slots.get_mut(usize::from(if_idx))?.as_mut()
	}

	pub fn if_type(&self, if_idx: u8) -> Option<VifType> {
		self.get(if_idx).map(|vif| vif.if_type)
	}

	/// Role snapshot for code that must not take this table's lock while
	/// holding the TX lock.
	pub fn type_snapshot(&self) -> VifTypeSnapshot {
		let mut snapshot = [None; MAX_NUM_VIFS];
		for (slot, out) in self.slots.iter().zip(snapshot.iter_mut()) {
			*out = slot.as_ref().map(|vif| vif.if_type);
		}
		snapshot
	}

	/// Rejects interface additions that would exceed the per-role caps.
	pub fn check_if_limit(&self, if_type: VifType) -> Result<(), Error> {
		if if_type.is_sta_like() && self.num_sta >= MAX_NUM_STAS {
			error!("maximum STA interface count exceeded");
			return Err(Error::NotSupported);
		}
		if if_type.is_ap_like() && self.num_ap >= MAX_NUM_APS {
			error!("maximum AP interface count exceeded");
			return Err(Error::NotSupported);
		}
		Ok(())
	}

	fn incr_if_type(&mut self, if_type: VifType) {
		if if_type.is_sta_like() {
			self.num_sta += 1;
		} else if if_type.is_ap_like() {
			self.num_ap += 1;
		}
	}

	fn decr_if_type(&mut self, if_type: VifType) {
		if if_type.is_sta_like() {
			self.num_sta -= 1;
		} else if if_type.is_ap_like() {
			self.num_ap -= 1;
		}
	}

	/// Places `vif` into the first free slot and returns its index.
	pub fn add(&mut self, vif: VifCtx) -> Result<u8, Error> {
		self.check_if_limit(vif.if_type)?;

		let Some(idx) = self.slots.iter().position(Option::is_none) else {
			return Err(Error::InsufficientMemory);
		};

		self.incr_if_type(vif.if_type);
		self.slots[idx] = Some(vif);
		Ok(idx as u8)
	}

	pub fn remove(&mut self, if_idx: u8) -> Result<VifCtx, Error> {
		let slot = self
			.slots
			.get_mut(usize::from(if_idx))
			.ok_or(Error::InvalidArgument)?;
		let vif = slot.take().ok_or(Error::DoesNotExist)?;
		self.decr_if_type(vif.if_type);
		Ok(vif)
	}

	/// Changes the role of an existing interface, keeping the per-role
	/// counters consistent.
	pub fn update_if_type(&mut self, if_idx: u8, if_type: VifType) -> Result<(), Error> {
		self.check_if_limit(if_type)?;

		let vif = self.get_mut(if_idx).ok_or(Error::DoesNotExist)?;
		let old = vif.if_type;
		vif.if_type = if_type;

		self.decr_if_type(old);
		self.incr_if_type(if_type);
		Ok(())
	}

	pub fn num_vifs(&self) -> usize {
		self.num_sta + self.num_ap
	}
}

impl Default for VifTable {
	fn default() -> Self {
		Self::new()
	}
}
