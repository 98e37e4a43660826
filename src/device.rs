//! Device context: lifecycle, control commands and statistics.
//!
//! Lock order is `vifs` → `tx_state` → `rx_state`; code that needs
//! interface roles inside the TX path takes a [`VifTypeSnapshot`] first
//! and never touches the VIF lock while holding the TX lock.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use hermit_sync::SpinMutex;

use crate::callbacks::DeviceCallbacks;
use crate::config::{
	AVAIL_AMPDU_LEN_PER_TOKEN, ETH_ALEN, FW_INIT_TIMEOUT_MS, IFFLAGS_TIMEOUT_MS,
	MAX_NUM_OF_RX_QUEUES, MAX_PEERS, MAX_TX_AGGREGATION, NUM_TX_TOKENS, STATS_RECV_TIMEOUT_MS,
};
use crate::error::Error;
use crate::hal::Bus;
use crate::rx::{RxState, RxStats};
use crate::tx::{AC_MAX, TxState, TxStats};
use crate::umac::cmd::{self, UmacCommand};
use crate::vif::{VifCtx, VifState, VifTable, VifType};

/// Geometry of one RX buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxBufPool {
	pub num_bufs: usize,
	pub buf_sz: usize,
}

/// The private const driver table: token counts, aggregation limits and
/// RX pool geometry. Shared by every instance created from it.
#[derive(Debug, Clone)]
pub struct DeviceParams {
	pub num_tx_tokens: usize,
	pub num_tx_tokens_per_ac: usize,
	pub max_tx_aggregation: usize,
	pub avail_ampdu_len_per_token: usize,
	pub rx_buf_pools: [RxBufPool; MAX_NUM_OF_RX_QUEUES],
}

impl Default for DeviceParams {
	fn default() -> Self {
		Self {
			num_tx_tokens: NUM_TX_TOKENS,
			num_tx_tokens_per_ac: NUM_TX_TOKENS / AC_MAX,
			max_tx_aggregation: MAX_TX_AGGREGATION,
			avail_ampdu_len_per_token: AVAIL_AMPDU_LEN_PER_TOKEN,
			rx_buf_pools: [RxBufPool {
				num_bufs: 16,
				buf_sz: 1600,
			}; MAX_NUM_OF_RX_QUEUES],
		}
	}
}

impl DeviceParams {
	/// Total number of RX descriptors across all pools.
	pub fn num_rx_bufs(&self) -> usize {
		self.rx_buf_pools.iter().map(|pool| pool.num_bufs).sum()
	}

	/// First descriptor id of `pool_id` (prefix sum over the pools).
	pub(crate) fn rx_pool_start(&self, pool_id: usize) -> usize {
		self.rx_buf_pools[..pool_id]
			.iter()
			.map(|pool| pool.num_bufs)
			.sum()
	}
}

/// Aggregated host-side data-path counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostStats {
	pub tx: TxStats,
	pub rx: RxStats,
}

/// The root driver object for one RPU.
pub struct Device<B: Bus> {
	pub(crate) bus: B,
	pub(crate) params: DeviceParams,
	pub(crate) callbacks: Box<dyn DeviceCallbacks>,
	pub(crate) vifs: SpinMutex<VifTable>,
	pub(crate) tx_state: SpinMutex<TxState>,
	pub(crate) rx_state: SpinMutex<RxState>,
	pub(crate) fw_init_done: AtomicBool,
	pub(crate) fw_deinit_done: AtomicBool,
	pub(crate) stats_req: AtomicBool,
	/// Landing buffer for the firmware statistics event.
	pub(crate) fw_stats: SpinMutex<Vec<u8>>,
	#[cfg(feature = "rx-wq")]
	pub(crate) rx_event_q: SpinMutex<alloc::collections::VecDeque<crate::umac::event::RxBuffEvent>>,
	#[cfg(feature = "tx-wq")]
	pub(crate) tx_done_event_q:
		SpinMutex<alloc::collections::VecDeque<crate::umac::event::TxBuffDoneEvent>>,
}

impl<B: Bus> Device<B> {
	/// Creates the device context. Nothing is sent to the RPU yet.
	pub fn new(bus: B, params: DeviceParams, callbacks: Box<dyn DeviceCallbacks>) -> Self {
		let tx_state = TxState::new(&params);
		let rx_state = RxState::new(&params);

		Self {
			bus,
			params,
			callbacks,
			vifs: SpinMutex::new(VifTable::new()),
			tx_state: SpinMutex::new(tx_state),
			rx_state: SpinMutex::new(rx_state),
			fw_init_done: AtomicBool::new(false),
			fw_deinit_done: AtomicBool::new(false),
			stats_req: AtomicBool::new(false),
			fw_stats: SpinMutex::new(Vec::new()),
			#[cfg(feature = "rx-wq")]
			rx_event_q: SpinMutex::new(alloc::collections::VecDeque::new()),
			#[cfg(feature = "tx-wq")]
			tx_done_event_q: SpinMutex::new(alloc::collections::VecDeque::new()),
		}
	}

	/// Polls `cond` in 1 ms steps through the bus sleep hook.
	pub(crate) fn wait_for(&self, timeout_ms: u32, cond: impl Fn() -> bool) -> Result<(), Error> {
		for _ in 0..timeout_ms {
			if cond() {
				return Ok(());
			}
			self.bus.sleep_ms(1);
		}

		if cond() { Ok(()) } else { Err(Error::Timeout) }
	}

	/// Brings the firmware up: arms every RX buffer, sends `CMD_INIT`
	/// with the RF parameter blob and waits for `INIT_DONE`.
	pub fn init(&self, rf_params: Option<&[u8]>, phy_calib: u32) -> Result<(), Error> {
		self.rx_init_all()?;

		self.bus
			.ctrl_cmd_send(&cmd::sys_init(&self.params, rf_params, phy_calib))?;

		self.wait_for(FW_INIT_TIMEOUT_MS, || self.fw_init_done.load(Ordering::Acquire))
			.inspect_err(|_| error!("timed out waiting for INIT_DONE"))
	}

	/// Tears the firmware down and releases the RX buffers.
	pub fn deinit(&self) -> Result<(), Error> {
		self.bus.ctrl_cmd_send(&cmd::sys_deinit())?;

		let result = self
			.wait_for(FW_INIT_TIMEOUT_MS, || {
				self.fw_deinit_done.load(Ordering::Acquire)
			})
			.inspect_err(|_| error!("timed out waiting for DEINIT_DONE"));

		self.fw_init_done.store(false, Ordering::Release);
		self.rx_deinit_all();

		result
	}

	/// Sends a UMAC control command. Control traffic is rejected until
	/// the firmware has acknowledged `CMD_INIT`.
	pub fn umac_cmd_cfg(
		&self,
		command: UmacCommand,
		wdev_id: u32,
		payload: &[u8],
	) -> Result<(), Error> {
		if !self.fw_init_done.load(Ordering::Acquire) {
			error!("UMAC command {command:?} before buffer config is done");
			return Err(Error::BadState);
		}

		self.bus.ctrl_cmd_send(&cmd::cfg(command, wdev_id, payload))
	}

	pub fn scan(&self, if_idx: u8, scan_params: &[u8]) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::Scan, u32::from(if_idx), scan_params)
	}

	pub fn abort_scan(&self, if_idx: u8) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::AbortScan, u32::from(if_idx), &[])
	}

	pub fn get_scan_results(&self, if_idx: u8) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::GetScanResults, u32::from(if_idx), &[])
	}

	pub fn auth(&self, if_idx: u8, auth_params: &[u8]) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::Auth, u32::from(if_idx), auth_params)
	}

	pub fn assoc(&self, if_idx: u8, assoc_params: &[u8]) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::Assoc, u32::from(if_idx), assoc_params)
	}

	pub fn deauth(&self, if_idx: u8, deauth_params: &[u8]) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::Deauth, u32::from(if_idx), deauth_params)
	}

	pub fn disassoc(&self, if_idx: u8, disassoc_params: &[u8]) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::Disassoc, u32::from(if_idx), disassoc_params)
	}

	pub fn start_ap(&self, if_idx: u8, ap_params: &[u8]) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::StartAp, u32::from(if_idx), ap_params)
	}

	pub fn stop_ap(&self, if_idx: u8) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::StopAp, u32::from(if_idx), &[])
	}

	pub fn set_power_save(&self, if_idx: u8, enabled: bool) -> Result<(), Error> {
		self.umac_cmd_cfg(
			UmacCommand::SetPowerSave,
			u32::from(if_idx),
			&u32::from(enabled).to_le_bytes(),
		)
	}

	pub fn config_twt(&self, if_idx: u8, twt_params: &[u8]) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::ConfigTwt, u32::from(if_idx), twt_params)
	}

	pub fn teardown_twt(&self, if_idx: u8, twt_params: &[u8]) -> Result<(), Error> {
		self.umac_cmd_cfg(UmacCommand::TeardownTwt, u32::from(if_idx), twt_params)
	}

	/// Requests the firmware statistics blob and waits for the `STATS`
	/// event to land in the pinned buffer.
	pub fn stats_get(&self) -> Result<Vec<u8>, Error> {
		if self
			.stats_req
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return Err(Error::BadState);
		}

		if let Err(err) = self.bus.ctrl_cmd_send(&cmd::sys_stats_get(0)) {
			self.stats_req.store(false, Ordering::Release);
			return Err(err);
		}

		let waited = self.wait_for(STATS_RECV_TIMEOUT_MS, || {
			!self.stats_req.load(Ordering::Acquire)
		});

		if waited.is_err() {
			self.stats_req.store(false, Ordering::Release);
			return Err(Error::Timeout);
		}

		Ok(self.fw_stats.lock().clone())
	}

	/// Host-side data-path counters (no RPU round trip).
	pub fn host_stats(&self) -> HostStats {
		HostStats {
			tx: self.tx_state.lock().stats,
			rx: self.rx_state.lock().stats,
		}
	}

	/// Adds a virtual interface. Index 0 is the firmware default
	/// interface and is not announced; any other index is created with
	/// `CMD_NEW_INTERFACE`.
	pub fn add_vif(&self, if_type: VifType, mac_addr: [u8; ETH_ALEN]) -> Result<u8, Error> {
		let if_idx = self.vifs.lock().add(VifCtx::new(if_type, mac_addr))?;

		if if_idx != 0 {
			if let Err(err) = self.bus.ctrl_cmd_send(&cmd::new_interface(
				u32::from(if_idx),
				if_type.into(),
				&mac_addr,
			)) {
				self.vifs.lock().remove(if_idx)?;
				return Err(err);
			}
		}

		Ok(if_idx)
	}

	/// Removes a virtual interface and all state hanging off it.
	pub fn del_vif(&self, if_idx: u8) -> Result<(), Error> {
		let if_type = self
			.vifs
			.lock()
			.if_type(if_idx)
			.ok_or(Error::DoesNotExist)?;

		{
			let mut tx = self.tx_state.lock();
			tx.drop_pending_for_vif(if_idx);
			tx.peers.flush(&self.bus, if_type, if_idx);
		}

		if if_idx != 0 {
			self.bus
				.ctrl_cmd_send(&cmd::del_interface(u32::from(if_idx)))?;
		}

		self.vifs.lock().remove(if_idx).map(|_| ())
	}

	/// Changes the role of an interface via `CMD_SET_INTERFACE`.
	pub fn chg_vif(&self, if_idx: u8, if_type: VifType) -> Result<(), Error> {
		self.bus
			.ctrl_cmd_send(&cmd::chg_vif(u32::from(if_idx), if_type.into()))?;
		self.vifs.lock().update_if_type(if_idx, if_type)
	}

	/// Brings an interface up or down.
	///
	/// Sends `CMD_SET_IFFLAGS` and blocks (bounded, 10 s) until the
	/// event thread reports `IFFLAGS_STATUS`. On an AP the broadcast
	/// pseudo-peer follows the interface state.
	pub fn chg_vif_state(&self, if_idx: u8, state: VifState) -> Result<(), Error> {
		let if_type = {
			let mut vifs = self.vifs.lock();
			let vif = vifs.get_mut(if_idx).ok_or(Error::DoesNotExist)?;
			vif.ifflags = false;
			vif.if_type
		};

		self.bus.ctrl_cmd_send(&cmd::chg_vif_state(
			u32::from(if_idx),
			state as i32,
		))?;

		self.wait_for(IFFLAGS_TIMEOUT_MS, || {
			self.vifs
				.lock()
				.get(if_idx)
				.is_some_and(|vif| vif.ifflags)
		})
		.inspect_err(|_| {
			error!("RPU did not acknowledge IFFLAGS change within {IFFLAGS_TIMEOUT_MS} ms");
		})?;

		if let Some(vif) = self.vifs.lock().get_mut(if_idx) {
			vif.state = state;
		}

		let mut tx = self.tx_state.lock();
		match state {
			VifState::Up => {
				if if_type == VifType::Ap {
					let bcast = [0xff; ETH_ALEN];
					let _ = tx
						.peers
						.add(&self.bus, if_type, if_idx, &bcast, true, false);
				}
			}
			VifState::Down => {
				// Interface-down drops pending state.
				tx.drop_pending_for_vif(if_idx);
				if if_type == VifType::Ap {
					tx.peers.remove(&self.bus, if_type, MAX_PEERS);
				}
			}
		}

		Ok(())
	}

	/// Changes the MAC address of an interface.
	pub fn set_vif_macaddr(&self, if_idx: u8, mac_addr: [u8; ETH_ALEN]) -> Result<(), Error> {
		self.bus
			.ctrl_cmd_send(&cmd::change_macaddr(u32::from(if_idx), &mac_addr))?;

		let mut vifs = self.vifs.lock();
		let vif = vifs.get_mut(if_idx).ok_or(Error::DoesNotExist)?;
		vif.mac_addr = mac_addr;
		Ok(())
	}

	/// Records the BSSID the interface is associated with.
	pub fn set_vif_bssid(&self, if_idx: u8, bssid: [u8; ETH_ALEN]) -> Result<(), Error> {
		let mut vifs = self.vifs.lock();
		let vif = vifs.get_mut(if_idx).ok_or(Error::DoesNotExist)?;
		vif.bssid = bssid;
		Ok(())
	}

	/// Sets the monitor-mode packet filter of an interface.
	pub fn set_packet_filter(&self, if_idx: u8, filter: u8) -> Result<(), Error> {
		let mut vifs = self.vifs.lock();
		let vif = vifs.get_mut(if_idx).ok_or(Error::DoesNotExist)?;
		vif.packet_filter = filter;
		Ok(())
	}

	/// Registers a peer (station association or AP client).
	pub fn peer_add(
		&self,
		if_idx: u8,
		mac_addr: &[u8; ETH_ALEN],
		is_legacy: bool,
		qos_supported: bool,
	) -> Result<usize, Error> {
		let if_type = self
			.vifs
			.lock()
			.if_type(if_idx)
			.ok_or(Error::DoesNotExist)?;

		self.tx_state
			.lock()
			.peers
			.add(&self.bus, if_type, if_idx, mac_addr, is_legacy, qos_supported)
	}

	/// Removes a peer.
	pub fn peer_remove(&self, if_idx: u8, peer_id: usize) -> Result<(), Error> {
		let if_type = self
			.vifs
			.lock()
			.if_type(if_idx)
			.ok_or(Error::DoesNotExist)?;

		self.tx_state.lock().peers.remove(&self.bus, if_type, peer_id);
		Ok(())
	}

	/// Removes every peer bound to `if_idx`.
	pub fn peers_flush(&self, if_idx: u8) -> Result<(), Error> {
		let if_type = self
			.vifs
			.lock()
			.if_type(if_idx)
			.ok_or(Error::DoesNotExist)?;

		self.tx_state.lock().peers.flush(&self.bus, if_type, if_idx);
		Ok(())
	}
}
