//! Shared mocks for the unit tests: a recording bus and a recording
//! callback table.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hermit_sync::SpinMutex;

use crate::callbacks::{CarrierState, DeviceCallbacks};
use crate::error::Error;
use crate::hal::{Bus, DataCmdKind, DmaAddr};
use crate::nbuf::NetBuf;

/// A bus that records everything and hands out fake DMA addresses.
pub struct MockBus {
	pub ctrl_cmds: SpinMutex<Vec<Vec<u8>>>,
	pub data_cmds: SpinMutex<Vec<(DataCmdKind, Vec<u8>, usize, usize)>>,
	pub mem_writes: SpinMutex<Vec<(u32, Vec<u8>)>>,
	pub tx_maps: SpinMutex<Vec<(usize, usize, usize, usize)>>,
	pub tx_unmaps: SpinMutex<Vec<usize>>,
	pub rx_maps: SpinMutex<Vec<(usize, usize)>>,
	pub rx_unmaps: SpinMutex<Vec<(usize, usize, usize)>>,
	next_addr: AtomicU64,
	/// When set, control sends fail with this error.
	pub fail_ctrl: SpinMutex<Option<Error>>,
	/// When `true`, `sleep_ms` really sleeps instead of spinning.
	pub real_sleep: bool,
}

impl MockBus {
	pub fn new() -> Self {
		Self {
			ctrl_cmds: SpinMutex::new(Vec::new()),
			data_cmds: SpinMutex::new(Vec::new()),
			mem_writes: SpinMutex::new(Vec::new()),
			tx_maps: SpinMutex::new(Vec::new()),
			tx_unmaps: SpinMutex::new(Vec::new()),
			rx_maps: SpinMutex::new(Vec::new()),
			rx_unmaps: SpinMutex::new(Vec::new()),
			next_addr: AtomicU64::new(0x1000),
			fail_ctrl: SpinMutex::new(None),
			real_sleep: false,
		}
	}

	pub fn with_real_sleep() -> Self {
		let mut bus = Self::new();
		bus.real_sleep = true;
		bus
	}

	fn fresh_addr(&self, len: usize) -> DmaAddr {
		DmaAddr(self.next_addr.fetch_add(len.max(1) as u64, Ordering::Relaxed))
	}
}

impl Bus for MockBus {
	fn ctrl_cmd_send(&self, msg: &[u8]) -> Result<(), Error> {
		if let Some(err) = *self.fail_ctrl.lock() {
			return Err(err);
		}
		self.ctrl_cmds.lock().push(msg.to_vec());
		Ok(())
	}

	fn data_cmd_send(
		&self,
		kind: DataCmdKind,
		msg: &[u8],
		desc_id: usize,
		pool_id: usize,
	) -> Result<(), Error> {
		self.data_cmds
			.lock()
			.push((kind, msg.to_vec(), desc_id, pool_id));
		Ok(())
	}

	fn map_tx_buf(
		&self,
		data: &[u8],
		desc_id: usize,
		token: usize,
		frame_idx: usize,
	) -> Result<DmaAddr, Error> {
		self.tx_maps
			.lock()
			.push((data.len(), desc_id, token, frame_idx));
		Ok(self.fresh_addr(data.len()))
	}

	fn unmap_tx_buf(&self, desc_id: usize) -> Result<(), Error> {
		self.tx_unmaps.lock().push(desc_id);
		Ok(())
	}

	fn map_rx_buf(&self, data: &[u8], pool_id: usize, buf_id: usize) -> Result<DmaAddr, Error> {
		self.rx_maps.lock().push((pool_id, buf_id));
		let _ = data;
		Ok(self.fresh_addr(1))
	}

	fn unmap_rx_buf(&self, data_len: usize, pool_id: usize, buf_id: usize) -> Result<(), Error> {
		self.rx_unmaps.lock().push((data_len, pool_id, buf_id));
		Ok(())
	}

	fn rpu_mem_write(&self, addr: u32, data: &[u8]) -> Result<(), Error> {
		self.mem_writes.lock().push((addr, data.to_vec()));
		Ok(())
	}

	fn sleep_ms(&self, ms: u32) {
		if self.real_sleep {
			std::thread::sleep(Duration::from_millis(u64::from(ms)));
		}
	}
}

/// Records everything delivered to the OS side.
#[derive(Default)]
pub struct RecordingCallbacks {
	pub rx_frames: SpinMutex<Vec<(u8, Vec<u8>)>>,
	pub sniffed: SpinMutex<Vec<(u8, Vec<u8>)>>,
	pub rssi: SpinMutex<Vec<(u8, i16)>>,
	pub carrier: SpinMutex<Vec<(u8, CarrierState)>>,
	pub scan_display: SpinMutex<Vec<(u8, bool)>>,
	pub stations: SpinMutex<Vec<(u8, [u8; 6], bool)>>,
	pub twt_sleep: SpinMutex<Vec<bool>>,
	#[cfg(feature = "raw-scan")]
	pub beacons: SpinMutex<Vec<(u8, u32, i16)>>,
}

impl RecordingCallbacks {
	pub fn new() -> Self {
		Self::default()
	}
}

impl DeviceCallbacks for RecordingCallbacks {
	fn rx_frame(&self, if_idx: u8, frame: NetBuf) {
		self.rx_frames.lock().push((if_idx, frame.data().to_vec()));
	}

	#[cfg(feature = "raw-scan")]
	fn rx_beacon_probe_resp(&self, if_idx: u8, _frame: NetBuf, frequency: u32, signal: i16) {
		self.beacons.lock().push((if_idx, frequency, signal));
	}

	fn sniffer_frame(&self, if_idx: u8, frame: NetBuf) {
		self.sniffed.lock().push((if_idx, frame.data().to_vec()));
	}

	fn process_rssi_from_rx(&self, if_idx: u8, signal: i16) {
		self.rssi.lock().push((if_idx, signal));
	}

	fn if_carr_state_chg(&self, if_idx: u8, state: CarrierState) {
		self.carrier.lock().push((if_idx, state));
	}

	fn display_scan_result(&self, if_idx: u8, _event: &[u8], more_results: bool) {
		self.scan_display.lock().push((if_idx, more_results));
	}

	fn new_station(&self, if_idx: u8, mac_addr: &[u8; 6]) {
		self.stations.lock().push((if_idx, *mac_addr, true));
	}

	fn del_station(&self, if_idx: u8, mac_addr: &[u8; 6]) {
		self.stations.lock().push((if_idx, *mac_addr, false));
	}

	fn twt_sleep(&self, _if_idx: u8, sleeping: bool) {
		self.twt_sleep.lock().push(sleeping);
	}
}

/// Lets a test keep a handle on the callbacks it hands to the device.
impl DeviceCallbacks for Arc<RecordingCallbacks> {
	fn rx_frame(&self, if_idx: u8, frame: NetBuf) {
		(**self).rx_frame(if_idx, frame);
	}

	#[cfg(feature = "raw-scan")]
	fn rx_beacon_probe_resp(&self, if_idx: u8, frame: NetBuf, frequency: u32, signal: i16) {
		(**self).rx_beacon_probe_resp(if_idx, frame, frequency, signal);
	}

	fn sniffer_frame(&self, if_idx: u8, frame: NetBuf) {
		(**self).sniffer_frame(if_idx, frame);
	}

	fn process_rssi_from_rx(&self, if_idx: u8, signal: i16) {
		(**self).process_rssi_from_rx(if_idx, signal);
	}

	fn if_carr_state_chg(&self, if_idx: u8, state: CarrierState) {
		(**self).if_carr_state_chg(if_idx, state);
	}

	fn display_scan_result(&self, if_idx: u8, event: &[u8], more_results: bool) {
		(**self).display_scan_result(if_idx, event, more_results);
	}

	fn new_station(&self, if_idx: u8, mac_addr: &[u8; 6]) {
		(**self).new_station(if_idx, mac_addr);
	}

	fn del_station(&self, if_idx: u8, mac_addr: &[u8; 6]) {
		(**self).del_station(if_idx, mac_addr);
	}

	fn twt_sleep(&self, if_idx: u8, sleeping: bool) {
		(**self).twt_sleep(if_idx, sleeping);
	}
}
