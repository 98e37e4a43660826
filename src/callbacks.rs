//! The surface the driver exposes towards the OS network layer.

use crate::nbuf::NetBuf;

/// Carrier state reported through the data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierState {
	On,
	Off,
}

/// Per-device callback table.
///
/// UMAC control events that the driver does not consume itself are
/// forwarded with their raw payload; the embedder decodes what it cares
/// about. All methods default to doing nothing, so an embedder only
/// implements the hooks it uses. Callbacks run on the event-processing
/// context and must not block.
#[allow(unused_variables)]
pub trait DeviceCallbacks: Send + Sync {
	/// A received data frame, already converted to Ethernet framing.
	fn rx_frame(&self, if_idx: u8, frame: NetBuf) {}

	/// Raw beacon/probe-response delivery (raw scan builds only).
	#[cfg(feature = "raw-scan")]
	fn rx_beacon_probe_resp(&self, if_idx: u8, frame: NetBuf, frequency: u32, signal: i16) {}

	/// A raw frame captured in monitor/promiscuous mode.
	fn sniffer_frame(&self, if_idx: u8, frame: NetBuf) {}

	/// Fires once per RX cluster carrying data packets.
	fn process_rssi_from_rx(&self, if_idx: u8, signal: i16) {}

	fn if_carr_state_chg(&self, if_idx: u8, state: CarrierState) {}

	fn scan_start(&self, if_idx: u8, event: &[u8]) {}
	fn scan_done(&self, if_idx: u8, event: &[u8]) {}
	fn scan_aborted(&self, if_idx: u8, event: &[u8]) {}
	fn scan_result(&self, if_idx: u8, event: &[u8], more_results: bool) {}
	fn display_scan_result(&self, if_idx: u8, event: &[u8], more_results: bool) {}

	fn auth_resp(&self, if_idx: u8, event: &[u8]) {}
	fn assoc_resp(&self, if_idx: u8, event: &[u8]) {}
	fn deauth(&self, if_idx: u8, event: &[u8]) {}
	fn disassoc(&self, if_idx: u8, event: &[u8]) {}
	fn unprot_mlme(&self, if_idx: u8, event: &[u8]) {}

	/// Management frame received (`EVENT_FRAME`).
	fn mgmt_rx(&self, if_idx: u8, event: &[u8]) {}
	fn mgmt_tx_status(&self, if_idx: u8, event: &[u8]) {}

	fn twt_config(&self, if_idx: u8, event: &[u8]) {}
	fn twt_teardown(&self, if_idx: u8, event: &[u8]) {}
	fn twt_sleep(&self, if_idx: u8, sleeping: bool) {}

	fn roc_start(&self, if_idx: u8, event: &[u8]) {}
	fn roc_cancel(&self, if_idx: u8, event: &[u8]) {}

	fn new_station(&self, if_idx: u8, mac_addr: &[u8; 6]) {}
	fn del_station(&self, if_idx: u8, mac_addr: &[u8; 6]) {}

	fn cookie_resp(&self, if_idx: u8, event: &[u8]) {}
	fn cmd_status(&self, if_idx: u8, event: &[u8]) {}

	fn event_get_reg(&self, if_idx: u8, event: &[u8]) {}
	fn event_get_wiphy(&self, if_idx: u8, event: &[u8]) {}
	fn event_get_tx_power(&self, if_idx: u8, event: &[u8]) {}
	fn event_get_channel(&self, if_idx: u8, event: &[u8]) {}
	fn event_get_station(&self, if_idx: u8, event: &[u8]) {}
	fn event_get_ps_info(&self, if_idx: u8, event: &[u8]) {}
	fn event_get_connection_info(&self, if_idx: u8, event: &[u8]) {}
	fn reg_change(&self, if_idx: u8, event: &[u8]) {}
	fn beacon_hint(&self, if_idx: u8, event: &[u8]) {}
	fn connect(&self, if_idx: u8, event: &[u8]) {}
	fn disconnect(&self, if_idx: u8, event: &[u8]) {}
}

/// A callback table that ignores everything.
#[derive(Debug, Default)]
pub struct NullCallbacks;

impl DeviceCallbacks for NullCallbacks {}
