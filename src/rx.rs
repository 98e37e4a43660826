//! RX data path: buffer pools, descriptor arming and frame delivery.

use alloc::vec::Vec;

use crate::config::{MAX_NUM_VIFS, RX_BUF_HEADROOM};
use crate::device::{Device, DeviceParams};
use crate::error::Error;
use crate::hal::{Bus, DataCmdKind};
use crate::nbuf::NetBuf;
use crate::umac::cmd::rx_buf_arm;
use crate::umac::event::{RxBuffEvent, RxDataPktType, RxPktType};
use crate::util::{
	Ieee80211Hdr, check_filter_setting, convert_amsdu_to_eth, convert_to_eth,
	get_skip_header_bytes, rx_get_eth_type,
};
use crate::vif::VifType;

/// RX arm/teardown selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxCmdType {
	Init,
	Deinit,
}

/// Data-path RX counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RxStats {
	pub total_rx_pkts: u64,
	pub rx_dropped: u64,
}

/// One RX descriptor slot. `mapped` is true exactly while the buffer is
/// bus-mapped and owned by the RPU.
#[derive(Debug, Default)]
struct RxSlot {
	nwb: Option<NetBuf>,
	mapped: bool,
}

pub(crate) struct RxState {
	slots: Vec<RxSlot>,
	pub(crate) stats: RxStats,
}

impl RxState {
	pub(crate) fn new(params: &DeviceParams) -> Self {
		Self {
			slots: (0..params.num_rx_bufs()).map(|_| RxSlot::default()).collect(),
			stats: RxStats::default(),
		}
	}

	pub(crate) fn is_mapped(&self, desc_id: usize) -> bool {
		self.slots[desc_id].mapped
	}
}

impl<B: Bus> Device<B> {
	/// Locates the pool whose descriptor range contains `desc_id`.
	fn map_desc_to_pool(&self, desc_id: usize) -> Result<(usize, usize), Error> {
		for pool_id in 0..self.params.rx_buf_pools.len() {
			let start = self.params.rx_pool_start(pool_id);
			let num = self.params.rx_buf_pools[pool_id].num_bufs;
			if desc_id >= start && desc_id < start + num {
				return Ok((pool_id, desc_id - start));
			}
		}
		Err(Error::InvalidArgument)
	}

	/// Arms or tears down one RX descriptor.
	///
	/// `Init` allocates a fresh buffer, stamps the descriptor id into its
	/// headroom, maps it and hands the bus address to the RPU. `Deinit`
	/// unmaps and frees.
	pub(crate) fn rx_cmd_send(
		&self,
		rx: &mut RxState,
		cmd_type: RxCmdType,
		desc_id: usize,
	) -> Result<(), Error> {
		let (pool_id, buf_id) = self.map_desc_to_pool(desc_id)?;
		let buf_len = self.params.rx_buf_pools[pool_id].buf_sz + RX_BUF_HEADROOM;

		match cmd_type {
			RxCmdType::Init => {
				if rx.slots[desc_id].mapped {
					error!("RX init for already mapped buffer {desc_id}");
					return Err(Error::BadState);
				}

				let mut nwb = NetBuf::new(buf_len);
				nwb.raw_mut()[..4].copy_from_slice(&(desc_id as u32).to_le_bytes());

				let phy_addr = self.bus.map_rx_buf(nwb.raw(), pool_id, buf_id)?;

				rx.slots[desc_id].nwb = Some(nwb);
				rx.slots[desc_id].mapped = true;

				self.bus.data_cmd_send(
					DataCmdKind::Rx,
					&rx_buf_arm(phy_addr.0 as u32),
					desc_id,
					pool_id,
				)
			}
			RxCmdType::Deinit => {
				if !rx.slots[desc_id].mapped {
					error!("RX deinit for unmapped buffer {desc_id}");
					return Err(Error::BadState);
				}

				self.bus.unmap_rx_buf(0, pool_id, buf_id)?;
				rx.slots[desc_id].nwb = None;
				rx.slots[desc_id].mapped = false;
				Ok(())
			}
		}
	}

	/// Arms every RX descriptor during device bring-up.
	pub(crate) fn rx_init_all(&self) -> Result<(), Error> {
		let mut rx = self.rx_state.lock();
		for desc_id in 0..self.params.num_rx_bufs() {
			self.rx_cmd_send(&mut rx, RxCmdType::Init, desc_id)?;
		}
		Ok(())
	}

	/// Releases every still-mapped RX descriptor during teardown.
	pub(crate) fn rx_deinit_all(&self) {
		let mut rx = self.rx_state.lock();
		for desc_id in 0..self.params.num_rx_bufs() {
			if rx.slots[desc_id].mapped {
				let _ = self.rx_cmd_send(&mut rx, RxCmdType::Deinit, desc_id);
			}
		}
	}

	/// Handles one `RX_BUFF` event.
	///
	/// Per-packet failures drop that packet and keep going; every
	/// consumed descriptor is re-armed before returning.
	pub(crate) fn rx_event_process(&self, event: &RxBuffEvent) -> Result<(), Error> {
		let wdev_id = event.wdev_id as usize;
		if wdev_id >= MAX_NUM_VIFS {
			error!("RX event for invalid wdev {wdev_id}");
			return Err(Error::InvalidArgument);
		}

		let (if_type, packet_filter) = {
			let vifs = self.vifs.lock();
			let Some(vif) = vifs.get(wdev_id as u8) else {
				error!("RX event for missing interface {wdev_id}");
				return Err(Error::DoesNotExist);
			};
			(vif.if_type, vif.packet_filter)
		};

		if event.rx_pkt_type == RxPktType::Data {
			self.callbacks
				.process_rssi_from_rx(wdev_id as u8, event.signal);
		}

		let mut rx = self.rx_state.lock();

		for pkt in &event.pkts {
			let desc_id = usize::from(pkt.descriptor_id);
			let pkt_len = usize::from(pkt.pkt_len);

			if desc_id >= self.params.num_rx_bufs() {
				error!("RX event with invalid descriptor {desc_id}");
				rx.stats.rx_dropped += 1;
				continue;
			}

			let (pool_id, buf_id) = self.map_desc_to_pool(desc_id)?;
			self.bus.unmap_rx_buf(pkt_len, pool_id, buf_id)?;

			let Some(mut nwb) = rx.slots[desc_id].nwb.take() else {
				error!("RX event for descriptor {desc_id} without a buffer");
				rx.stats.rx_dropped += 1;
				continue;
			};
			rx.slots[desc_id].mapped = false;

			// The RPU wrote the frame after the headroom that carries the
			// descriptor id.
			nwb.put(pkt_len + RX_BUF_HEADROOM);
			nwb.pull(RX_BUF_HEADROOM);

			match event.rx_pkt_type {
				RxPktType::Data => {
					if self.rx_deliver_data(wdev_id as u8, if_type, event, pkt.pkt_type, nwb) {
						rx.stats.total_rx_pkts += 1;
					} else {
						rx.stats.rx_dropped += 1;
					}
				}
				RxPktType::BcnPrbRsp => {
					#[cfg(feature = "raw-scan")]
					self.callbacks.rx_beacon_probe_resp(
						wdev_id as u8,
						nwb,
						event.frequency,
						event.signal,
					);
					#[cfg(not(feature = "raw-scan"))]
					drop(nwb);
				}
				RxPktType::Raw => {
					let fc = {
						let data = nwb.data();
						if data.len() >= 2 {
							u16::from_le_bytes([data[0], data[1]])
						} else {
							0
						}
					};

					if check_filter_setting(packet_filter, fc) {
						self.callbacks.sniffer_frame(wdev_id as u8, nwb);
					} else {
						drop(nwb);
					}
				}
			}

			self.rx_cmd_send(&mut rx, RxCmdType::Init, desc_id)?;
		}

		Ok(())
	}

	/// Converts one data packet to Ethernet framing and delivers it.
	/// Returns `false` if the packet had to be dropped.
	fn rx_deliver_data(
		&self,
		if_idx: u8,
		if_type: VifType,
		event: &RxBuffEvent,
		pkt_type: u8,
		mut nwb: NetBuf,
	) -> bool {
		if !if_type.is_sta_like() {
			return false;
		}

		let mac_header_len = event.mac_header_len as usize;

		match RxDataPktType::try_from(pkt_type) {
			Ok(RxDataPktType::Mpdu) => {
				let Some(hdr) = Ieee80211Hdr::parse(nwb.data()) else {
					warn!("runt MPDU on interface {if_idx}");
					return false;
				};

				if nwb.data().len() < mac_header_len + 8 {
					warn!("MPDU shorter than its MAC header");
					return false;
				}

				let eth_type = rx_get_eth_type(&nwb.data()[mac_header_len..]);
				nwb.pull(mac_header_len + get_skip_header_bytes(eth_type));
				convert_to_eth(&mut nwb, &hdr, eth_type);
			}
			Ok(RxDataPktType::MsduWithMac) => {
				nwb.pull(mac_header_len);
				convert_amsdu_to_eth(&mut nwb);
			}
			Ok(RxDataPktType::Msdu) => {
				convert_amsdu_to_eth(&mut nwb);
			}
			Err(_) => {
				error!("invalid RX packet type {pkt_type}");
				return false;
			}
		}

		self.callbacks.rx_frame(if_idx, nwb);
		true
	}

	/// Drains one queued RX event when the RX work queue is enabled.
	/// Returns `true` while more events are waiting.
	#[cfg(feature = "rx-wq")]
	pub fn rx_tasklet(&self) -> bool {
		let event = self.rx_event_q.lock().pop_front();

		if let Some(event) = event {
			if let Err(err) = self.rx_event_process(&event) {
				error!("deferred RX event processing failed: {err}");
			}
		}

		!self.rx_event_q.lock().is_empty()
	}
}
