//! Event dispatcher: routes RPU messages to the data path, the driver
//! state machine and the user callbacks.
//!
//! Events inside one envelope are processed in order; envelopes are
//! processed in delivery order. Unknown events are logged, never fatal.

use core::sync::atomic::Ordering;

use crate::config::MAX_NUM_VIFS;
use crate::callbacks::CarrierState;
use crate::device::Device;
use crate::error::Error;
use crate::hal::Bus;
use crate::tx::TwtState;
use crate::umac::event::{
	CarrierEvent, CtrlEvent, PmModeEvent, PsGetFramesEvent, RxBuffEvent, SystemEvent,
	TwtSleepType, TxBuffDoneEvent, parse_ctrl_event,
};
use crate::umac::{DATA_HDR_LEN, DataHead, DataMsgId, MessageType, MsgReader, SysHead, envelope_parse};
use crate::vif::VifType;

impl<B: Bus> Device<B> {
	/// Entry point for every message the bus HAL delivers.
	pub fn process_event(&self, msg: &[u8]) -> Result<(), Error> {
		let (msg_type, body) = envelope_parse(msg)?;

		match msg_type {
			MessageType::Data => self.data_events_process(body),
			MessageType::Umac => self.umac_event_ctrl_process(body),
			MessageType::System => self.sys_event_process(body),
		}
	}

	/// Walks the sub-events of a data envelope, advancing by each
	/// sub-event's length field.
	fn data_events_process(&self, body: &[u8]) -> Result<(), Error> {
		let mut offset = 0;
		let mut status = Ok(());

		while body.len() - offset >= DATA_HDR_LEN {
			let head = DataHead::parse(&mut MsgReader::new(&body[offset..]))?;
			let len = head.len as usize;
			if len < DATA_HDR_LEN || offset + len > body.len() {
				return Err(Error::InvalidArgument);
			}

			let sub = &body[offset..offset + len];
			if let Err(err) = self.data_event_process(head.cmd, sub) {
				error!("data event {} failed: {err}", head.cmd);
				status = Err(err);
			}

			offset += len;
		}

		status
	}

	fn data_event_process(&self, cmd: u32, sub: &[u8]) -> Result<(), Error> {
		let Ok(id) = DataMsgId::try_from(cmd) else {
			debug!("ignoring unknown data event {cmd}");
			return Ok(());
		};

		match id {
			DataMsgId::RxBuff => self.queue_or_process_rx(RxBuffEvent::parse(sub)?),
			DataMsgId::TxBuffDone => self.queue_or_process_tx_done(TxBuffDoneEvent::parse(sub)?),
			DataMsgId::CarrierOn => self.carrier_event(sub, CarrierState::On),
			DataMsgId::CarrierOff => self.carrier_event(sub, CarrierState::Off),
			DataMsgId::PmMode => self.sap_client_update_pmmode(&PmModeEvent::parse(sub)?),
			DataMsgId::PsGetFrames => {
				self.sap_client_ps_get_frames(&PsGetFramesEvent::parse(sub)?)
			}
			DataMsgId::TxBuff => {
				// Command-only id; the RPU never sends it.
				debug!("ignoring TX_BUFF on the event path");
				Ok(())
			}
		}
	}

	/// RX events either run inline or are copied onto the work queue the
	/// embedder drains with [`Device::rx_tasklet`].
	#[cfg(feature = "rx-wq")]
	fn queue_or_process_rx(&self, event: RxBuffEvent) -> Result<(), Error> {
		self.rx_event_q.lock().push_back(event);
		Ok(())
	}

	#[cfg(not(feature = "rx-wq"))]
	fn queue_or_process_rx(&self, event: RxBuffEvent) -> Result<(), Error> {
		self.rx_event_process(&event)
	}

	/// Same split for TX-done events and [`Device::tx_done_tasklet`].
	#[cfg(feature = "tx-wq")]
	fn queue_or_process_tx_done(&self, event: TxBuffDoneEvent) -> Result<(), Error> {
		self.tx_done_event_q.lock().push_back(event);
		Ok(())
	}

	#[cfg(not(feature = "tx-wq"))]
	fn queue_or_process_tx_done(&self, event: TxBuffDoneEvent) -> Result<(), Error> {
		self.tx_done_event(&event)
	}

	fn carrier_event(&self, sub: &[u8], state: CarrierState) -> Result<(), Error> {
		let event = CarrierEvent::parse(sub)?;
		let if_idx = event.wdev_id as u8;

		if let Some(vif) = self.vifs.lock().get_mut(if_idx) {
			vif.carrier = state;
		} else {
			return Err(Error::DoesNotExist);
		}

		self.callbacks.if_carr_state_chg(if_idx, state);
		Ok(())
	}

	/// The UMAC control event switch.
	fn umac_event_ctrl_process(&self, body: &[u8]) -> Result<(), Error> {
		let (hdr, event) = parse_ctrl_event(body)?;
		let if_idx = hdr.wdev_id as u8;

		if usize::from(if_idx) >= MAX_NUM_VIFS {
			error!("invalid wdev_id {} received from UMAC", hdr.wdev_id);
			return Err(Error::InvalidArgument);
		}

		match event {
			CtrlEvent::TriggerScanStart(payload) => self.callbacks.scan_start(if_idx, payload),
			CtrlEvent::ScanDone(payload) => self.callbacks.scan_done(if_idx, payload),
			CtrlEvent::ScanAborted(payload) => self.callbacks.scan_aborted(if_idx, payload),
			CtrlEvent::ScanResult(payload) => {
				self.callbacks
					.scan_result(if_idx, payload, hdr.seq != 0);
			}
			CtrlEvent::ScanDisplayResult(payload) => {
				self.callbacks
					.display_scan_result(if_idx, payload, hdr.seq != 0);
			}
			CtrlEvent::Authenticate(payload) => self.callbacks.auth_resp(if_idx, payload),
			CtrlEvent::Associate(payload) => self.callbacks.assoc_resp(if_idx, payload),
			CtrlEvent::Deauthenticate(payload) => self.callbacks.deauth(if_idx, payload),
			CtrlEvent::Disassociate(payload) => self.callbacks.disassoc(if_idx, payload),
			CtrlEvent::Frame(payload) => self.callbacks.mgmt_rx(if_idx, payload),
			CtrlEvent::FrameTxStatus(payload) => self.callbacks.mgmt_tx_status(if_idx, payload),
			CtrlEvent::UnprotDeauthenticate(payload)
			| CtrlEvent::UnprotDisassociate(payload) => {
				self.callbacks.unprot_mlme(if_idx, payload);
			}
			CtrlEvent::NewStation {
				mac_addr,
				is_sta_legacy,
				wme,
			} => self.umac_event_new_station(if_idx, mac_addr, is_sta_legacy, wme),
			CtrlEvent::DelStation { mac_addr } => self.umac_event_del_station(if_idx, mac_addr),
			CtrlEvent::IfflagsStatus { status } => {
				// A negative status means the RPU rejected the request;
				// the waiter then times out instead of proceeding.
				if status >= 0 {
					if let Some(vif) = self.vifs.lock().get_mut(if_idx) {
						vif.ifflags = true;
					}
				}
			}
			CtrlEvent::NewInterface(payload) | CtrlEvent::SetInterface(payload) => {
				self.callbacks.cmd_status(if_idx, payload);
			}
			CtrlEvent::CookieResp(payload) => self.callbacks.cookie_resp(if_idx, payload),
			CtrlEvent::GetTxPower(payload) => self.callbacks.event_get_tx_power(if_idx, payload),
			CtrlEvent::GetChannel(payload) => self.callbacks.event_get_channel(if_idx, payload),
			CtrlEvent::GetStation(payload) => self.callbacks.event_get_station(if_idx, payload),
			CtrlEvent::NewWiphy(payload) => self.callbacks.event_get_wiphy(if_idx, payload),
			CtrlEvent::CmdStatus(payload) => self.callbacks.cmd_status(if_idx, payload),
			CtrlEvent::BeaconHint(payload) => self.callbacks.beacon_hint(if_idx, payload),
			CtrlEvent::Connect(payload) => self.callbacks.connect(if_idx, payload),
			CtrlEvent::Disconnect(payload) => self.callbacks.disconnect(if_idx, payload),
			CtrlEvent::GetReg(payload) => self.callbacks.event_get_reg(if_idx, payload),
			CtrlEvent::RegChange(payload) => self.callbacks.reg_change(if_idx, payload),
			CtrlEvent::GetPowerSaveInfo(payload) => {
				self.callbacks.event_get_ps_info(if_idx, payload);
			}
			CtrlEvent::TwtSleep { sleep_type } => self.umac_event_twt_sleep(if_idx, sleep_type),
			CtrlEvent::ConfigTwt(payload) => self.callbacks.twt_config(if_idx, payload),
			CtrlEvent::TeardownTwt(payload) => self.callbacks.twt_teardown(if_idx, payload),
			CtrlEvent::RemainOnChannel(payload) => self.callbacks.roc_start(if_idx, payload),
			CtrlEvent::CancelRemainOnChannel(payload) => {
				self.callbacks.roc_cancel(if_idx, payload);
			}
			CtrlEvent::GetConnectionInfo(payload) => {
				self.callbacks.event_get_connection_info(if_idx, payload);
			}
			CtrlEvent::Unknown { event_num } => {
				warn!("unknown UMAC event {event_num}");
			}
		}

		Ok(())
	}

	/// `NEW_STATION`: learn the peer (and the BSSID on a station
	/// interface). Runs under the TX lock like every peer mutation.
	fn umac_event_new_station(&self, if_idx: u8, mac_addr: [u8; 6], is_legacy: bool, wme: bool) {
		let if_type = {
			let mut vifs = self.vifs.lock();
			let Some(vif) = vifs.get_mut(if_idx) else {
				error!("NEW_STATION for missing interface {if_idx}");
				return;
			};
			if vif.if_type == VifType::Station {
				vif.bssid = mac_addr;
			}
			vif.if_type
		};

		let mut tx = self.tx_state.lock();
		if tx.peers.get_id(&mac_addr).is_none()
			&& tx
				.peers
				.add(&self.bus, if_type, if_idx, &mac_addr, is_legacy, wme)
				.is_err()
		{
			error!("cannot add new station {mac_addr:02x?}");
			return;
		}

		self.callbacks.new_station(if_idx, &mac_addr);
	}

	/// `DEL_STATION`: forget the peer if it is known.
	fn umac_event_del_station(&self, if_idx: u8, mac_addr: [u8; 6]) {
		let Some(if_type) = self.vifs.lock().if_type(if_idx) else {
			return;
		};

		{
			let mut tx = self.tx_state.lock();
			if let Some(peer_id) = tx.peers.get_id(&mac_addr) {
				tx.peers.remove(&self.bus, if_type, peer_id);
			}
		}

		self.callbacks.del_station(if_idx, &mac_addr);
	}

	/// `TWT_SLEEP`: gate or re-open the TX path. Waking up re-drives
	/// every AC so frames queued during sleep go out.
	fn umac_event_twt_sleep(&self, if_idx: u8, sleep_type: TwtSleepType) {
		let vif_types = self.vifs.lock().type_snapshot();
		let sleeping = {
			let mut tx = self.tx_state.lock();
			match sleep_type {
				TwtSleepType::BlockTx => {
					tx.twt_state = TwtState::Sleeping;
					true
				}
				TwtSleepType::UnblockTx => {
					tx.twt_state = TwtState::Awake;
					tx.fire_all_acs(&self.bus, &vif_types);
					false
				}
			}
		};

		self.callbacks.twt_sleep(if_idx, sleeping);
	}

	/// System channel events: init/deinit completions and statistics.
	fn sys_event_process(&self, body: &[u8]) -> Result<(), Error> {
		let mut r = MsgReader::new(body);
		let head = SysHead::parse(&mut r)?;

		let Ok(event) = SystemEvent::try_from(head.cmd_event) else {
			warn!("unknown system event {}", head.cmd_event);
			return Ok(());
		};

		match event {
			SystemEvent::InitDone => {
				self.fw_init_done.store(true, Ordering::Release);
			}
			SystemEvent::DeinitDone => {
				self.fw_deinit_done.store(true, Ordering::Release);
			}
			SystemEvent::Stats => {
				// Unsolicited statistics are dropped; only a pending
				// stats_get may fill the pinned buffer.
				if self.stats_req.load(Ordering::Acquire) {
					*self.fw_stats.lock() = r.rest().to_vec();
					self.stats_req.store(false, Ordering::Release);
				}
			}
			SystemEvent::RfTest => {
				debug!("RF test event ({} bytes)", r.remaining());
			}
			SystemEvent::RadiocmdStatus => {
				debug!("radio command status event");
			}
		}

		Ok(())
	}

	/// Drains one deferred TX-done event when the TX work queue is
	/// enabled. Returns `true` while more events are waiting.
	#[cfg(feature = "tx-wq")]
	pub fn tx_done_tasklet(&self) -> bool {
		let event = self.tx_done_event_q.lock().pop_front();

		if let Some(event) = event {
			if let Err(err) = self.tx_done_event(&event) {
				error!("deferred TX done processing failed: {err}");
			}
		}

		!self.tx_done_event_q.lock().is_empty()
	}
}
