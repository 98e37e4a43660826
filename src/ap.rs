//! SoftAP client power-save handling.
//!
//! The RPU reports client sleep transitions (`PM_MODE`) and PS-poll
//! style frame requests (`PS_GET_FRAMES`); both feed the wakeup list
//! that peer selection services first.

use crate::device::Device;
use crate::error::Error;
use crate::hal::Bus;
use crate::peer::PsState;
use crate::umac::event::{PmModeEvent, PsGetFramesEvent};

impl<B: Bus> Device<B> {
	/// A sleeping client polled for `num_frames` buffered frames: grant
	/// that many PS tokens, put the peer on the wakeup list and run a
	/// fire cycle.
	pub(crate) fn sap_client_ps_get_frames(&self, event: &PsGetFramesEvent) -> Result<(), Error> {
		let vif_types = self.vifs.lock().type_snapshot();
		let mut tx = self.tx_state.lock();

		let Some(peer_id) = tx.peers.get_id(&event.mac_addr) else {
			error!("PS_GET_FRAMES for unknown peer {:02x?}", event.mac_addr);
			return Err(Error::DoesNotExist);
		};

		tx.peers.entries[peer_id].ps_token_count = event.num_frames;
		tx.wakeup_enqueue(peer_id);
		tx.fire_all_acs(&self.bus, &vif_types);

		Ok(())
	}

	/// A client toggled power save. Waking clients join the wakeup list
	/// and trigger a fire cycle across all ACs.
	pub(crate) fn sap_client_update_pmmode(&self, event: &PmModeEvent) -> Result<(), Error> {
		let vif_types = self.vifs.lock().type_snapshot();
		let mut tx = self.tx_state.lock();

		let Some(peer_id) = tx.peers.get_id(&event.mac_addr) else {
			error!("PM_MODE for unknown peer {:02x?}", event.mac_addr);
			return Err(Error::DoesNotExist);
		};

		tx.peers.entries[peer_id].ps_state = if event.sta_ps_state == 0 {
			PsState::Active
		} else {
			PsState::PowerSave
		};

		if tx.peers.entries[peer_id].ps_state == PsState::Active {
			tx.wakeup_enqueue(peer_id);
			tx.fire_all_acs(&self.bus, &vif_types);
		}

		Ok(())
	}
}
