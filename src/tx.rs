//! TX data path: pending queues, descriptor accounting, A-MPDU
//! coalescing and TX-done processing.
//!
//! All TX state lives behind one spin-lock of the same grain as the
//! descriptor bitmap it protects. The lock is held across a full
//! enqueue/fire or TX-done cycle; the coalesce build is bounded by
//! `max_tx_aggregation`, never by the total number of pending frames.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::array;

use bit_field::BitField;
use num_enum::TryFromPrimitive;
use smallvec::SmallVec;

use crate::config::{
	AC_TWT_PRIORITY_EMERGENCY, DSCP_OR_TOS_TWT_EMERGENCY_TX, ETH_ALEN, ETH_HDR_LEN,
	MAX_PEERS, MAX_SW_PEERS, MAX_TX_PENDING_QLEN, SPARE_DESC_Q_MAP_SIZE, TX_BUF_HEADROOM,
	TX_DESC_BUCKET_BOUND,
};
use crate::device::{Device, DeviceParams};
use crate::error::Error;
use crate::hal::{Bus, DataCmdKind};
use crate::nbuf::NetBuf;
use crate::peer::{PeerTable, PsState, pend_q_bmp_addr};
use crate::umac::cmd::{TxBuffCmd, TxBuffInfo, TxMacHdrInfo};
use crate::umac::event::TxBuffDoneEvent;
use crate::util::{ether_addr_equal, get_dest, get_src, get_tid, is_multicast_addr, tx_get_eth_type};
use crate::vif::{VifType, VifTypeSnapshot};

/// EDCA access categories. `Mc` is the multicast pseudo-category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum AccessCategory {
	Bk = 0,
	Be = 1,
	Vi = 2,
	Vo = 3,
	Mc = 4,
}

/// Number of access categories, pseudo-category included.
pub const AC_MAX: usize = 5;

impl AccessCategory {
	/// The real categories, highest priority first.
	pub const REAL_DESCENDING: [Self; 4] = [Self::Vo, Self::Vi, Self::Be, Self::Bk];

	#[inline]
	pub fn idx(self) -> usize {
		self as usize
	}

	/// The canonical 802.1D TID → AC table.
	pub fn from_tid(tid: u8) -> Self {
		const MAP_1D_TO_AC: [AccessCategory; 8] = [
			AccessCategory::Be,
			AccessCategory::Bk,
			AccessCategory::Bk,
			AccessCategory::Be,
			AccessCategory::Vi,
			AccessCategory::Vi,
			AccessCategory::Vo,
			AccessCategory::Vo,
		];
		MAP_1D_TO_AC[usize::from(tid & 7)]
	}
}

/// AC for a classified frame; multicast receivers use the pseudo-AC.
pub fn get_ac(tid: u8, ra: &[u8]) -> AccessCategory {
	if is_multicast_addr(ra) {
		AccessCategory::Mc
	} else {
		AccessCategory::from_tid(tid)
	}
}

/// TWT sleep state of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwtState {
	Awake,
	Sleeping,
}

/// Outcome of handing a frame to the TX path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
	/// A `CMD_TX_BUFF` was issued for the frame (possibly coalesced).
	Success,
	/// The frame waits on a pending queue for a descriptor, a TX-done or
	/// a wakeup.
	Queued,
	/// The frame was dropped.
	Fail,
}

fn is_twt_emergency(nwb: &NetBuf) -> bool {
	nwb.priority() == AC_TWT_PRIORITY_EMERGENCY
}

/// Data-path TX counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxStats {
	pub total_tx_pkts: u64,
	pub total_tx_done_pkts: u64,
	pub tx_dropped: u64,
}

/// Frames coalesced onto one descriptor, plus the peer they serve.
/// FIFO order, bounded by `max_tx_aggregation`.
#[derive(Debug, Default)]
struct PktInfo {
	pkt: SmallVec<[NetBuf; 4]>,
	peer_id: usize,
}

/// Everything the TX lock protects.
pub(crate) struct TxState {
	pub(crate) peers: PeerTable,
	pending: [[VecDeque<NetBuf>; AC_MAX]; MAX_SW_PEERS],
	buf_pool_bmp: Vec<u32>,
	spare_desc_queue_map: u16,
	outstanding_descs: [usize; AC_MAX],
	pkt_info: Vec<PktInfo>,
	send_pkt_coalesce_count: Vec<usize>,
	curr_peer_opp: [usize; AC_MAX],
	/// Peers woken from power save that still hold PS tokens; serviced in
	/// insertion order.
	wakeup_client_q: VecDeque<usize>,
	pub(crate) twt_state: TwtState,
	/// `mapped` flag per (descriptor, frame) buffer-map slot.
	tx_buf_mapped: Vec<bool>,
	pub(crate) stats: TxStats,

	num_tx_tokens: usize,
	num_tx_tokens_per_ac: usize,
	max_tx_aggregation: usize,
	avail_ampdu_len_per_token: usize,
}

impl TxState {
	pub(crate) fn new(params: &DeviceParams) -> Self {
		let num_tx_tokens = params.num_tx_tokens;
		Self {
			peers: PeerTable::new(),
			pending: array::from_fn(|_| array::from_fn(|_| VecDeque::new())),
			buf_pool_bmp: vec![0; num_tx_tokens / TX_DESC_BUCKET_BOUND + 1],
			spare_desc_queue_map: 0,
			outstanding_descs: [0; AC_MAX],
			pkt_info: (0..num_tx_tokens).map(|_| PktInfo::default()).collect(),
			send_pkt_coalesce_count: vec![0; num_tx_tokens],
			curr_peer_opp: [0; AC_MAX],
			wakeup_client_q: VecDeque::new(),
			twt_state: TwtState::Awake,
			tx_buf_mapped: vec![false; num_tx_tokens * params.max_tx_aggregation],
			stats: TxStats::default(),
			num_tx_tokens,
			num_tx_tokens_per_ac: params.num_tx_tokens_per_ac,
			max_tx_aggregation: params.max_tx_aggregation,
			avail_ampdu_len_per_token: params.avail_ampdu_len_per_token,
		}
	}

	fn reserved_desc_count(&self) -> usize {
		self.num_tx_tokens_per_ac * AC_MAX
	}

	fn can_xmit(&self, nwb: &NetBuf) -> bool {
		is_twt_emergency(nwb) || self.twt_state == TwtState::Awake
	}

	fn spare_desc_index(&self, desc: usize) -> usize {
		desc % self.reserved_desc_count()
	}

	fn set_spare_desc_q_map(&mut self, desc: usize, ac: usize) {
		let idx = self.spare_desc_index(desc);
		self.spare_desc_queue_map |= 1 << (idx * SPARE_DESC_Q_MAP_SIZE + ac);
	}

	fn clear_spare_desc_q_map(&mut self, desc: usize, ac: usize) {
		let idx = self.spare_desc_index(desc);
		self.spare_desc_queue_map &= !(1 << (idx * SPARE_DESC_Q_MAP_SIZE + ac));
	}

	pub(crate) fn spare_desc_q_map(&self, desc: usize) -> u16 {
		let idx = self.spare_desc_index(desc);
		(self.spare_desc_queue_map >> (idx * SPARE_DESC_Q_MAP_SIZE)) & 0x000f
	}

	pub(crate) fn outstanding(&self, ac: AccessCategory) -> usize {
		self.outstanding_descs[ac.idx()]
	}

	pub(crate) fn pending_len(&self, peer_id: usize, ac: AccessCategory) -> usize {
		self.pending[peer_id][ac.idx()].len()
	}

	pub(crate) fn desc_in_use(&self, desc: usize) -> bool {
		let pool_id = desc / TX_DESC_BUCKET_BOUND;
		self.buf_pool_bmp[pool_id].get_bit(desc % TX_DESC_BUCKET_BOUND)
	}

	pub(crate) fn buf_mapped(&self, desc_id: usize) -> bool {
		self.tx_buf_mapped[desc_id]
	}

	/// Pending frames for `peer_id` across the real ACs.
	fn pending_frames_count(&self, peer_id: usize) -> usize {
		AccessCategory::REAL_DESCENDING
			.iter()
			.map(|ac| self.pending[peer_id][ac.idx()].len())
			.sum()
	}

	/// Mirrors the per-AC pending bitmap of an AP client into RPU memory.
	fn update_pend_q_bmp(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		ac: usize,
		peer_id: usize,
	) -> Result<(), Error> {
		let if_idx = usize::from(self.peers.entries[peer_id].if_idx);

		if vif_types[if_idx] == Some(VifType::Ap) && peer_id < MAX_PEERS {
			let len = self.pending[peer_id][ac].len();
			let bmp = &mut self.peers.entries[peer_id].pend_q_bmp;
			if len == 0 {
				*bmp &= !(1 << ac);
			} else {
				*bmp |= 1 << ac;
			}
			let bmp = *bmp;
			bus.rpu_mem_write(pend_q_bmp_addr(peer_id) + ETH_ALEN as u32, &[bmp])?;
		}

		Ok(())
	}

	/// Allocates a descriptor for `ac`: first from the AC's reserved
	/// stripe, then from the spare region. Returns `num_tx_tokens` when
	/// everything is in flight.
	pub(crate) fn tx_desc_get(&mut self, ac: AccessCategory) -> usize {
		let queue = ac.idx();

		for cnt in 0..self.num_tx_tokens_per_ac {
			let desc = queue + AC_MAX * cnt;
			let pool_id = desc / TX_DESC_BUCKET_BOUND;
			let bit = desc % TX_DESC_BUCKET_BOUND;

			if !self.buf_pool_bmp[pool_id].get_bit(bit) {
				self.buf_pool_bmp[pool_id].set_bit(bit, true);
				self.outstanding_descs[queue] += 1;
				return desc;
			}
		}

		// Rent a spare descriptor and note the borrowing AC; TX-done does
		// not carry the queue number.
		for desc in self.reserved_desc_count()..self.num_tx_tokens {
			let pool_id = desc / TX_DESC_BUCKET_BOUND;
			let bit = desc % TX_DESC_BUCKET_BOUND;

			if !self.buf_pool_bmp[pool_id].get_bit(bit) {
				self.buf_pool_bmp[pool_id].set_bit(bit, true);
				self.outstanding_descs[queue] += 1;
				self.set_spare_desc_q_map(desc, queue);
				return desc;
			}
		}

		self.num_tx_tokens
	}

	/// Returns a descriptor. Freeing an already free descriptor is a
	/// no-op.
	pub(crate) fn tx_desc_free(&mut self, desc: usize, queue: usize) {
		let pool_id = desc / TX_DESC_BUCKET_BOUND;
		let bit = desc % TX_DESC_BUCKET_BOUND;

		if !self.buf_pool_bmp[pool_id].get_bit(bit) {
			return;
		}

		self.buf_pool_bmp[pool_id].set_bit(bit, false);
		self.outstanding_descs[queue] -= 1;

		if desc >= self.reserved_desc_count() {
			self.clear_spare_desc_q_map(desc, queue);
		}
	}

	/// First wakeup-list peer holding PS tokens and pending frames for
	/// `ac`; consumes one token.
	fn get_peer_from_wakeup_q(&mut self, ac: usize) -> Option<usize> {
		for &peer_id in &self.wakeup_client_q {
			let peer = &mut self.peers.entries[peer_id];
			if peer.ps_token_count > 0 && !self.pending[peer_id][ac].is_empty() {
				peer.ps_token_count -= 1;
				return Some(peer_id);
			}
		}
		None
	}

	/// Opportunistic peer selection: wakeup list first, then round-robin
	/// over awake peers with pending frames.
	fn tx_curr_peer_opp_get(&mut self, ac: AccessCategory) -> Option<usize> {
		if ac == AccessCategory::Mc {
			return Some(MAX_PEERS);
		}
		let ac = ac.idx();

		if let Some(peer_id) = self.get_peer_from_wakeup_q(ac) {
			return Some(peer_id);
		}

		let init_peer_opp = self.curr_peer_opp[ac];
		for i in 0..MAX_PEERS {
			let cand = (init_peer_opp + i) % MAX_PEERS;

			if self.peers.entries[cand].ps_state == PsState::PowerSave {
				continue;
			}

			if !self.pending[cand][ac].is_empty() {
				self.curr_peer_opp[ac] = (cand + 1) % MAX_PEERS;
				return Some(cand);
			}
		}

		None
	}

	/// Builds the coalesced frame list for `desc` out of the pending
	/// queue picked by peer selection. Returns the number of frames
	/// claimed by the descriptor.
	fn tx_pending_process_build(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		desc: usize,
		ac: AccessCategory,
	) -> usize {
		let Some(peer_id) = self.tx_curr_peer_opp_get(ac) else {
			return 0;
		};
		let ac = ac.idx();

		if self.pending[peer_id][ac].is_empty() {
			return 0;
		}

		// Aggregation keys of the queue head; only frames with the same
		// receiver and source may join the A-MPDU.
		let (first_dst, first_src) = {
			let first = self.pending[peer_id][ac].front().unwrap();
			let mut dst = [0u8; ETH_ALEN];
			let mut src = [0u8; ETH_ALEN];
			dst.copy_from_slice(get_dest(first));
			src.copy_from_slice(get_src(first));
			(dst, src)
		};
		let is_legacy = self.peers.entries[peer_id].is_legacy;

		let mut ampdu_len = 0;
		loop {
			let Some(head) = self.pending[peer_id][ac].front() else {
				break;
			};

			ampdu_len += TX_BUF_HEADROOM + head.len();
			if ampdu_len >= self.avail_ampdu_len_per_token {
				break;
			}

			let head_ok = is_twt_emergency(head) || self.twt_state == TwtState::Awake;
			let aggr = !is_legacy
				&& !is_twt_emergency(head)
				&& ether_addr_equal(get_dest(head), &first_dst)
				&& ether_addr_equal(get_src(head), &first_src);

			if !head_ok || !aggr || self.pkt_info[desc].pkt.len() >= self.max_tx_aggregation {
				break;
			}

			let nwb = self.pending[peer_id][ac].pop_front().unwrap();
			self.pkt_info[desc].pkt.push(nwb);
		}

		// If the criteria rejected everything, make progress with exactly
		// one frame.
		if self.pkt_info[desc].pkt.is_empty() {
			if let Some(nwb) = self.pending[peer_id][ac].pop_front() {
				if !self.can_xmit(&nwb) {
					// The gated head frame is dropped, not re-queued.
					// TODO: re-queue at the head once the TWT wake path
					// re-drives this descriptor.
					self.stats.tx_dropped += 1;
					return 0;
				}
				self.pkt_info[desc].pkt.push(nwb);
			}
		}

		let len = self.pkt_info[desc].pkt.len();
		if len > 0 {
			self.pkt_info[desc].peer_id = peer_id;
		}

		let _ = self.update_pend_q_bmp(bus, vif_types, ac, peer_id);

		len
	}

	/// Maps the coalesced frames of `desc` and issues the `CMD_TX_BUFF`.
	fn tx_cmd_init(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		desc: usize,
		peer_id: usize,
	) -> Result<(), Error> {
		let txq_len = self.pkt_info[desc].pkt.len();
		if txq_len == 0 {
			error!("tx_cmd_init called with an empty coalesce list (desc {desc})");
			return Err(Error::InvalidArgument);
		}

		self.send_pkt_coalesce_count[desc] = txq_len;

		let mut mac_hdr = TxMacHdrInfo::default();
		let mut frames = Vec::with_capacity(txq_len);
		{
			let first = &self.pkt_info[desc].pkt[0];
			mac_hdr.dest.copy_from_slice(get_dest(first));
			mac_hdr.src.copy_from_slice(get_src(first));
			mac_hdr.etype = tx_get_eth_type(first.data());
			mac_hdr.dscp_or_tos = u16::from(get_tid(first.data()));
			if is_twt_emergency(first) {
				mac_hdr.dscp_or_tos |= DSCP_OR_TOS_TWT_EMERGENCY_TX;
			}
		}

		for (frame_idx, nwb) in self.pkt_info[desc].pkt.iter().enumerate() {
			let desc_id = desc * self.max_tx_aggregation + frame_idx;

			if self.tx_buf_mapped[desc_id] {
				error!("TX init for already mapped buffer {desc_id}");
				return Err(Error::BadState);
			}

			let phy_addr = bus.map_tx_buf(nwb.data(), desc_id, desc, frame_idx)?;
			self.tx_buf_mapped[desc_id] = true;

			frames.push(TxBuffInfo {
				ddr_ptr: phy_addr.0,
				pkt_length: nwb.len() as u32,
			});
		}

		self.stats.total_tx_pkts += txq_len as u64;

		let if_idx = self.peers.entries[peer_id].if_idx;
		let buffers_for_clients = vif_types[usize::from(if_idx)]
			.is_some_and(VifType::buffers_for_clients);

		mac_hdr.more_data =
			buffers_for_clients && self.pending_frames_count(peer_id) != 0;

		if self.peers.entries[peer_id].ps_token_count == 0 {
			self.wakeup_client_q.retain(|&id| id != peer_id);
			mac_hdr.eosp = true;
		}

		let cmd = TxBuffCmd {
			wdev_id: u32::from(if_idx),
			tx_desc_num: desc as u32,
			mac_hdr,
			frames,
		};

		bus.data_cmd_send(DataCmdKind::Tx, &cmd.encode(), desc, 0)
	}

	/// Fills `desc` from the pending queues of `ac` and either fires it
	/// or gives it back.
	pub(crate) fn tx_pending_process(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		desc: usize,
		ac: AccessCategory,
	) -> Result<(), Error> {
		if self.tx_pending_process_build(bus, vif_types, desc, ac) > 0 {
			let peer_id = self.pkt_info[desc].peer_id;
			self.tx_cmd_init(bus, vif_types, desc, peer_id)
		} else {
			self.tx_desc_free(desc, ac.idx());
			Ok(())
		}
	}

	/// Appends a frame to its pending queue. TWT-emergency frames go to
	/// the head; a full queue drops the frame.
	fn tx_enqueue(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		nwb: NetBuf,
		ac: AccessCategory,
		peer_id: usize,
	) -> Result<(), Error> {
		let queue = &mut self.pending[peer_id][ac.idx()];

		if queue.len() >= MAX_TX_PENDING_QLEN {
			self.stats.tx_dropped += 1;
			return Err(Error::InsufficientMemory);
		}

		if is_twt_emergency(&nwb) {
			queue.push_front(nwb);
		} else {
			queue.push_back(nwb);
		}

		self.update_pend_q_bmp(bus, vif_types, ac.idx(), peer_id)
	}

	/// Enqueue plus the early-out decisions that keep a frame queued:
	/// peer asleep, or back-pressure while an aggregatable batch builds
	/// up behind an exhausted reserved stripe.
	fn tx_process(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		nwb: NetBuf,
		ac: AccessCategory,
		peer_id: usize,
	) -> TxStatus {
		let mut keys = [0u8; 2 * ETH_ALEN];
		keys[..ETH_ALEN].copy_from_slice(get_dest(&nwb));
		keys[ETH_ALEN..].copy_from_slice(get_src(&nwb));
		let emergency = is_twt_emergency(&nwb);

		if self.tx_enqueue(bus, vif_types, nwb, ac, peer_id).is_err() {
			return TxStatus::Fail;
		}

		if self.peers.entries[peer_id].ps_state == PsState::PowerSave {
			return TxStatus::Queued;
		}

		// Back-pressure: with the reserved stripe exhausted and an older
		// aggregatable head in front of this frame, hold the frame back
		// so the next TX-done picks up a bigger batch. Emergency frames
		// are never held back.
		if !emergency && self.outstanding_descs[ac.idx()] >= self.num_tx_tokens_per_ac {
			let queue = &self.pending[peer_id][ac.idx()];
			let aggr = queue.len() > 1
				&& queue.front().is_some_and(|first| {
					ether_addr_equal(get_dest(first), &keys[..ETH_ALEN])
						&& ether_addr_equal(get_src(first), &keys[ETH_ALEN..])
				});

			if aggr && queue.len() < self.max_tx_aggregation {
				return TxStatus::Queued;
			}
		}

		TxStatus::Success
	}

	/// The full TX entry: enqueue, gate, allocate, fire.
	pub(crate) fn tx(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		nwb: NetBuf,
		ac: AccessCategory,
		peer_id: usize,
	) -> TxStatus {
		if self.num_tx_tokens == 0 {
			return TxStatus::Fail;
		}

		let can_xmit = self.can_xmit(&nwb);

		match self.tx_process(bus, vif_types, nwb, ac, peer_id) {
			TxStatus::Success => {}
			status => return status,
		}

		if !can_xmit {
			return TxStatus::Queued;
		}

		let desc = self.tx_desc_get(ac);
		if desc == self.num_tx_tokens {
			return TxStatus::Queued;
		}

		match self.tx_pending_process(bus, vif_types, desc, ac) {
			Ok(()) => TxStatus::Success,
			Err(_) => TxStatus::Fail,
		}
	}

	/// Decides what happens to a descriptor released by `TX_BUFF_DONE`:
	/// refill it from some AC (possibly reassigning a spare descriptor)
	/// or free it. Returns the refilled frame count.
	fn tx_buff_req_free(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		desc: usize,
	) -> usize {
		let reserved = desc < self.reserved_desc_count();

		// Reserved descriptors encode their AC in their stripe position.
		// Spare descriptors recover the borrowing AC from the nibble map,
		// highest-priority bit first.
		let tx_done_q = if reserved {
			desc % AC_MAX
		} else {
			let map = self.spare_desc_q_map(desc);
			AccessCategory::REAL_DESCENDING
				.into_iter()
				.find(|ac| map & (1 << ac.idx()) != 0)
				.map_or(AccessCategory::Bk.idx(), AccessCategory::idx)
		};

		let single;
		let candidates: &[AccessCategory] = if reserved {
			single = [AccessCategory::try_from(tx_done_q as u8).unwrap()];
			&single
		} else {
			&AccessCategory::REAL_DESCENDING
		};

		for &ac in candidates {
			let pkts_pend = self.tx_pending_process_build(bus, vif_types, desc, ac);
			if pkts_pend > 0 {
				if tx_done_q != ac.idx() {
					// A spare descriptor moved to a new borrower.
					self.outstanding_descs[tx_done_q] -= 1;
					self.outstanding_descs[ac.idx()] += 1;
					self.clear_spare_desc_q_map(desc, tx_done_q);
					self.set_spare_desc_q_map(desc, ac.idx());
				}
				return pkts_pend;
			}
		}

		self.tx_desc_free(desc, tx_done_q);
		0
	}

	/// Handles one `TX_BUFF_DONE`: unmap and free the coalesced frames,
	/// then rearm or release the descriptor.
	pub(crate) fn tx_done_process(
		&mut self,
		bus: &dyn Bus,
		vif_types: &VifTypeSnapshot,
		desc: usize,
	) -> Result<(), Error> {
		if desc >= self.num_tx_tokens {
			error!("TX done for invalid descriptor {desc}");
			return Err(Error::InvalidArgument);
		}

		for frame in 0..self.send_pkt_coalesce_count[desc] {
			let desc_id = desc * self.max_tx_aggregation + frame;

			if !self.tx_buf_mapped[desc_id] {
				error!("TX done for unmapped buffer {desc_id}");
				return Err(Error::BadState);
			}

			bus.unmap_tx_buf(desc_id)?;
			self.tx_buf_mapped[desc_id] = false;
		}

		let done = self.pkt_info[desc].pkt.len() as u64;
		self.pkt_info[desc].pkt.clear();
		self.stats.total_tx_done_pkts += done;

		let pkts_pending = self.tx_buff_req_free(bus, vif_types, desc);

		if pkts_pending > 0 && self.twt_state == TwtState::Awake {
			let peer_id = self.pkt_info[desc].peer_id;
			self.tx_cmd_init(bus, vif_types, desc, peer_id)?;
		}

		Ok(())
	}

	/// One allocation/fire attempt per real AC, highest priority first.
	/// Runs after PS wakeups and TWT wake.
	pub(crate) fn fire_all_acs(&mut self, bus: &dyn Bus, vif_types: &VifTypeSnapshot) {
		for ac in AccessCategory::REAL_DESCENDING {
			let desc = self.tx_desc_get(ac);
			if desc < self.num_tx_tokens {
				let _ = self.tx_pending_process(bus, vif_types, desc, ac);
			}
		}
	}

	/// Drops all pending frames owned by `if_idx`'s peers. Used on
	/// interface down.
	pub(crate) fn drop_pending_for_vif(&mut self, if_idx: u8) {
		for peer_id in 0..MAX_SW_PEERS {
			if self.peers.entries[peer_id].used && self.peers.entries[peer_id].if_idx == if_idx {
				for queue in &mut self.pending[peer_id] {
					queue.clear();
				}
			}
		}
	}

	pub(crate) fn wakeup_enqueue(&mut self, peer_id: usize) {
		if !self.wakeup_client_q.contains(&peer_id) {
			self.wakeup_client_q.push_back(peer_id);
		}
	}
}

impl<B: Bus> Device<B> {
	/// Entry point for outgoing Ethernet frames.
	///
	/// The frame is classified (receiver, TID, AC), enqueued and fired if
	/// a descriptor is available; otherwise it stays queued. The frame is
	/// consumed either way.
	pub fn start_xmit(&self, if_idx: u8, nwb: NetBuf) -> Result<(), Error> {
		if nwb.len() < ETH_HDR_LEN {
			self.tx_state.lock().stats.tx_dropped += 1;
			return Err(Error::InvalidArgument);
		}

		let (ra, vif_types) = {
			let vifs = self.vifs.lock();
			let vif = vifs.get(if_idx).ok_or(Error::DoesNotExist)?;
			let mut ra = [0u8; ETH_ALEN];
			if vif.if_type == VifType::Station {
				ra = vif.bssid;
			} else {
				ra.copy_from_slice(get_dest(&nwb));
			}
			(ra, vifs.type_snapshot())
		};

		let mut tx = self.tx_state.lock();

		let Some(peer_id) = tx.peers.get_id(&ra) else {
			debug!("dropping frame for unknown peer {ra:02x?}");
			tx.stats.tx_dropped += 1;
			return Err(Error::DoesNotExist);
		};

		let ac = if peer_id == MAX_PEERS {
			AccessCategory::Mc
		} else if tx.peers.entries[peer_id].qos_supported {
			get_ac(get_tid(nwb.data()), &ra)
		} else {
			AccessCategory::Be
		};

		match tx.tx(&self.bus, &vif_types, nwb, ac, peer_id) {
			TxStatus::Success | TxStatus::Queued => Ok(()),
			TxStatus::Fail => Err(Error::InsufficientMemory),
		}
	}

	/// Handles a `TX_BUFF_DONE` event.
	pub(crate) fn tx_done_event(&self, event: &TxBuffDoneEvent) -> Result<(), Error> {
		let vif_types = self.vifs.lock().type_snapshot();
		let mut tx = self.tx_state.lock();
		tx.tx_done_process(&self.bus, &vif_types, event.tx_desc_num as usize)
	}
}

#[cfg(test)]
mod tests {
	use alloc::boxed::Box;
	use alloc::vec::Vec;

	use super::*;
	use crate::callbacks::NullCallbacks;
	use crate::config::MAX_TX_PENDING_QLEN;
	use crate::device::{Device, DeviceParams};
	use crate::testutil::MockBus;
	use crate::umac::event::{PmModeEvent, PsGetFramesEvent, TwtSleepType, TxBuffDoneEvent};
	use crate::umac::{MessageType, MsgWriter};
	use crate::vif::VifType;

	const BSSID: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
	const OUR_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
	const BCAST: [u8; 6] = [0xff; 6];

	/// The fields of an encoded `CMD_TX_BUFF`.
	struct ParsedTxCmd {
		wdev_id: u32,
		tx_desc_num: u32,
		dest: [u8; 6],
		src: [u8; 6],
		etype: u16,
		dscp_or_tos: u16,
		more_data: bool,
		eosp: bool,
		frames: Vec<(u64, u32)>,
	}

	fn parse_tx_cmd(msg: &[u8]) -> ParsedTxCmd {
		// Envelope (8) + data head (8) precede the command proper.
		let body = &msg[16..];
		let mut dest = [0u8; 6];
		let mut src = [0u8; 6];
		dest.copy_from_slice(&body[8..14]);
		src.copy_from_slice(&body[14..20]);

		let num = u32::from_le_bytes(body[28..32].try_into().unwrap()) as usize;
		let mut frames = Vec::new();
		for i in 0..num {
			let off = 32 + i * 12;
			frames.push((
				u64::from_le_bytes(body[off..off + 8].try_into().unwrap()),
				u32::from_le_bytes(body[off + 8..off + 12].try_into().unwrap()),
			));
		}

		ParsedTxCmd {
			wdev_id: u32::from_le_bytes(body[0..4].try_into().unwrap()),
			tx_desc_num: u32::from_le_bytes(body[4..8].try_into().unwrap()),
			dest,
			src,
			etype: u16::from_le_bytes(body[20..22].try_into().unwrap()),
			dscp_or_tos: u16::from_le_bytes(body[22..24].try_into().unwrap()),
			more_data: body[24] != 0,
			eosp: body[25] != 0,
			frames,
		}
	}

	fn wrap_data_event(sub: &[u8]) -> Vec<u8> {
		let mut w = MsgWriter::new();
		w.put_bytes(sub);
		w.into_envelope(MessageType::Data)
	}

	fn eth_frame(dst: [u8; 6], src: [u8; 6], ethertype: u16, total_len: usize) -> NetBuf {
		assert!(total_len >= ETH_HDR_LEN);
		let mut bytes = vec![0u8; total_len];
		bytes[..6].copy_from_slice(&dst);
		bytes[6..12].copy_from_slice(&src);
		bytes[12..14].copy_from_slice(&ethertype.to_be_bytes());
		NetBuf::from_slice(&bytes, 0)
	}

	fn ipv4_frame(dst: [u8; 6], src: [u8; 6], tos: u8, total_len: usize) -> NetBuf {
		let mut nwb = eth_frame(dst, src, 0x0800, total_len);
		nwb.data_mut()[14] = 0x45;
		nwb.data_mut()[15] = tos;
		nwb
	}

	fn sta_device() -> Device<MockBus> {
		let device = Device::new(
			MockBus::new(),
			DeviceParams::default(),
			Box::new(NullCallbacks),
		);
		let idx = device.add_vif(VifType::Station, OUR_MAC).unwrap();
		assert_eq!(idx, 0);
		device.set_vif_bssid(0, BSSID).unwrap();
		device.peer_add(0, &BSSID, false, true).unwrap();
		device
	}

	fn ap_device(params: DeviceParams) -> Device<MockBus> {
		let device = Device::new(MockBus::new(), params, Box::new(NullCallbacks));
		assert_eq!(device.add_vif(VifType::Ap, OUR_MAC).unwrap(), 0);
		device
	}

	fn tx_cmds(device: &Device<MockBus>) -> Vec<Vec<u8>> {
		device
			.bus
			.data_cmds
			.lock()
			.iter()
			.filter(|(kind, ..)| *kind == DataCmdKind::Tx)
			.map(|(_, msg, ..)| msg.clone())
			.collect()
	}

	#[test]
	fn tid_to_ac_table() {
		use AccessCategory::*;
		let expected = [Be, Bk, Bk, Be, Vi, Vi, Vo, Vo];
		for (tid, ac) in expected.iter().enumerate() {
			assert_eq!(AccessCategory::from_tid(tid as u8), *ac);
		}
	}

	#[test]
	fn single_arp_frame() {
		let device = sta_device();

		device
			.start_xmit(0, eth_frame(BCAST, OUR_MAC, 0x0806, 42))
			.unwrap();

		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		let cmd = parse_tx_cmd(&cmds[0]);
		assert_eq!(cmd.wdev_id, 0);
		assert_eq!(cmd.dest, BCAST);
		assert_eq!(cmd.src, OUR_MAC);
		assert_eq!(cmd.etype, 0x0806);
		assert_eq!(cmd.dscp_or_tos, 0);
		assert_eq!(cmd.frames.len(), 1);
		assert_eq!(cmd.frames[0].1, 42);

		let desc = cmd.tx_desc_num;
		device
			.process_event(&wrap_data_event(
				&TxBuffDoneEvent {
					tx_desc_num: desc,
					status: 0,
				}
				.encode(),
			))
			.unwrap();

		assert_eq!(device.host_stats().tx.total_tx_done_pkts, 1);
		let tx = device.tx_state.lock();
		assert!(!tx.desc_in_use(desc as usize));
		assert_eq!(tx.outstanding(AccessCategory::Be), 0);
	}

	#[test]
	fn ipv4_vo_classification() {
		let device = sta_device();

		device
			.start_xmit(0, ipv4_frame(BSSID, OUR_MAC, 0xe0, 60))
			.unwrap();

		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		let cmd = parse_tx_cmd(&cmds[0]);
		assert_eq!(cmd.dscp_or_tos, 7);
		// The first VO allocation comes from the VO-reserved stripe.
		assert_eq!(cmd.tx_desc_num as usize, AccessCategory::Vo.idx());

		let tx = device.tx_state.lock();
		assert_eq!(tx.outstanding(AccessCategory::Vo), 1);
	}

	#[test]
	fn non_qos_peer_defaults_to_best_effort() {
		let device = Device::new(
			MockBus::new(),
			DeviceParams::default(),
			Box::new(NullCallbacks),
		);
		device.add_vif(VifType::Station, OUR_MAC).unwrap();
		device.set_vif_bssid(0, BSSID).unwrap();
		device.peer_add(0, &BSSID, false, false).unwrap();

		device
			.start_xmit(0, ipv4_frame(BSSID, OUR_MAC, 0xe0, 60))
			.unwrap();

		let cmds = tx_cmds(&device);
		let cmd = parse_tx_cmd(&cmds[0]);
		assert_eq!(cmd.tx_desc_num as usize, AccessCategory::Be.idx());
	}

	#[test]
	fn short_frame_is_rejected() {
		let device = sta_device();
		assert_eq!(
			device.start_xmit(0, NetBuf::from_slice(&[0u8; 8], 0)),
			Err(Error::InvalidArgument)
		);
		assert_eq!(device.host_stats().tx.tx_dropped, 1);
	}

	#[test]
	fn aggregation_after_backpressure() {
		let mut params = DeviceParams::default();
		params.num_tx_tokens_per_ac = 1;
		// No spare region: frames behind the in-flight one pile up.
		params.num_tx_tokens = AC_MAX;
		params.avail_ampdu_len_per_token = 3 * (TX_BUF_HEADROOM + 1000) + 1;

		let device = Device::new(MockBus::new(), params, Box::new(NullCallbacks));
		device.add_vif(VifType::Station, OUR_MAC).unwrap();
		device.set_vif_bssid(0, BSSID).unwrap();
		device.peer_add(0, &BSSID, false, true).unwrap();

		for _ in 0..4 {
			device
				.start_xmit(0, ipv4_frame(BSSID, OUR_MAC, 0, 1000))
				.unwrap();
		}

		// Only the first frame went out; the rest wait for TX-done.
		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		let first = parse_tx_cmd(&cmds[0]);
		assert_eq!(first.frames.len(), 1);

		device
			.process_event(&wrap_data_event(
				&TxBuffDoneEvent {
					tx_desc_num: first.tx_desc_num,
					status: 0,
				}
				.encode(),
			))
			.unwrap();

		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 2);
		let second = parse_tx_cmd(&cmds[1]);
		// The A-MPDU byte budget admits exactly three coalesced frames.
		assert_eq!(second.frames.len(), 3);
		assert_eq!(second.tx_desc_num, first.tx_desc_num);
	}

	#[test]
	fn spare_descriptor_borrow_and_return() {
		let device = ap_device(DeviceParams::default());

		let peers: [[u8; 6]; 3] = [
			[0x02, 0, 0, 0, 0, 0x10],
			[0x02, 0, 0, 0, 0, 0x20],
			[0x02, 0, 0, 0, 0, 0x30],
		];
		for mac in &peers {
			device.peer_add(0, mac, false, true).unwrap();
		}

		for mac in &peers {
			device
				.start_xmit(0, ipv4_frame(*mac, OUR_MAC, 0, 200))
				.unwrap();
		}

		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 3);
		let third = parse_tx_cmd(&cmds[2]);
		let spare_desc = third.tx_desc_num as usize;

		{
			let tx = device.tx_state.lock();
			assert_eq!(tx.outstanding(AccessCategory::Be), 3);
			// With two tokens per AC the third allocation is a spare.
			assert!(spare_desc >= 2 * AC_MAX);
			assert_eq!(
				tx.spare_desc_q_map(spare_desc),
				1 << AccessCategory::Be.idx()
			);
		}

		device
			.process_event(&wrap_data_event(
				&TxBuffDoneEvent {
					tx_desc_num: spare_desc as u32,
					status: 0,
				}
				.encode(),
			))
			.unwrap();

		let tx = device.tx_state.lock();
		assert_eq!(tx.outstanding(AccessCategory::Be), 2);
		assert_eq!(tx.spare_desc_q_map(spare_desc), 0);
		assert!(!tx.desc_in_use(spare_desc));
	}

	#[test]
	fn desc_allocator_exhaustion_and_idempotent_free() {
		let params = DeviceParams::default();
		let mut tx = TxState::new(&params);

		let mut taken = Vec::new();
		loop {
			let desc = tx.tx_desc_get(AccessCategory::Be);
			if desc == params.num_tx_tokens {
				break;
			}
			taken.push(desc);
		}
		// Two reserved plus both spares.
		assert_eq!(taken.len(), 4);
		assert_eq!(tx.outstanding(AccessCategory::Be), 4);

		let desc = taken[0];
		tx.tx_desc_free(desc, AccessCategory::Be.idx());
		assert_eq!(tx.outstanding(AccessCategory::Be), 3);
		// Freeing a free descriptor must not touch the counters.
		tx.tx_desc_free(desc, AccessCategory::Be.idx());
		assert_eq!(tx.outstanding(AccessCategory::Be), 3);
	}

	#[test]
	fn reserved_stripe_is_striped_by_ac() {
		let params = DeviceParams::default();
		let mut tx = TxState::new(&params);

		assert_eq!(tx.tx_desc_get(AccessCategory::Bk), 0);
		assert_eq!(tx.tx_desc_get(AccessCategory::Be), 1);
		assert_eq!(tx.tx_desc_get(AccessCategory::Vi), 2);
		assert_eq!(tx.tx_desc_get(AccessCategory::Vo), 3);
		assert_eq!(tx.tx_desc_get(AccessCategory::Mc), 4);
		assert_eq!(tx.tx_desc_get(AccessCategory::Bk), 5);
	}

	#[test]
	fn pending_queue_capacity_drops_excess() {
		let device = ap_device(DeviceParams::default());
		let mac = [0x02, 0, 0, 0, 0, 0x10];
		let peer_id = device.peer_add(0, &mac, false, true).unwrap();

		// Put the client to sleep so everything stays queued.
		device
			.process_event(&wrap_data_event(
				&PmModeEvent {
					wdev_id: 0,
					mac_addr: mac,
					sta_ps_state: 1,
				}
				.encode(),
			))
			.unwrap();

		for _ in 0..MAX_TX_PENDING_QLEN {
			device
				.start_xmit(0, ipv4_frame(mac, OUR_MAC, 0, 100))
				.unwrap();
		}
		assert_eq!(
			device.start_xmit(0, ipv4_frame(mac, OUR_MAC, 0, 100)),
			Err(Error::InsufficientMemory)
		);

		let tx = device.tx_state.lock();
		assert_eq!(tx.pending_len(peer_id, AccessCategory::Be), MAX_TX_PENDING_QLEN);
		assert_eq!(tx.stats.tx_dropped, 1);
	}

	#[test]
	fn ps_mode_queues_until_wakeup() {
		let device = ap_device(DeviceParams::default());
		let mac = [0x02, 0, 0, 0, 0, 0x10];
		device.peer_add(0, &mac, false, true).unwrap();

		let pm = |state: u8| {
			wrap_data_event(
				&PmModeEvent {
					wdev_id: 0,
					mac_addr: mac,
					sta_ps_state: state,
				}
				.encode(),
			)
		};

		device.process_event(&pm(1)).unwrap();
		device
			.start_xmit(0, ipv4_frame(mac, OUR_MAC, 0, 120))
			.unwrap();
		assert!(tx_cmds(&device).is_empty());

		device.process_event(&pm(0)).unwrap();
		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		assert_eq!(parse_tx_cmd(&cmds[0]).frames.len(), 1);
	}

	#[test]
	fn ps_poll_tokens_and_eosp() {
		let device = ap_device(DeviceParams::default());
		let mac = [0x02, 0, 0, 0, 0, 0x10];
		device.peer_add(0, &mac, false, true).unwrap();

		// Sleeping client with three queued frames of distinct sources,
		// so they cannot coalesce.
		device
			.process_event(&wrap_data_event(
				&PmModeEvent {
					wdev_id: 0,
					mac_addr: mac,
					sta_ps_state: 1,
				}
				.encode(),
			))
			.unwrap();
		for src in [0x0au8, 0x0b, 0x0c] {
			let mut our = OUR_MAC;
			our[5] = src;
			device
				.start_xmit(0, ipv4_frame(mac, our, 0, 120))
				.unwrap();
		}

		// The client polls for two frames.
		device
			.process_event(&wrap_data_event(
				&PsGetFramesEvent {
					wdev_id: 0,
					mac_addr: mac,
					num_frames: 2,
				}
				.encode(),
			))
			.unwrap();

		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		let first = parse_tx_cmd(&cmds[0]);
		assert_eq!(first.frames.len(), 1);
		assert!(!first.eosp);

		device
			.process_event(&wrap_data_event(
				&TxBuffDoneEvent {
					tx_desc_num: first.tx_desc_num,
					status: 0,
				}
				.encode(),
			))
			.unwrap();

		// The second (and last) PS token sets EOSP on the final frame.
		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 2);
		let second = parse_tx_cmd(&cmds[1]);
		assert!(second.eosp);

		device
			.process_event(&wrap_data_event(
				&TxBuffDoneEvent {
					tx_desc_num: second.tx_desc_num,
					status: 0,
				}
				.encode(),
			))
			.unwrap();

		// Tokens exhausted and the client is still asleep: the third
		// frame stays queued.
		assert_eq!(tx_cmds(&device).len(), 2);
		let tx = device.tx_state.lock();
		let peer_id = tx.peers.get_id(&mac).unwrap();
		assert_eq!(tx.pending_len(peer_id, AccessCategory::Be), 1);
	}

	fn twt_sleep_event(block: bool) -> Vec<u8> {
		use crate::umac::event::{UmacEvent, encode_ctrl_event};
		let sleep_type = if block {
			TwtSleepType::BlockTx
		} else {
			TwtSleepType::UnblockTx
		};
		encode_ctrl_event(
			UmacEvent::TwtSleep,
			0,
			0,
			&(sleep_type as u32).to_le_bytes(),
		)
	}

	#[test]
	fn twt_sleep_gates_egress() {
		let device = sta_device();

		device.process_event(&twt_sleep_event(true)).unwrap();
		device
			.start_xmit(0, ipv4_frame(BSSID, OUR_MAC, 0, 80))
			.unwrap();
		assert!(tx_cmds(&device).is_empty());

		device.process_event(&twt_sleep_event(false)).unwrap();
		assert_eq!(tx_cmds(&device).len(), 1);
	}

	#[test]
	fn twt_emergency_bypasses_sleep() {
		let device = sta_device();
		device.process_event(&twt_sleep_event(true)).unwrap();

		let mut nwb = ipv4_frame(BSSID, OUR_MAC, 0, 80);
		nwb.set_priority(AC_TWT_PRIORITY_EMERGENCY);
		device.start_xmit(0, nwb).unwrap();

		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		let cmd = parse_tx_cmd(&cmds[0]);
		assert_eq!(cmd.frames.len(), 1);
		assert_ne!(cmd.dscp_or_tos & DSCP_OR_TOS_TWT_EMERGENCY_TX, 0);
	}

	#[test]
	fn gated_head_frame_is_dropped_on_tx_done() {
		let mut params = DeviceParams::default();
		params.num_tx_tokens_per_ac = 1;
		params.num_tx_tokens = AC_MAX;

		let device = Device::new(MockBus::new(), params, Box::new(NullCallbacks));
		device.add_vif(VifType::Station, OUR_MAC).unwrap();
		device.set_vif_bssid(0, BSSID).unwrap();
		device.peer_add(0, &BSSID, false, true).unwrap();

		device
			.start_xmit(0, ipv4_frame(BSSID, OUR_MAC, 0, 80))
			.unwrap();
		device
			.start_xmit(0, ipv4_frame(BSSID, OUR_MAC, 0, 80))
			.unwrap();
		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		let desc = parse_tx_cmd(&cmds[0]).tx_desc_num;

		device.process_event(&twt_sleep_event(true)).unwrap();
		device
			.process_event(&wrap_data_event(
				&TxBuffDoneEvent {
					tx_desc_num: desc,
					status: 0,
				}
				.encode(),
			))
			.unwrap();

		// The queued frame was dequeued while gated and dropped.
		let tx = device.tx_state.lock();
		let peer_id = tx.peers.get_id(&BSSID).unwrap();
		assert_eq!(tx.pending_len(peer_id, AccessCategory::Be), 0);
		assert_eq!(tx.stats.tx_dropped, 1);
		assert!(!tx.desc_in_use(desc as usize));
	}

	#[test]
	fn ap_pending_bitmap_mirrors_queue_state() {
		let device = ap_device(DeviceParams::default());
		let mac = [0x02, 0, 0, 0, 0, 0x10];
		let peer_id = device.peer_add(0, &mac, false, true).unwrap();

		// Sleeping client: the enqueue must set the BE bit in the mirror.
		device
			.process_event(&wrap_data_event(
				&PmModeEvent {
					wdev_id: 0,
					mac_addr: mac,
					sta_ps_state: 1,
				}
				.encode(),
			))
			.unwrap();
		device
			.start_xmit(0, ipv4_frame(mac, OUR_MAC, 0, 100))
			.unwrap();

		let writes = device.bus.mem_writes.lock();
		let bmp_write = writes
			.iter()
			.rfind(|(addr, data)| {
				*addr == crate::peer::pend_q_bmp_addr(peer_id) + ETH_ALEN as u32
					&& data.len() == 1
			})
			.expect("pending bitmap write");
		assert_eq!(bmp_write.1[0], 1 << AccessCategory::Be.idx());
	}

	#[test]
	fn more_data_set_while_frames_remain() {
		let device = ap_device(DeviceParams::default());
		let mac = [0x02, 0, 0, 0, 0, 0x10];
		device.peer_add(0, &mac, false, true).unwrap();

		// Sleeping client accumulates two non-coalescable frames, then
		// polls for one: more frames remain behind it.
		device
			.process_event(&wrap_data_event(
				&PmModeEvent {
					wdev_id: 0,
					mac_addr: mac,
					sta_ps_state: 1,
				}
				.encode(),
			))
			.unwrap();
		for src in [0x0au8, 0x0b] {
			let mut our = OUR_MAC;
			our[5] = src;
			device
				.start_xmit(0, ipv4_frame(mac, our, 0, 100))
				.unwrap();
		}
		device
			.process_event(&wrap_data_event(
				&PsGetFramesEvent {
					wdev_id: 0,
					mac_addr: mac,
					num_frames: 1,
				}
				.encode(),
			))
			.unwrap();

		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		assert!(parse_tx_cmd(&cmds[0]).more_data);
	}

	#[test]
	fn descriptor_accounting_invariant() {
		let device = ap_device(DeviceParams::default());
		let peers: [[u8; 6]; 2] = [[0x02, 0, 0, 0, 0, 1], [0x02, 0, 0, 0, 0, 2]];
		for mac in &peers {
			device.peer_add(0, mac, false, true).unwrap();
		}

		for (i, mac) in peers.iter().enumerate() {
			for _ in 0..=i {
				device
					.start_xmit(0, ipv4_frame(*mac, OUR_MAC, 0, 150))
					.unwrap();
			}
		}

		let tx = device.tx_state.lock();
		let in_use = (0..device.params.num_tx_tokens)
			.filter(|&d| tx.desc_in_use(d))
			.count();
		let busy_lists = tx.pkt_info.iter().filter(|info| !info.pkt.is_empty()).count();
		let outstanding: usize = (0..AC_MAX)
			.map(|ac| tx.outstanding_descs[ac])
			.sum();

		assert_eq!(in_use, busy_lists);
		assert_eq!(in_use, outstanding);
	}

	#[test]
	fn tx_done_clears_buffer_mappings() {
		let device = sta_device();
		device
			.start_xmit(0, ipv4_frame(BSSID, OUR_MAC, 0, 80))
			.unwrap();

		let cmds = tx_cmds(&device);
		let desc = parse_tx_cmd(&cmds[0]).tx_desc_num as usize;
		let max_agg = device.params.max_tx_aggregation;

		assert!(device.tx_state.lock().buf_mapped(desc * max_agg));

		device
			.process_event(&wrap_data_event(
				&TxBuffDoneEvent {
					tx_desc_num: desc as u32,
					status: 0,
				}
				.encode(),
			))
			.unwrap();

		let tx = device.tx_state.lock();
		for frame in 0..max_agg {
			assert!(!tx.buf_mapped(desc * max_agg + frame));
		}
		assert_eq!(device.bus.tx_unmaps.lock().as_slice(), &[desc * max_agg]);
	}

	#[test]
	fn unknown_peer_frame_is_dropped() {
		let device = ap_device(DeviceParams::default());
		assert_eq!(
			device.start_xmit(0, ipv4_frame([0x02, 0, 0, 0, 0, 9], OUR_MAC, 0, 80)),
			Err(Error::DoesNotExist)
		);
		assert_eq!(device.host_stats().tx.tx_dropped, 1);
	}

	#[test]
	fn multicast_on_ap_uses_pseudo_peer() {
		let device = ap_device(DeviceParams::default());
		device.chg_vif_state_test_shortcut();

		device
			.start_xmit(0, ipv4_frame(BCAST, OUR_MAC, 0, 80))
			.unwrap();

		let cmds = tx_cmds(&device);
		assert_eq!(cmds.len(), 1);
		// Multicast rides the MC pseudo-AC reserved stripe.
		assert_eq!(
			parse_tx_cmd(&cmds[0]).tx_desc_num as usize,
			AccessCategory::Mc.idx()
		);
	}

	impl Device<MockBus> {
		/// Enables the broadcast pseudo-peer without the SET_IFFLAGS
		/// round trip.
		fn chg_vif_state_test_shortcut(&self) {
			let mut tx = self.tx_state.lock();
			let _ = tx
				.peers
				.add(&self.bus, VifType::Ap, 0, &BCAST, true, false);
		}
	}
}
