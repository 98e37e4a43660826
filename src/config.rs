//! Compile-time sizing and protocol constants.

/// Maximum number of virtual interfaces.
pub const MAX_NUM_VIFS: usize = 3;
/// Maximum number of station-like interfaces (STA, P2P client).
pub const MAX_NUM_STAS: usize = 2;
/// Maximum number of AP-like interfaces (AP, P2P GO).
pub const MAX_NUM_APS: usize = 1;

/// Maximum number of real peers. The slot at index `MAX_PEERS` is reserved
/// for the broadcast/multicast pseudo-peer on an AP interface.
pub const MAX_PEERS: usize = 5;
/// Number of software peer slots (real peers plus the pseudo-peer).
pub const MAX_SW_PEERS: usize = MAX_PEERS + 1;

/// Maximum number of RX buffer pools.
pub const MAX_NUM_OF_RX_QUEUES: usize = 3;
/// Headroom reserved in every RX buffer. The first four bytes carry the
/// descriptor id while the buffer is with the RPU.
pub const RX_BUF_HEADROOM: usize = 4;
/// Headroom the RPU needs in front of every TX frame.
pub const TX_BUF_HEADROOM: usize = 52;

/// Bits per word of the TX descriptor bitmap.
pub const TX_DESC_BUCKET_BOUND: usize = 32;
/// Per-(peer, AC) pending queue capacity; enqueues beyond this are dropped.
pub const MAX_TX_PENDING_QLEN: usize = 18;
/// Bits recorded per spare descriptor in the spare queue map.
pub const SPARE_DESC_Q_MAP_SIZE: usize = 4;

/// Default total number of TX descriptors (tokens).
pub const NUM_TX_TOKENS: usize = 12;
/// Default number of frames that may be coalesced into one A-MPDU.
pub const MAX_TX_AGGREGATION: usize = 12;
/// Default A-MPDU byte budget per TX token, headroom included.
pub const AVAIL_AMPDU_LEN_PER_TOKEN: usize = 8768;

/// How long `stats_get` waits for the statistics event.
pub const STATS_RECV_TIMEOUT_MS: u32 = 50;
/// How long `chg_vif_state` waits for `IFFLAGS_STATUS`.
pub const IFFLAGS_TIMEOUT_MS: u32 = 10_000;
/// How long device init/deinit waits for `INIT_DONE`/`DEINIT_DONE`.
pub const FW_INIT_TIMEOUT_MS: u32 = 5_000;

/// RPU hardware bring-up time handed to the firmware, in microseconds.
pub const HW_DELAY_US: u32 = 7300;
/// RPU software bring-up time handed to the firmware, in microseconds.
pub const SW_DELAY_US: u32 = 5000;
/// Beacon loss timeout handed to the firmware, in milliseconds.
pub const BCN_TIMEOUT_MS: u32 = 20_000;

/// Size of the opaque RF parameter blob in the system init command.
pub const RF_PARAMS_SIZE: usize = 200;

/// Base of the RPU memory region mirroring per-peer pending bitmaps (AP).
pub const RPU_MEM_UMAC_PEND_Q_BMP: u32 = 0x0080_A000;
/// One entry of that region: 6 MAC bytes followed by the bitmap byte.
pub const PEND_Q_BMP_ENTRY_LEN: u32 = 7;

/// Network-buffer priority value marking a TWT-emergency frame.
pub const AC_TWT_PRIORITY_EMERGENCY: u8 = 0x80;
/// Flag OR-ed into the TX command TID field for TWT-emergency frames.
pub const DSCP_OR_TOS_TWT_EMERGENCY_TX: u16 = 0x80;

/// Length of an Ethernet MAC address.
pub const ETH_ALEN: usize = 6;
/// Length of an Ethernet header.
pub const ETH_HDR_LEN: usize = 14;
/// Length of the modeled (4-address) IEEE 802.11 MAC header.
pub const IEEE80211_HDR_LEN: usize = 30;
/// Length of an AMSDU sub-frame header (dst, src, length).
pub const AMSDU_HDR_LEN: usize = 14;

// Ethertypes consumed by the TID classifier.
pub const ETH_P_8021Q: u16 = 0x8100;
pub const ETH_P_8021AD: u16 = 0x88A8;
pub const ETH_P_MPLS_UC: u16 = 0x8847;
pub const ETH_P_MPLS_MC: u16 = 0x8848;
pub const ETH_P_IP: u16 = 0x0800;
pub const ETH_P_IPV6: u16 = 0x86DD;
pub const ETH_P_80221: u16 = 0x8917;
pub const ETH_P_AARP: u16 = 0x80F3;
pub const ETH_P_IPX: u16 = 0x8137;
/// Ethertype values below this are 802.3 length fields.
pub const ETH_P_802_3_MIN: u16 = 0x0600;

pub const VLAN_PRIO_SHIFT: u16 = 13;
pub const VLAN_PRIO_MASK: u16 = 0xE000;
pub const MPLS_LS_TC_MASK: u32 = 0x0000_0E00;
pub const MPLS_LS_TC_SHIFT: u32 = 9;
pub const IPV6_TOS_MASK: u16 = 0x0FF0;
pub const IPV6_TOS_SHIFT: u16 = 4;
