//! Bus HAL abstraction.
//!
//! The RPU sits behind an on-chip bus that the driver never touches
//! directly. Everything it needs from that bus is captured by the [`Bus`]
//! trait: sending control and data commands, mapping packet buffers into
//! bus-addressable memory, writing the AP pending-bitmap mirror, and a
//! sleep primitive for the bounded completion waits.
//!
//! A buffer handed to [`Bus::map_tx_buf`]/[`Bus::map_rx_buf`] is owned by
//! the RPU until the matching unmap; the driver must neither access nor
//! free it in that window.

use crate::error::Error;

/// A bus address as seen by the RPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaAddr(pub u64);

/// Kind of message travelling over the data-command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCmdKind {
	Tx,
	Rx,
}

/// The opaque channel to the radio co-processor.
pub trait Bus: Send + Sync {
	/// Sends a control message (system or UMAC command envelope).
	///
	/// Ownership of the bytes stays with the caller; the HAL copies them
	/// out for the duration of the send.
	fn ctrl_cmd_send(&self, msg: &[u8]) -> Result<(), Error>;

	/// Sends a data-path command (TX buffer submit or RX buffer arm).
	fn data_cmd_send(
		&self,
		kind: DataCmdKind,
		msg: &[u8],
		desc_id: usize,
		pool_id: usize,
	) -> Result<(), Error>;

	/// Maps one TX frame into bus-addressable memory.
	///
	/// `desc_id` is the flat buffer-map slot (`token * max_tx_aggregation
	/// + frame_idx`).
	fn map_tx_buf(
		&self,
		data: &[u8],
		desc_id: usize,
		token: usize,
		frame_idx: usize,
	) -> Result<DmaAddr, Error>;

	/// Releases the TX mapping for `desc_id` after `TX_BUFF_DONE`.
	fn unmap_tx_buf(&self, desc_id: usize) -> Result<(), Error>;

	/// Maps one RX buffer into bus-addressable memory.
	fn map_rx_buf(&self, data: &[u8], pool_id: usize, buf_id: usize) -> Result<DmaAddr, Error>;

	/// Releases the RX mapping after the buffer came back in an `RX_BUFF`
	/// event (or on teardown). `data_len` is the number of bytes the RPU
	/// wrote, zero on teardown.
	fn unmap_rx_buf(&self, data_len: usize, pool_id: usize, buf_id: usize) -> Result<(), Error>;

	/// Writes raw bytes into RPU memory (AP pending-bitmap region).
	fn rpu_mem_write(&self, addr: u32, data: &[u8]) -> Result<(), Error>;

	/// Sleeps for at least `ms` milliseconds.
	///
	/// Completion waits poll in 1 ms steps through this hook, so the
	/// embedder decides whether that is a busy-wait or a real sleep.
	fn sleep_ms(&self, ms: u32);
}
