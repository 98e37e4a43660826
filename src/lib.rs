//! Host-side FMAC layer of a Wi-Fi driver.
//!
//! The crate mediates between an operating-system network interface and a
//! radio co-processor (RPU) that runs the actual MAC/PHY firmware. The host
//! talks to the RPU over an opaque message-passing bus (see [`hal::Bus`]):
//! typed UMAC commands go down, asynchronous events come back up, and data
//! frames travel through bus-mapped buffers owned by the RPU while in flight.
//!
//! The driver owns the transmit and receive data-plane (descriptor
//! accounting, per-peer queueing, A-MPDU coalescing, buffer re-arming), the
//! peer and virtual-interface state, and the command/event protocol. The
//! attached [`crypto`] module drives an on-chip cryptographic accelerator in
//! the same spirit: the host keeps the multipart state machine, the hardware
//! does the math.

#![warn(rust_2018_idioms)]
#![no_std]

#[macro_use]
extern crate alloc;
#[macro_use]
extern crate log;
#[cfg(test)]
#[macro_use]
extern crate std;

pub mod ap;
pub mod callbacks;
pub mod config;
pub mod crypto;
pub mod device;
mod error;
pub mod event;
pub mod hal;
pub mod nbuf;
pub mod peer;
pub mod rx;
#[cfg(test)]
mod testutil;
pub mod tx;
pub mod umac;
pub mod util;
pub mod vif;

pub use self::device::{Device, DeviceParams, RxBufPool};
pub use self::error::Error;
pub use self::nbuf::NetBuf;
