#![no_std]
//! HeyMac data-link / MAC layer driver
//!
//! HeyMac frames, transmits, and receives short packets between
//! battery-powered LoRa radios built around the Semtech SX127x family.
//! It is distilled from — and deliberately incompatible with —
//! IEEE 802.15.4.
//!
//! # Architecture
//!
//! - [`frame`]: the wire-level frame codec. Field layout is entirely
//!   inferred from a single control byte (`FCTL`); see [`frame::Frame`].
//! - [`command`]: typed MAC commands (text, capability beacon) emplaced
//!   into a frame's payload.
//! - [`radio`]: the SX127x register driver — [`radio::Device`] for raw
//!   SPI/register access, [`radio::Settings`] for the logical
//!   desired/applied field model, [`radio::dio`] for DIO pin decoding,
//!   and [`radio::errata`] for the Rx spurious-reception workaround.
//! - [`mac`]: the event-driven state machine that owns a [`radio::Device`]
//!   and arbitrates listening vs. transmitting.
//! - [`ident`]: node identity and long-address derivation.
//! - [`pool`] / [`queue`]: the fixed-capacity frame buffer pool and the
//!   transmit/receive queues shared between the MAC state machine and the
//!   application.
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use heymac::{frame::Frame, radio::Device};
//!
//! fn build_ping() -> Frame {
//!     let mut frm = Frame::new();
//!     frm.set_protocol(heymac::frame::Pid::CsmaV0);
//!     frm.set_net_id(0x1234);
//!     frm.set_dst_addr16(0x00AB);
//!     frm.set_src_addr16(0xCD00);
//!     frm.set_payload(b"ping").unwrap();
//!     frm
//! }
//! ```

pub mod command;
pub mod frame;
pub mod ident;
pub mod mac;
pub mod pool;
pub mod queue;
pub mod radio;

pub use frame::Frame;
pub use mac::Mac;
pub use radio::Device;

/// Maximum serialised frame size, including the reserved SPI-prefix byte.
pub const FRAME_MAX: usize = 256;

/// Number of buffers held in the fixed frame pool.
pub const FRMBUF_POOL_CNT: usize = 4;

/// Minimum transmit-queue capacity.
pub const TX_QUEUE_CNT: usize = 4;

/// Minimum receive-queue capacity.
pub const RX_QUEUE_CNT: usize = 4;
