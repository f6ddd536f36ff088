//! A pair of emulated Ethernet interfaces wired back-to-back.
//!
//! Every frame transmitted on one interface is rewritten (the third octet of both IPv4
//! addresses has its low bit flipped, so `192.168.0.x` becomes `192.168.1.x`) and shows up as a
//! received frame on the other interface. There is no medium and no real hardware: the
//! "interrupts" that a NIC would raise for RX and TX completion are plain function calls made
//! synchronously from [`InterfacePair::transmit`].
//!
//! The crate is organised leaves first:
//!
//! - [`Frame`]: fixed-capacity frame storage, always owned by exactly one holder
//! - [`BufferPool`]: per-interface free stack of preallocated frames
//! - [`RxQueue`]: per-interface FIFO of frames waiting to be delivered upward
//! - [`IrqEvents`] and [`InterfacePair::handle_interrupt`]: the simulated interrupt line
//! - [`Interface`]: lifecycle, MTU, statistics and the per-interface lock
//! - [`InterfacePair`]: the cross-wiring plus the transmit path
//!
//! The host side (the "upper layer" that receives frames and reacts to queue stop/wake
//! signals) is abstracted by [`LinkHost`].
#![forbid(unsafe_code)]

mod config;
mod error;
mod frame;
mod header;
mod host;
mod interface;
mod irq;
mod pair;
mod pool;
mod rx_queue;

pub use config::PairConfig;
pub use error::{ConfigError, DropReason, Dropped, HeaderError, MtuError, TeardownError};
pub use frame::{
    Frame, ETH_ALEN, ETH_DATA_LEN, ETH_HLEN, ETH_ZLEN, IPV4_MIN_HEADER_LEN, MAX_FRAME_LEN,
    MIN_TX_LEN,
};
pub use header::{
    build_header, ipv4_header_checksum, ipv4_header_len, rewrite_ipv4_subnets, MacAddr,
    SubnetRewrite, ETHERTYPE_ARP, ETHERTYPE_IPV4,
};
pub use host::LinkHost;
pub use interface::{
    Interface, InterfaceId, InterfaceStats, InterfaceStatus, LinkState, QueueState, MAX_MTU,
    MIN_MTU,
};
pub use irq::{IrqEvents, IrqReport, RxOutcome};
pub use pair::InterfacePair;
pub use pool::{BufferPool, DEFAULT_POOL_SIZE, MAX_POOL_SIZE};
pub use rx_queue::RxQueue;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod proptests;
