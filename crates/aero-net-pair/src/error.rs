use thiserror::Error;

use crate::interface::{InterfaceId, MAX_MTU, MIN_MTU};

/// A transmit that did not make it onto the wire.
///
/// None of these are fatal to the pair; the upper layer decides whether to retry (typically
/// after a `queue_wake` signal for [`DropReason::PoolEmpty`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{iface}: frame dropped: {reason}")]
pub struct Dropped {
    pub iface: InterfaceId,
    pub reason: DropReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    /// Too short to hold an Ethernet and an IPv4 header.
    #[error("frame too short ({len} bytes, need at least {min})")]
    TooShort { len: usize, min: usize },

    /// Every buffer of the sending interface is in flight; the queue has been stopped.
    #[error("transmit buffer pool exhausted")]
    PoolEmpty,

    #[error("interface is down")]
    InterfaceDown,

    /// Payload exceeds the interface MTU.
    #[error("frame of {len} bytes exceeds the {max}-byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("malformed frame: {0}")]
    Malformed(#[from] HeaderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("truncated header: {len} bytes available, {needed} needed")]
    Truncated { len: usize, needed: usize },

    #[error("not an IPv4 packet (version {version})")]
    NotIpv4 { version: u8 },

    #[error("invalid IPv4 header length field {ihl}")]
    BadHeaderLength { ihl: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MtuError {
    #[error("invalid MTU {mtu} (must be within {}..={})", MIN_MTU, MAX_MTU)]
    InvalidMtu { mtu: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid pool size {size} (must be within 1..={max})")]
    InvalidPoolSize { size: usize, max: usize },

    #[error(transparent)]
    InvalidMtu(#[from] MtuError),

    #[error("invalid value {value:?} for env var {var}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TeardownError {
    #[error("{iface}: {outstanding} frame(s) never returned to the pool")]
    LeakedFrames {
        iface: InterfaceId,
        outstanding: usize,
    },
}
