use core::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::config::PairConfig;
use crate::error::MtuError;
use crate::header::MacAddr;
use crate::irq::IrqEvents;
use crate::pool::BufferPool;
use crate::rx_queue::RxQueue;

/// Smallest MTU an IPv4 interface may use (RFC 791).
pub const MIN_MTU: usize = 68;
/// Largest MTU the pair supports (plain Ethernet, no jumbo frames).
pub const MAX_MTU: usize = 1500;

pub(crate) fn validate_mtu(mtu: usize) -> Result<(), MtuError> {
    if (MIN_MTU..=MAX_MTU).contains(&mtu) {
        Ok(())
    } else {
        Err(MtuError::InvalidMtu { mtu })
    }
}

/// Which end of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InterfaceId {
    A,
    B,
}

impl InterfaceId {
    pub const ALL: [InterfaceId; 2] = [InterfaceId::A, InterfaceId::B];

    /// The other end of the wire. `id.peer().peer() == id`.
    pub const fn peer(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "sn0",
            Self::B => "sn1",
        }
    }

    /// Hardware address assigned when the interface is opened. The two differ only in the low
    /// bit of the last octet.
    pub const fn hw_addr(self) -> MacAddr {
        match self {
            Self::A => MacAddr(*b"\0SNUL0"),
            Self::B => MacAddr(*b"\0SNUL1"),
        }
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-interface counters, reset on open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceStats {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    /// Transmits rejected before reaching the wire.
    pub tx_dropped: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    /// Frames that reached this interface but could not be delivered upward.
    pub rx_dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Up,
}

/// Transmit queue state as last signalled to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Running,
    Stopped,
}

/// Point-in-time view of an interface for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceStatus {
    pub id: InterfaceId,
    pub hw_addr: MacAddr,
    pub mtu: usize,
    pub link: LinkState,
    pub queue: QueueState,
    pub rx_interrupts: bool,
    pub pool_available: usize,
    pub pool_capacity: usize,
    pub rx_queue_len: usize,
}

/// Transmits recorded by the TX path but not yet acknowledged by a transmit-complete interrupt.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct InFlightTx {
    pub(crate) packets: u64,
    pub(crate) bytes: u64,
}

/// Everything guarded by the interface lock.
#[derive(Debug)]
pub(crate) struct InterfaceState {
    pub(crate) hw_addr: MacAddr,
    pub(crate) mtu: usize,
    pub(crate) link: LinkState,
    /// Queue state implied by link and pool: Running only while up with a free buffer.
    pub(crate) queue: QueueState,
    /// Queue state the host was last told about.
    pub(crate) host_queue: QueueState,
    /// Set while some caller is delivering queue signals for this interface.
    pub(crate) signalling: bool,
    pub(crate) rx_int_enabled: bool,
    pub(crate) pending: IrqEvents,
    pub(crate) stats: InterfaceStats,
    pub(crate) tx_inflight: InFlightTx,
    pub(crate) pool: BufferPool,
    pub(crate) rx_queue: RxQueue,
}

impl InterfaceState {
    /// Recompute `queue` from the link state and the pool. Returns the previous value.
    pub(crate) fn refresh_queue(&mut self) -> QueueState {
        let previous = self.queue;
        self.queue = if self.link == LinkState::Up && !self.pool.is_empty() {
            QueueState::Running
        } else {
            QueueState::Stopped
        };
        previous
    }
}

/// One end of an [`crate::InterfacePair`].
///
/// All mutable state sits behind a single mutex. Code in this crate never holds the locks of
/// both interfaces at the same time, and never calls into the [`crate::LinkHost`] (other than
/// for receive-buffer allocation) while holding one.
#[derive(Debug)]
pub struct Interface {
    id: InterfaceId,
    state: Mutex<InterfaceState>,
}

impl Interface {
    pub(crate) fn new(id: InterfaceId, config: &PairConfig) -> Self {
        Self {
            id,
            state: Mutex::new(InterfaceState {
                hw_addr: MacAddr::default(),
                mtu: config.mtu,
                link: LinkState::Down,
                queue: QueueState::Stopped,
                host_queue: QueueState::Stopped,
                signalling: false,
                rx_int_enabled: config.rx_interrupts,
                pending: IrqEvents::empty(),
                stats: InterfaceStats::default(),
                tx_inflight: InFlightTx::default(),
                pool: BufferPool::new(id, config.pool_size),
                rx_queue: RxQueue::new(),
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, InterfaceState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Bring the interface up: assign its hardware address, clear counters and pending events,
    /// and start the transmit queue. The host is told by [`crate::InterfacePair::open`].
    pub(crate) fn open(&self) {
        let mut state = self.lock();
        state.hw_addr = self.id.hw_addr();
        state.link = LinkState::Up;
        state.stats = InterfaceStats::default();
        state.pending = IrqEvents::empty();
        state.tx_inflight = InFlightTx::default();
        // Frames still parked in the peer's receive queue keep our pool empty until drained.
        state.refresh_queue();
        tracing::info!(
            iface = %self.id,
            hw_addr = %state.hw_addr,
            mtu = state.mtu,
            pool = state.pool.available(),
            "interface up"
        );
    }

    /// Take the interface down. Further transmits are rejected; frames already handed to the
    /// peer are unaffected.
    pub(crate) fn close(&self) {
        let mut state = self.lock();
        state.link = LinkState::Down;
        state.refresh_queue();
        tracing::info!(iface = %self.id, "interface down");
    }

    pub fn set_mtu(&self, mtu: usize) -> Result<(), MtuError> {
        validate_mtu(mtu)?;
        let mut state = self.lock();
        tracing::debug!(iface = %self.id, old = state.mtu, new = mtu, "mtu changed");
        state.mtu = mtu;
        Ok(())
    }

    pub fn mtu(&self) -> usize {
        self.lock().mtu
    }

    pub fn hw_addr(&self) -> MacAddr {
        self.lock().hw_addr
    }

    /// Enable or disable the receive interrupt. While disabled, incoming frames stay queued
    /// until polled.
    pub fn set_rx_interrupts(&self, enabled: bool) {
        self.lock().rx_int_enabled = enabled;
    }

    pub fn stats(&self) -> InterfaceStats {
        self.lock().stats
    }

    pub fn status(&self) -> InterfaceStatus {
        let state = self.lock();
        InterfaceStatus {
            id: self.id,
            hw_addr: state.hw_addr,
            mtu: state.mtu,
            link: state.link,
            queue: state.queue,
            rx_interrupts: state.rx_int_enabled,
            pool_available: state.pool.available(),
            pool_capacity: state.pool.capacity(),
            rx_queue_len: state.rx_queue.len(),
        }
    }
}
