use std::sync::MutexGuard;

use crate::config::PairConfig;
use crate::error::{ConfigError, DropReason, Dropped, HeaderError, MtuError, TeardownError};
use crate::frame::{Frame, ETH_HLEN, ETH_ZLEN, MIN_TX_LEN};
use crate::header::{build_header, ipv4_header_len, rewrite_ipv4_subnets, MacAddr};
use crate::host::LinkHost;
use crate::interface::{
    Interface, InterfaceId, InterfaceState, InterfaceStats, InterfaceStatus, LinkState,
    QueueState,
};
use crate::irq::IrqEvents;

/// Two [`Interface`]s joined by a simulated wire, plus the host they report to.
///
/// The pair is owned by the caller (there is no global device table) and every operation
/// takes `&self`, so it can be shared between threads behind an `Arc` as long as the host is
/// `Sync`.
#[derive(Debug)]
pub struct InterfacePair<H> {
    ifaces: [Interface; 2],
    host: H,
    config: PairConfig,
}

impl<H: LinkHost> InterfacePair<H> {
    /// Build both interfaces and preallocate their pools. Both start down.
    pub fn new(config: PairConfig, host: H) -> Result<Self, ConfigError> {
        config.validate()?;
        let ifaces = InterfaceId::ALL.map(|id| Interface::new(id, &config));
        tracing::debug!(pool_size = config.pool_size, "interface pair created");
        Ok(Self {
            ifaces,
            host,
            config,
        })
    }

    pub fn interface(&self, id: InterfaceId) -> &Interface {
        &self.ifaces[id.index()]
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    /// Bring `id` up. The host gets `queue_wake` if the queue can take frames.
    pub fn open(&self, id: InterfaceId) {
        self.interface(id).open();
        self.signal_queue(id, self.interface(id).lock());
    }

    /// Take `id` down. The host gets `queue_stop` if it was last told the queue was running.
    pub fn close(&self, id: InterfaceId) {
        self.interface(id).close();
        self.signal_queue(id, self.interface(id).lock());
    }

    pub fn set_mtu(&self, id: InterfaceId, mtu: usize) -> Result<(), MtuError> {
        self.interface(id).set_mtu(mtu)
    }

    pub fn set_rx_interrupts(&self, id: InterfaceId, enabled: bool) {
        self.interface(id).set_rx_interrupts(enabled);
    }

    pub fn stats(&self, id: InterfaceId) -> InterfaceStats {
        self.interface(id).stats()
    }

    pub fn status(&self, id: InterfaceId) -> InterfaceStatus {
        self.interface(id).status()
    }

    /// Write the Ethernet header `id` would put on an outgoing frame. See [`build_header`].
    pub fn build_header(
        &self,
        id: InterfaceId,
        frame: &mut [u8],
        ether_type: u16,
        dest: Option<MacAddr>,
        source: Option<MacAddr>,
    ) -> Result<usize, HeaderError> {
        let own = self.interface(id).hw_addr();
        build_header(frame, own, ether_type, dest, source)
    }

    /// Send an IPv4-in-Ethernet frame out of `id`.
    ///
    /// The frame is zero-padded to [`ETH_ZLEN`], moved to the other subnet, copied into a
    /// buffer taken from `id`'s pool and queued on the peer. The peer's receive interrupt and
    /// then `id`'s transmit-complete interrupt run before this returns. The buffer goes back to
    /// `id`'s pool once the peer has consumed it.
    pub fn transmit(&self, id: InterfaceId, frame: &[u8]) -> Result<(), Dropped> {
        let len = frame.len();
        if len < MIN_TX_LEN {
            let reason = DropReason::TooShort {
                len,
                min: MIN_TX_LEN,
            };
            return Err(reject(id, &mut self.interface(id).lock(), reason));
        }

        {
            let mut state = self.interface(id).lock();
            if state.link == LinkState::Down {
                return Err(reject(id, &mut state, DropReason::InterfaceDown));
            }
            let max = ETH_HLEN + state.mtu;
            if len > max {
                return Err(reject(id, &mut state, DropReason::FrameTooLarge { len, max }));
            }
        }

        if let Err(err) = ipv4_header_len(frame) {
            return Err(reject(id, &mut self.interface(id).lock(), err.into()));
        }

        let mut buf = self.acquire_tx_buffer(id)?;
        let loaded = buf.load_padded(frame, ETH_ZLEN);
        debug_assert!(loaded, "MTU check admits only frames that fit");
        let rewrite = match rewrite_ipv4_subnets(buf.as_mut_slice()) {
            Ok(rewrite) => rewrite,
            Err(err) => {
                self.release_buffer(buf);
                return Err(reject(id, &mut self.interface(id).lock(), err.into()));
            }
        };

        let peer = id.peer();
        let tx_len = buf.len();
        tracing::debug!(
            iface = %id,
            %peer,
            len = tx_len,
            src = %rewrite.src,
            dst = %rewrite.dst,
            "tx: frame on the wire"
        );

        let mut refused = None;
        let raise_rx = {
            let mut state = self.interface(peer).lock();
            match state.link {
                LinkState::Up => {
                    state.rx_queue.push_back(buf);
                    if state.rx_int_enabled {
                        state.pending |= IrqEvents::RX;
                    }
                    state.rx_int_enabled
                }
                LinkState::Down => {
                    state.stats.rx_dropped += 1;
                    refused = Some(buf);
                    false
                }
            }
        };
        if let Some(buf) = refused {
            tracing::warn!(iface = %peer, len = tx_len, "rx: interface down, frame dropped");
            self.release_buffer(buf);
        }
        if raise_rx {
            self.handle_interrupt(peer, IrqEvents::RX);
        }

        {
            let mut state = self.interface(id).lock();
            state.tx_inflight.packets += 1;
            state.tx_inflight.bytes += tx_len as u64;
            state.pending |= IrqEvents::TX_DONE;
        }
        self.handle_interrupt(id, IrqEvents::TX_DONE);
        Ok(())
    }

    /// Drain up to `budget` frames from `id`'s receive queue, as a NAPI-style poll would when
    /// receive interrupts are disabled. Returns the number of frames processed (delivered or
    /// dropped).
    pub fn poll_rx(&self, id: InterfaceId, budget: usize) -> usize {
        let mut processed = 0;
        while processed < budget {
            if self.handle_interrupt(id, IrqEvents::RX).rx.is_none() {
                break;
            }
            processed += 1;
        }
        tracing::trace!(iface = %id, processed, budget, "rx poll");
        processed
    }

    /// Take a buffer from `id`'s pool. Taking the last one stops `id`'s queue.
    pub(crate) fn acquire_tx_buffer(&self, id: InterfaceId) -> Result<Frame, Dropped> {
        let mut state = self.interface(id).lock();
        let Some(frame) = state.pool.acquire() else {
            return Err(reject(id, &mut state, DropReason::PoolEmpty));
        };
        if state.refresh_queue() == QueueState::Running && state.queue == QueueState::Stopped {
            tracing::warn!(iface = %id, "tx: buffer pool empty, stopping queue");
        }
        self.signal_queue(id, state);
        Ok(frame)
    }

    /// Return a buffer to the pool it came from, waking that interface's queue if this ends an
    /// exhaustion. Must be called with no interface lock held.
    pub(crate) fn release_buffer(&self, frame: Frame) {
        let origin = frame.origin();
        let mut state = self.interface(origin).lock();
        if let Err(frame) = state.pool.release(frame) {
            // Only frames handed out by this pair's pools ever reach here.
            tracing::error!(iface = %origin, slot = frame.slot(), "frame rejected by its pool");
            return;
        }
        if state.refresh_queue() == QueueState::Stopped && state.queue == QueueState::Running {
            tracing::debug!(iface = %origin, "tx: buffer returned, waking queue");
        }
        self.signal_queue(origin, state);
    }

    /// Bring the host's view of `id`'s queue in line with `state.queue`.
    ///
    /// Host callbacks run with the lock released. Only one caller at a time delivers signals
    /// for an interface; a caller that finds another one active just leaves its state change
    /// behind, and the active caller re-reads the state after every callback. The host
    /// therefore sees stop and wake in the order the queue changed and always ends up on the
    /// current state, even if a callback re-enters the pair or another thread releases a
    /// buffer in between.
    fn signal_queue<'a>(&'a self, id: InterfaceId, mut state: MutexGuard<'a, InterfaceState>) {
        if state.signalling {
            return;
        }
        state.signalling = true;
        loop {
            let target = state.queue;
            if target == state.host_queue {
                state.signalling = false;
                return;
            }
            state.host_queue = target;
            drop(state);

            match target {
                QueueState::Stopped => self.host.queue_stop(id),
                QueueState::Running => self.host.queue_wake(id),
            }
            state = self.interface(id).lock();
        }
    }

    /// Close both interfaces, return every queued frame to its pool and hand back the host.
    ///
    /// Fails if any pool is missing frames, which would mean a frame was lost.
    pub fn shutdown(self) -> Result<H, TeardownError> {
        for id in InterfaceId::ALL {
            self.close(id);
        }

        let mut leftovers = Vec::new();
        for id in InterfaceId::ALL {
            leftovers.extend(self.interface(id).lock().rx_queue.drain());
        }
        if !leftovers.is_empty() {
            tracing::info!(frames = leftovers.len(), "discarding undelivered frames");
        }
        for frame in leftovers {
            self.release_buffer(frame);
        }

        for id in InterfaceId::ALL {
            let state = self.interface(id).lock();
            if !state.pool.is_full() {
                return Err(TeardownError::LeakedFrames {
                    iface: id,
                    outstanding: state.pool.in_use(),
                });
            }
        }

        tracing::info!("interface pair torn down");
        Ok(self.host)
    }
}

/// Count a rejected transmit against `id` and build the error.
fn reject(id: InterfaceId, state: &mut InterfaceState, reason: DropReason) -> Dropped {
    state.stats.tx_dropped += 1;
    tracing::warn!(iface = %id, %reason, "tx: frame dropped");
    Dropped { iface: id, reason }
}
