//! Simulated interrupt line of each interface.
//!
//! A real NIC raises an interrupt when a frame lands in its receive ring or when a transmit
//! finishes. Here both are synchronous calls made by the transmit path (or by
//! [`InterfacePair::poll_rx`]) into [`InterfacePair::handle_interrupt`].

use bitflags::bitflags;

use crate::host::LinkHost;
use crate::interface::{InterfaceId, LinkState};
use crate::pair::InterfacePair;

bitflags! {
    /// Pending interrupt causes. Lower bits are serviced first.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct IrqEvents: u16 {
        /// A frame is waiting in the receive queue.
        const RX = 0x0001;
        /// A transmit has left the interface.
        const TX_DONE = 0x0002;
    }
}

/// What happened to the frame popped by a receive interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxOutcome {
    Delivered { len: usize },
    /// No upward buffer could be allocated (or the interface is down); counted in `rx_dropped`.
    Dropped { len: usize },
}

/// Work done by one [`InterfacePair::handle_interrupt`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IrqReport {
    /// `None` if the receive bit was clear or the receive queue was empty.
    pub rx: Option<RxOutcome>,
    /// Transmits acknowledged by this interrupt.
    pub tx_completed: u64,
}

impl<H: LinkHost> InterfacePair<H> {
    /// Service `events` plus anything already pending on `id`.
    ///
    /// Pending events are snapshotted and cleared under the interface lock, and statistics are
    /// updated there. Upward delivery and the return of the receive buffer to its pool (which
    /// may wake the sender's queue) happen only after the lock has been dropped.
    pub fn handle_interrupt(&self, id: InterfaceId, events: IrqEvents) -> IrqReport {
        let mut report = IrqReport::default();
        let mut upward = None;
        let mut release = None;

        {
            let mut state = self.interface(id).lock();
            let status = state.pending | events;
            state.pending = IrqEvents::empty();
            tracing::trace!(iface = %id, ?status, "interrupt");

            if status.contains(IrqEvents::RX) {
                if let Some(frame) = state.rx_queue.pop_front() {
                    let len = frame.len();
                    let buf = match state.link {
                        LinkState::Up => self.host().alloc_rx_buffer(id, len),
                        LinkState::Down => None,
                    };
                    match buf {
                        Some(mut buf) => {
                            buf.clear();
                            buf.extend_from_slice(frame.as_slice());
                            state.stats.rx_packets += 1;
                            state.stats.rx_bytes += len as u64;
                            report.rx = Some(RxOutcome::Delivered { len });
                            upward = Some(buf);
                        }
                        None => {
                            state.stats.rx_dropped += 1;
                            report.rx = Some(RxOutcome::Dropped { len });
                            tracing::warn!(iface = %id, len, link = ?state.link, "rx: frame dropped");
                        }
                    }
                    release = Some(frame);
                }
            }

            if status.contains(IrqEvents::TX_DONE) {
                let done = std::mem::take(&mut state.tx_inflight);
                state.stats.tx_packets += done.packets;
                state.stats.tx_bytes += done.bytes;
                report.tx_completed = done.packets;
            }
        }

        if let Some(buf) = upward {
            tracing::debug!(iface = %id, len = buf.len(), "rx: delivering frame");
            self.host().deliver(id, buf);
        }
        if let Some(frame) = release {
            self.release_buffer(frame);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::PairConfig;
    use crate::frame::ETH_ZLEN;

    #[test]
    fn rx_is_serviced_before_tx_done_in_one_call() {
        let pair = InterfacePair::new(PairConfig::default(), ()).unwrap();
        pair.open(InterfaceId::A);
        pair.open(InterfaceId::B);

        // Park a frame in A's receive queue and a finished transmit in A's in-flight record.
        let frame = pair.acquire_tx_buffer(InterfaceId::B).unwrap();
        {
            let mut state = pair.interface(InterfaceId::A).lock();
            state.rx_queue.push_back(frame);
            state.tx_inflight.packets = 1;
            state.tx_inflight.bytes = 60;
            state.pending = IrqEvents::TX_DONE;
        }

        let report = pair.handle_interrupt(InterfaceId::A, IrqEvents::RX);
        assert_eq!(report.rx, Some(RxOutcome::Delivered { len: 0 }));
        assert_eq!(report.tx_completed, 1);

        let stats = pair.stats(InterfaceId::A);
        assert_eq!(stats.rx_packets, 1);
        assert_eq!(stats.tx_packets, 1);
        assert_eq!(stats.tx_bytes, ETH_ZLEN as u64);
        // The received frame went back to B's pool, outside A's lock.
        assert_eq!(pair.status(InterfaceId::B).pool_available, 8);
        assert!(pair.interface(InterfaceId::A).lock().pending.is_empty());
    }

    #[test]
    fn empty_receive_queue_is_a_no_op() {
        let pair = InterfacePair::new(PairConfig::default(), ()).unwrap();
        pair.open(InterfaceId::B);

        let report = pair.handle_interrupt(InterfaceId::B, IrqEvents::RX);
        assert_eq!(report, IrqReport::default());
        assert_eq!(pair.stats(InterfaceId::B), Default::default());
    }
}
