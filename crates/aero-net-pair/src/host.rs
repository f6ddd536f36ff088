use std::sync::Arc;

use crate::interface::InterfaceId;

/// The upper layer sitting on top of both interfaces of a pair.
///
/// This is the boundary a real OS network stack would occupy: it receives frames, and it is
/// told when an interface's transmit queue must pause because the interface ran out of
/// buffers (and when it may resume).
///
/// [`deliver`](LinkHost::deliver), [`queue_stop`](LinkHost::queue_stop) and
/// [`queue_wake`](LinkHost::queue_wake) are invoked with no interface lock held, so
/// implementations may call straight back into the pair (e.g. to transmit a reply).
/// [`alloc_rx_buffer`](LinkHost::alloc_rx_buffer) runs inside the receiving interface's
/// critical section and must not.
pub trait LinkHost {
    /// Hand a received frame to the upper layer of `iface`.
    fn deliver(&self, iface: InterfaceId, frame: Vec<u8>);

    /// `iface` has no free transmit buffers; stop submitting frames to it.
    fn queue_stop(&self, _iface: InterfaceId) {}

    /// `iface` has a free transmit buffer again.
    fn queue_wake(&self, _iface: InterfaceId) {}

    /// Allocate the buffer a received frame of `len` bytes is copied into before delivery.
    ///
    /// Returning `None` models an allocation failure: the frame is counted in `rx_dropped` and
    /// never delivered.
    fn alloc_rx_buffer(&self, _iface: InterfaceId, len: usize) -> Option<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).ok()?;
        Some(buf)
    }
}

/// Discards every frame.
impl LinkHost for () {
    fn deliver(&self, _iface: InterfaceId, _frame: Vec<u8>) {}
}

impl<T: LinkHost + ?Sized> LinkHost for &T {
    fn deliver(&self, iface: InterfaceId, frame: Vec<u8>) {
        <T as LinkHost>::deliver(&**self, iface, frame);
    }

    fn queue_stop(&self, iface: InterfaceId) {
        <T as LinkHost>::queue_stop(&**self, iface);
    }

    fn queue_wake(&self, iface: InterfaceId) {
        <T as LinkHost>::queue_wake(&**self, iface);
    }

    fn alloc_rx_buffer(&self, iface: InterfaceId, len: usize) -> Option<Vec<u8>> {
        <T as LinkHost>::alloc_rx_buffer(&**self, iface, len)
    }
}

impl<T: LinkHost + ?Sized> LinkHost for Box<T> {
    fn deliver(&self, iface: InterfaceId, frame: Vec<u8>) {
        <T as LinkHost>::deliver(&**self, iface, frame);
    }

    fn queue_stop(&self, iface: InterfaceId) {
        <T as LinkHost>::queue_stop(&**self, iface);
    }

    fn queue_wake(&self, iface: InterfaceId) {
        <T as LinkHost>::queue_wake(&**self, iface);
    }

    fn alloc_rx_buffer(&self, iface: InterfaceId, len: usize) -> Option<Vec<u8>> {
        <T as LinkHost>::alloc_rx_buffer(&**self, iface, len)
    }
}

impl<T: LinkHost + ?Sized> LinkHost for Arc<T> {
    fn deliver(&self, iface: InterfaceId, frame: Vec<u8>) {
        <T as LinkHost>::deliver(&**self, iface, frame);
    }

    fn queue_stop(&self, iface: InterfaceId) {
        <T as LinkHost>::queue_stop(&**self, iface);
    }

    fn queue_wake(&self, iface: InterfaceId) {
        <T as LinkHost>::queue_wake(&**self, iface);
    }

    fn alloc_rx_buffer(&self, iface: InterfaceId, len: usize) -> Option<Vec<u8>> {
        <T as LinkHost>::alloc_rx_buffer(&**self, iface, len)
    }
}
