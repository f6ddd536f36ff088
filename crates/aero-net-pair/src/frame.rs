use crate::interface::InterfaceId;

/// Length of an Ethernet hardware address.
pub const ETH_ALEN: usize = 6;
/// Length of an Ethernet II header (dst + src + ethertype).
pub const ETH_HLEN: usize = 14;
/// Minimum Ethernet frame length (without FCS). Shorter frames are zero-padded on transmit.
pub const ETH_ZLEN: usize = 60;
/// Maximum Ethernet payload length.
pub const ETH_DATA_LEN: usize = 1500;
/// Capacity of every [`Frame`].
pub const MAX_FRAME_LEN: usize = ETH_HLEN + ETH_DATA_LEN;
/// Length of an IPv4 header without options.
pub const IPV4_MIN_HEADER_LEN: usize = 20;
/// Frames shorter than this cannot carry an Ethernet + IPv4 header and are rejected on transmit.
pub const MIN_TX_LEN: usize = ETH_HLEN + IPV4_MIN_HEADER_LEN;

/// Storage for a single frame moving across the pair.
///
/// Frames are created once by a [`crate::BufferPool`] and are never cloned. At any point a frame
/// is held by exactly one of: its origin pool's free stack, the transmit path, or one
/// [`crate::RxQueue`]. Moving the value is what transfers ownership.
#[derive(Debug)]
pub struct Frame {
    origin: InterfaceId,
    slot: u16,
    len: usize,
    data: Box<[u8]>,
}

impl Frame {
    pub(crate) fn new(origin: InterfaceId, slot: u16) -> Self {
        Self {
            origin,
            slot,
            len: 0,
            data: vec![0u8; MAX_FRAME_LEN].into_boxed_slice(),
        }
    }

    /// Interface whose pool this frame belongs to.
    pub fn origin(&self) -> InterfaceId {
        self.origin
    }

    /// Index of this frame within its origin pool.
    pub fn slot(&self) -> u16 {
        self.slot
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The valid bytes of the frame.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Copy `bytes` into the frame, zero-padding up to `min_len`.
    ///
    /// Returns `false` (leaving the frame untouched) if the result would not fit.
    pub(crate) fn load_padded(&mut self, bytes: &[u8], min_len: usize) -> bool {
        let len = bytes.len().max(min_len);
        if len > self.data.len() {
            return false;
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        self.data[bytes.len()..len].fill(0);
        self.len = len;
        true
    }

    /// Forget the contents before the frame goes back on the free stack.
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_padded_zero_fills_short_payloads() {
        let mut frame = Frame::new(InterfaceId::A, 0);
        // Dirty the storage first so stale bytes would show up in the padding.
        assert!(frame.load_padded(&[0xAA; 64], 0));
        assert!(frame.load_padded(&[1, 2, 3], ETH_ZLEN));

        assert_eq!(frame.len(), ETH_ZLEN);
        assert_eq!(&frame.as_slice()[..3], &[1, 2, 3]);
        assert!(frame.as_slice()[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn load_padded_rejects_oversized_input() {
        let mut frame = Frame::new(InterfaceId::B, 3);
        assert!(!frame.load_padded(&vec![0u8; MAX_FRAME_LEN + 1], ETH_ZLEN));
        assert!(frame.is_empty());

        assert!(frame.load_padded(&vec![7u8; MAX_FRAME_LEN], ETH_ZLEN));
        assert_eq!(frame.len(), MAX_FRAME_LEN);
        assert_eq!(frame.capacity(), MAX_FRAME_LEN);
    }
}
