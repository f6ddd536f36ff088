use std::collections::VecDeque;

use crate::frame::Frame;
use crate::interface::InterfaceId;

/// FIFO of frames waiting to be handed to the upper layer of the receiving interface.
///
/// Frames in the queue still belong to the *sending* interface's pool; they go back there once
/// the receive path has copied them upward.
#[derive(Debug, Default)]
pub struct RxQueue {
    frames: VecDeque<Frame>,
}

impl RxQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    pub fn pop_front(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of queued frames borrowed from `origin`'s pool.
    pub fn count_from(&self, origin: InterfaceId) -> usize {
        self.frames.iter().filter(|f| f.origin() == origin).count()
    }

    /// Remove every queued frame, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BufferPool;

    #[test]
    fn pops_in_enqueue_order() {
        let mut pool = BufferPool::new(InterfaceId::A, 4);
        let mut queue = RxQueue::new();

        let mut pushed = Vec::new();
        while let Some(frame) = pool.acquire() {
            pushed.push(frame.slot());
            queue.push_back(frame);
        }

        let popped: Vec<_> = std::iter::from_fn(|| queue.pop_front())
            .map(|f| f.slot())
            .collect();
        assert_eq!(popped, pushed);
        assert!(queue.is_empty());
    }

    #[test]
    fn count_from_filters_by_origin_pool() {
        let mut a = BufferPool::new(InterfaceId::A, 2);
        let mut b = BufferPool::new(InterfaceId::B, 2);
        let mut queue = RxQueue::new();

        queue.push_back(a.acquire().unwrap());
        queue.push_back(b.acquire().unwrap());
        queue.push_back(a.acquire().unwrap());

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.count_from(InterfaceId::A), 2);
        assert_eq!(queue.count_from(InterfaceId::B), 1);

        for frame in queue.drain() {
            let released = match frame.origin() {
                InterfaceId::A => a.release(frame),
                InterfaceId::B => b.release(frame),
            };
            assert!(released.is_ok());
        }
        assert!(a.is_full() && b.is_full());
    }
}
