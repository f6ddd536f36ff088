use crate::frame::Frame;
use crate::interface::InterfaceId;

/// Number of frames per interface when no pool size is configured.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Largest supported pool. Slot indices are stored as `u16`.
pub const MAX_POOL_SIZE: usize = u16::MAX as usize + 1;

/// Fixed-size free stack of [`Frame`]s owned by one interface.
///
/// The pool never grows or shrinks after construction. Frames leave through [`acquire`] and
/// come back through [`release`]; the pool itself knows nothing about queues or interrupts and
/// only reports the empty/non-empty transitions the owning interface needs for backpressure.
///
/// [`acquire`]: BufferPool::acquire
/// [`release`]: BufferPool::release
#[derive(Debug)]
pub struct BufferPool {
    owner: InterfaceId,
    capacity: usize,
    /// Free stack; the head of the free chain is the last element.
    free: Vec<Frame>,
    /// Per-slot flag, `true` while the frame is outside the pool.
    on_loan: Vec<bool>,
}

impl BufferPool {
    /// Preallocate `capacity` frames for `owner`.
    ///
    /// `capacity` is clamped to [`MAX_POOL_SIZE`]; callers validate it up front via
    /// [`crate::PairConfig::validate`].
    pub fn new(owner: InterfaceId, capacity: usize) -> Self {
        let capacity = capacity.min(MAX_POOL_SIZE);
        // Push in reverse so slot 0 is handed out first.
        let free = (0..capacity)
            .rev()
            .map(|slot| Frame::new(owner, slot as u16))
            .collect();
        Self {
            owner,
            capacity,
            free,
            on_loan: vec![false; capacity],
        }
    }

    pub fn owner(&self) -> InterfaceId {
        self.owner
    }

    /// Take the head of the free chain, or `None` if every frame is out.
    pub fn acquire(&mut self) -> Option<Frame> {
        let frame = self.free.pop()?;
        let slot = usize::from(frame.slot());
        debug_assert!(!self.on_loan[slot], "slot {slot} handed out twice");
        self.on_loan[slot] = true;
        Some(frame)
    }

    /// Push a frame back onto the free chain.
    ///
    /// Returns `Ok(true)` if the pool was empty immediately before this release, which is the
    /// condition for waking a stopped transmit queue. A frame this pool did not hand out (other
    /// owner, unknown slot, or a slot that is not on loan) is given back as `Err` and the pool
    /// is left untouched.
    pub fn release(&mut self, mut frame: Frame) -> Result<bool, Frame> {
        let slot = usize::from(frame.slot());
        let on_loan = self.on_loan.get(slot).copied().unwrap_or(false);
        if frame.origin() != self.owner || !on_loan {
            return Err(frame);
        }
        self.on_loan[slot] = false;

        let was_empty = self.free.is_empty();
        frame.clear();
        self.free.push(frame);
        Ok(was_empty)
    }

    /// Frames currently on the free stack.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames currently outside the pool (in flight or sitting in a receive queue).
    pub fn in_use(&self) -> usize {
        self.capacity - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.free.len() == self.capacity
    }
}
