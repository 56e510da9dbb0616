//! Frame buffers and the receive buffer pool
//!
//! A [`DmxFrame`] holds one complete frame (start code plus up to 512 data
//! slots) together with its pool bookkeeping. RDM messages are carried in
//! the same storage; the declared message length of the RDM header is read
//! straight out of the slot bytes rather than tracked separately.
//!
//! Buffers move through three states: free (`!used && !valid`), being
//! filled by the receiver (`used`), and published to the consumer
//! (`valid`). `used` and `valid` are never set together. Publishing is a
//! handoff, not a ring: a published buffer stays out of circulation until
//! the consumer calls [`DmxFrame::release`].

use super::{Error, DMX_FRAME_LEN, DMX_MAX_SLOTS};

/// One DMX or RDM frame
pub struct DmxFrame {
    pub(crate) data: [u8; DMX_FRAME_LEN],
    pub(crate) slot_count: u16,
    pub(crate) used: bool,
    pub(crate) valid: bool,
}

impl DmxFrame {
    const EMPTY: Self = DmxFrame {
        data: [0; DMX_FRAME_LEN],
        slot_count: 0,
        used: false,
        valid: false,
    };

    /// Create an empty frame, e.g. to build an outgoing transmission
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Fill the frame with a start code and data slots
    pub fn load(&mut self, start_code: u8, slots: &[u8]) -> Result<(), Error> {
        if slots.len() > DMX_MAX_SLOTS {
            return Err(Error::Overlength);
        }
        self.data[0] = start_code;
        self.data[1..=slots.len()].copy_from_slice(slots);
        self.slot_count = slots.len() as u16 + 1;
        Ok(())
    }

    /// Number of populated bytes, start code included
    pub fn slot_count(&self) -> usize {
        usize::from(self.slot_count)
    }

    /// The frame's start code, if any byte has been stored
    pub fn start_code(&self) -> Option<u8> {
        (self.slot_count > 0).then(|| self.data[0])
    }

    /// All populated bytes, start code first
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.slot_count()]
    }

    /// The data slots, without the start code
    pub fn slots(&self) -> &[u8] {
        if self.slot_count == 0 {
            &[]
        } else {
            &self.data[1..self.slot_count()]
        }
    }

    /// Whether the frame is currently published to the consumer
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Hand a published frame back to the pool. Consumer's responsibility;
    /// a pool that is never released stops the receiver from publishing.
    pub fn release(&mut self) {
        self.valid = false;
    }

    /// Declared message length from the RDM header (byte 2). Only
    /// meaningful once at least three bytes are stored; callers guard with
    /// the minimum frame length.
    pub(crate) fn rdm_message_length(&self) -> usize {
        usize::from(self.data[2])
    }

    /// Store the start code
    pub(crate) fn begin(&mut self, byte: u8) {
        self.data[0] = byte;
        self.slot_count = 1;
    }

    /// Append one slot byte
    pub(crate) fn push(&mut self, byte: u8) {
        self.data[self.slot_count()] = byte;
        self.slot_count += 1;
    }

    /// Drop everything collected so far
    pub(crate) fn reset(&mut self) {
        self.slot_count = 0;
    }

    pub(crate) fn copy_from(&mut self, other: &DmxFrame) {
        let count = other.slot_count();
        self.data[..count].copy_from_slice(&other.data[..count]);
        self.slot_count = other.slot_count;
    }
}

impl Default for DmxFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed set of receive buffers
///
/// `DEPTH` is small (two to four buffers); acquisition is a linear scan for
/// the first free entry. `None` from [`acquire`](Self::acquire) is the
/// designed backpressure signal when the consumer holds everything.
pub(crate) struct FramePool<const DEPTH: usize> {
    pub(crate) frames: [DmxFrame; DEPTH],
}

impl<const DEPTH: usize> FramePool<DEPTH> {
    pub(crate) const fn new() -> Self {
        FramePool {
            frames: [DmxFrame::EMPTY; DEPTH],
        }
    }

    /// Claim the first free buffer for the receiver, resetting its slot
    /// count
    pub(crate) fn acquire(&mut self) -> Option<usize> {
        for (index, frame) in self.frames.iter_mut().enumerate() {
            if !frame.used && !frame.valid {
                frame.used = true;
                frame.slot_count = 0;
                return Some(index);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_until_exhausted() {
        let mut pool = FramePool::<3>::new();

        assert_eq!(pool.acquire(), Some(0));
        assert_eq!(pool.acquire(), Some(1));
        assert_eq!(pool.acquire(), Some(2));
        assert_eq!(pool.acquire(), None);
    }

    #[test]
    fn acquire_resets_slot_count() {
        let mut pool = FramePool::<2>::new();
        pool.frames[0].slot_count = 57;

        let index = pool.acquire().unwrap();
        assert_eq!(index, 0);
        assert!(pool.frames[0].used);
        assert_eq!(pool.frames[0].slot_count, 0);
    }

    #[test]
    fn released_buffer_is_reusable() {
        let mut pool = FramePool::<1>::new();

        let index = pool.acquire().unwrap();
        pool.frames[index].used = false;
        pool.frames[index].valid = true;
        assert_eq!(pool.acquire(), None);

        pool.frames[index].release();
        assert_eq!(pool.acquire(), Some(index));
    }

    #[test]
    fn load_rejects_overlength() {
        let mut frame = DmxFrame::new();
        assert_eq!(frame.load(0x00, &[0; 513]), Err(Error::Overlength));

        frame.load(0x00, &[0xAB; 512]).unwrap();
        assert_eq!(frame.slot_count(), 513);
        assert_eq!(frame.start_code(), Some(0x00));
        assert_eq!(frame.slots().len(), 512);
        assert!(frame.slots().iter().all(|&b| b == 0xAB));
    }
}
