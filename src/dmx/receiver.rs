//! Byte-by-byte frame reconstruction
//!
//! The receiver is fed from the interrupt handler: one call per received
//! byte, plus dedicated entry points for the two line conditions the USART
//! reports alongside a character. A framing error is the protocol's
//! synchronization marker (the break), an overrun means bytes were lost and
//! forces a resync.
//!
//! Under pool exhaustion the machine keeps running with no destination
//! buffer: every buffer access is gated on one being present, surplus bytes
//! fall on the floor, and the next break retries acquisition.

use super::frame::{DmxFrame, FramePool};
use super::{
    ByteCallback, FrameCallback, DMX_START_CODE, DMX_MAX_SLOTS,
    RDM_CHECKSUM_LEN, RDM_MIN_FRAME_LEN, RDM_START_CODE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RxState {
    /// Between frames, or resynchronizing: bytes are discarded
    Idle,
    /// The break has been seen; the next byte is the start code
    StartCode,
    /// Collecting data slots of a lighting (or unknown alternate start
    /// code) frame
    Slots,
    /// Collecting an RDM message, terminated by its declared length
    Rdm,
}

pub(crate) struct Receiver<const DEPTH: usize> {
    state: RxState,
    pool: FramePool<DEPTH>,
    /// Buffer currently being filled; `None` while the pool is exhausted
    current: Option<usize>,
    /// Most recently published buffer
    last: Option<usize>,
    frame_ready: Option<FrameCallback>,
    rdm_ready: Option<FrameCallback>,
    pub(crate) byte_received: Option<ByteCallback>,
}

impl<const DEPTH: usize> Receiver<DEPTH> {
    pub(crate) fn new(
        frame_ready: Option<FrameCallback>,
        rdm_ready: Option<FrameCallback>,
        byte_received: Option<ByteCallback>,
    ) -> Self {
        let mut pool = FramePool::new();
        let current = pool.acquire();
        Receiver {
            state: RxState::Idle,
            pool,
            current,
            last: None,
            frame_ready,
            rdm_ready,
            byte_received,
        }
    }

    /// A framing error: the line was held low across a stop bit, which on a
    /// DMX line is the break preceding a frame.
    ///
    /// Anything already collected is published as-is: the true length of a
    /// frame is only known once the next break arrives, so a short frame is
    /// complete, not broken.
    pub(crate) fn on_break(&mut self) {
        match self.current {
            Some(index) if self.pool.frames[index].slot_count != 0 => {
                self.publish(self.frame_ready);
            }
            // the frame boundary is the natural point to retry after the
            // pool ran dry
            None => self.current = self.pool.acquire(),
            Some(_) => {}
        }
        self.state = RxState::StartCode;
    }

    /// Bytes were dropped by the peripheral; nothing collected so far can
    /// be framed correctly anymore. Discard and wait for the next break.
    pub(crate) fn on_overrun(&mut self) {
        if let Some(index) = self.current {
            self.pool.frames[index].reset();
        }
        self.state = RxState::Idle;
    }

    pub(crate) fn on_byte(&mut self, byte: u8) {
        match self.state {
            // Loose or extra byte
            RxState::Idle => {}
            RxState::StartCode => {
                if let Some(index) = self.current {
                    self.pool.frames[index].begin(byte);
                }
                self.state = match byte {
                    DMX_START_CODE => RxState::Slots,
                    RDM_START_CODE => RxState::Rdm,
                    // Unknown alternate start code: collect it like a
                    // lighting frame, delivered on the terminating break
                    _ => RxState::Slots,
                };
            }
            RxState::Slots => {
                if let Some(index) = self.current {
                    let frame = &mut self.pool.frames[index];
                    frame.push(byte);
                    if frame.slot_count() > DMX_MAX_SLOTS {
                        self.publish(self.frame_ready);
                        self.state = RxState::Idle;
                    }
                }
            }
            RxState::Rdm => {
                if let Some(index) = self.current {
                    let frame = &mut self.pool.frames[index];
                    frame.push(byte);
                    let count = frame.slot_count();
                    // the declared length is garbage until byte 2 has
                    // arrived; the minimum frame length covers that window
                    if count >= frame.rdm_message_length() + RDM_CHECKSUM_LEN
                        && count >= RDM_MIN_FRAME_LEN
                    {
                        self.publish(self.rdm_ready);
                        self.state = RxState::Idle;
                    }
                }
            }
        }
    }

    /// Hand the current buffer to the consumer and line up a replacement.
    ///
    /// Exactly one `used -> valid` transition paired with one acquisition
    /// attempt; with the pool exhausted the receiver continues without a
    /// destination buffer.
    fn publish(&mut self, callback: Option<FrameCallback>) {
        let Some(index) = self.current else { return };
        let frame = &mut self.pool.frames[index];
        frame.used = false;
        frame.valid = true;
        self.last = Some(index);
        self.current = self.pool.acquire();
        if let Some(callback) = callback {
            callback(&mut self.pool.frames[index]);
        }
    }

    /// The most recently published frame, while it is still unreleased
    pub(crate) fn last_frame(&mut self) -> Option<&mut DmxFrame> {
        let index = self.last?;
        let frame = &mut self.pool.frames[index];
        if frame.valid {
            Some(frame)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn feed(receiver: &mut Receiver<2>, bytes: &[u8]) {
        for &byte in bytes {
            receiver.on_byte(byte);
        }
    }

    #[test]
    fn full_frame_is_published_at_max_slots() {
        static FRAMES: AtomicUsize = AtomicUsize::new(0);
        fn count(_: &mut DmxFrame) {
            FRAMES.fetch_add(1, Ordering::Relaxed);
        }

        let mut receiver = Receiver::<2>::new(Some(count), None, None);
        receiver.on_break();

        receiver.on_byte(0x00);
        for slot in 0..512u32 {
            receiver.on_byte(slot as u8);
        }

        assert_eq!(FRAMES.load(Ordering::Relaxed), 1);
        assert_eq!(receiver.state, RxState::Idle);

        let frame = receiver.last_frame().unwrap();
        assert_eq!(frame.slot_count(), 513);
        assert_eq!(frame.start_code(), Some(0x00));
        assert_eq!(frame.slots()[0], 0);
        assert_eq!(frame.slots()[511], 255);
    }

    #[test]
    fn short_frame_is_published_on_break() {
        static FRAMES: AtomicUsize = AtomicUsize::new(0);
        fn count(_: &mut DmxFrame) {
            FRAMES.fetch_add(1, Ordering::Relaxed);
        }

        let mut receiver = Receiver::<2>::new(Some(count), None, None);
        receiver.on_break();
        feed(&mut receiver, &[0x00, 0x42]);

        // the next break terminates the two-byte frame
        receiver.on_break();

        assert_eq!(FRAMES.load(Ordering::Relaxed), 1);
        assert_eq!(receiver.state, RxState::StartCode);
        let frame = receiver.last_frame().unwrap();
        assert_eq!(frame.slot_count(), 2);
        assert_eq!(frame.bytes(), &[0x00, 0x42]);
    }

    #[test]
    fn rdm_message_ends_at_declared_length() {
        static MESSAGES: AtomicUsize = AtomicUsize::new(0);
        static FRAMES: AtomicUsize = AtomicUsize::new(0);
        fn rdm(frame: &mut DmxFrame) {
            MESSAGES.fetch_add(1, Ordering::Relaxed);
            assert_eq!(frame.slot_count(), 26);
            assert_eq!(frame.start_code(), Some(0xCC));
        }
        fn dmx(_: &mut DmxFrame) {
            FRAMES.fetch_add(1, Ordering::Relaxed);
        }

        let mut receiver = Receiver::<2>::new(Some(dmx), Some(rdm), None);
        receiver.on_break();

        // start code, sub start code, message length 24, filler up to the
        // declared length plus checksum
        feed(&mut receiver, &[0xCC, 0x01, 24]);
        for _ in 3..26 {
            receiver.on_byte(0x00);
        }

        assert_eq!(MESSAGES.load(Ordering::Relaxed), 1);
        assert_eq!(FRAMES.load(Ordering::Relaxed), 0);
        assert_eq!(receiver.state, RxState::Idle);
    }

    #[test]
    fn alternate_start_code_collects_as_generic_frame() {
        static FRAMES: AtomicUsize = AtomicUsize::new(0);
        static MESSAGES: AtomicUsize = AtomicUsize::new(0);
        fn dmx(frame: &mut DmxFrame) {
            FRAMES.fetch_add(1, Ordering::Relaxed);
            assert_eq!(frame.start_code(), Some(0x17));
        }
        fn rdm(_: &mut DmxFrame) {
            MESSAGES.fetch_add(1, Ordering::Relaxed);
        }

        let mut receiver = Receiver::<2>::new(Some(dmx), Some(rdm), None);
        receiver.on_break();
        feed(&mut receiver, &[0x17, 1, 2, 3]);
        assert_eq!(receiver.state, RxState::Slots);
        receiver.on_break();

        assert_eq!(FRAMES.load(Ordering::Relaxed), 1);
        assert_eq!(MESSAGES.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn overrun_discards_partial_frame() {
        static FRAMES: AtomicUsize = AtomicUsize::new(0);
        fn count(_: &mut DmxFrame) {
            FRAMES.fetch_add(1, Ordering::Relaxed);
        }

        let mut receiver = Receiver::<2>::new(Some(count), None, None);
        receiver.on_break();
        feed(&mut receiver, &[0x00, 1, 2, 3]);

        receiver.on_overrun();
        assert_eq!(receiver.state, RxState::Idle);

        // bytes after the overrun are discarded, and the emptied buffer is
        // not published by the next break
        feed(&mut receiver, &[4, 5]);
        receiver.on_break();
        assert_eq!(FRAMES.load(Ordering::Relaxed), 0);
        assert_eq!(receiver.state, RxState::StartCode);
    }

    #[test]
    fn exhausted_pool_drops_bytes_and_recovers() {
        let mut receiver = Receiver::<2>::new(None, None, None);

        // publish two short frames without releasing either
        for _ in 0..2 {
            receiver.on_break();
            feed(&mut receiver, &[0x00, 0xEE]);
        }
        receiver.on_break();

        // both buffers are held by the consumer now
        assert_eq!(receiver.current, None);

        // the stream keeps running; nothing to store the bytes in
        feed(&mut receiver, &[0x00, 1, 2, 3]);
        receiver.on_break();
        assert_eq!(receiver.current, None);

        // consumer hands one buffer back; the break after that resumes
        // reception
        receiver.last_frame().unwrap().release();
        receiver.on_break();
        assert!(receiver.current.is_some());

        feed(&mut receiver, &[0x00, 0x99]);
        receiver.on_break();
        let frame = receiver.last_frame().unwrap();
        assert_eq!(frame.bytes(), &[0x00, 0x99]);
    }
}
