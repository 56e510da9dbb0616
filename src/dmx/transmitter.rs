//! Byte-by-byte frame generation
//!
//! A DMX frame begins with a break (line low for at least two byte times)
//! and a mark-after-break, neither of which a USART can produce as ordinary
//! characters at the working baud rate. The transmitter instead disconnects
//! the TX pin and drives the levels directly, while feeding filler bytes
//! through the now-dangling shift register: the shifter keeps raising its
//! transmit-complete interrupt every byte time, so the break duration is
//! counted in byte times without a separate timer. Once the mark has been
//! driven the pin is handed back to the USART and the start code and slots
//! go out as normal characters.
//!
//! The hardware side is behind the [`TxLine`] seam; the sequencing logic
//! itself has no register knowledge.

use super::frame::DmxFrame;
use super::BREAK_FILL;

/// Hardware operations the transmit sequence is built from
pub(crate) trait TxLine {
    /// Write one byte to the transmit data register
    fn load(&mut self, byte: u8);
    /// Drive the TX-role pin low at the pin level
    fn set_low(&mut self);
    /// Drive the TX-role pin high at the pin level
    fn set_high(&mut self);
    /// Disconnect the TX-role pin from the USART output
    fn release(&mut self);
    /// Reconnect the TX-role pin to the USART output
    fn restore(&mut self);
    /// Enable the transmit-complete interrupt
    fn listen(&mut self);
    /// Disable the transmit interrupt sources
    fn unlisten(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxState {
    Idle,
    /// Counting filler bytes with the pin held low
    Break,
    /// One filler byte with the pin high again
    Mark,
    /// Pin handed back to the USART, start code loaded
    StartCode,
    /// Clocking out data slots
    Slots,
}

pub(crate) struct Transmitter {
    state: TxState,
    cursor: u16,
    break_bytes: u8,
}

impl Transmitter {
    pub(crate) fn new(break_bytes: u8) -> Self {
        Transmitter {
            state: TxState::Idle,
            cursor: 0,
            // the arm call itself loads the first filler byte
            break_bytes: break_bytes.max(1),
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.state == TxState::Idle
    }

    /// Arm a transmission: start the break and the interrupt chain.
    ///
    /// Rejected without side effects unless the machine is idle. The filler
    /// byte loaded here never reaches the disconnected pin; it exists to
    /// make the shifter raise the first transmit-complete interrupt.
    pub(crate) fn start<L: TxLine>(&mut self, line: &mut L) -> bool {
        if self.state != TxState::Idle {
            return false;
        }
        self.state = TxState::Break;
        line.set_low();
        line.release();
        self.cursor = 1;
        line.load(BREAK_FILL);
        line.listen();
        true
    }

    /// Advance the sequence by one transmit-complete event
    pub(crate) fn on_transmit_complete<L: TxLine>(
        &mut self,
        frame: &DmxFrame,
        line: &mut L,
    ) {
        match self.state {
            TxState::Break => {
                line.load(BREAK_FILL);
                self.cursor += 1;
                if self.cursor >= u16::from(self.break_bytes) {
                    self.state = TxState::Mark;
                }
            }
            TxState::Mark => {
                line.set_high();
                line.load(BREAK_FILL);
                self.state = TxState::StartCode;
            }
            TxState::StartCode => {
                line.restore();
                self.cursor = 1;
                line.load(frame.data[0]);
                self.state = TxState::Slots;
            }
            TxState::Slots => {
                if self.cursor < frame.slot_count {
                    line.load(frame.data[usize::from(self.cursor)]);
                    self.cursor += 1;
                    if self.cursor < frame.slot_count {
                        return;
                    }
                }
                self.finish(line);
            }
            // A completion with nothing in flight: quiesce the interrupt
            // source rather than hang with it screaming
            TxState::Idle => self.finish(line),
        }
    }

    fn finish<L: TxLine>(&mut self, line: &mut L) {
        line.unlisten();
        self.state = TxState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Op {
        Load(u8),
        SetLow,
        SetHigh,
        Release,
        Restore,
        Listen,
        Unlisten,
    }

    #[derive(Default)]
    struct MockLine {
        ops: Vec<Op>,
    }

    impl TxLine for MockLine {
        fn load(&mut self, byte: u8) {
            self.ops.push(Op::Load(byte));
        }
        fn set_low(&mut self) {
            self.ops.push(Op::SetLow);
        }
        fn set_high(&mut self) {
            self.ops.push(Op::SetHigh);
        }
        fn release(&mut self) {
            self.ops.push(Op::Release);
        }
        fn restore(&mut self) {
            self.ops.push(Op::Restore);
        }
        fn listen(&mut self) {
            self.ops.push(Op::Listen);
        }
        fn unlisten(&mut self) {
            self.ops.push(Op::Unlisten);
        }
    }

    #[test]
    fn full_transmission_sequence() {
        let mut frame = DmxFrame::new();
        frame.load(0x00, &[0x11, 0x22]).unwrap();

        let mut transmitter = Transmitter::new(3);
        let mut line = MockLine::default();
        assert!(transmitter.start(&mut line));

        // run the interrupt chain to completion
        while !transmitter.is_idle() {
            transmitter.on_transmit_complete(&frame, &mut line);
        }

        assert_eq!(
            line.ops,
            [
                // arm: break level, pin disconnected, chain started
                Op::SetLow,
                Op::Release,
                Op::Load(BREAK_FILL),
                Op::Listen,
                // two more filler bytes complete the three break byte times
                Op::Load(BREAK_FILL),
                Op::Load(BREAK_FILL),
                // mark-after-break
                Op::SetHigh,
                Op::Load(BREAK_FILL),
                // payload
                Op::Restore,
                Op::Load(0x00),
                Op::Load(0x11),
                Op::Load(0x22),
                Op::Unlisten,
            ]
        );
    }

    #[test]
    fn arm_rejected_while_busy() {
        let mut frame = DmxFrame::new();
        frame.load(0x00, &[0x01]).unwrap();

        let mut transmitter = Transmitter::new(2);
        let mut line = MockLine::default();
        assert!(transmitter.start(&mut line));

        let before = line.ops.len();
        assert!(!transmitter.start(&mut line));
        // rejection produces no line activity at all
        assert_eq!(line.ops.len(), before);

        while !transmitter.is_idle() {
            transmitter.on_transmit_complete(&frame, &mut line);
        }
        assert!(transmitter.start(&mut line));
    }

    #[test]
    fn start_code_only_frame_sends_no_stray_slot() {
        let mut frame = DmxFrame::new();
        frame.load(0x55, &[]).unwrap();

        let mut transmitter = Transmitter::new(1);
        let mut line = MockLine::default();
        assert!(transmitter.start(&mut line));
        while !transmitter.is_idle() {
            transmitter.on_transmit_complete(&frame, &mut line);
        }

        assert_eq!(
            line.ops,
            [
                Op::SetLow,
                Op::Release,
                Op::Load(BREAK_FILL),
                Op::Listen,
                // the break-state handler always clocks at least one more
                // filler byte before moving on
                Op::Load(BREAK_FILL),
                Op::SetHigh,
                Op::Load(BREAK_FILL),
                Op::Restore,
                Op::Load(0x55),
                Op::Unlisten,
            ]
        );
    }

    #[test]
    fn spurious_completion_quiesces_the_interrupt() {
        let frame = DmxFrame::new();
        let mut transmitter = Transmitter::new(3);
        let mut line = MockLine::default();

        transmitter.on_transmit_complete(&frame, &mut line);
        assert!(transmitter.is_idle());
        assert_eq!(line.ops, [Op::Unlisten]);
    }
}
