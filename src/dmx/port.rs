//! USART binding for the DMX port
//!
//! [`DmxPort`] ties the protocol machines to a concrete USART instance: it
//! performs the one-shot peripheral setup, implements the [`TxLine`] seam
//! with real register and pin accesses, and exposes the interrupt entry
//! point the caller wires to the instance's interrupt line.

use core::ops::Deref;

#[cfg(feature = "log")]
use log::debug;

use crate::gpio::{BoundPin, PortPin};
use crate::stm32::{
    usart1,
    usart1::cr1::{M0, M1, PCE},
    Interrupt,
};
use crate::time::Hertz;

use super::config::{baud_divisor, Config, InvalidConfig};
use super::frame::DmxFrame;
use super::receiver::Receiver;
use super::transmitter::{Transmitter, TxLine};
use super::Error;

mod usart_def;

/// A USART instance usable as a DMX port
pub trait Instance:
    crate::Sealed + Deref<Target = usart1::RegisterBlock>
{
    /// NVIC line of this instance. Unmask it once the port is stowed where
    /// the interrupt handler can reach it.
    const INTERRUPT: Interrupt;

    #[doc(hidden)]
    fn enable_and_reset();

    /// Alternate function code routing `pin` to this instance's TX signal,
    /// if such a routing exists
    #[doc(hidden)]
    fn tx_routing(pin: &PortPin) -> Option<u8>;

    /// Alternate function code routing `pin` to this instance's RX signal,
    /// if such a routing exists
    #[doc(hidden)]
    fn rx_routing(pin: &PortPin) -> Option<u8>;
}

/// DMX port abstraction
///
/// `DEPTH` selects the receive buffering depth; two buffers (one being
/// filled while the consumer holds the other) suit most uses.
pub struct DmxPort<USART, const DEPTH: usize = 2> {
    usart: USART,
    tx_pin: BoundPin,
    rx_pin: BoundPin,
    swapped: bool,
    receiver: Receiver<DEPTH>,
    transmitter: Transmitter,
    tx_frame: DmxFrame,
}

pub trait DmxExt<USART: Instance>: Sized {
    /// Configure this USART as a DMX port
    ///
    /// `pins` is the (TX, RX) pair; both must route to the instance, or the
    /// configuration is rejected. `ker_ck` is the frequency of the kernel
    /// clock currently selected for the instance (PCLK after reset).
    fn dmx_port<const DEPTH: usize>(
        self,
        pins: (PortPin, PortPin),
        config: Config,
        ker_ck: Hertz,
    ) -> Result<DmxPort<USART, DEPTH>, InvalidConfig>;
}

impl<USART: Instance> DmxExt<USART> for USART {
    fn dmx_port<const DEPTH: usize>(
        self,
        pins: (PortPin, PortPin),
        config: Config,
        ker_ck: Hertz,
    ) -> Result<DmxPort<USART, DEPTH>, InvalidConfig> {
        DmxPort::new(self, pins, config, ker_ck)
    }
}

impl<USART: Instance, const DEPTH: usize> DmxPort<USART, DEPTH> {
    fn new(
        usart: USART,
        (tx, rx): (PortPin, PortPin),
        config: Config,
        ker_ck: Hertz,
    ) -> Result<Self, InvalidConfig> {
        let tx_af = USART::tx_routing(&tx).ok_or(InvalidConfig)?;
        let rx_af = USART::rx_routing(&rx).ok_or(InvalidConfig)?;
        let brr = baud_divisor(ker_ck.raw()).ok_or(InvalidConfig)?;

        #[cfg(feature = "log")]
        debug!("DMX: Kernel clock: {ker_ck}; BRR: {brr:#X}");

        USART::enable_and_reset();
        tx.port.enable_clock();
        rx.port.enable_clock();

        let mut port = DmxPort {
            usart,
            tx_pin: BoundPin::bind(tx, tx_af),
            rx_pin: BoundPin::bind(rx, rx_af),
            swapped: config.swap_txrx,
            receiver: Receiver::new(
                config.frame_ready,
                config.rdm_ready,
                config.byte_received,
            ),
            transmitter: Transmitter::new(config.break_bytes),
            tx_frame: DmxFrame::new(),
        };
        port.configure(brr);

        Ok(port)
    }

    /// Runs the port configuration process
    ///
    /// The USART has just been reset when this is called.
    fn configure(&mut self, brr: u16) {
        let usart = &self.usart;

        usart.cr1().reset();
        usart.cr2().reset();
        usart.cr3().reset();

        usart.brr().write(|w| w.brr().set(brr));

        usart.cr2().write(|w| {
            // One stop bit, not the protocol's two: keeps transmitters that
            // shorten the second stop bit from registering as framing
            // errors (which mean "break" here)
            w.stop().stop1();
            w.msbfirst().lsb();

            if self.swapped {
                w.swap().swapped()
            } else {
                w.swap().standard()
            };

            w
        });

        self.tx_pin.setup();
        self.rx_pin.setup();

        // Start from a clean slate: stale flags cleared, only the receive
        // interrupt armed. The transmit-complete interrupt is enabled per
        // transmission.
        usart.icr().write(|w| {
            w.pecf()
                .clear()
                .fecf()
                .clear()
                .necf()
                .clear()
                .orecf()
                .clear()
                .idlecf()
                .clear()
                .tccf()
                .clear()
        });
        usart.cr1().write(|w| {
            w.fifoen()
                .disabled()
                .m1()
                .variant(M1::M0)
                .m0()
                .variant(M0::Bit8)
                .pce()
                .variant(PCE::Disabled)
                .te()
                .enabled()
                .re()
                .enabled()
                .rxneie()
                .enabled()
        });
        usart.cr1().modify(|_, w| w.ue().enabled());
    }

    /// The interrupt service routine body. Wire this to the instance's
    /// interrupt line (see the module-level example); it is driven by the
    /// receive-data and transmit-complete events.
    pub fn handle_interrupt(&mut self) {
        let isr = self.usart.isr().read();

        if isr.rxfne().bit_is_set() || isr.ore().bit_is_set() {
            // reading RDR drops RXNE; with an overrun pending this fetches
            // the last character before the loss
            let byte = (self.usart.rdr().read().rdr().bits() & 0xFF) as u8;

            if let Some(callback) = self.receiver.byte_received {
                callback();
            }

            if isr.ore().bit_is_set() {
                self.usart.icr().write(|w| w.orecf().clear());
                interrupt_clear_clock_sync_delay!(self.usart.isr());
                self.receiver.on_overrun();
            } else if isr.fe().bit_is_set() {
                // Framing error = break condition
                self.usart.icr().write(|w| w.fecf().clear());
                interrupt_clear_clock_sync_delay!(self.usart.isr());
                self.receiver.on_break();
            } else {
                self.receiver.on_byte(byte);
            }
        }

        if isr.tc().bit_is_set()
            && self.usart.cr1().read().tcie().bit_is_set()
        {
            self.usart.icr().write(|w| w.tccf().clear());
            interrupt_clear_clock_sync_delay!(self.usart.isr());

            let mut line = UsartLine {
                usart: &self.usart,
                pin: if self.swapped {
                    &mut self.rx_pin
                } else {
                    &mut self.tx_pin
                },
            };
            self.transmitter.on_transmit_complete(&self.tx_frame, &mut line);
        }
    }

    /// Arm a transmission of `frame`
    ///
    /// Returns [`Error::Busy`] without touching anything if a transmission
    /// is already in flight; the frame is copied into the port's transmit
    /// buffer otherwise and goes out driven entirely by interrupts.
    pub fn send_frame(&mut self, frame: &DmxFrame) -> Result<(), Error> {
        if frame.slot_count() == 0 {
            return Err(Error::Empty);
        }
        if !self.transmitter.is_idle() {
            return Err(Error::Busy);
        }

        self.tx_frame.copy_from(frame);

        let mut line = UsartLine {
            usart: &self.usart,
            pin: if self.swapped {
                &mut self.rx_pin
            } else {
                &mut self.tx_pin
            },
        };
        if self.transmitter.start(&mut line) {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    /// Exchange the RX and TX pin roles (half-duplex topologies)
    ///
    /// The swap happens inside the USART, so both pins keep their alternate
    /// function codes; only the break-generation bookkeeping follows the
    /// role change. The USART is disabled for the duration of the update.
    pub fn swap_pins(&mut self, swap: bool) {
        let usart = &self.usart;

        usart.cr1().modify(|_, w| w.ue().disabled());
        usart.cr1().modify(|_, w| w.re().disabled().te().disabled());

        usart.cr2().modify(|_, w| {
            if swap {
                w.swap().swapped()
            } else {
                w.swap().standard()
            }
        });
        self.swapped = swap;

        usart.cr1().modify(|_, w| w.re().enabled().te().enabled());
        usart.cr1().modify(|_, w| w.ue().enabled());
    }

    /// The most recently published receive frame, as long as it has not
    /// been released
    pub fn last_frame(&mut self) -> Option<&mut DmxFrame> {
        self.receiver.last_frame()
    }

    /// Releases the USART peripheral
    pub fn release(self) -> USART {
        // Wait until both the data register and shift register are empty
        while self.usart.isr().read().tc().bit_is_clear() {}

        self.usart.cr1().modify(|_, w| w.ue().disabled());
        self.usart
    }

    /// Returns a reference to the inner peripheral
    pub fn inner(&self) -> &USART {
        &self.usart
    }
}

/// [`TxLine`] over the real USART and the pin currently carrying the TX
/// role
struct UsartLine<'a, USART> {
    usart: &'a USART,
    pin: &'a mut BoundPin,
}

impl<USART: Instance> TxLine for UsartLine<'_, USART> {
    fn load(&mut self, byte: u8) {
        // NOTE(unsafe) TDR is a 9-bit field; a data byte always fits
        self.usart
            .tdr()
            .write(|w| unsafe { w.tdr().bits(u16::from(byte)) });
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn release(&mut self) {
        self.pin.release();
    }

    fn restore(&mut self) {
        self.pin.restore();
    }

    fn listen(&mut self) {
        self.usart.cr1().modify(|_, w| w.tcie().enabled());
    }

    fn unlisten(&mut self) {
        self.usart
            .cr1()
            .modify(|_, w| w.tcie().disabled().txeie().disabled());
        interrupt_clear_clock_sync_delay!(self.usart.cr1());
    }
}
