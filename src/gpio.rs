//! Pin identification and direct pin control
//!
//! DMX break generation needs to drive the transmit pin below the USART: the
//! pin is taken away from its alternate function, driven low as a plain
//! output for the break, and handed back for the serial payload. The types
//! here carry just enough information to do that: a GPIO port and pin
//! number, plus the alternate function code resolved from the per-instance
//! routing tables at port initialization.

use cortex_m::interrupt;

use crate::stm32::RCC;

/// GPIO port name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
    D,
    #[cfg(feature = "rm0481")]
    E,
    #[cfg(feature = "rm0481")]
    F,
    #[cfg(feature = "rm0481")]
    G,
    H,
    #[cfg(feature = "h56x_h573")]
    I,
}

impl Port {
    pub(crate) const fn ptr(self) -> *const crate::pac::gpioa::RegisterBlock {
        match self {
            Port::A => crate::pac::GPIOA::ptr(),
            Port::B => crate::pac::GPIOB::ptr() as _,
            Port::C => crate::pac::GPIOC::ptr() as _,
            Port::D => crate::pac::GPIOD::ptr() as _,
            #[cfg(feature = "rm0481")]
            Port::E => crate::pac::GPIOE::ptr() as _,
            #[cfg(feature = "rm0481")]
            Port::F => crate::pac::GPIOF::ptr() as _,
            #[cfg(feature = "rm0481")]
            Port::G => crate::pac::GPIOG::ptr() as _,
            Port::H => crate::pac::GPIOH::ptr() as _,
            #[cfg(feature = "h56x_h573")]
            Port::I => crate::pac::GPIOI::ptr() as _,
        }
    }

    /// Enable the AHB2 clock for this GPIO port
    pub(crate) fn enable_clock(self) {
        // unsafe: Owned exclusive access to this bitfield
        interrupt::free(|_| {
            let enr = unsafe { &(*RCC::ptr()).ahb2enr() };
            enr.modify(|_, w| match self {
                Port::A => w.gpioaen().set_bit(),
                Port::B => w.gpioben().set_bit(),
                Port::C => w.gpiocen().set_bit(),
                Port::D => w.gpioden().set_bit(),
                #[cfg(feature = "rm0481")]
                Port::E => w.gpioeen().set_bit(),
                #[cfg(feature = "rm0481")]
                Port::F => w.gpiofen().set_bit(),
                #[cfg(feature = "rm0481")]
                Port::G => w.gpiogen().set_bit(),
                Port::H => w.gpiohen().set_bit(),
                #[cfg(feature = "h56x_h573")]
                Port::I => w.gpioien().set_bit(),
            });
        });
    }
}

/// A (port, pin number) pair naming a physical pin
///
/// ```ignore
/// let tx = PortPin::new(Port::D, 8); // PD8
/// let rx = PortPin::new(Port::D, 9); // PD9
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortPin {
    pub(crate) port: Port,
    pub(crate) pin: u8,
}

impl PortPin {
    /// Name a pin by port and pin number
    ///
    /// Panics if `pin` is not in `0..16`.
    pub const fn new(port: Port, pin: u8) -> Self {
        assert!(pin < 16);
        PortPin { port, pin }
    }
}

/// A pin bound to a USART signal: its routing has been resolved to an
/// alternate function code and the pin can be flipped between that function
/// and direct output control.
pub(crate) struct BoundPin {
    port: Port,
    pin: u8,
    af: u8,
}

impl BoundPin {
    pub(crate) fn bind(pin: PortPin, af: u8) -> Self {
        BoundPin {
            port: pin.port,
            pin: pin.pin,
            af,
        }
    }

    fn block(&self) -> &crate::pac::gpioa::RegisterBlock {
        unsafe { &*self.port.ptr() }
    }

    /// Program the alternate function code and connect the pin to it.
    ///
    /// The AFR code stays programmed from here on; [`release`](Self::release)
    /// and [`restore`](Self::restore) only flip MODER.
    pub(crate) fn setup(&mut self) {
        let shift = u32::from(self.pin % 8) * 4;
        let mask = !(0xF << shift);
        let value = u32::from(self.af) << shift;
        // NOTE(unsafe) plain 4-bit field update; the PAC has no field
        // accessor spanning both AFR registers
        if self.pin < 8 {
            self.block()
                .afrl()
                .modify(|r, w| unsafe { w.bits((r.bits() & mask) | value) });
        } else {
            self.block()
                .afrh()
                .modify(|r, w| unsafe { w.bits((r.bits() & mask) | value) });
        }
        self.restore();
    }

    /// Drives the pin high
    pub(crate) fn set_high(&mut self) {
        // BSRR writes are atomic; no read-modify-write
        self.block().bsrr().write(|w| w.bs(self.pin).set_bit());
    }

    /// Drives the pin low
    pub(crate) fn set_low(&mut self) {
        self.block().bsrr().write(|w| w.br(self.pin).set_bit());
    }

    /// Disconnect the pin from the peripheral: general-purpose output,
    /// driving whatever level was last set
    pub(crate) fn release(&mut self) {
        self.block()
            .moder()
            .modify(|_, w| w.mode(self.pin).output());
    }

    /// Reconnect the pin to its alternate function
    pub(crate) fn restore(&mut self) {
        self.block()
            .moder()
            .modify(|_, w| w.mode(self.pin).alternate());
    }
}
