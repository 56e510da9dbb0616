//! Instance trait implementations and pin routing tables
//!
//! Pin data is taken from the STM32H503 (rm0492) and STM32H56x/H573/H523/
//! H533 (rm0481) datasheets. A routing lookup answers "which alternate
//! function code connects this pin to this instance's TX (or RX) signal";
//! `None` means the pin cannot carry that signal at all.

use cortex_m::interrupt;

use crate::gpio::{Port, PortPin};
use crate::stm32::{Interrupt, RCC, USART1, USART2, USART3};

#[cfg(feature = "rm0481")]
use crate::stm32::{UART4, UART5, USART6};

use super::Instance;

// Implemented by all USART instances
macro_rules! instances {
    ($($USARTX:ident: $apbX:ident),+ $(,)?) => { paste::item! {
        $(
            impl Instance for $USARTX {
                const INTERRUPT: Interrupt = Interrupt::$USARTX;

                fn enable_and_reset() {
                    // unsafe: Owned exclusive access to these bitfields
                    interrupt::free(|_| {
                        let rcc = unsafe { &*RCC::ptr() };
                        rcc.[< $apbX enr >]()
                            .modify(|_, w| w.[< $USARTX:lower en >]().set_bit());
                        rcc.[< $apbX rstr >]()
                            .modify(|_, w| w.[< $USARTX:lower rst >]().set_bit());
                        rcc.[< $apbX rstr >]()
                            .modify(|_, w| w.[< $USARTX:lower rst >]().clear_bit());
                    });
                }

                fn tx_routing(pin: &PortPin) -> Option<u8> {
                    [< $USARTX:lower _tx >](pin)
                }

                fn rx_routing(pin: &PortPin) -> Option<u8> {
                    [< $USARTX:lower _rx >](pin)
                }
            }

            impl crate::Sealed for $USARTX {}
        )+
    }};
}

macro_rules! routing {
    ($($name:ident: [$(($P:ident, $N:literal, $A:literal)),* $(,)?])+) => {
        $(
            fn $name(pin: &PortPin) -> Option<u8> {
                match (pin.port, pin.pin) {
                    $( (Port::$P, $N) => Some($A), )*
                    _ => None,
                }
            }
        )+
    };
}

instances!(USART1: apb2, USART2: apb1l, USART3: apb1l);

#[cfg(feature = "rm0481")]
instances!(UART4: apb1l, UART5: apb1l, USART6: apb1l);

#[cfg(feature = "rm0492")]
routing! {
    usart1_tx: [
        (A, 2, 8), (A, 9, 7), (A, 12, 8), (A, 14, 7), (B, 6, 7), (B, 14, 4),
    ]
    usart1_rx: [
        (A, 1, 8), (A, 10, 7), (A, 11, 8), (A, 13, 7), (B, 7, 7), (B, 15, 4),
    ]
    usart2_tx: [
        (A, 2, 7), (A, 5, 9), (A, 8, 4), (A, 12, 4), (A, 14, 9), (B, 0, 9),
        (B, 4, 13), (C, 6, 13),
    ]
    usart2_rx: [
        (A, 3, 7), (A, 11, 4), (A, 13, 9), (A, 15, 9), (B, 1, 9), (B, 5, 13),
        (B, 15, 13), (C, 7, 13),
    ]
    usart3_tx: [
        (A, 4, 13), (A, 8, 13), (B, 3, 13), (B, 7, 13), (B, 10, 7),
        (C, 10, 7),
    ]
    usart3_rx: [
        (A, 3, 13), (A, 5, 13), (A, 12, 13), (A, 15, 13), (B, 8, 13),
        (C, 4, 7), (C, 11, 7),
    ]
}

#[cfg(feature = "rm0481")]
routing! {
    usart1_tx: [
        (A, 9, 7), (A, 15, 7), (B, 6, 7), (B, 14, 4),
    ]
    usart1_rx: [
        (A, 10, 7), (B, 7, 7), (B, 15, 4),
    ]
    usart2_tx: [
        (A, 2, 7), (B, 0, 7), (D, 5, 7),
    ]
    usart2_rx: [
        (A, 3, 7), (D, 6, 7),
    ]
    usart3_tx: [
        (B, 10, 7), (C, 10, 7), (D, 8, 7),
    ]
    usart3_rx: [
        (B, 1, 7), (C, 4, 7), (C, 11, 7), (D, 9, 7),
    ]
    uart4_tx: [
        (A, 0, 8), (A, 12, 6), (B, 9, 8), (C, 10, 8), (D, 1, 8), (D, 12, 8),
    ]
    uart4_rx: [
        (A, 1, 8), (A, 11, 6), (B, 8, 8), (C, 11, 8), (D, 0, 8), (D, 11, 8),
    ]
    uart5_tx: [
        (B, 3, 14), (B, 6, 14), (B, 13, 14), (C, 12, 8),
    ]
    uart5_rx: [
        (B, 5, 14), (B, 12, 14), (B, 15, 14), (D, 2, 8),
    ]
    usart6_tx: [
        (B, 5, 6), (C, 6, 7), (G, 14, 7),
    ]
    usart6_rx: [
        (B, 6, 6), (C, 7, 7), (G, 9, 7),
    ]
}
