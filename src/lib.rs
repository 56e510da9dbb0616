#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(non_camel_case_types)]

//! DMX512/RDM port driver for the STM32H5 USART peripherals.
//!
//! The protocol core (frame buffers, the receive state machine and the
//! transmit state machine in [`dmx`]) is hardware independent and always
//! built (and unit tested on the host). Binding it to a USART instance
//! requires selecting one of the device features:
//!
//! ```text
//! stm32h503 stm32h523 stm32h533 stm32h562 stm32h563 stm32h573
//! ```

#[cfg(all(feature = "rm0492", feature = "rm0481"))]
compile_error!("Cannot not select both rm0492 and rm0481");

#[cfg(feature = "stm32h503")]
pub use stm32h5::stm32h503 as stm32;

#[cfg(feature = "stm32h523")]
pub use stm32h5::stm32h523 as stm32;

#[cfg(feature = "stm32h533")]
pub use stm32h5::stm32h533 as stm32;

#[cfg(feature = "stm32h562")]
pub use stm32h5::stm32h562 as stm32;

#[cfg(feature = "stm32h563")]
pub use stm32h5::stm32h563 as stm32;

#[cfg(feature = "stm32h573")]
pub use stm32h5::stm32h573 as stm32;

#[cfg(feature = "device-selected")]
pub use crate::stm32 as pac;
#[cfg(feature = "device-selected")]
pub use crate::stm32 as device;

// Enable use of interrupt macro
#[cfg(all(feature = "device-selected", feature = "rt"))]
#[cfg_attr(docsrs, doc(cfg(feature = "rt")))]
pub use crate::stm32::interrupt;

#[cfg(feature = "device-selected")]
pub mod prelude;

#[cfg(feature = "device-selected")]
#[macro_use]
mod macros;

#[cfg(feature = "device-selected")]
pub mod time;

#[cfg(feature = "device-selected")]
pub mod gpio;

pub mod dmx;

#[cfg(feature = "device-selected")]
mod sealed {
    pub trait Sealed {}
}

#[cfg(feature = "device-selected")]
pub(crate) use sealed::Sealed;
