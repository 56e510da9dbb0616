//! DMX512/RDM port driver using USART peripherals
//!
//! This module implements the DMX512 lighting protocol, including reception
//! of RDM (alternate start code `0xCC`) device-management packets, entirely
//! from interrupt context. Every received or transmitted byte is handled in
//! [`DmxPort::handle_interrupt`]; completed frames are handed to callbacks
//! supplied at configuration time, drawn from a fixed pool of reusable
//! buffers. Outgoing frames run to completion without task-context
//! involvement, including the break and mark-after-break preamble, which is
//! generated by detaching the TX pin from the USART and driving it directly
//! while the shift register keeps producing transmit-complete interrupts.
//!
//! # Usage
//!
//! The port is shared between the interrupt handler and task context, so it
//! lives in a critical-section guarded static:
//!
//! ```ignore
//! use stm32h5xx_dmx::dmx::{Config, DmxExt, DmxFrame, DmxPort, Instance};
//! use stm32h5xx_dmx::gpio::{Port, PortPin};
//!
//! static DMX: Mutex<RefCell<Option<DmxPort<pac::USART3>>>> =
//!     Mutex::new(RefCell::new(None));
//!
//! fn on_frame(frame: &mut DmxFrame) {
//!     // consume the slots, then hand the buffer back to the pool
//!     frame.release();
//! }
//!
//! let config = Config::new().on_frame(on_frame);
//! let port = dp.USART3.dmx_port::<2>(
//!     (PortPin::new(Port::D, 8), PortPin::new(Port::D, 9)),
//!     config,
//!     250.MHz(), // USART3 kernel clock
//! )?;
//!
//! cortex_m::interrupt::free(|cs| DMX.borrow(cs).replace(Some(port)));
//! unsafe { cortex_m::peripheral::NVIC::unmask(pac::USART3::INTERRUPT) };
//!
//! #[interrupt]
//! fn USART3() {
//!     cortex_m::interrupt::free(|cs| {
//!         if let Some(port) = DMX.borrow(cs).borrow_mut().as_mut() {
//!             port.handle_interrupt();
//!         }
//!     });
//! }
//! ```
//!
//! Transmission is armed from task context and then driven purely by
//! interrupts:
//!
//! ```ignore
//! let mut frame = DmxFrame::new();
//! frame.load(0x00, &levels)?;
//! cortex_m::interrupt::free(|cs| {
//!     DMX.borrow(cs).borrow_mut().as_mut().unwrap().send_frame(&frame)
//! })?;
//! ```
//!
//! A `send_frame` overlapping an in-flight transmission returns
//! [`Error::Busy`]; retry after the current frame drains. Received buffers
//! stay valid until the consumer calls [`DmxFrame::release`]; a pool that
//! is never released stops producing frames (bytes are dropped until a
//! buffer frees up), it never corrupts one.

use core::fmt::Display;

pub mod config;
mod frame;
mod receiver;
mod transmitter;

#[cfg(feature = "device-selected")]
pub(crate) mod port;

pub use config::Config;
pub use frame::DmxFrame;
#[cfg(feature = "device-selected")]
pub use port::{DmxExt, DmxPort, Instance};

/// DMX operates at a fixed 250 kbaud, 8N1, LSB first
pub const DMX_BAUD: u32 = 250_000;

/// Start code of a standard lighting data frame
pub const DMX_START_CODE: u8 = 0x00;
/// Start code of an RDM device-management frame
pub const RDM_START_CODE: u8 = 0xCC;

/// Data slots per frame, excluding the start code
pub const DMX_MAX_SLOTS: usize = 512;
/// Full frame: start code plus the maximum slot count
pub const DMX_FRAME_LEN: usize = DMX_MAX_SLOTS + 1;

/// Width of the RDM packet checksum, not counted by the declared message
/// length field
pub const RDM_CHECKSUM_LEN: usize = 2;
/// Shortest legal RDM packet on the wire: 24-byte header plus checksum
pub const RDM_MIN_FRAME_LEN: usize = 26;

/// Filler byte clocked through the disconnected shift register while the
/// break and mark are driven at the pin
pub(crate) const BREAK_FILL: u8 = 0x00;

/// Completion callback, loaned the finished frame for the duration of the
/// call; reachable afterwards through `DmxPort::last_frame` until released
pub type FrameCallback = fn(&mut DmxFrame);
/// Per-byte notification, fired before any state processing
pub type ByteCallback = fn();

/// DMX runtime error
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// A transmission is already in flight
    Busy,
    /// The frame holds no bytes at all, not even a start code
    Empty,
    /// More data slots than a DMX frame can carry
    Overlength,
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl core::error::Error for Error {}
