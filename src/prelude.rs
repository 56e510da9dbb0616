//! Prelude

pub use crate::dmx::DmxExt as _stm32h5xx_dmx_dmx_DmxExt;
pub use crate::time::U32Ext as _stm32h5xx_dmx_time_U32Ext;

pub use fugit::RateExtU32 as _;
