/// Inserts a double read of a peripheral status register after a write that
/// clears an interrupt flag. Writes to peripheral registers are synchronized
/// on a slower clock than the CPU, so without the delay the ISR can exit
/// before the flag drops and fire a second time immediately.
///
/// See ARM Application Note 321 Section 4.9, and the discussion in the
/// stm32h7xx-hal PRs [`#191`][191] and [`#195`][195].
///
/// [191]: https://github.com/stm32-rs/stm32h7xx-hal/pull/191
/// [195]: https://github.com/stm32-rs/stm32h7xx-hal/pull/195
macro_rules! interrupt_clear_clock_sync_delay {
    ($status_reg:expr) => {
        let _ = $status_reg.read();
        let _ = $status_reg.read();
    };
}
