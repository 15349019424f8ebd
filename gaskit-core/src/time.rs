//! Millisecond tick
//!
//! A wrapping 32-bit millisecond counter, the same shape as a SysTick-driven
//! tick. All elapsed-time comparisons go through [`Millis::since`] so a wrap
//! after ~49 days does not disturb timeouts.

/// Millisecond timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u32);

impl Millis {
    /// Milliseconds elapsed from `earlier` to `self`
    pub fn since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}
