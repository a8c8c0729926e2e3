/// Errors raised while configuring or starting a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Sampling period of zero microseconds.
    InvalidPeriod,
    /// Sampling frequency of zero, or too high to give a period of at least one microsecond.
    InvalidFrequency,
    /// Debounce window that is zero or not a power of two.
    InvalidWindow,
    /// The timer or sensor backing a sampler failed to start. There is no recovery from this; a
    /// sampler without a clock is dead.
    HardwareInit,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPeriod => f.write_str("sampling period must be at least 1us"),
            Self::InvalidFrequency => f.write_str("sampling frequency must be within 1Hz..=1MHz"),
            Self::InvalidWindow => f.write_str("debounce window must be a non-zero power of two"),
            Self::HardwareInit => f.write_str("sampling hardware failed to start"),
        }
    }
}
