use crate::Error;

pub const MICROS_PER_SECOND: u32 = 1_000_000;
/// Largest division a 16 bit timer prescaler can apply
pub const PRESCALER_MAX: u64 = 1 << 16;

/// Why a period can't be produced by a timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Fewer than two timer clocks per period
    PeriodTooShort,
    /// Too long for the prescaler and counter together
    PeriodTooLong,
}

/// Prescaler and auto-reload register values, both already minus one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dividers {
    pub psc: u16,
    pub arr: u32,
}

/// Period of a sampling timer, in whole microseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Period {
    micros: u32,
}

impl Period {
    pub const fn from_micros(micros: u32) -> Result<Self, Error> {
        if micros == 0 {
            Err(Error::InvalidPeriod)
        } else {
            Ok(Self { micros })
        }
    }

    /// Period for a sampling frequency in Hz.
    ///
    /// The period is truncated to whole microseconds, so frequencies that don't divide 1MHz
    /// evenly run slightly fast. Use [`Period::effective_millihertz`] to see the real rate.
    pub const fn from_frequency(hz: u32) -> Result<Self, Error> {
        if hz == 0 || hz > MICROS_PER_SECOND {
            Err(Error::InvalidFrequency)
        } else {
            Ok(Self {
                micros: MICROS_PER_SECOND / hz,
            })
        }
    }

    pub const fn as_micros(&self) -> u32 {
        self.micros
    }

    /// Split the period between a prescaler and a counter of `max_count` values, for a timer
    /// clocked at `clock_hz`.
    ///
    /// The smallest prescaler that divides the period's clock count exactly is used, so the
    /// period stays exact whenever the clock is a whole number of MHz. If no such prescaler
    /// exists the counter is truncated.
    pub fn dividers(&self, clock_hz: u32, max_count: u64) -> Result<Dividers, TimerError> {
        let cycles = clock_hz as u64 * self.micros as u64 / MICROS_PER_SECOND as u64;
        if cycles < 2 {
            return Err(TimerError::PeriodTooShort);
        }

        let min_psc = cycles.div_ceil(max_count).max(1);
        if min_psc > PRESCALER_MAX {
            return Err(TimerError::PeriodTooLong);
        }
        let psc = (min_psc..=PRESCALER_MAX)
            .find(|psc| cycles % psc == 0)
            .unwrap_or(min_psc);

        let reload = cycles / psc;
        if reload < 2 {
            return Err(TimerError::PeriodTooShort);
        }

        Ok(Dividers {
            psc: (psc - 1) as u16,
            arr: (reload - 1) as u32,
        })
    }

    /// Rate the timer actually fires at, in mHz
    pub const fn effective_millihertz(&self) -> u32 {
        // 1e9 still fits a u32
        (MICROS_PER_SECOND * 1000) / self.micros
    }
}
