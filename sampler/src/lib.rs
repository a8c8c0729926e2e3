#![cfg_attr(not(test), no_std)]
//! Timer driven acquisition for touch pads and an analog input.
//!
//! Each sampler is a timer interrupt, a [`Notifier`] the interrupt feeds, and a
//! [`Worker`] that wakes on the notifier and runs one round of work per tick.
//! Touch rounds go through a windowed [`Debouncer`]; analog rounds hand every
//! sample straight to the registered callback.

pub mod debounce;
pub mod error;
pub mod notify;
pub mod readings;
pub mod sensor;
pub mod start;
pub mod timing;
pub mod worker;

pub use debounce::{Channel, Debouncer};
pub use error::Error;
pub use notify::{Notifier, Tick};
pub use readings::{Reading, Readings};
pub use sensor::{AnalogSampler, PeriodicTimer, TouchSensor};
pub use start::{start_adc_sampling, start_touch_sampling, Acquisition};
pub use timing::{Dividers, Period, TimerError};
pub use worker::{AdcRound, Clock, Notify, Round, Service, TouchRound, Worker};

/// Debounced state of a touch channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchState {
    #[default]
    Unasserted,
    Asserted,
}

/// Configuration for the touch debouncer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebounceConfig {
    /// Number of raw samples averaged into one verdict. Must be a non-zero power of two, so the
    /// mean is a right shift of the window sum.
    pub window: u16,
    /// A window mean at or below this many raw counts is reported as a touch. Capacitive pads
    /// read lower when touched.
    pub threshold: u16,
}

impl DebounceConfig {
    const fn default() -> Self {
        Self {
            window: 8,
            threshold: 40,
        }
    }

    /// Bits the window sum is shifted right by to get the mean
    pub const fn shift(&self) -> u32 {
        self.window.trailing_zeros()
    }

    /// Threshold `depth` counts below the quietest channel's untouched reference.
    ///
    /// A channel that never completes an acquisition reads full scale, so it never sets the
    /// floor.
    pub fn from_reference(window: u16, reference: &[u16], depth: u16) -> Self {
        let floor = reference.iter().copied().min().unwrap_or(0);
        Self {
            window,
            threshold: floor.saturating_sub(depth),
        }
    }

    pub const fn validate(&self) -> Result<(), Error> {
        if self.window == 0 || !self.window.is_power_of_two() {
            Err(Error::InvalidWindow)
        } else {
            Ok(())
        }
    }
}

pub const DEFAULT_DEBOUNCE_CONFIG: DebounceConfig = DebounceConfig::default();

/// Ticks a notifier holds before further interrupts are counted as overruns
pub const DEFAULT_MAX_PENDING: u16 = 16;
/// Liveness timeout for the touch worker
pub const TOUCH_TIMEOUT_MS: u32 = 1_000;
/// Liveness timeout for the analog worker
pub const ADC_TIMEOUT_MS: u32 = 100_000;
