//! Hardware seams. The firmware implements these over its peripherals; tests use closures.

use crate::Period;

/// Reads every touch channel once
pub trait TouchSensor<const N: usize> {
    fn sample(&mut self) -> [u16; N];
}

impl<F, const N: usize> TouchSensor<N> for F
where
    F: FnMut() -> [u16; N],
{
    fn sample(&mut self) -> [u16; N] {
        self()
    }
}

/// Reads one analog channel once
pub trait AnalogSampler {
    fn sample(&mut self) -> u16;
}

impl<F> AnalogSampler for F
where
    F: FnMut() -> u16,
{
    fn sample(&mut self) -> u16 {
        self()
    }
}

/// A hardware timer that raises an interrupt once per period
pub trait PeriodicTimer {
    type Error: core::fmt::Debug;

    /// Arm the timer and enable its interrupt
    fn start(&mut self, period: Period) -> Result<(), Self::Error>;
}
