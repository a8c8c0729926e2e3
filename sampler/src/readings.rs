//! Latest values published by a worker, readable from anywhere.
//!
//! Callbacks take no arguments, so whatever they need to know (which value triggered them, the
//! current window mean) is read back from here.

use core::cell::Cell;

use critical_section::Mutex;

use crate::debounce::Channel;
use crate::TouchState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Most recent raw sample
    pub raw: u16,
    /// Mean of the last completed debounce window. Always 0 for analog readings.
    pub mean: u16,
    /// Verdict of the last completed window
    pub detected: bool,
    /// Debounced state
    pub asserted: bool,
}

impl Reading {
    pub const EMPTY: Self = Self {
        raw: 0,
        mean: 0,
        detected: false,
        asserted: false,
    };

    pub const fn sample(raw: u16) -> Self {
        Self {
            raw,
            ..Self::EMPTY
        }
    }
}

impl From<&Channel> for Reading {
    fn from(channel: &Channel) -> Self {
        Self {
            raw: channel.raw,
            mean: channel.mean,
            detected: channel.detected,
            asserted: channel.state == TouchState::Asserted,
        }
    }
}

pub struct Readings<const N: usize> {
    readings: Mutex<Cell<[Reading; N]>>,
}

impl<const N: usize> Readings<N> {
    pub const fn new() -> Self {
        Self {
            readings: Mutex::new(Cell::new([Reading::EMPTY; N])),
        }
    }

    pub fn publish(&self, readings: [Reading; N]) {
        critical_section::with(|cs| self.readings.borrow(cs).set(readings));
    }

    pub fn publish_one(&self, index: usize, reading: Reading) {
        critical_section::with(|cs| {
            let cell = self.readings.borrow(cs);
            let mut readings = cell.get();
            if let Some(slot) = readings.get_mut(index) {
                *slot = reading;
                cell.set(readings);
            }
        });
    }

    pub fn get(&self, index: usize) -> Option<Reading> {
        self.snapshot().get(index).copied()
    }

    pub fn snapshot(&self) -> [Reading; N] {
        critical_section::with(|cs| self.readings.borrow(cs).get())
    }
}

impl<const N: usize> Default for Readings<N> {
    fn default() -> Self {
        Self::new()
    }
}
