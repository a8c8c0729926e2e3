use crate::{DebounceConfig, Error, TouchState, DEFAULT_DEBOUNCE_CONFIG};

/// Debounce state for one touch pad
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel {
    /// Latest raw sample
    pub raw: u16,
    /// Sum of the samples accumulated into the open window
    pub sum: u32,
    /// Mean of the last completed window
    pub mean: u16,
    /// Verdict of the last completed window
    pub detected: bool,
    pub state: TouchState,
}

impl Channel {
    pub fn asserted(&self) -> bool {
        self.state == TouchState::Asserted
    }
}

pub struct Debouncer<'a, const N: usize> {
    pub channels: [Channel; N],
    /// Samples accumulated into the open window
    pub count: u16,
    config: &'a DebounceConfig,
}

impl<'a, const N: usize> Debouncer<'a, N> {
    /// Fails with `InvalidWindow` unless the window is a non-zero power of two.
    pub fn new(config: Option<&'a DebounceConfig>) -> Result<Self, Error> {
        let config = config.unwrap_or(&DEFAULT_DEBOUNCE_CONFIG);
        config.validate()?;
        Ok(Self {
            channels: [Channel::default(); N],
            count: 0,
            config,
        })
    }

    pub fn config(&self) -> &DebounceConfig {
        self.config
    }

    pub fn active(&self, channel: usize) -> bool {
        self.channels.get(channel).map_or(false, Channel::asserted)
    }

    /// Record a new raw sample for every channel and run edge detection against the verdict of
    /// the last completed window.
    ///
    /// Returns the channels that just went from unasserted to asserted. Their callbacks should
    /// fire once for this press.
    pub fn edges(&mut self, measurements: [u16; N]) -> [bool; N] {
        let mut pressed = [false; N];

        for (i, channel) in self.channels.iter_mut().enumerate() {
            channel.raw = measurements[i];
            channel.state = match (channel.detected, channel.state) {
                (true, TouchState::Unasserted) => {
                    pressed[i] = true;
                    TouchState::Asserted
                }
                (true, TouchState::Asserted) => TouchState::Asserted,
                (false, _) => TouchState::Unasserted,
            };
        }

        pressed
    }

    /// Add the latest raw samples to the open window.
    ///
    /// When the window fills, each channel's mean and verdict are replaced and the window starts
    /// over. Returns true if a window was completed.
    pub fn accumulate(&mut self) -> bool {
        for channel in self.channels.iter_mut() {
            channel.sum += channel.raw as u32;
        }
        self.count += 1;

        if self.count < self.config.window {
            return false;
        }

        let shift = self.config.shift();
        for channel in self.channels.iter_mut() {
            channel.mean = (channel.sum >> shift) as u16;
            channel.sum = 0;
            channel.detected = channel.mean <= self.config.threshold;
        }
        self.count = 0;

        true
    }

    /// Process one timer tick: edge detection, then accumulation.
    pub fn push(&mut self, measurements: [u16; N]) -> [bool; N] {
        let pressed = self.edges(measurements);
        self.accumulate();
        pressed
    }
}
