use crate::hal;
use crate::hal::pac;
use crate::hal::rcc::Rcc;
use crate::hal::tsc::Tsc;
use sampler::TouchSensor;

#[derive(Clone, Copy, Debug)]
pub struct TscSample {
    pub group: u8,
    pub sample: u8,
    pub channel: u8,
}

/// One pad per group, so all three convert in a single acquisition
pub static TOUCH_PADS: [TscSample; 3] = [
    TscSample { group: 1, sample: 2, channel: 1 }, // Pad 1
    TscSample { group: 2, sample: 3, channel: 1 }, // Pad 2
    TscSample { group: 3, sample: 4, channel: 2 }, // Pad 3
];

/// Capacitive pads read through the touch sensing controller. Counts drop when a pad is touched.
pub struct TouchPads {
    tsc: Tsc,
    max_count: u16,
    pads: &'static [TscSample; 3],
}

impl TouchPads {
    pub fn new(tsc: pac::TSC, rcc: &mut Rcc, pads: &'static [TscSample; 3]) -> Self {
        let config = hal::tsc::Config {
            clock_prescale: None,
            max_count: Some(hal::tsc::MaxCount::U8191),
            charge_transfer_high: None,
            charge_transfer_low: None,
        };
        Self {
            tsc: Tsc::tsc(tsc, rcc, Some(config)),
            max_count: 8191,
            pads,
        }
    }
}

impl TouchPads {
    /// Untouched count of each pad: `samples` acquisitions averaged after `settle` discarded ones.
    /// Run before the sampling timer starts, with nobody touching the pads.
    pub fn reference(&mut self, settle: u16, samples: u16) -> [u16; 3] {
        for _ in 0..settle {
            self.sample();
        }

        let samples = samples.max(1);
        let mut sums = [0u32; 3];
        for _ in 0..samples {
            for (sum, value) in sums.iter_mut().zip(self.sample()) {
                *sum += value as u32;
            }
        }
        sums.map(|sum| (sum / samples as u32) as u16)
    }
}

impl TouchSensor<3> for TouchPads {
    fn sample(&mut self) -> [u16; 3] {
        // The HAL has no way to select several groups at once, so program the IO registers here.
        let regs = unsafe { pac::Peripherals::steal().TSC };

        let mut iogcsr: u32 = 0;
        let mut ioscr: u32 = 0;
        let mut ioccr: u32 = 0;

        for s in self.pads {
            iogcsr |= 1 << (s.group - 1);
            ioscr |= 1 << ((s.group - 1) * 4 + s.sample - 1);
            ioccr |= 1 << ((s.group - 1) * 4 + s.channel - 1);
        }

        regs.iogcsr.write(|w| unsafe { w.bits(iogcsr) });
        regs.ioscr.write(|w| unsafe { w.bits(ioscr) });
        regs.ioccr.write(|w| unsafe { w.bits(ioccr) });

        self.tsc.acquire().ok();

        // A group that hit max count before its sample cap charged has no status bit. Report it
        // as max count + 1, which reads as "not touched".
        let group_status = regs.iogcsr.read().bits() >> 16;

        let mut result = [self.max_count + 1; 3];
        for (value, s) in result.iter_mut().zip(self.pads) {
            if group_status & (1 << (s.group - 1)) != 0 {
                *value = self.tsc.read_unchecked(s.group);
            }
        }

        result
    }
}
