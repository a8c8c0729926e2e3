//! Analog samplers for ADC_IN7 (PA7).
//!
//! The default goes through the HAL. The `raw-adc` feature swaps in a register-polling
//! sampler that keeps the converter powered between samples; both feed the same worker.

use crate::hal::pac;
use sampler::AnalogSampler;

pub const ADC_CHANNEL: u8 = 7;

#[cfg(not(feature = "raw-adc"))]
pub use calibrated::CalibratedAdc;
#[cfg(feature = "raw-adc")]
pub use register::RegisterAdc;

#[cfg(not(feature = "raw-adc"))]
mod calibrated {
    use super::*;
    use crate::hal::adc::{Adc, AdcAlign, AdcPrecision, AdcSampleTime};
    use crate::hal::gpio::{gpioa::PA7, Analog};
    use crate::hal::prelude::*;
    use crate::hal::rcc::Rcc;

    pub struct CalibratedAdc {
        adc: Adc,
        pin: PA7<Analog>,
    }

    impl CalibratedAdc {
        pub fn new(adc: pac::ADC, pin: PA7<Analog>, rcc: &mut Rcc) -> Self {
            let mut adc = Adc::new(adc, rcc);
            adc.set_precision(AdcPrecision::B_12);
            adc.set_align(AdcAlign::Right);
            adc.set_sample_time(AdcSampleTime::T_239);
            Self { adc, pin }
        }
    }

    impl AnalogSampler for CalibratedAdc {
        fn sample(&mut self) -> u16 {
            // The HAL conversion blocks until done and has no error path
            self.adc.read(&mut self.pin).unwrap_or(0)
        }
    }
}

#[cfg(feature = "raw-adc")]
mod register {
    use super::*;

    /// Polls before a start-up step is declared stuck; far longer than any of them take
    const SPIN_LIMIT: u32 = 100_000;

    #[derive(Clone, Copy, Debug, defmt::Format)]
    pub enum AdcError {
        /// HSI14, the converter's kernel clock, never came up
        ClockNotReady,
        CalibrationTimeout,
        EnableTimeout,
        ConversionTimeout,
    }

    /// Spin until `done`, giving up after `SPIN_LIMIT` polls
    fn wait(done: impl Fn() -> bool, err: AdcError) -> Result<(), AdcError> {
        for _ in 0..SPIN_LIMIT {
            if done() {
                return Ok(());
            }
        }
        Err(err)
    }

    pub struct RegisterAdc {
        adc: pac::ADC,
    }

    impl RegisterAdc {
        /// Start the converter clock, calibrate, power up and select `channel`. The pin must
        /// already be in analog mode.
        pub fn new(adc: pac::ADC, channel: u8) -> Result<Self, AdcError> {
            let rccregs = unsafe { pac::Peripherals::steal().RCC };
            rccregs.apb2enr.modify(|_, w| w.adcen().set_bit());

            // CKMODE resets to the asynchronous clock, which is HSI14 and off at reset
            rccregs.cr2.modify(|_, w| w.hsi14on().set_bit());
            wait(|| rccregs.cr2.read().hsi14rdy().bit_is_set(), AdcError::ClockNotReady)?;

            // Calibration only runs with the converter disabled
            adc.cr.modify(|_, w| w.adcal().set_bit());
            wait(|| adc.cr.read().adcal().bit_is_clear(), AdcError::CalibrationTimeout)?;

            // ADRDY is cleared by writing 1
            adc.isr.write(|w| unsafe { w.bits(1) });
            adc.cr.modify(|_, w| w.aden().set_bit());
            wait(|| adc.isr.read().adrdy().bit_is_set(), AdcError::EnableTimeout)?;

            adc.chselr.write(|w| unsafe { w.bits(1 << channel) });

            Ok(Self { adc })
        }
    }

    impl AnalogSampler for RegisterAdc {
        fn sample(&mut self) -> u16 {
            self.adc.cr.modify(|_, w| w.adstart().set_bit());
            let eoc = wait(|| self.adc.isr.read().eoc().bit_is_set(), AdcError::ConversionTimeout);
            if let Err(e) = eoc {
                defmt::warn!("adc: {}", e);
            }
            self.adc.dr.read().data().bits()
        }
    }
}
