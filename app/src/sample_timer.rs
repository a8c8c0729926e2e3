use crate::hal::pac;
use crate::hal::rcc::Rcc;
use sampler::{Dividers, Period, PeriodicTimer, TimerError};

/// Timer input clock for the APB1 timers
fn timer_clock(rcc: &Rcc) -> u32 {
    // If pclk is prescaled from hclk, the frequency fed into the timers is doubled
    if rcc.clocks.hclk().0 == rcc.clocks.pclk().0 {
        rcc.clocks.pclk().0
    } else {
        rcc.clocks.pclk().0 * 2
    }
}

macro_rules! sample_timer {
    ($name:ident, $TIM:ident, $timen:ident, $max_count:expr) => {
        /// Update interrupt once per sampling period. The prescaler is picked per period, so
        /// slow rates still fit the counter.
        pub struct $name {
            tim: pac::$TIM,
            clk_freq: u32,
        }

        impl $name {
            pub fn new(tim: pac::$TIM, rcc: &Rcc) -> Self {
                let rccregs = unsafe { pac::Peripherals::steal().RCC };
                rccregs.apb1enr.modify(|_, w| w.$timen().set_bit());

                Self {
                    tim,
                    clk_freq: timer_clock(rcc),
                }
            }

            /// Acknowledge the update interrupt. Call first thing in the handler.
            pub fn clear_irq(&mut self) {
                self.tim.sr.write(|w| unsafe { w.bits(0) });
            }
        }

        impl PeriodicTimer for $name {
            type Error = TimerError;

            fn start(&mut self, period: Period) -> Result<(), TimerError> {
                let Dividers { psc, arr } = period.dividers(self.clk_freq, $max_count)?;

                self.tim.cr1.modify(|_, w| w.cen().clear_bit());
                self.tim.psc.write(|w| unsafe { w.bits(psc as u32) });
                self.tim.arr.write(|w| unsafe { w.bits(arr) });
                // Load the prescaler now rather than at the first overflow
                self.tim.egr.write(|w| w.ug().set_bit());
                self.clear_irq();

                self.tim.dier.write(|w| w.uie().set_bit());
                self.tim.cr1.modify(|_, w| w.cen().set_bit().arpe().set_bit());
                Ok(())
            }
        }
    };
}

// TIM2 has a 32 bit counter, TIM3 a 16 bit one
sample_timer!(TouchTimer, TIM2, tim2en, 1u64 << 32);
sample_timer!(AdcTimer, TIM3, tim3en, 1u64 << 16);
