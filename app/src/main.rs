#![no_main]
#![no_std]

use core::fmt::Write;
use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::{entry, exception};
use defmt_rtt as _;
use panic_halt as _;

use sampler::{start_adc_sampling, start_touch_sampling, Acquisition, Clock, DebounceConfig};
use stm32f0xx_hal as hal;

use crate::hal::pac;
use crate::hal::pac::interrupt;
use crate::hal::prelude::*;
use crate::sample_timer::{AdcTimer, TouchTimer};
use crate::touch_pads::{TouchPads, TOUCH_PADS};

mod adc;
mod console;
mod sample_timer;
mod touch_pads;

/// ADC sampling frequency in Hz
const SAMPLING_FREQ: u32 = 256;
/// Touch pad sampling period in microseconds
const TOUCH_PERIOD_US: u32 = 10_000;

const TIMER_IRQ_PRIO: u8 = 0x40;
const SERIAL_IRQ_PRIO: u8 = 0x80;

/// Samples averaged into each touch verdict
const TOUCH_WINDOW: u16 = 8;
/// Counts below the untouched reference that read as a touch
const TOUCH_DEPTH: u16 = 100;
/// Acquisitions discarded while the pads settle, then averaged into the reference
const CALIBRATION_DELAY: u16 = 10;
const CALIBRATION_SAMPLES: u16 = 16;

static TOUCH: Acquisition<3> = Acquisition::new(sampler::DEFAULT_MAX_PENDING);
static ADC: Acquisition<1> = Acquisition::new(sampler::DEFAULT_MAX_PENDING);
static TIME: AtomicU32 = AtomicU32::new(0);

/// SysTick millisecond count; the main loop sleeps between interrupts
struct SysTickClock;

impl Clock for SysTickClock {
    fn now_ms(&self) -> u32 {
        TIME.load(Ordering::Relaxed)
    }

    fn idle(&self, woken: &dyn Fn() -> bool) {
        // A pending interrupt still ends wfi with PRIMASK set; it runs once unmasked
        cortex_m::interrupt::disable();
        if !woken() {
            cortex_m::asm::wfi();
        }
        unsafe { cortex_m::interrupt::enable() };
    }
}

fn report_press(pad: usize) {
    if let Some(reading) = TOUCH.readings().get(pad) {
        writeln!(console::writer(), "{} pressed, value: {}\r", pad + 1, reading.raw).ok();
    }
}

fn on_pad1() {
    report_press(0);
}

fn on_pad2() {
    report_press(1);
}

fn on_pad3() {
    report_press(2);
}

fn on_sample() {
    if let Some(reading) = ADC.readings().get(0) {
        writeln!(console::writer(), "{}\r", reading.raw).ok();
    }
}

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();
    let mut nvic = cp.NVIC;

    let mut flash = dp.FLASH;
    let mut rcc = dp.RCC.configure().sysclk(48.mhz()).freeze(&mut flash);
    let gpioa = dp.GPIOA.split(&mut rcc);
    let gpiob = dp.GPIOB.split(&mut rcc);

    let (adc_pin, tx_pin, rx_pin) = cortex_m::interrupt::free(|cs| {
        // Touch pads and their sample capacitors
        let _pad1 = gpioa.pa0.into_alternate_af3(cs);
        let _pad2 = gpioa.pa4.into_alternate_af3(cs);
        let _pad3 = gpiob.pb0.into_alternate_af3(cs);
        let _g1_cap = gpioa.pa1.into_alternate_af3(cs);
        let _g2_cap = gpioa.pa6.into_alternate_af3(cs);
        let _g3_cap = gpiob.pb2.into_alternate_af3(cs);

        (
            gpioa.pa7.into_analog(cs),
            gpiob.pb6.into_alternate_af0(cs),
            gpiob.pb7.into_alternate_af0(cs),
        )
    });

    let uart = hal::serial::Serial::usart1(dp.USART1, (tx_pin, rx_pin), 115_200.bps(), &mut rcc);
    console::init(uart, SERIAL_IRQ_PRIO);

    let mut syst = hal::timers::Timer::syst(cp.SYST, 1.khz(), &mut rcc);
    syst.listen(&hal::timers::Event::TimeOut);

    let mut pads = TouchPads::new(dp.TSC, &mut rcc, &TOUCH_PADS);
    let reference = pads.reference(CALIBRATION_DELAY, CALIBRATION_SAMPLES);
    let touch_config = cortex_m::singleton!(
        : DebounceConfig = DebounceConfig::from_reference(TOUCH_WINDOW, &reference, TOUCH_DEPTH)
    );
    defmt::info!("touch reference {}", reference);

    #[cfg(not(feature = "raw-adc"))]
    let analog = adc::CalibratedAdc::new(dp.ADC, adc_pin, &mut rcc);
    #[cfg(feature = "raw-adc")]
    let analog = {
        let _pin = adc_pin;
        match adc::RegisterAdc::new(dp.ADC, adc::ADC_CHANNEL) {
            Ok(adc) => adc,
            Err(e) => defmt::panic!("adc failed to start: {}", e),
        }
    };

    let mut touch_timer = TouchTimer::new(dp.TIM2, &rcc);
    let mut adc_timer = AdcTimer::new(dp.TIM3, &rcc);

    let now = SysTickClock.now_ms();
    let callbacks: [fn(); 3] = [on_pad1, on_pad2, on_pad3];

    // A sampler with no clock is useless; stop here rather than run half the system
    let mut touch = match start_touch_sampling(
        &mut touch_timer,
        pads,
        callbacks,
        TOUCH_PERIOD_US,
        &TOUCH,
        touch_config.map(|config| &*config),
        now,
    ) {
        Ok(worker) => worker,
        Err(e) => defmt::panic!("touch sampling failed to start: {}", e),
    };

    let mut adc = match start_adc_sampling(
        &mut adc_timer,
        analog,
        on_sample as fn(),
        SAMPLING_FREQ,
        &ADC,
        now,
    ) {
        Ok(worker) => worker,
        Err(e) => defmt::panic!("adc sampling failed to start: {}", e),
    };
    defmt::info!(
        "sampling ADC_IN{=u8} at {=u32}Hz",
        adc::ADC_CHANNEL,
        SAMPLING_FREQ
    );

    unsafe {
        nvic.set_priority(pac::Interrupt::TIM2, TIMER_IRQ_PRIO);
        nvic.set_priority(pac::Interrupt::TIM3, TIMER_IRQ_PRIO);
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM2);
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM3);
    }

    sampler::worker::run(&SysTickClock, &mut [&mut touch, &mut adc])
}

#[exception]
fn SysTick() {
    // No atomic read-modify-write on the M0; this is the only writer
    let time = TIME.load(Ordering::Relaxed);
    TIME.store(time.wrapping_add(1), Ordering::Relaxed);
}

#[interrupt]
fn TIM2() {
    // Clear IRQ flags
    unsafe {
        let tim2 = pac::Peripherals::steal().TIM2;
        tim2.sr.write(|w| w.bits(0));
    }
    TOUCH.on_interrupt();
}

#[interrupt]
fn TIM3() {
    unsafe {
        let tim3 = pac::Peripherals::steal().TIM3;
        tim3.sr.write(|w| w.bits(0));
    }
    ADC.on_interrupt();
}
