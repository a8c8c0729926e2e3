//! Registration surface used by the firmware's setup code.

use crate::debounce::Debouncer;
use crate::notify::{Notifier, Tick};
use crate::readings::Readings;
use crate::sensor::{AnalogSampler, PeriodicTimer, TouchSensor};
use crate::timing::Period;
use crate::worker::{AdcRound, Notify, TouchRound, Worker};
use crate::{DebounceConfig, Error, ADC_TIMEOUT_MS, DEFAULT_DEBOUNCE_CONFIG, TOUCH_TIMEOUT_MS};

/// State shared between a sampler's interrupt, its worker and anyone reading its values.
///
/// Meant to live in a `static` so the interrupt handler can reach it.
pub struct Acquisition<const N: usize> {
    ticks: Notifier,
    readings: Readings<N>,
}

impl<const N: usize> Acquisition<N> {
    pub const fn new(max_pending: u16) -> Self {
        Self {
            ticks: Notifier::new(max_pending),
            readings: Readings::new(),
        }
    }

    /// Call from the timer interrupt handler
    pub fn on_interrupt(&self) -> Tick {
        self.ticks.on_interrupt()
    }

    pub fn ticks(&self) -> &Notifier {
        &self.ticks
    }

    pub fn readings(&self) -> &Readings<N> {
        &self.readings
    }
}

/// Configure the touch debouncer and start its sampling timer.
///
/// `callbacks[i]` fires once each time channel `i` is pressed. Intended to be called once;
/// calling it again for the same `acquisition` leaves two workers fighting over one notifier.
pub fn start_touch_sampling<'a, T, S, C, const N: usize>(
    timer: &mut T,
    sensor: S,
    callbacks: [C; N],
    period_us: u32,
    acquisition: &'a Acquisition<N>,
    config: Option<&'a DebounceConfig>,
    now_ms: u32,
) -> Result<Worker<'a, TouchRound<'a, S, C, N>>, Error>
where
    T: PeriodicTimer,
    S: TouchSensor<N>,
    C: Notify,
{
    let period = Period::from_micros(period_us)?;
    let config = config.unwrap_or(&DEFAULT_DEBOUNCE_CONFIG);
    let debouncer = Debouncer::new(Some(config))?;

    let round = TouchRound::new(sensor, callbacks, debouncer, acquisition.readings());
    let worker = Worker::new(acquisition.ticks(), round, TOUCH_TIMEOUT_MS, now_ms);

    start_timer(timer, period)?;

    #[cfg(feature = "defmt")]
    defmt::info!(
        "touch sampling every {=u32}us, window {=u16}, threshold {=u16}",
        period.as_micros(),
        config.window,
        config.threshold
    );

    Ok(worker)
}

/// Start sampling one analog channel at `sampling_frequency_hz`.
///
/// The timer period is `1_000_000 / sampling_frequency_hz` microseconds, truncated.
pub fn start_adc_sampling<'a, T, S, C>(
    timer: &mut T,
    sampler: S,
    callback: C,
    sampling_frequency_hz: u32,
    acquisition: &'a Acquisition<1>,
    now_ms: u32,
) -> Result<Worker<'a, AdcRound<'a, S, C>>, Error>
where
    T: PeriodicTimer,
    S: AnalogSampler,
    C: Notify,
{
    let period = Period::from_frequency(sampling_frequency_hz)?;

    let round = AdcRound::new(sampler, callback, acquisition.readings());
    let worker = Worker::new(acquisition.ticks(), round, ADC_TIMEOUT_MS, now_ms);

    start_timer(timer, period)?;

    #[cfg(feature = "defmt")]
    defmt::info!(
        "adc sampling every {=u32}us, effective rate {=u32}mHz",
        period.as_micros(),
        period.effective_millihertz()
    );

    Ok(worker)
}

/// Start `timer`, logging the driver's own error before it collapses into `HardwareInit`.
fn start_timer<T: PeriodicTimer>(timer: &mut T, period: Period) -> Result<(), Error> {
    if let Err(_e) = timer.start(period) {
        #[cfg(feature = "defmt")]
        defmt::error!(
            "timer failed to start for {=u32}us: {}",
            period.as_micros(),
            defmt::Debug2Format(&_e)
        );
        return Err(Error::HardwareInit);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::timing::{Dividers, TimerError};
    use core::cell::Cell;

    #[derive(Default)]
    struct FakeTimer {
        started: Option<Period>,
        fail: bool,
    }

    impl PeriodicTimer for FakeTimer {
        type Error = ();

        fn start(&mut self, period: Period) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.started = Some(period);
            Ok(())
        }
    }

    #[test]
    fn test_adc_period_from_frequency() {
        static ADC: Acquisition<1> = Acquisition::new(16);
        let mut timer = FakeTimer::default();

        let worker = start_adc_sampling(&mut timer, || 0u16, || {}, 256, &ADC, 0).unwrap();
        assert_eq!(timer.started.map(|p| p.as_micros()), Some(3906));
        assert_eq!(worker.timeout_ms(), ADC_TIMEOUT_MS);
    }

    #[test]
    fn test_invalid_config_never_touches_hardware() {
        static ADC: Acquisition<1> = Acquisition::new(16);
        static TOUCH: Acquisition<3> = Acquisition::new(16);
        let mut timer = FakeTimer::default();

        let err = start_adc_sampling(&mut timer, || 0u16, || {}, 0, &ADC, 0).err();
        assert_eq!(err, Some(Error::InvalidFrequency));

        let err = start_touch_sampling(&mut timer, || [0u16; 3], [|| {}; 3], 0, &TOUCH, None, 0).err();
        assert_eq!(err, Some(Error::InvalidPeriod));

        let bad = DebounceConfig { window: 3, threshold: 40 };
        let err = start_touch_sampling(&mut timer, || [0u16; 3], [|| {}; 3], 10_000, &TOUCH, Some(&bad), 0)
            .err();
        assert_eq!(err, Some(Error::InvalidWindow));

        assert!(timer.started.is_none());
    }

    #[test]
    fn test_timer_failure_is_hardware_init() {
        static TOUCH: Acquisition<3> = Acquisition::new(16);
        let mut timer = FakeTimer {
            started: None,
            fail: true,
        };

        let err = start_touch_sampling(&mut timer, || [0u16; 3], [|| {}; 3], 10_000, &TOUCH, None, 0)
            .err();
        assert_eq!(err, Some(Error::HardwareInit));
    }

    /// Splits the period like a 16 bit timer on a 48MHz clock
    #[derive(Default)]
    struct ShortCounterTimer {
        dividers: Option<Dividers>,
    }

    impl PeriodicTimer for ShortCounterTimer {
        type Error = TimerError;

        fn start(&mut self, period: Period) -> Result<(), TimerError> {
            self.dividers = Some(period.dividers(48_000_000, 1 << 16)?);
            Ok(())
        }
    }

    #[test]
    fn test_slow_adc_rate_starts() {
        static ADC: Acquisition<1> = Acquisition::new(16);
        let mut timer = ShortCounterTimer::default();

        assert!(start_adc_sampling(&mut timer, || 0u16, || {}, 10, &ADC, 0).is_ok());
        assert_eq!(timer.dividers, Some(Dividers { psc: 74, arr: 63_999 }));
    }

    #[test]
    fn test_unreachable_period_is_hardware_init() {
        static TOUCH: Acquisition<3> = Acquisition::new(16);
        let mut timer = ShortCounterTimer::default();

        let err = start_touch_sampling(&mut timer, || [0u16; 3], [|| {}; 3], u32::MAX, &TOUCH, None, 0)
            .err();
        assert_eq!(err, Some(Error::HardwareInit));
        assert!(timer.dividers.is_none());
    }

    #[test]
    fn test_touch_worker_uses_config() {
        let touch: Acquisition<3> = Acquisition::new(16);
        let config = DebounceConfig {
            window: 2,
            threshold: 50,
        };
        let presses = Cell::new(0u32);
        let callback = || presses.set(presses.get() + 1);
        let mut timer = FakeTimer::default();

        let mut worker = start_touch_sampling(
            &mut timer,
            || [50u16, 60, 60],
            [&callback, &callback, &callback],
            10_000,
            &touch,
            Some(&config),
            0,
        )
        .unwrap();
        assert_eq!(timer.started.map(|p| p.as_micros()), Some(10_000));
        assert_eq!(worker.timeout_ms(), TOUCH_TIMEOUT_MS);

        for _ in 0..3 {
            touch.on_interrupt();
            assert!(worker.poll(0));
        }
        // Window of two closed after the second tick, pressed on the third
        assert_eq!(presses.get(), 1);
        assert!(touch.readings().get(0).unwrap().asserted);
        assert!(!touch.readings().get(1).unwrap().asserted);
    }
}
