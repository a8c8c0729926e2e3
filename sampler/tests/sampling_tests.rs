use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use sampler::{
    start_adc_sampling, start_touch_sampling, Acquisition, Notifier, Period, PeriodicTimer, Tick,
};

/// Records the period it was armed with. The test drives interrupts by hand from a simulated
/// microsecond clock.
#[derive(Default)]
struct SimTimer {
    period: Option<Period>,
}

impl PeriodicTimer for SimTimer {
    type Error = ();

    fn start(&mut self, period: Period) -> Result<(), ()> {
        self.period = Some(period);
        Ok(())
    }
}

impl SimTimer {
    fn period_us(&self) -> u64 {
        self.period.map(|p| p.as_micros() as u64).unwrap_or(u64::MAX)
    }
}

#[test]
fn pending_counter_survives_concurrent_interrupts() {
    static TICKS: Notifier = Notifier::new(u16::MAX);
    const FIRINGS: u32 = 20_000;

    let isr = thread::spawn(|| {
        for _ in 0..FIRINGS {
            assert!(matches!(TICKS.on_interrupt(), Tick::Accepted(_)));
        }
    });

    let mut drained = 0u32;
    while drained < FIRINGS / 2 {
        if TICKS.acknowledge() {
            drained += 1;
        }
    }
    isr.join().unwrap();

    assert_eq!(TICKS.fired(), FIRINGS);
    assert_eq!(TICKS.pending() as u32, FIRINGS - drained);
    assert_eq!(TICKS.overruns(), 0);

    while TICKS.acknowledge() {
        drained += 1;
    }
    assert_eq!(drained, FIRINGS);
    assert_eq!(TICKS.pending(), 0);
}

#[test]
fn worker_thread_services_every_interrupt() {
    static ADC: Acquisition<1> = Acquisition::new(1024);
    const FIRINGS: u32 = 500;

    let callbacks = Arc::new(AtomicU32::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let worker = {
        let callbacks = callbacks.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut timer = SimTimer::default();
            let mut value = 0u16;
            let mut worker = start_adc_sampling(
                &mut timer,
                move || {
                    value = value.wrapping_add(1);
                    value
                },
                move || {
                    callbacks.fetch_add(1, Ordering::SeqCst);
                },
                1000,
                &ADC,
                0,
            )
            .unwrap();

            while !done.load(Ordering::SeqCst) || ADC.ticks().pending() > 0 {
                if !worker.poll(0) {
                    thread::yield_now();
                }
            }
            worker.round().samples()
        })
    };

    for _ in 0..FIRINGS {
        ADC.on_interrupt();
        thread::yield_now();
    }
    done.store(true, Ordering::SeqCst);
    // A final give so a worker that saw `done` late still drains
    ADC.ticks().give();

    let samples = worker.join().unwrap();
    assert_eq!(samples, FIRINGS - ADC.ticks().overruns());
    assert_eq!(callbacks.load(Ordering::SeqCst), samples);
    assert_eq!(ADC.readings().get(0).map(|r| r.raw as u32), Some(samples));
}

#[test]
fn adc_callback_once_per_period() {
    static ADC: Acquisition<1> = Acquisition::new(16);
    let callbacks = AtomicU32::new(0);
    let mut timer = SimTimer::default();

    let mut worker = start_adc_sampling(
        &mut timer,
        || 2048u16,
        || {
            callbacks.fetch_add(1, Ordering::Relaxed);
        },
        250,
        &ADC,
        0,
    )
    .unwrap();
    assert_eq!(timer.period_us(), 4000);

    // Observe for two seconds of simulated time, polling every 100us
    let period = timer.period_us();
    let mut next_irq = period;
    let mut now_us = 0u64;
    while now_us <= 2_000_000 {
        if now_us >= next_irq {
            ADC.on_interrupt();
            next_irq += period;
        }
        worker.poll((now_us / 1000) as u32);
        now_us += 100;
    }

    let expected = 2_000_000 / period as u32;
    let got = callbacks.load(Ordering::Relaxed);
    assert!(got + 1 >= expected && got <= expected, "got {got} callbacks, expected {expected}");
}

#[test]
fn independent_samplers_run_at_their_own_rates() {
    static ADC: Acquisition<1> = Acquisition::new(16);
    static TOUCH: Acquisition<3> = Acquisition::new(16);

    let adc_callbacks = AtomicU32::new(0);
    let touch_presses = AtomicU32::new(0);
    let pads_touched = AtomicBool::new(false);

    let mut adc_timer = SimTimer::default();
    let mut touch_timer = SimTimer::default();

    let mut adc = start_adc_sampling(
        &mut adc_timer,
        || 1u16,
        || {
            adc_callbacks.fetch_add(1, Ordering::Relaxed);
        },
        256,
        &ADC,
        0,
    )
    .unwrap();

    let press = || {
        touch_presses.fetch_add(1, Ordering::Relaxed);
    };
    let mut touch = start_touch_sampling(
        &mut touch_timer,
        || {
            if pads_touched.load(Ordering::Relaxed) {
                [10u16, 100, 100]
            } else {
                [100u16, 100, 100]
            }
        },
        [&press, &press, &press],
        10_000,
        &TOUCH,
        None,
        0,
    )
    .unwrap();

    let adc_period = adc_timer.period_us();
    let touch_period = touch_timer.period_us();
    assert_eq!(adc_period, 3906);
    assert_eq!(touch_period, 10_000);

    // Ten seconds; the pad is touched for half a second out of every second
    let mut next_adc = adc_period;
    let mut next_touch = touch_period;
    let mut now_us = 0u64;
    while now_us < 10_000_000 {
        pads_touched.store(now_us % 1_000_000 >= 500_000, Ordering::Relaxed);
        if now_us >= next_adc {
            ADC.on_interrupt();
            next_adc += adc_period;
        }
        if now_us >= next_touch {
            TOUCH.on_interrupt();
            next_touch += touch_period;
        }
        let now_ms = (now_us / 1000) as u32;
        adc.poll(now_ms);
        touch.poll(now_ms);
        now_us += 50;
    }

    // 10s / 3906us
    assert_eq!(adc_callbacks.load(Ordering::Relaxed), 2560);
    assert_eq!(adc.round().samples(), 2560);
    // 100Hz ticks are 12.5 windows per second; every touched half second is one press
    assert_eq!(touch_presses.load(Ordering::Relaxed), 10);
    assert_eq!(ADC.ticks().overruns(), 0);
    assert_eq!(TOUCH.ticks().overruns(), 0);
}

#[test]
fn overrun_is_bounded_and_counted() {
    static TOUCH: Acquisition<3> = Acquisition::new(4);
    let mut timer = SimTimer::default();
    let mut worker =
        start_touch_sampling(&mut timer, || [100u16; 3], [|| {}; 3], 1000, &TOUCH, None, 0)
            .unwrap();

    // Worker stalled for ten periods
    for _ in 0..10 {
        TOUCH.on_interrupt();
    }
    assert_eq!(TOUCH.ticks().pending(), 4);
    assert_eq!(TOUCH.ticks().overruns(), 6);

    // Backlog drains one round per poll
    let mut rounds = 0;
    while worker.poll(0) {
        rounds += 1;
    }
    assert_eq!(rounds, 4);
    assert_eq!(TOUCH.ticks().pending(), 0);
    assert_eq!(worker.round().debouncer().count, 4);
}
