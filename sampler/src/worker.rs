//! Worker side of a sampler.
//!
//! A [`Worker`] sleeps until its [`Notifier`] is given or its timeout lapses, then runs exactly
//! one [`Round`]. The timeout only keeps the worker alive if interrupts stop; ticks are never
//! created by it.

use crate::debounce::Debouncer;
use crate::notify::Notifier;
use crate::readings::{Reading, Readings};
use crate::sensor::{AnalogSampler, TouchSensor};

/// A registered callback. Takes no arguments; payload is read back from [`Readings`].
pub trait Notify {
    fn notify(&mut self);
}

impl<F> Notify for F
where
    F: FnMut(),
{
    fn notify(&mut self) {
        self()
    }
}

/// One unit of work, run once per wake
pub trait Round {
    fn run(&mut self, ticks: &Notifier);
}

/// Millisecond time source and idle hook for [`run`]
pub trait Clock {
    fn now_ms(&self) -> u32;
    /// Sleep until the next interrupt, unless `woken` reports a wake that landed after the last
    /// poll.
    ///
    /// `woken` must be checked with interrupts masked and the sleep entered before they are
    /// unmasked, or a tick arriving in between waits for the next unrelated interrupt.
    fn idle(&self, woken: &dyn Fn() -> bool);
}

pub struct Worker<'a, R> {
    ticks: &'a Notifier,
    round: R,
    timeout_ms: u32,
    last_round_ms: u32,
    rounds: u32,
    overruns_seen: u32,
}

impl<'a, R: Round> Worker<'a, R> {
    pub fn new(ticks: &'a Notifier, round: R, timeout_ms: u32, now_ms: u32) -> Self {
        Self {
            ticks,
            round,
            timeout_ms,
            last_round_ms: now_ms,
            rounds: 0,
            overruns_seen: ticks.overruns(),
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Run one round if the worker was woken or its timeout lapsed.
    ///
    /// Returns true if a round ran.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        let woken = self.ticks.take();
        let timed_out = now_ms.wrapping_sub(self.last_round_ms) >= self.timeout_ms;
        if !woken && !timed_out {
            return false;
        }

        self.round.run(self.ticks);
        self.last_round_ms = now_ms;
        self.rounds = self.rounds.wrapping_add(1);

        let overruns = self.ticks.overruns();
        if overruns != self.overruns_seen {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "sampler overrun: {=u32} ticks dropped",
                overruns.wrapping_sub(self.overruns_seen)
            );
            self.overruns_seen = overruns;
        }

        // Wakes coalesce; keep going until every pending tick has had its own round
        if self.ticks.pending() > 0 {
            self.ticks.give();
        }

        true
    }

    pub fn round(&self) -> &R {
        &self.round
    }

    /// Rounds run so far, including timeout rounds
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

/// Anything the main loop can service
pub trait Service {
    fn poll(&mut self, now_ms: u32) -> bool;
    /// True if the next poll will run a round because of a wake
    fn woken(&self) -> bool;
}

impl<'a, R: Round> Service for Worker<'a, R> {
    fn poll(&mut self, now_ms: u32) -> bool {
        Worker::poll(self, now_ms)
    }

    fn woken(&self) -> bool {
        self.ticks.is_given()
    }
}

/// Poll every worker once, and idle if none of them had work.
///
/// Returns true if any worker ran a round.
pub fn service<C: Clock>(clock: &C, workers: &mut [&mut dyn Service]) -> bool {
    let now_ms = clock.now_ms();
    let mut ran = false;
    for worker in workers.iter_mut() {
        ran |= worker.poll(now_ms);
    }
    if !ran {
        clock.idle(&|| workers.iter().any(|worker| worker.woken()));
    }
    ran
}

/// Service workers forever. Workers wait only on their own notifier, never on each other.
pub fn run<C: Clock>(clock: &C, workers: &mut [&mut dyn Service]) -> ! {
    loop {
        service(clock, workers);
    }
}

/// Touch round: sample every pad, dispatch presses, then fold the samples into the debounce
/// window if a timer tick is pending.
pub struct TouchRound<'a, S, C, const N: usize> {
    sensor: S,
    callbacks: [C; N],
    debouncer: Debouncer<'a, N>,
    readings: &'a Readings<N>,
}

impl<'a, S, C, const N: usize> TouchRound<'a, S, C, N>
where
    S: TouchSensor<N>,
    C: Notify,
{
    pub fn new(
        sensor: S,
        callbacks: [C; N],
        debouncer: Debouncer<'a, N>,
        readings: &'a Readings<N>,
    ) -> Self {
        Self {
            sensor,
            callbacks,
            debouncer,
            readings,
        }
    }

    pub fn debouncer(&self) -> &Debouncer<'a, N> {
        &self.debouncer
    }

    fn publish(&self) {
        let mut readings = [Reading::EMPTY; N];
        for (reading, channel) in readings.iter_mut().zip(self.debouncer.channels.iter()) {
            *reading = channel.into();
        }
        self.readings.publish(readings);
    }
}

impl<'a, S, C, const N: usize> Round for TouchRound<'a, S, C, N>
where
    S: TouchSensor<N>,
    C: Notify,
{
    fn run(&mut self, ticks: &Notifier) {
        let measurements = self.sensor.sample();
        let pressed = self.debouncer.edges(measurements);
        self.publish();

        for (callback, pressed) in self.callbacks.iter_mut().zip(pressed) {
            if pressed {
                callback.notify();
            }
        }

        if ticks.acknowledge() && self.debouncer.accumulate() {
            #[cfg(feature = "defmt")]
            for (i, channel) in self.debouncer.channels.iter().enumerate() {
                defmt::trace!(
                    "touch {=usize}: mean {=u16} detected {=bool}",
                    i,
                    channel.mean,
                    channel.detected
                );
            }
            self.publish();
        }
    }
}

/// Analog round: one sample and one callback per timer tick, no averaging.
pub struct AdcRound<'a, S, C> {
    sampler: S,
    callback: C,
    readings: &'a Readings<1>,
    samples: u32,
}

impl<'a, S, C> AdcRound<'a, S, C>
where
    S: AnalogSampler,
    C: Notify,
{
    pub fn new(sampler: S, callback: C, readings: &'a Readings<1>) -> Self {
        Self {
            sampler,
            callback,
            readings,
            samples: 0,
        }
    }

    /// Samples taken, which is also the number of callbacks made
    pub fn samples(&self) -> u32 {
        self.samples
    }
}

impl<'a, S, C> Round for AdcRound<'a, S, C>
where
    S: AnalogSampler,
    C: Notify,
{
    fn run(&mut self, ticks: &Notifier) {
        // A timeout wake with nothing pending is not a sample period
        if !ticks.acknowledge() {
            return;
        }

        let value = self.sampler.sample();
        self.readings.publish_one(0, Reading::sample(value));
        self.samples = self.samples.wrapping_add(1);
        self.callback.notify();
    }
}
