//! Hand-off from a timer interrupt to the worker that services it.
//!
//! The interrupt side only bumps a counter and raises a wake token; everything else happens in
//! the worker. The token is a single slot, so several interrupts that land before the worker
//! runs produce one wake, while the pending counter still records each of them.

use core::cell::Cell;

use critical_section::Mutex;

/// Outcome of one timer interrupt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// The tick was queued; holds the pending count including this tick.
    Accepted(u16),
    /// The pending counter was full and this tick was dropped.
    Overrun,
}

pub struct Notifier {
    max_pending: u16,
    pending: Mutex<Cell<u16>>,
    token: Mutex<Cell<bool>>,
    fired: Mutex<Cell<u32>>,
    overruns: Mutex<Cell<u32>>,
}

impl Notifier {
    /// A notifier that holds at most `max_pending` unserviced ticks (at least one).
    pub const fn new(max_pending: u16) -> Self {
        Self {
            max_pending: if max_pending == 0 { 1 } else { max_pending },
            pending: Mutex::new(Cell::new(0)),
            token: Mutex::new(Cell::new(false)),
            fired: Mutex::new(Cell::new(0)),
            overruns: Mutex::new(Cell::new(0)),
        }
    }

    /// Interrupt side. Counts the tick and wakes the worker; never blocks.
    pub fn on_interrupt(&self) -> Tick {
        critical_section::with(|cs| {
            let fired = self.fired.borrow(cs);
            fired.set(fired.get().wrapping_add(1));

            let pending = self.pending.borrow(cs);
            let tick = if pending.get() < self.max_pending {
                pending.set(pending.get() + 1);
                Tick::Accepted(pending.get())
            } else {
                let overruns = self.overruns.borrow(cs);
                overruns.set(overruns.get().wrapping_add(1));
                Tick::Overrun
            };

            self.token.borrow(cs).set(true);
            tick
        })
    }

    /// Consume the wake token. Returns true if the worker was woken since the last take.
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.token.borrow(cs).replace(false))
    }

    /// Peek at the wake token without consuming it
    pub fn is_given(&self) -> bool {
        critical_section::with(|cs| self.token.borrow(cs).get())
    }

    /// Raise the wake token from thread context
    pub fn give(&self) {
        critical_section::with(|cs| self.token.borrow(cs).set(true));
    }

    /// Retire one pending tick. Returns false, leaving the counter at zero, if none was pending.
    pub fn acknowledge(&self) -> bool {
        critical_section::with(|cs| {
            let pending = self.pending.borrow(cs);
            match pending.get() {
                0 => false,
                n => {
                    pending.set(n - 1);
                    true
                }
            }
        })
    }

    pub fn pending(&self) -> u16 {
        critical_section::with(|cs| self.pending.borrow(cs).get())
    }

    /// Total interrupts seen, including overruns
    pub fn fired(&self) -> u32 {
        critical_section::with(|cs| self.fired.borrow(cs).get())
    }

    /// Interrupts dropped because the pending counter was full
    pub fn overruns(&self) -> u32 {
        critical_section::with(|cs| self.overruns.borrow(cs).get())
    }

    pub fn max_pending(&self) -> u16 {
        self.max_pending
    }
}
