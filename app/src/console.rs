//! Interrupt driven text output on USART1.
//!
//! Writers only enqueue; the USART1 interrupt drains the queue one byte per TXE. Nothing here
//! blocks, so it is safe to write from a sampler callback.
use core::cell::RefCell;

use critical_section::Mutex;
use heapless::spsc::{Consumer, Producer, Queue};
use stm32f0xx_hal::gpio::{gpiob, Alternate, AF0};

use crate::hal::{
    pac,
    pac::interrupt,
    prelude::*,
    serial::{Event, Serial},
};

const TX_Q_SIZE: usize = 256;

type TxPinType = gpiob::PB6<Alternate<AF0>>;
type RxPinType = gpiob::PB7<Alternate<AF0>>;
type Port = Serial<pac::USART1, TxPinType, RxPinType>;

struct Drain {
    serial: Port,
    queue: Consumer<'static, u8, TX_Q_SIZE>,
}

static DRAIN: Mutex<RefCell<Option<Drain>>> = Mutex::new(RefCell::new(None));
static FILL: Mutex<RefCell<Option<Producer<'static, u8, TX_Q_SIZE>>>> =
    Mutex::new(RefCell::new(None));

pub struct Writer {}

impl core::fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        write_bytes(s.as_bytes());
        Ok(())
    }
}

/// Must be called once during application initialization
pub fn init(serial: Port, irq_prio: u8) {
    let Some(queue) = cortex_m::singleton!(: Queue<u8, TX_Q_SIZE> = Queue::new()) else {
        return;
    };
    let (producer, consumer) = queue.split();

    critical_section::with(|cs| {
        FILL.borrow_ref_mut(cs).replace(producer);
        DRAIN.borrow_ref_mut(cs).replace(Drain {
            serial,
            queue: consumer,
        });
    });

    let core = unsafe { pac::CorePeripherals::steal() };
    let mut nvic = core.NVIC;
    unsafe {
        nvic.set_priority(pac::Interrupt::USART1, irq_prio);
        pac::NVIC::unmask(pac::Interrupt::USART1);
    }
}

/// Queue bytes for transmission. Bytes that don't fit are dropped.
pub fn write_bytes(bytes: &[u8]) {
    critical_section::with(|cs| {
        if let Some(fill) = FILL.borrow_ref_mut(cs).as_mut() {
            for b in bytes {
                // Full queue: drop the rest rather than stall a sampler callback
                if fill.enqueue(*b).is_err() {
                    break;
                }
            }
        }
        if let Some(drain) = DRAIN.borrow_ref_mut(cs).as_mut() {
            drain.serial.listen(Event::Txe);
        }
    });
}

pub fn writer() -> Writer {
    Writer {}
}

#[interrupt]
fn USART1() {
    critical_section::with(|cs| {
        let mut drain = DRAIN.borrow_ref_mut(cs);
        let Some(drain) = drain.as_mut() else {
            return;
        };
        let usart1 = unsafe { pac::Peripherals::steal().USART1 };

        if usart1.isr.read().txe().bit_is_set() {
            match drain.queue.dequeue() {
                Some(b) => {
                    drain.serial.write(b).ok();
                }
                None => {
                    // Queue empty, mask TXE until the next write
                    drain.serial.unlisten(Event::Txe);
                }
            }
        }
    });
}
