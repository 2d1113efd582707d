// src/transport.rs

use std::io;
use std::thread;
use std::time::{Duration, Instant};

/// Byte and register access to the device address space.
///
/// Implemented by whatever bus glue moves data to the chip (SPI, SDIO, a
/// simulator). Addresses are device addresses; the command engine never
/// interprets them beyond passing them through.
pub trait Transport {
    fn write_bytes(&mut self, addr: u32, buf: &[u8]) -> io::Result<()>;
    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> io::Result<()>;
    fn read_register32(&mut self, addr: u32) -> io::Result<u32>;
    fn write_register32(&mut self, addr: u32, value: u32) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_bytes(&mut self, addr: u32, buf: &[u8]) -> io::Result<()> {
        (**self).write_bytes(addr, buf)
    }

    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_bytes(addr, buf)
    }

    fn read_register32(&mut self, addr: u32) -> io::Result<u32> {
        (**self).read_register32(addr)
    }

    fn write_register32(&mut self, addr: u32, value: u32) -> io::Result<()> {
        (**self).write_register32(addr, value)
    }
}

/// Monotonic time source used by the polling loops.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
    /// Spin for a short interval without yielding the thread.
    fn delay(&self, duration: Duration);
    /// Put the calling thread to sleep.
    fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by `std::time::Instant` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn delay(&self, duration: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {
            std::hint::spin_loop();
        }
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
