//! Bit-banged TWI port over two open-drain GPIO lines.
//!
//! Produces the same status codes a hardware TWI engine reports, so the
//! [`TwoWireMaster`](super::TwoWireMaster) state machine runs unchanged on
//! top of it. Every phase completes synchronously; `is_ready` is always
//! `true` afterwards.
//!
//! Both lines are driven open-drain: `set_high` releases the line to the
//! pull-up, `set_low` pulls it down.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::{status, TwiPort};
use crate::config::BITBANG_HALF_PERIOD_US;

pub struct BitBangPort<SCL, SDA, D> {
    scl: SCL,
    sda: SDA,
    delay: D,
    half_period_us: u32,
    status: u8,
    /// Next byte is the address byte of a fresh transaction.
    addressing: bool,
}

impl<SCL, SDA, D> BitBangPort<SCL, SDA, D>
where
    SCL: OutputPin,
    SDA: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(scl: SCL, sda: SDA, delay: D) -> Self {
        Self::with_half_period(scl, sda, delay, BITBANG_HALF_PERIOD_US)
    }

    pub fn with_half_period(scl: SCL, sda: SDA, delay: D, half_period_us: u32) -> Self {
        let mut port = Self {
            scl,
            sda,
            delay,
            half_period_us,
            status: status::BUS_ERROR,
            addressing: false,
        };
        // Idle bus high (released).
        let _ = port.sda.set_high();
        let _ = port.scl.set_high();
        port
    }

    pub fn release(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }

    fn wait(&mut self) {
        self.delay.delay_us(self.half_period_us);
    }

    fn start(&mut self) -> Result<u8, ()> {
        self.sda.set_high().map_err(drop)?;
        self.scl.set_high().map_err(drop)?;
        self.wait();
        // Someone else is holding SDA down.
        if self.sda.is_low().map_err(drop)? {
            return Ok(status::ARBITRATION_LOST);
        }
        self.sda.set_low().map_err(drop)?;
        self.wait();
        self.scl.set_low().map_err(drop)?;
        self.wait();
        Ok(status::START)
    }

    /// Shift out `byte` MSB first and sample the ACK bit. Returns `true` on ACK.
    fn shift_out(&mut self, mut byte: u8) -> Result<bool, ()> {
        for _ in 0..8 {
            if byte & 0x80 != 0 {
                self.sda.set_high().map_err(drop)?;
            } else {
                self.sda.set_low().map_err(drop)?;
            }
            byte <<= 1;
            self.wait();
            self.scl.set_high().map_err(drop)?;
            self.wait();
            self.scl.set_low().map_err(drop)?;
        }

        // ACK phase: release SDA and sample it while SCL is high.
        self.sda.set_high().map_err(drop)?;
        self.wait();
        self.scl.set_high().map_err(drop)?;
        self.wait();
        let ack = self.sda.is_low().map_err(drop)?;
        self.scl.set_low().map_err(drop)?;
        self.wait();
        Ok(ack)
    }

    fn stop(&mut self) -> Result<(), ()> {
        self.sda.set_low().map_err(drop)?;
        self.wait();
        self.scl.set_high().map_err(drop)?;
        self.wait();
        self.sda.set_high().map_err(drop)?;
        self.wait();
        Ok(())
    }
}

impl<SCL, SDA, D> TwiPort for BitBangPort<SCL, SDA, D>
where
    SCL: OutputPin,
    SDA: InputPin + OutputPin,
    D: DelayNs,
{
    fn send_start(&mut self) {
        self.status = self.start().unwrap_or(status::BUS_ERROR);
        self.addressing = self.status == status::START;
    }

    fn send_byte(&mut self, byte: u8) {
        let addressing = core::mem::replace(&mut self.addressing, false);
        self.status = match self.shift_out(byte) {
            Ok(true) if addressing => status::MT_SLA_ACK,
            Ok(false) if addressing => status::MT_SLA_NACK,
            Ok(true) => status::MT_DATA_ACK,
            Ok(false) => status::MT_DATA_NACK,
            Err(()) => status::BUS_ERROR,
        };
    }

    fn send_stop(&mut self) {
        self.addressing = false;
        if self.stop().is_err() {
            self.status = status::BUS_ERROR;
        }
    }

    fn is_ready(&mut self) -> bool {
        true
    }

    fn status(&mut self) -> u8 {
        self.status
    }
}
