//! Two-wire bus master - single-master, write-only, one byte per transaction.
//!
//! The master drives a [`TwiPort`], a register-level view of a TWI engine:
//! issue a phase, poll until ready, read the status code. Each transaction
//! is strictly sequential:
//!
//! ```text
//! START → SLA+W → DATA → STOP
//! ```
//!
//! Every wait is bounded by `poll_limit` ready-polls and turns into
//! [`BusError::Timeout`] instead of spinning forever.

pub mod bitbang;
pub mod hal;

use crate::config::BUS_POLL_LIMIT;
use crate::error::BusError;

pub use bitbang::BitBangPort;
pub use hal::HalBus;

/// TWI status codes (upper five bits of the status register).
pub mod status {
    /// Bus error due to an illegal START or STOP.
    pub const BUS_ERROR: u8 = 0x00;
    /// START condition transmitted.
    pub const START: u8 = 0x08;
    /// SLA+W transmitted, ACK received.
    pub const MT_SLA_ACK: u8 = 0x18;
    /// SLA+W transmitted, NACK received.
    pub const MT_SLA_NACK: u8 = 0x20;
    /// Data byte transmitted, ACK received.
    pub const MT_DATA_ACK: u8 = 0x28;
    /// Data byte transmitted, NACK received.
    pub const MT_DATA_NACK: u8 = 0x30;
    /// Arbitration lost while sending SLA+W or data.
    pub const ARBITRATION_LOST: u8 = 0x38;
}

/// Direction bit appended to the 7-bit address.
pub const WRITE: u8 = 0;

/// Anything that can deliver one byte to one device on a two-wire bus.
///
/// This is the seam the display driver is written against.
pub trait ByteBus {
    fn write_byte(&mut self, address: u8, byte: u8) -> Result<(), BusError>;
}

impl<T: ByteBus + ?Sized> ByteBus for &mut T {
    fn write_byte(&mut self, address: u8, byte: u8) -> Result<(), BusError> {
        (**self).write_byte(address, byte)
    }
}

/// Register-level TWI engine.
///
/// Phase methods only *issue* the phase; completion is observed through
/// [`is_ready`](TwiPort::is_ready) and [`status`](TwiPort::status).
pub trait TwiPort {
    /// Issue a START condition.
    fn send_start(&mut self);
    /// Load `byte` and start shifting it out.
    fn send_byte(&mut self, byte: u8);
    /// Issue a STOP condition. No completion wait is required.
    fn send_stop(&mut self);
    /// `true` once the current phase has completed.
    fn is_ready(&mut self) -> bool;
    /// Status code of the last completed phase, prescaler bits masked off.
    fn status(&mut self) -> u8;
}

/// Polled two-wire master on top of a [`TwiPort`].
pub struct TwoWireMaster<P> {
    port: P,
    poll_limit: u32,
}

impl<P: TwiPort> TwoWireMaster<P> {
    pub fn new(port: P) -> Self {
        Self::with_poll_limit(port, BUS_POLL_LIMIT)
    }

    pub fn with_poll_limit(port: P, poll_limit: u32) -> Self {
        Self { port, poll_limit }
    }

    /// Give the port back.
    pub fn release(self) -> P {
        self.port
    }

    fn wait_ready(&mut self) -> Result<(), BusError> {
        for _ in 0..self.poll_limit {
            if self.port.is_ready() {
                return Ok(());
            }
        }
        Err(BusError::Timeout)
    }

    /// Wait out a byte phase. A stalled phase still ends with STOP.
    fn byte_status(&mut self) -> Result<u8, BusError> {
        if let Err(e) = self.wait_ready() {
            debug!("twi: byte phase stalled");
            self.port.send_stop();
            return Err(e);
        }
        Ok(self.port.status())
    }

    /// Run one START → SLA+W → DATA → STOP transaction.
    pub fn write_byte(&mut self, address: u8, byte: u8) -> Result<(), BusError> {
        self.port.send_start();
        self.wait_ready()?;
        if self.port.status() != status::START {
            return Err(BusError::StartFailed);
        }

        self.port.send_byte((address << 1) | WRITE);
        let st = self.byte_status()?;
        if st != status::MT_SLA_ACK {
            debug!("twi: SLA+W {=u8:#x} status {=u8:#x}", address, st);
            self.port.send_stop();
            return Err(BusError::AddressNack);
        }

        self.port.send_byte(byte);
        let st = self.byte_status()?;
        if st != status::MT_DATA_ACK {
            debug!("twi: data status {=u8:#x}", st);
            self.port.send_stop();
            return Err(BusError::DataNack);
        }

        self.port.send_stop();
        Ok(())
    }
}

impl<P: TwiPort> ByteBus for TwoWireMaster<P> {
    fn write_byte(&mut self, address: u8, byte: u8) -> Result<(), BusError> {
        TwoWireMaster::write_byte(self, address, byte)
    }
}
