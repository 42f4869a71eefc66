//! Unified error type for tickctl.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

/// Failure of a single two-wire write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The START condition was not acknowledged by the bus hardware.
    StartFailed,
    /// No device acknowledged the address + write byte.
    AddressNack,
    /// The device did not acknowledge the payload byte.
    DataNack,
    /// The bus never reported ready within the poll limit.
    Timeout,
}

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// I²C transaction to the display failed.
    Bus(BusError),

    /// Buffer too small for the formatted text.
    BufferOverflow,
}

// Convenience conversions

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Error::Bus(e)
    }
}
