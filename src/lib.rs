//! Host-testable core of tickctl.
//!
//! Everything that does not touch a concrete chip lives here: the
//! two-wire bus master, the character LCD driver, the 1 ms debounce and
//! timing engine, the analog sampler, serial reports and the cooperative
//! scheduler. Hardware is reached only through small traits
//! ([`bus::TwiPort`], [`bus::ByteBus`], [`analog::AnalogInput`],
//! [`serial::SerialPort`]) and `embedded-hal` 1.0 pins and delays.
//!
//! Usage: `cargo test` runs everything on the host.
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and binds these pieces to nRF52840 peripherals.

#![cfg_attr(not(test), no_std)]

// Must come first: the logging macros are textually scoped.
#[macro_use]
mod fmt;

pub mod analog;
pub mod bus;
pub mod config;
pub mod error;
pub mod lcd;
pub mod scheduler;
pub mod serial;
pub mod timing;

pub use error::{BusError, Error};
pub use timing::{Mode, SharedTimingState};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - configuration invariants
// ═══════════════════════════════════════════════════════════════════════════
