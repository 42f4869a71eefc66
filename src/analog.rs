//! Analog sampling - one-shot conversions triggered from the main loop.
//!
//! The conversion-complete context stores its reading with
//! [`AnalogSample::capture`]; everything else only reads it. There is no
//! auto-restart: each reading needs a fresh [`Sampler::trigger`].
//!
//! With power gating on, the converter stays enabled from the trigger until
//! its completion has been captured. The next trigger after that powers it
//! down; the one after starts a fresh conversion.

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

/// Hardware side of the converter.
pub trait AnalogInput {
    /// Start a single conversion. Completion is reported asynchronously.
    fn start_conversion(&mut self);

    /// Power the converter up. Default: always powered.
    fn enable(&mut self) {}

    /// Power the converter down. Default: always powered.
    fn disable(&mut self) {}
}

/// Last completed conversion, shared between the completion context and the main loop.
pub struct AnalogSample {
    value: AtomicU16,
    completions: AtomicU32,
}

impl AnalogSample {
    pub const fn new() -> Self {
        Self {
            value: AtomicU16::new(0),
            completions: AtomicU32::new(0),
        }
    }

    /// Store a completed reading. Completion context only.
    pub fn capture(&self, raw: u16) {
        self.value.store(raw, Ordering::Release);
        self.completions.fetch_add(1, Ordering::Release);
    }

    pub fn latest(&self) -> u16 {
        self.value.load(Ordering::Acquire)
    }

    /// Number of readings captured so far (wrapping).
    pub fn completions(&self) -> u32 {
        self.completions.load(Ordering::Acquire)
    }
}

impl Default for AnalogSample {
    fn default() -> Self {
        Self::new()
    }
}

/// Main-loop handle on the converter.
pub struct Sampler<A> {
    adc: A,
    power_gate: bool,
    /// Completion count seen when the gated conversion in flight was started.
    in_flight: Option<u32>,
}

impl<A: AnalogInput> Sampler<A> {
    pub fn new(adc: A, power_gate: bool) -> Self {
        Self {
            adc,
            power_gate,
            in_flight: None,
        }
    }

    /// Kick off one conversion.
    ///
    /// Ungated, every call starts a conversion. Gated, a conversion still
    /// in flight is left alone and a finished one powers the converter down.
    pub fn trigger(&mut self, analog: &AnalogSample) {
        if !self.power_gate {
            self.adc.start_conversion();
            return;
        }

        if let Some(started) = self.in_flight {
            if analog.completions() == started {
                return;
            }
            self.adc.disable();
            self.in_flight = None;
            return;
        }

        self.adc.enable();
        self.in_flight = Some(analog.completions());
        self.adc.start_conversion();
    }

    /// `true` while a gated conversion is waiting for its completion.
    pub fn converting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn release(self) -> A {
        self.adc
    }
}
