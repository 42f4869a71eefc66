//! Cooperative main loop - mode dispatch, display frames, serial reports.
//!
//! Runs only in thread context. Bus I/O blocks here while the periodic
//! and conversion-complete contexts keep preempting it.
//!
//! The scheduler remembers the last frame it drew and redraws only when
//! the wanted frame changes, so a steady mode does not flicker. A failed
//! draw forgets the frame so the next iteration retries it.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::analog::{AnalogInput, AnalogSample, Sampler};
use crate::bus::ByteBus;
use crate::config::SchedulerConfig;
use crate::error::{BusError, Error};
use crate::lcd::Lcd;
use crate::serial::{format_report, SerialPort};
use crate::timing::{Mode, SharedTimingState};

/// What the display should be showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Frame {
    /// Fixed banner (Idle).
    Banner,
    /// Latest analog reading (Active).
    Reading(u16),
}

impl Frame {
    pub fn for_mode(mode: Mode, sample: u16) -> Self {
        match mode {
            Mode::Idle => Frame::Banner,
            Mode::Active => Frame::Reading(sample),
        }
    }
}

pub struct Scheduler<B, D, A, S> {
    lcd: Lcd<B, D>,
    sampler: Sampler<A>,
    serial: S,
    config: SchedulerConfig,
    shown: Option<Frame>,
    serial_enabled: bool,
    last_mode: Option<Mode>,
}

impl<B, D, A, S> Scheduler<B, D, A, S>
where
    B: ByteBus,
    D: DelayNs,
    A: AnalogInput,
    S: SerialPort,
{
    pub fn new(lcd: Lcd<B, D>, adc: A, serial: S, config: SchedulerConfig) -> Self {
        Self {
            lcd,
            sampler: Sampler::new(adc, config.power_gate_adc),
            serial,
            config,
            shown: None,
            serial_enabled: true,
            last_mode: None,
        }
    }

    /// Initialise the display. Call once before the loop.
    pub fn start(&mut self) -> Result<(), BusError> {
        self.shown = None;
        self.lcd.initialize()
    }

    pub fn serial_enabled(&self) -> bool {
        self.serial_enabled
    }

    /// Frame currently on the display, if the last draw succeeded.
    pub fn shown(&self) -> Option<Frame> {
        self.shown
    }

    pub fn release(self) -> (Lcd<B, D>, A, S) {
        (self.lcd, self.sampler.release(), self.serial)
    }

    /// One pass of the main loop. Returns the mode it acted on.
    pub fn run_once(
        &mut self,
        timing: &SharedTimingState,
        analog: &AnalogSample,
    ) -> Result<Mode, Error> {
        self.sampler.trigger(analog);
        self.poll_serial();

        let mode = timing.mode();
        if self.last_mode != Some(mode) {
            info!("mode -> {} at {}s", mode, timing.uptime_secs());
            self.last_mode = Some(mode);
        }
        let sample = analog.latest();

        if self.config.features.serial_heartbeat
            && timing.take_heartbeat()
            && self.serial_enabled
            && mode == Mode::Idle
        {
            let line = format_report(self.config.report_prefix, sample)?;
            self.serial.write_str(&line);
        }

        let frame = Frame::for_mode(mode, sample);
        if self.shown != Some(frame) {
            self.shown = None;
            self.draw(frame)?;
            self.shown = Some(frame);
        }
        Ok(mode)
    }

    /// Run forever. Errors are logged and the iteration is retried.
    pub fn run(&mut self, timing: &SharedTimingState, analog: &AnalogSample) -> ! {
        loop {
            if let Err(e) = self.run_once(timing, analog) {
                warn!("main loop: {}", e);
            }
        }
    }

    fn poll_serial(&mut self) {
        if let Some(byte) = self.serial.read_byte() {
            if byte == self.config.serial_toggle_byte {
                self.serial_enabled = !self.serial_enabled;
                info!("serial reports {}", self.serial_enabled);
            }
        }
    }

    fn draw(&mut self, frame: Frame) -> Result<(), Error> {
        self.lcd.clear()?;
        self.lcd.set_cursor_home()?;
        self.lcd.reset_cursor();
        match frame {
            Frame::Banner => self.lcd.write_string(self.config.banner)?,
            Frame::Reading(sample) => {
                let mut text: String<32> = String::new();
                write!(text, "{}:{} Active", self.config.report_prefix, sample)
                    .map_err(|_| Error::BufferOverflow)?;
                self.lcd.write_string(&text)?;
            }
        }
        Ok(())
    }
}
