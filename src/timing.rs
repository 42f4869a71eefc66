//! Debounce & timing engine - the body of the 1 ms periodic interrupt.
//!
//! ## Ownership
//!
//! Every field of [`SharedTimingState`] is written only by
//! [`TimingEngine::tick`] (periodic context) and read by the main loop.
//! The one exception is the heartbeat flag, which the main loop consumes
//! with an atomic swap in [`SharedTimingState::take_heartbeat`]. The other
//! fields are individual atomics using plain loads and stores; a reader may
//! observe a window
//! that is only partly updated, which is fine because every consumer reads
//! single values, never a multi-field snapshot.
//!
//! ## Debounce
//!
//! Once per window the raw input is sampled and compared with the previous
//! window's sample. The debounced value is the raw value when both agree
//! and `false` otherwise - instability reads as "not pressed".
//!
//! ## Mode
//!
//! Each window whose debounced value is "not pressed" advances the
//! transition counter by one; the mode is its parity. Holding the button
//! freezes the mode.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::analog::AnalogSample;
use crate::config::TimingConfig;

/// Discrete operating state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Banner on the display, serial heartbeat running.
    Idle,
    /// Live reading on the display, ratio output toggling.
    Active,
}

impl Mode {
    pub fn from_transitions(count: u32) -> Self {
        if count % 2 == 0 {
            Mode::Idle
        } else {
            Mode::Active
        }
    }
}

pub struct SharedTimingState {
    debounced: AtomicBool,
    raw: AtomicBool,
    previous_raw: AtomicBool,
    reliable: AtomicBool,
    window_ticks: AtomicU32,
    mode_transitions: AtomicU32,
    second_ticks: AtomicU32,
    uptime_secs: AtomicU32,
    ratio_ticks: AtomicU32,
    ratio_level: AtomicBool,
    heartbeat_ticks: AtomicU32,
    heartbeat_pending: AtomicBool,
}

impl SharedTimingState {
    pub const fn new() -> Self {
        Self {
            debounced: AtomicBool::new(false),
            raw: AtomicBool::new(false),
            previous_raw: AtomicBool::new(false),
            reliable: AtomicBool::new(false),
            window_ticks: AtomicU32::new(0),
            mode_transitions: AtomicU32::new(0),
            second_ticks: AtomicU32::new(0),
            uptime_secs: AtomicU32::new(0),
            ratio_ticks: AtomicU32::new(0),
            ratio_level: AtomicBool::new(false),
            heartbeat_ticks: AtomicU32::new(0),
            heartbeat_pending: AtomicBool::new(false),
        }
    }

    /// Debounced button state; `true` = pressed.
    pub fn debounced(&self) -> bool {
        self.debounced.load(Ordering::Acquire)
    }

    /// Raw sample taken at the last window boundary.
    pub fn raw_sample(&self) -> bool {
        self.raw.load(Ordering::Relaxed)
    }

    /// Whether the last two window samples agreed.
    pub fn is_reliable(&self) -> bool {
        self.reliable.load(Ordering::Relaxed)
    }

    /// Ticks elapsed in the current debounce window.
    pub fn window_ticks(&self) -> u32 {
        self.window_ticks.load(Ordering::Relaxed)
    }

    pub fn mode_transitions(&self) -> u32 {
        self.mode_transitions.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> Mode {
        Mode::from_transitions(self.mode_transitions())
    }

    pub fn uptime_secs(&self) -> u32 {
        self.uptime_secs.load(Ordering::Relaxed)
    }

    /// Current level of the ratio-derived output line.
    pub fn ratio_level(&self) -> bool {
        self.ratio_level.load(Ordering::Relaxed)
    }

    /// Consume a pending heartbeat, if any.
    pub fn take_heartbeat(&self) -> bool {
        self.heartbeat_pending.swap(false, Ordering::AcqRel)
    }
}

impl Default for SharedTimingState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the periodic context should do with its output lines this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickOutputs {
    /// A debounce window closed on this tick.
    pub window_closed: bool,
    /// Level for the mode indicator line (high while idle).
    pub indicator: bool,
    /// The ratio line flipped on this tick.
    pub ratio_toggled: bool,
    /// A serial heartbeat became due on this tick.
    pub heartbeat: bool,
}

/// Toggle period in ticks derived from an analog sample:
/// `sample * span / adc_max + min`, with `sample` clamped to `adc_max`.
pub fn ratio_period(sample: u16, config: &TimingConfig) -> u32 {
    if config.adc_max == 0 {
        return config.ratio_min_ticks;
    }
    let sample = u32::from(sample.min(config.adc_max));
    sample * config.ratio_span_ticks / u32::from(config.adc_max) + config.ratio_min_ticks
}

/// Periodic tick handler. Owned by the periodic context.
pub struct TimingEngine<'a> {
    config: TimingConfig,
    state: &'a SharedTimingState,
    analog: &'a AnalogSample,
}

impl<'a> TimingEngine<'a> {
    pub fn new(config: TimingConfig, state: &'a SharedTimingState, analog: &'a AnalogSample) -> Self {
        Self {
            config,
            state,
            analog,
        }
    }

    /// Advance one tick. `read_raw` is called only when a window closes and
    /// returns `true` when the input reads "pressed".
    pub fn tick(&mut self, read_raw: impl FnOnce() -> bool) -> TickOutputs {
        let s = self.state;
        let cfg = &self.config;
        let mut out = TickOutputs::default();

        // Slow clock: whole seconds of uptime.
        let second = s.second_ticks.load(Ordering::Relaxed) + 1;
        if second >= cfg.ticks_per_second {
            let secs = s.uptime_secs.load(Ordering::Relaxed).wrapping_add(1);
            s.uptime_secs.store(secs, Ordering::Relaxed);
            s.second_ticks.store(0, Ordering::Relaxed);
        } else {
            s.second_ticks.store(second, Ordering::Relaxed);
        }

        let window = s.window_ticks.load(Ordering::Relaxed) + 1;
        if window > cfg.debounce_window_ticks {
            let raw = read_raw();
            let reliable = raw == s.previous_raw.load(Ordering::Relaxed);
            s.raw.store(raw, Ordering::Relaxed);
            s.reliable.store(reliable, Ordering::Relaxed);
            s.previous_raw.store(raw, Ordering::Relaxed);
            s.window_ticks.store(0, Ordering::Relaxed);

            let pressed = raw && reliable;
            s.debounced.store(pressed, Ordering::Release);

            if !pressed {
                let n = s.mode_transitions.load(Ordering::Relaxed).wrapping_add(1);
                s.mode_transitions.store(n, Ordering::Release);
            }
            out.window_closed = true;
        } else {
            s.window_ticks.store(window, Ordering::Relaxed);
        }

        let mode = s.mode();
        out.indicator = mode == Mode::Idle;

        if cfg.features.ratio_toggle && mode == Mode::Active {
            let period = ratio_period(self.analog.latest(), cfg);
            let mut n = s.ratio_ticks.load(Ordering::Relaxed) + 1;
            if n > period {
                let level = !s.ratio_level.load(Ordering::Relaxed);
                s.ratio_level.store(level, Ordering::Relaxed);
                out.ratio_toggled = true;
                n = 0;
            }
            s.ratio_ticks.store(n, Ordering::Relaxed);
        } else {
            s.ratio_ticks.store(0, Ordering::Relaxed);
        }

        if cfg.features.serial_heartbeat && mode == Mode::Idle {
            let mut n = s.heartbeat_ticks.load(Ordering::Relaxed) + 1;
            if n >= cfg.heartbeat_period_ticks {
                s.heartbeat_pending.store(true, Ordering::Release);
                out.heartbeat = true;
                n = 0;
            }
            s.heartbeat_ticks.store(n, Ordering::Relaxed);
        } else {
            s.heartbeat_ticks.store(0, Ordering::Relaxed);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Features;

    /// Tick with the input held at `raw` until the current window closes.
    fn run_window(engine: &mut TimingEngine<'_>, raw: bool) -> TickOutputs {
        loop {
            let out = engine.tick(|| raw);
            if out.window_closed {
                return out;
            }
        }
    }

    #[test]
    fn window_spans_configured_ticks() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        for _ in 0..3 {
            let mut ticks = 0;
            while !engine.tick(|| false).window_closed {
                ticks += 1;
                assert_eq!(state.window_ticks(), ticks);
            }
            assert_eq!(ticks + 1, 51);
            assert_eq!(state.window_ticks(), 0);
        }
    }

    #[test]
    fn pairwise_agreement_scenario() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        let mut seen = Vec::new();
        for raw in [false, false, false, true, true, false] {
            run_window(&mut engine, raw);
            seen.push(state.debounced());
        }
        assert_eq!(seen, [false, false, false, false, true, false]);
    }

    #[test]
    fn unreliable_window_forces_not_pressed() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        run_window(&mut engine, true);
        assert!(state.raw_sample());
        assert!(!state.is_reliable());
        assert!(!state.debounced());

        run_window(&mut engine, true);
        assert!(state.is_reliable());
        assert!(state.debounced());
    }

    #[test]
    fn debounced_only_changes_at_agreeing_boundaries() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        let mut seed: u32 = 0x1234_5678;
        let mut prev_sample = false;
        let mut debounced = state.debounced();
        for _ in 0..20_000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let noisy = (seed >> 16) & 1 == 1;
            let mut sampled = None;
            let out = engine.tick(|| {
                sampled = Some(noisy);
                noisy
            });

            assert_eq!(sampled.is_some(), out.window_closed);
            if let Some(sample) = sampled {
                if state.debounced() {
                    assert!(sample && prev_sample);
                }
                prev_sample = sample;
            } else {
                assert_eq!(state.debounced(), debounced);
            }
            debounced = state.debounced();
        }
    }

    #[test]
    fn mode_advances_once_per_released_window() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        assert_eq!(state.mode(), Mode::Idle);
        run_window(&mut engine, false);
        assert_eq!(state.mode_transitions(), 1);
        assert_eq!(state.mode(), Mode::Active);
        run_window(&mut engine, false);
        assert_eq!(state.mode(), Mode::Idle);

        // First pressed window is unreliable and still counts as released.
        run_window(&mut engine, true);
        assert_eq!(state.mode_transitions(), 3);

        for _ in 0..10 {
            run_window(&mut engine, true);
            assert_eq!(state.mode_transitions(), 3);
            assert_eq!(state.mode(), Mode::Active);
        }

        run_window(&mut engine, false);
        assert_eq!(state.mode_transitions(), 4);
        assert_eq!(state.mode(), Mode::Idle);
    }

    #[test]
    fn indicator_follows_mode() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        assert!(engine.tick(|| false).indicator);
        let out = run_window(&mut engine, false);
        assert_eq!(state.mode(), Mode::Active);
        assert!(!out.indicator);
        let out = run_window(&mut engine, false);
        assert_eq!(state.mode(), Mode::Idle);
        assert!(out.indicator);
    }

    #[test]
    fn ratio_period_mapping() {
        let cfg = TimingConfig::DEFAULT;
        assert_eq!(ratio_period(0, &cfg), 200);
        assert_eq!(ratio_period(511, &cfg), 599);
        assert_eq!(ratio_period(1023, &cfg), 1000);
        assert_eq!(ratio_period(4095, &cfg), 1000);
    }

    #[test]
    fn ratio_line_toggles_every_600_ticks_at_mid_scale() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        analog.capture(511);
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        // Released, released, pressed, pressed: held in Active.
        for raw in [false, false, true, true] {
            run_window(&mut engine, raw);
        }
        assert_eq!(state.mode(), Mode::Active);

        let mut toggles = Vec::new();
        for t in 0..5_000u32 {
            let level_before = state.ratio_level();
            if engine.tick(|| true).ratio_toggled {
                assert_ne!(state.ratio_level(), level_before);
                toggles.push(t);
            }
        }
        assert!(toggles.len() >= 7);
        assert!(toggles.windows(2).all(|w| w[1] - w[0] == 600));
    }

    #[test]
    fn ratio_line_is_quiet_while_idle() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        // Released, pressed, pressed: held in Idle.
        for raw in [false, true, true] {
            run_window(&mut engine, raw);
        }
        assert_eq!(state.mode(), Mode::Idle);
        assert!((0..5_000).all(|_| !engine.tick(|| true).ratio_toggled));
    }

    #[test]
    fn heartbeat_every_500_ticks_only_while_idle() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        for raw in [false, true, true] {
            run_window(&mut engine, raw);
        }
        assert_eq!(state.mode(), Mode::Idle);
        let _ = state.take_heartbeat();

        let mut beats = Vec::new();
        for t in 0..3_000u32 {
            if engine.tick(|| true).heartbeat {
                beats.push(t);
            }
        }
        assert!(beats.len() >= 5);
        assert!(beats.windows(2).all(|w| w[1] - w[0] == 500));
        assert!(state.take_heartbeat());
        assert!(!state.take_heartbeat());

        // Release for two windows, then hold: lands in Active.
        for raw in [false, false, true, true] {
            run_window(&mut engine, raw);
        }
        assert_eq!(state.mode(), Mode::Active);
        let _ = state.take_heartbeat();
        assert!((0..3_000).all(|_| !engine.tick(|| true).heartbeat));
        assert!(!state.take_heartbeat());
    }

    #[test]
    fn each_heartbeat_is_taken_exactly_once() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);
        for raw in [false, true, true] {
            run_window(&mut engine, raw);
        }
        let mut taken = 0;
        for _ in 0..1_500 {
            if engine.tick(|| true).heartbeat {
                assert!(state.take_heartbeat());
                taken += 1;
            }
        }
        assert_eq!(taken, 3);
        assert!(!state.take_heartbeat());
    }

    #[test]
    fn basic_features_disable_ratio_and_heartbeat() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let config = TimingConfig {
            features: Features::BASIC,
            ..TimingConfig::DEFAULT
        };
        let mut engine = TimingEngine::new(config, &state, &analog);

        for _ in 0..5_000 {
            let out = engine.tick(|| false);
            assert!(!out.ratio_toggled);
            assert!(!out.heartbeat);
        }
        assert!(!state.take_heartbeat());
    }

    #[test]
    fn uptime_counts_seconds() {
        let state = SharedTimingState::new();
        let analog = AnalogSample::new();
        let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &state, &analog);

        for _ in 0..2_500 {
            engine.tick(|| false);
        }
        assert_eq!(state.uptime_secs(), 2);
    }
}
