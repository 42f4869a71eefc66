//! Application-wide constants and compile-time configuration.
//!
//! All bus addresses, timing parameters, and display constants live here
//! so they can be tuned in one place. Knobs that tests or the binary
//! adjust at runtime are bundled into small `Copy` structs whose
//! `DEFAULT` values are built from the constants below.

// Two-wire bus

/// 7-bit address of the I²C GPIO expander behind the LCD (PCF8574 default).
pub const LCD_I2C_ADDRESS: u8 = 0x27;

/// Maximum number of ready-polls per bus phase before giving up.
pub const BUS_POLL_LIMIT: u32 = 10_000;

/// Half of one SCL period for the bit-banged port (µs). 5 µs ≈ 100 kHz.
pub const BITBANG_HALF_PERIOD_US: u32 = 5;

// Character LCD (HD44780 behind an 8-bit expander)
//
// Expander byte layout:
//
//   bit 7..4  data / instruction nibble
//   bit 3     backlight
//   bit 2     enable (1→0 latches the nibble)
//   bit 1     read/write (always 0 = write)
//   bit 0     register select (0 = instruction, 1 = data)

/// Register-select bit position.
pub const LCD_RS_BIT: u8 = 0;
/// Read/write bit position.
pub const LCD_RW_BIT: u8 = 1;
/// Enable bit position.
pub const LCD_EN_BIT: u8 = 2;
/// Backlight bit position.
pub const LCD_BL_BIT: u8 = 3;

/// Characters per display line.
pub const LCD_COLUMNS: u8 = 16;
/// Number of display lines.
pub const LCD_ROWS: u8 = 2;

/// Settle time after most nibble transfers (ms).
pub const LCD_SHORT_DELAY_MS: u32 = 1;
/// Settle time after reset, clear and return-home (ms).
pub const LCD_LONG_DELAY_MS: u32 = 15;

// Timing engine

/// Ticks per debounce window. The window closes once the tick counter exceeds this.
pub const DEBOUNCE_WINDOW_TICKS: u32 = 50;

/// Ticks between serial heartbeats while idle.
pub const HEARTBEAT_PERIOD_TICKS: u32 = 500;

/// Ticks per second (1 ms tick).
pub const TICKS_PER_SECOND: u32 = 1000;

/// Ratio period mapping: `sample * RATIO_SPAN / ADC_MAX + RATIO_MIN`.
pub const RATIO_MIN_TICKS: u32 = 200;
pub const RATIO_SPAN_TICKS: u32 = 800;

/// Full-scale reading of the 10-bit converter.
pub const ADC_MAX: u16 = 1023;

// Scheduler / serial

/// Received byte that toggles serial reporting on and off.
pub const SERIAL_TOGGLE_BYTE: u8 = b's';

/// Prefix of each serial status line (`"<prefix>: <value>\n"`).
pub const REPORT_PREFIX: &str = "ADC";

/// Text shown while idle.
pub const IDLE_BANNER: &str = "tickctl ready   Hold to freeze";

/// Optional behaviour on top of the basic debounce/mode loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Features {
    /// Toggle the secondary output at a period derived from the analog sample.
    pub ratio_toggle: bool,
    /// Emit periodic serial status lines while idle.
    pub serial_heartbeat: bool,
}

impl Features {
    /// Debounce and mode indication only.
    pub const BASIC: Self = Self {
        ratio_toggle: false,
        serial_heartbeat: false,
    };

    /// Everything on.
    pub const FULL: Self = Self {
        ratio_toggle: true,
        serial_heartbeat: true,
    };
}

/// Parameters of the periodic tick handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    pub debounce_window_ticks: u32,
    pub heartbeat_period_ticks: u32,
    pub ticks_per_second: u32,
    pub ratio_min_ticks: u32,
    pub ratio_span_ticks: u32,
    pub adc_max: u16,
    pub features: Features,
}

impl TimingConfig {
    pub const DEFAULT: Self = Self {
        debounce_window_ticks: DEBOUNCE_WINDOW_TICKS,
        heartbeat_period_ticks: HEARTBEAT_PERIOD_TICKS,
        ticks_per_second: TICKS_PER_SECOND,
        ratio_min_ticks: RATIO_MIN_TICKS,
        ratio_span_ticks: RATIO_SPAN_TICKS,
        adc_max: ADC_MAX,
        features: Features::FULL,
    };
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parameters of the cooperative main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub banner: &'static str,
    pub report_prefix: &'static str,
    pub serial_toggle_byte: u8,
    /// Enable the converter only around each trigger.
    pub power_gate_adc: bool,
    pub features: Features,
}

impl SchedulerConfig {
    pub const DEFAULT: Self = Self {
        banner: IDLE_BANNER,
        report_prefix: REPORT_PREFIX,
        serial_toggle_byte: SERIAL_TOGGLE_BYTE,
        power_gate_adc: true,
        features: Features::FULL,
    };
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
