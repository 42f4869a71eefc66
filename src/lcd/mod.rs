//! HD44780 character LCD behind an I²C GPIO expander, 4-bit interface.
//!
//! Every expander byte carries one nibble in its upper four bits plus the
//! control lines (see [`config`](crate::config) for the layout). A nibble
//! is latched by writing it with EN set, then again with EN cleared, so
//! one logical byte costs four bus writes.
//!
//! The driver tracks a logical [`Cursor`] only to know when to wrap onto
//! the second line. It never resets the cursor on its own; callers do that
//! with [`Lcd::reset_cursor`] after clearing or homing.


use embedded_hal::delay::DelayNs;

use crate::bus::ByteBus;
use crate::config::{
    LCD_BL_BIT, LCD_COLUMNS, LCD_EN_BIT, LCD_I2C_ADDRESS, LCD_LONG_DELAY_MS, LCD_ROWS,
    LCD_RS_BIT, LCD_RW_BIT, LCD_SHORT_DELAY_MS,
};
use crate::error::BusError;

/// HD44780 instruction set (subset used here).
pub mod cmd {
    pub const CLEAR_DISPLAY: u8 = 0x01;
    pub const RETURN_HOME: u8 = 0x02;
    /// Increment, no shift.
    pub const ENTRY_MODE_INCREMENT: u8 = 0x06;
    pub const DISPLAY_OFF: u8 = 0x08;
    /// Display on, cursor on, no blink.
    pub const DISPLAY_ON_CURSOR: u8 = 0x0E;
    /// 8-bit interface, used only during the reset sequence.
    pub const FUNCTION_SET_8BIT: u8 = 0x30;
    /// 4-bit interface (sent as a single nibble).
    pub const FUNCTION_SET_4BIT: u8 = 0x20;
    /// 4-bit interface, two lines, 5x8 font.
    pub const FUNCTION_SET_4BIT_2LINE: u8 = 0x28;
    pub const SET_DDRAM_ADDR: u8 = 0x80;
}

/// DDRAM address of the first column of each row.
const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

/// Which controller register a byte goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterSelect {
    Instruction,
    Data,
}

/// Logical cursor position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cursor {
    pub row: u8,
    pub col: u8,
}

pub struct Lcd<B, D> {
    bus: B,
    delay: D,
    address: u8,
    backlight: bool,
    cursor: Cursor,
}

impl<B: ByteBus, D: DelayNs> Lcd<B, D> {
    /// Driver for the display at the default expander address, backlight on.
    pub fn new(bus: B, delay: D) -> Self {
        Self::with_address(bus, delay, LCD_I2C_ADDRESS)
    }

    pub fn with_address(bus: B, delay: D, address: u8) -> Self {
        Self {
            bus,
            delay,
            address,
            backlight: true,
            cursor: Cursor::default(),
        }
    }

    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = Cursor::default();
    }

    /// Expander byte for the upper nibble of `nibble` with the given control bits.
    fn control_byte(&self, nibble: u8, rs: RegisterSelect, enable: bool) -> u8 {
        let mut byte = nibble & 0xF0;
        if self.backlight {
            byte |= 1 << LCD_BL_BIT;
        }
        if enable {
            byte |= 1 << LCD_EN_BIT;
        }
        if rs == RegisterSelect::Data {
            byte |= 1 << LCD_RS_BIT;
        }
        byte & !(1 << LCD_RW_BIT)
    }

    /// Latch one nibble: EN high, settle, EN low, settle.
    fn pulse(&mut self, nibble: u8, rs: RegisterSelect, settle_ms: u32) -> Result<(), BusError> {
        let high = self.control_byte(nibble, rs, true);
        self.bus.write_byte(self.address, high)?;
        self.delay.delay_ms(settle_ms);
        let low = self.control_byte(nibble, rs, false);
        self.bus.write_byte(self.address, low)?;
        self.delay.delay_ms(settle_ms);
        Ok(())
    }

    /// Send the upper four bits of `nibble` with the short settle delay.
    pub fn send_nibble(&mut self, nibble: u8, rs: RegisterSelect) -> Result<(), BusError> {
        self.pulse(nibble, rs, LCD_SHORT_DELAY_MS)
    }

    fn send_byte(&mut self, byte: u8, rs: RegisterSelect, settle_ms: u32) -> Result<(), BusError> {
        self.pulse(byte & 0xF0, rs, settle_ms)?;
        self.pulse(byte << 4, rs, settle_ms)
    }

    /// One logical byte transfer, high nibble first.
    pub fn write_char(&mut self, byte: u8, rs: RegisterSelect) -> Result<(), BusError> {
        self.send_byte(byte, rs, LCD_SHORT_DELAY_MS)
    }

    fn command(&mut self, instruction: u8) -> Result<(), BusError> {
        self.write_char(instruction, RegisterSelect::Instruction)
    }

    /// Software reset followed by the 4-bit, two-line initialisation.
    ///
    /// The controller is not reset with the MCU, so the 8-bit function set
    /// is repeated three times before switching to 4-bit mode.
    pub fn initialize(&mut self) -> Result<(), BusError> {
        // Power-on settle (> 30 ms).
        self.delay.delay_ms(LCD_LONG_DELAY_MS);
        self.delay.delay_ms(LCD_LONG_DELAY_MS);

        for _ in 0..3 {
            self.pulse(cmd::FUNCTION_SET_8BIT, RegisterSelect::Instruction, LCD_LONG_DELAY_MS)?;
        }
        self.send_nibble(cmd::FUNCTION_SET_4BIT, RegisterSelect::Instruction)?;

        self.command(cmd::FUNCTION_SET_4BIT_2LINE)?;
        self.command(cmd::DISPLAY_OFF)?;
        self.send_byte(
            cmd::CLEAR_DISPLAY,
            RegisterSelect::Instruction,
            LCD_LONG_DELAY_MS,
        )?;
        self.command(cmd::ENTRY_MODE_INCREMENT)?;
        self.command(cmd::DISPLAY_ON_CURSOR)?;

        info!("lcd: initialised at {=u8:#x}", self.address);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), BusError> {
        self.send_byte(
            cmd::CLEAR_DISPLAY,
            RegisterSelect::Instruction,
            LCD_LONG_DELAY_MS,
        )
    }

    pub fn set_cursor_home(&mut self) -> Result<(), BusError> {
        self.send_byte(
            cmd::RETURN_HOME,
            RegisterSelect::Instruction,
            LCD_LONG_DELAY_MS,
        )
    }

    /// Move the controller's DDRAM pointer. Out-of-range positions are clamped.
    pub fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), BusError> {
        let row = row.min(LCD_ROWS - 1);
        let col = col.min(LCD_COLUMNS - 1);
        self.command(cmd::SET_DDRAM_ADDR | (ROW_OFFSETS[row as usize] + col))?;
        self.cursor = Cursor { row, col };
        Ok(())
    }

    /// Switch the backlight; takes effect with this and every later bus write.
    pub fn set_backlight(&mut self, on: bool) -> Result<(), BusError> {
        self.backlight = on;
        let byte = self.control_byte(0, RegisterSelect::Data, false);
        self.bus.write_byte(self.address, byte)?;
        self.delay.delay_ms(LCD_SHORT_DELAY_MS);
        Ok(())
    }

    /// Write `text` at the cursor, wrapping once from the end of the first
    /// line to the start of the second.
    pub fn write_string(&mut self, text: &str) -> Result<(), BusError> {
        for byte in text.bytes() {
            if self.cursor.row == 0 && self.cursor.col == LCD_COLUMNS {
                self.command(cmd::SET_DDRAM_ADDR | ROW_OFFSETS[1])?;
                self.cursor = Cursor { row: 1, col: 0 };
            }
            self.write_char(byte, RegisterSelect::Data)?;
            self.cursor.col = self.cursor.col.saturating_add(1);
        }
        Ok(())
    }
}
