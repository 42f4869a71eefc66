//! Serial status link - polled byte transmit and receive.
//!
//! Status lines have the form `"<prefix>: <value>\n"`.

use core::fmt::Write as _;

use heapless::String;

use crate::error::Error;

/// Longest status line we format.
pub const REPORT_CAPACITY: usize = 32;

/// Polled UART.
pub trait SerialPort {
    /// Transmit one byte, blocking until the transmit register is free.
    fn write_byte(&mut self, byte: u8);

    /// Return a received byte if one is waiting.
    fn read_byte(&mut self) -> Option<u8>;

    fn write_str(&mut self, text: &str) {
        for byte in text.bytes() {
            self.write_byte(byte);
        }
    }
}

impl<T: SerialPort + ?Sized> SerialPort for &mut T {
    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte)
    }

    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }
}

/// Format one status line.
pub fn format_report(prefix: &str, value: u16) -> Result<String<REPORT_CAPACITY>, Error> {
    let mut line = String::new();
    writeln!(line, "{}: {}", prefix, value).map_err(|_| Error::BufferOverflow)?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Loopback {
        tx: Vec<u8>,
        rx: Vec<u8>,
    }

    impl SerialPort for Loopback {
        fn write_byte(&mut self, byte: u8) {
            self.tx.push(byte);
        }

        fn read_byte(&mut self) -> Option<u8> {
            if self.rx.is_empty() {
                None
            } else {
                Some(self.rx.remove(0))
            }
        }
    }

    #[test]
    fn report_format() {
        assert_eq!(format_report("ADC", 511).unwrap().as_str(), "ADC: 511\n");
        assert_eq!(format_report("ADC", 0).unwrap().as_str(), "ADC: 0\n");
    }

    #[test]
    fn oversized_prefix_overflows() {
        let prefix = "a-very-long-prefix-that-does-not-fit";
        assert_eq!(format_report(prefix, 1), Err(Error::BufferOverflow));
    }

    #[test]
    fn write_str_sends_every_byte() {
        let mut port = Loopback::default();
        port.write_str("ok\n");
        assert_eq!(port.tx, b"ok\n");
    }

    #[test]
    fn read_drains_in_order() {
        let mut port = Loopback {
            rx: vec![b'a', b's'],
            ..Default::default()
        };
        assert_eq!(port.read_byte(), Some(b'a'));
        assert_eq!(port.read_byte(), Some(b's'));
        assert_eq!(port.read_byte(), None);
    }
}
