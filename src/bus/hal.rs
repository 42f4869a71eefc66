//! [`ByteBus`] over any `embedded-hal` 1.0 I²C peripheral.
//!
//! Lets the display driver run on a hardware TWI block instead of the
//! bit-banged port when the board has one free.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};

use super::ByteBus;
use crate::error::BusError;

pub struct HalBus<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> HalBus<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> ByteBus for HalBus<I2C> {
    fn write_byte(&mut self, address: u8, byte: u8) -> Result<(), BusError> {
        self.i2c
            .write(address, &[byte])
            .map_err(|e| bus_error(e.kind()))
    }
}

/// Map a HAL error kind onto the phase that failed.
pub fn bus_error(kind: ErrorKind) -> BusError {
    match kind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => BusError::AddressNack,
        ErrorKind::NoAcknowledge(_) => BusError::DataNack,
        ErrorKind::Bus | ErrorKind::ArbitrationLoss => BusError::StartFailed,
        _ => BusError::DataNack,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, Operation};

    #[derive(Debug)]
    struct FakeError(ErrorKind);

    impl embedded_hal::i2c::Error for FakeError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    struct FakeI2c {
        fail: Option<ErrorKind>,
        writes: Vec<(u8, Vec<u8>)>,
    }

    impl ErrorType for FakeI2c {
        type Error = FakeError;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), FakeError> {
            if let Some(kind) = self.fail {
                return Err(FakeError(kind));
            }
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.writes.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn writes_single_byte_frames() {
        let mut bus = HalBus::new(FakeI2c {
            fail: None,
            writes: Vec::new(),
        });
        assert_eq!(bus.write_byte(0x27, 0x0C), Ok(()));
        assert_eq!(bus.release().writes, [(0x27, vec![0x0C])]);
    }

    #[test]
    fn address_nack_maps_to_address_nack() {
        let mut bus = HalBus::new(FakeI2c {
            fail: Some(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
            writes: Vec::new(),
        });
        assert_eq!(bus.write_byte(0x27, 0x0C), Err(BusError::AddressNack));
    }

    #[test]
    fn error_kind_mapping() {
        assert_eq!(
            bus_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)),
            BusError::DataNack
        );
        assert_eq!(bus_error(ErrorKind::ArbitrationLoss), BusError::StartFailed);
        assert_eq!(bus_error(ErrorKind::Bus), BusError::StartFailed);
        assert_eq!(bus_error(ErrorKind::Overrun), BusError::DataNack);
    }
}
