//! Errors that can occur when using the OPT3001 driver.
//!
//! The error type is generic over the error type of the underlying I²C bus.

use core::fmt;

/// All errors the driver can report.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<I2CError> {
    /// The I²C transfer failed (NACK, arbitration loss, short read, ...)
    Comm(I2CError),
    /// The manufacturer ID register did not read `0x5449` ("TI").
    ///
    /// Usually a wrong address or a different chip on the bus.
    IdentityMismatch {
        /// Value read from the manufacturer ID register
        found: u16,
    },
    /// A register access was attempted before a device address was set
    NotInitialized,
}

impl<I2CError> From<I2CError> for Error<I2CError> {
    fn from(err: I2CError) -> Self {
        Error::Comm(err)
    }
}

impl<I2CError: fmt::Debug> fmt::Display for Error<I2CError> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Comm(err) => write!(f, "I2C communication error: {:?}", err),
            Error::IdentityMismatch { found } => {
                write!(f, "unexpected manufacturer ID 0x{:04X}, expected 0x5449", found)
            }
            Error::NotInitialized => f.write_str("no device address set, call begin() first"),
        }
    }
}
