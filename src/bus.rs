//! Register access over I²C.
//!
//! A register write is a single I²C write of the register pointer followed by the data bytes.
//! A register read first writes the register pointer, then reads the data in a second transfer.
//! If the pointer write fails, the read transfer is never started.

use embedded_hal::i2c::{I2c, Operation, SevenBitAddress};

use crate::error::Error;
use crate::register::{Readable, Writable, REGISTER_BYTES};

/// Bits of a raw address that are selectable through the ADDR pin, plus the fixed family bits.
const ADDRESS_MASK: u8 = 0b100_0111;
/// Bits that are set in every OPT3001 address.
const ADDRESS_BASE: u8 = 0b100_0100;

/// Address with ADDR tied to GND.
pub const DEFAULT_ADDRESS: SevenBitAddress = 0x44;

/// Maps any byte onto one of the four addresses the ADDR pin can select.
///
/// | ADDR pin | Address |
/// |----------|---------|
/// | GND      | `0x44`  |
/// | VDD      | `0x45`  |
/// | SDA      | `0x46`  |
/// | SCL      | `0x47`  |
pub const fn normalize_address(raw: u8) -> SevenBitAddress {
    (raw | ADDRESS_BASE) & ADDRESS_MASK
}

/// Reads and writes whole registers of one device on an I²C bus.
pub struct RegisterBus<I2C> {
    i2c: I2C,
    address: SevenBitAddress,
}

impl<I2C: I2c> RegisterBus<I2C> {
    pub fn new(i2c: I2C, address: SevenBitAddress) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    pub fn set_address(&mut self, address: SevenBitAddress) {
        self.address = address;
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Encodes `value` and writes it to register `W`.
    pub fn write_register<W: Writable>(&mut self, value: &W::In) -> Result<(), Error<I2C::Error>> {
        self.write_raw(W::ADDR, &W::encode(value))
    }

    /// Reads register `R` and decodes it.
    pub fn read_register<R: Readable>(&mut self) -> Result<R::Out, Error<I2C::Error>> {
        let mut data = [0u8; REGISTER_BYTES];
        self.read_raw(R::ADDR, &mut data)?;
        Ok(R::decode(&data))
    }

    /// Writes `reg` followed by `data` in one transfer.
    pub fn write_raw(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        log::trace!("write 0x{:02X} <- {:02X?}", reg, data);

        if data.len() > REGISTER_BYTES {
            // Adjacent writes of a transaction go out without a repeated start
            self.i2c.transaction(self.address, &mut [Operation::Write(&[reg]), Operation::Write(data)])?;
            return Ok(());
        }

        let mut frame = [0u8; 1 + REGISTER_BYTES];
        frame[0] = reg;
        frame[1..=data.len()].copy_from_slice(data);
        self.i2c.write(self.address, &frame[..=data.len()])?;
        Ok(())
    }

    /// Sets the register pointer to `reg`, then fills `data` starting at that register.
    ///
    /// `embedded-hal` reads either fill the whole buffer or fail, so a short read is reported as
    /// [`Error::Comm`].
    pub fn read_raw(&mut self, reg: u8, data: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        self.i2c.write(self.address, &[reg])?;
        self.i2c.read(self.address, data)?;
        log::trace!("read 0x{:02X} -> {:02X?}", reg, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{Config, ConfigFields, HighLimit, Measurement, ResultFields};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    #[test]
    fn address_is_always_valid() {
        for raw in 0..=u8::MAX {
            let address = normalize_address(raw);
            assert!((0x44..=0x47).contains(&address), "0x{:02X} -> 0x{:02X}", raw, address);
        }
    }

    #[test]
    fn address_keeps_pin_bits() {
        assert_eq!(0x44, normalize_address(0x44));
        assert_eq!(0x45, normalize_address(0x45));
        assert_eq!(0x46, normalize_address(0x46));
        assert_eq!(0x47, normalize_address(0x47));
        assert_eq!(0x44, normalize_address(0x00));
        assert_eq!(0x47, normalize_address(0xFF));
        assert_eq!(0x45, normalize_address(0x01));
    }

    #[test]
    fn write_register_sends_pointer_then_msb_first() {
        let expectations = [Transaction::write(0x45, vec![0x03, 0x20, 0x64])];
        let mut i2c = I2cMock::new(&expectations);

        let mut bus = RegisterBus::new(i2c.clone(), 0x45);
        bus.write_register::<HighLimit>(&ResultFields::new(100, 2)).unwrap();

        i2c.done();
    }

    #[test]
    fn read_register_sets_pointer_then_reads() {
        let expectations = [
            Transaction::write(0x44, vec![0x01]),
            Transaction::read(0x44, vec![0xC8, 0x10]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let mut bus = RegisterBus::new(i2c.clone(), 0x44);
        let config = bus.read_register::<Config>().unwrap();
        assert_eq!(ConfigFields::default(), config);

        i2c.done();
    }

    #[test]
    fn long_raw_write_is_one_transaction() {
        let expectations = [
            Transaction::transaction_start(0x44),
            Transaction::write(0x44, vec![0x02]),
            Transaction::write(0x44, vec![0x00, 0x05, 0xB0, 0x10]),
            Transaction::transaction_end(0x44),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let mut bus = RegisterBus::new(i2c.clone(), 0x44);
        bus.write_raw(0x02, &[0x00, 0x05, 0xB0, 0x10]).unwrap();

        i2c.done();
    }

    #[test]
    fn failed_pointer_write_skips_read() {
        let expectations = [Transaction::write(0x44, vec![0x00]).with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expectations);

        let mut bus = RegisterBus::new(i2c.clone(), 0x44);
        let result = bus.read_register::<Measurement>();
        assert_eq!(Err(Error::Comm(ErrorKind::Other)), result);

        // no read transaction expected
        i2c.done();
    }

    #[test]
    fn failed_read_is_comm_error() {
        let expectations = [
            Transaction::write(0x44, vec![0x00]),
            Transaction::read(0x44, vec![0x00, 0x00]).with_error(ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let mut bus = RegisterBus::new(i2c.clone(), 0x44);
        assert_eq!(Err(Error::Comm(ErrorKind::Other)), bus.read_register::<Measurement>());

        i2c.done();
    }

    #[test]
    fn failed_write_is_comm_error() {
        let expectations = [Transaction::write(0x44, vec![0x01, 0xC8, 0x10]).with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expectations);

        let mut bus = RegisterBus::new(i2c.clone(), 0x44);
        assert_eq!(
            Err(Error::Comm(ErrorKind::Other)),
            bus.write_register::<Config>(&ConfigFields::default())
        );

        i2c.done();
    }
}
