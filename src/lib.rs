//! # OPT3001 driver
//! A platform-agnostic, `no_std` compatible Rust driver for the OPT3001 ambient light sensor using the `embedded-hal` traits.
//!
//! The register layout is based on the following datasheet: [OPT3001 datasheet](https://www.ti.com/lit/ds/symlink/opt3001.pdf) \
//! All registers (result, configuration, low/high limit, manufacturer and device ID) are supported.
//!
//! Measurements are converted to optical power in nW/cm² using `reading * 2^exponent * 1.2`.
//!
//! ## Usage
//! Create an instance of the driver with an `embedded_hal` I²C implementation, adjust the soft configuration and call `begin`.
//! `begin` resolves the I²C address, checks that a Texas Instruments part answers and writes the configuration.
//!
//! Afterwards `get_illuminance` reads the latest conversion result.
//! Alternatively, leave the sensor in shutdown mode and call `get_single_shot_illuminance` to take one measurement on demand.
//!
//! The driver does not lock the bus. Every method takes `&mut self`; share the driver between tasks through your own mutex.
//!
//! ## Example
//!
//! ```no_run
//! # use embedded_hal::i2c::I2c;
//! # fn demo<I: I2c>(i2c: I) -> Result<(), opt3001::Error<I::Error>> {
//! use opt3001::{ConversionTime, Mode, Opt3001, DEFAULT_ADDRESS};
//!
//! let config = opt3001::ConfigFields::default()
//!     .with_mode(Mode::Continuous)
//!     .with_conversion_time(ConversionTime::Ms800);
//! let mut sensor = Opt3001::new_with_config(i2c, config);
//!
//! sensor.begin(DEFAULT_ADDRESS)?;
//!
//! let power = sensor.get_illuminance()?;
//! log::info!("Optical power = {:.1} nW/cm2", power);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod error;
pub mod register;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{I2c, SevenBitAddress};

pub use crate::bus::{normalize_address, DEFAULT_ADDRESS};
pub use crate::error::Error;
pub use crate::register::{
    ConfigFields, ConversionTime, FaultCount, InterruptLatch, InterruptPolarity, Mode, Range, ResultFields,
};

use crate::bus::RegisterBus;
use crate::register::{Config, DeviceId, HighLimit, LowLimit, ManufacturerId, Measurement};

/// Contents of the manufacturer ID register, "TI" in ASCII
pub const TI_MANUFACTURER_ID: u16 = 0x5449;

/// Contents of the device ID register of an OPT3001
pub const OPT3001_DEVICE_ID: u16 = 0x3001;

/// Progress of the initialisation sequence
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// No address has been set yet, no register access is possible
    Unstarted,
    /// An address is set but the device has not been identified
    Addressed,
    /// The manufacturer ID matched
    Verified,
    /// The soft configuration has been written to the device
    Configured,
}

pub struct Opt3001<I2C> {
    bus: RegisterBus<I2C>,
    state: SessionState,
    config: ConfigFields,
}

impl<I2C: I2c> Opt3001<I2C> {
    /// Create a new instance of the OPT3001 driver
    ///
    /// The soft configuration starts at the power-on defaults of the sensor. Nothing is sent on the bus until
    /// `begin` or `set_address` is called.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus the sensor is connected to
    pub fn new(i2c: I2C) -> Self {
        return Self::new_with_config(i2c, ConfigFields::default());
    }

    /// Create a new instance of the OPT3001 driver with a custom soft configuration
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus the sensor is connected to
    /// * `config` - The configuration `begin` writes to the sensor
    pub fn new_with_config(i2c: I2C, config: ConfigFields) -> Self {
        return Self {
            bus: RegisterBus::new(i2c, DEFAULT_ADDRESS),
            state: SessionState::Unstarted,
            config,
        };
    }

    /// Destroys the driver and gives back the I2C bus
    pub fn release(self) -> I2C {
        return self.bus.release();
    }

    /// Sets the address, checks the manufacturer ID and writes the soft configuration
    ///
    /// Stops at the first failing step. In particular, no configuration is written if the manufacturer ID
    /// does not match. Calling it again repeats the whole sequence.
    ///
    /// # Arguments
    /// * `address` - The I2C address, see `set_address`
    pub fn begin(&mut self, address: u8) -> Result<(), Error<I2C::Error>> {
        self.set_address(address);
        self.check_comms()?;
        self.apply_config()?;

        log::debug!("OPT3001 at 0x{:02X} configured: 0x{:04X}", self.bus.address(), self.config.bits());
        return Ok(());
    }

    /// Sets the I2C address of the sensor
    ///
    /// The address is selected in hardware through the ADDR pin:
    /// GND = 0x44, VDD = 0x45, SDA = 0x46, SCL = 0x47.
    /// Any other value is mapped onto one of these four.
    ///
    /// # Arguments
    /// * `address` - The address to talk to
    pub fn set_address(&mut self, address: u8) {
        self.bus.set_address(normalize_address(address));
        self.state = SessionState::Addressed;
    }

    /// Checks that the sensor answers and identifies as a Texas Instruments part
    pub fn check_comms(&mut self) -> Result<(), Error<I2C::Error>> {
        self.ensure_addressed()?;
        self.state = SessionState::Addressed;

        let id = self.bus.read_register::<ManufacturerId>()?;
        if id != TI_MANUFACTURER_ID {
            log::warn!("OPT3001 at 0x{:02X}: unexpected manufacturer ID 0x{:04X}", self.bus.address(), id);
            return Err(Error::IdentityMismatch { found: id });
        }

        self.state = SessionState::Verified;
        return Ok(());
    }

    /// Writes the soft configuration to the sensor
    pub fn apply_config(&mut self) -> Result<(), Error<I2C::Error>> {
        self.ensure_addressed()?;
        self.bus.write_register::<Config>(&self.config)?;

        if self.state == SessionState::Verified {
            self.state = SessionState::Configured;
        }
        return Ok(());
    }

    /// Reads the configuration register
    ///
    /// This also returns the status flags (conversion ready, overflow, limit flags).
    /// The soft configuration is not changed.
    /// In latched interrupt mode, reading the configuration register clears the interrupt.
    pub fn read_config(&mut self) -> Result<ConfigFields, Error<I2C::Error>> {
        self.ensure_addressed()?;
        return self.bus.read_register::<Config>();
    }

    /// Reads the latest measurement from the sensor in nW/cm²
    ///
    /// Every call reads the result register again. In single shot or shutdown mode this is the last completed
    /// conversion, check `conversion_ready` in `read_config` to know whether it is new.
    pub fn get_illuminance(&mut self) -> Result<f32, Error<I2C::Error>> {
        return Ok(self.read_result()?.optical_power());
    }

    /// Reads the raw result register
    pub fn read_result(&mut self) -> Result<ResultFields, Error<I2C::Error>> {
        self.ensure_addressed()?;
        return self.bus.read_register::<Measurement>();
    }

    /// Takes one measurement and returns it in nW/cm²
    ///
    /// Writes the soft configuration with the mode set to single shot, waits for the conversion time plus 20%
    /// and reads the result. The sensor returns to shutdown by itself afterwards.
    ///
    /// This function is blocking and will wait for the measurement to complete.
    ///
    /// # Arguments
    /// * `delay` - The delay provider
    pub fn get_single_shot_illuminance<D: DelayNs>(&mut self, delay: &mut D) -> Result<f32, Error<I2C::Error>> {
        self.ensure_addressed()?;

        let config = self.config.with_mode(Mode::SingleShot);
        self.bus.write_register::<Config>(&config)?;

        // The conversion time is typical, give it 20% more
        let safe_delay = config.conversion_time().millis() * 12 / 10;
        delay.delay_ms(safe_delay);

        return self.get_illuminance();
    }

    /// Sets the high limit for measurements before faults occur
    ///
    /// The limit uses the same format as the result register.
    ///
    /// # Arguments
    /// * `limit` - The new high limit
    pub fn set_high_limit(&mut self, limit: ResultFields) -> Result<(), Error<I2C::Error>> {
        self.ensure_addressed()?;
        return self.bus.write_register::<HighLimit>(&limit);
    }

    /// Gets the sensor's current high limit
    pub fn get_high_limit(&mut self) -> Result<ResultFields, Error<I2C::Error>> {
        self.ensure_addressed()?;
        return self.bus.read_register::<HighLimit>();
    }

    /// Sets the low limit for measurements before faults occur
    ///
    /// # Arguments
    /// * `limit` - The new low limit
    pub fn set_low_limit(&mut self, limit: ResultFields) -> Result<(), Error<I2C::Error>> {
        self.ensure_addressed()?;
        return self.bus.write_register::<LowLimit>(&limit);
    }

    /// Gets the sensor's current low limit, 0 after reset
    pub fn get_low_limit(&mut self) -> Result<ResultFields, Error<I2C::Error>> {
        self.ensure_addressed()?;
        return self.bus.read_register::<LowLimit>();
    }

    /// Reads the manufacturer ID register, 0x5449 for Texas Instruments
    pub fn manufacturer_id(&mut self) -> Result<u16, Error<I2C::Error>> {
        self.ensure_addressed()?;
        return self.bus.read_register::<ManufacturerId>();
    }

    /// Reads the device ID register, 0x3001 for an OPT3001
    pub fn device_id(&mut self) -> Result<u16, Error<I2C::Error>> {
        self.ensure_addressed()?;
        return self.bus.read_register::<DeviceId>();
    }

    /// The soft configuration written by `begin` and `apply_config`
    pub fn config(&self) -> ConfigFields {
        return self.config;
    }

    /// Mutable access to the soft configuration, changes take effect with the next `apply_config`
    pub fn config_mut(&mut self) -> &mut ConfigFields {
        return &mut self.config;
    }

    /// Replaces the soft configuration without writing it to the sensor
    pub fn set_config(&mut self, config: ConfigFields) {
        self.config = config;
    }

    /// The I2C address in use, only meaningful once an address was set
    pub fn address(&self) -> SevenBitAddress {
        return self.bus.address();
    }

    pub fn state(&self) -> SessionState {
        return self.state;
    }

    fn ensure_addressed(&self) -> Result<(), Error<I2C::Error>> {
        if self.state == SessionState::Unstarted {
            return Err(Error::NotInitialized);
        }
        return Ok(());
    }
}
