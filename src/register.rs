//! Register map and bit-field codec of the OPT3001.
//!
//! Every register of the sensor is 16 bits wide and is transferred most significant byte first.
//! Each register has a marker type implementing [`Reg`], plus [`Readable`] and/or [`Writable`]
//! depending on its access. The marker decides how the two raw bytes are turned into a value.
//!
//! | Address | Register        | Access | Value type       |
//! |---------|-----------------|--------|------------------|
//! | `0x00`  | Result          | R      | [`ResultFields`] |
//! | `0x01`  | Configuration   | R/W    | [`ConfigFields`] |
//! | `0x02`  | Low Limit       | R/W    | [`ResultFields`] |
//! | `0x03`  | High Limit      | R/W    | [`ResultFields`] |
//! | `0x7E`  | Manufacturer ID | R      | `u16`            |
//! | `0x7F`  | Device ID       | R      | `u16`            |

/// Number of bytes in every OPT3001 register.
pub const REGISTER_BYTES: usize = 2;

/// Implemented by every register marker type.
pub trait Reg {
    /// Register pointer sent on the bus before the data bytes.
    const ADDR: u8;
}

/// A register that can be read from the sensor.
pub trait Readable: Reg {
    type Out;
    fn decode(b: &[u8; REGISTER_BYTES]) -> Self::Out;
}

/// A register that can be written to the sensor.
pub trait Writable: Reg {
    type In;
    fn encode(v: &Self::In) -> [u8; REGISTER_BYTES];
}

/// Marker for the Result (`0x00`) register. Read-only.
pub struct Measurement;
impl Reg for Measurement { const ADDR: u8 = 0x00; }

/// Marker for the Configuration (`0x01`) register.
pub struct Config;
impl Reg for Config { const ADDR: u8 = 0x01; }

/// Marker for the Low Limit (`0x02`) register.
pub struct LowLimit;
impl Reg for LowLimit { const ADDR: u8 = 0x02; }

/// Marker for the High Limit (`0x03`) register.
pub struct HighLimit;
impl Reg for HighLimit { const ADDR: u8 = 0x03; }

/// Marker for the Manufacturer ID (`0x7E`) register. Read-only, reads `0x5449` ("TI").
pub struct ManufacturerId;
impl Reg for ManufacturerId { const ADDR: u8 = 0x7E; }

/// Marker for the Device ID (`0x7F`) register. Read-only.
pub struct DeviceId;
impl Reg for DeviceId { const ADDR: u8 = 0x7F; }

impl Readable for Measurement {
    type Out = ResultFields;
    fn decode(b: &[u8; REGISTER_BYTES]) -> Self::Out {
        ResultFields::from_bits(u16::from_be_bytes(*b))
    }
}

impl Readable for LowLimit {
    type Out = ResultFields;
    fn decode(b: &[u8; REGISTER_BYTES]) -> Self::Out {
        ResultFields::from_bits(u16::from_be_bytes(*b))
    }
}

impl Writable for LowLimit {
    type In = ResultFields;
    fn encode(v: &Self::In) -> [u8; REGISTER_BYTES] {
        v.bits().to_be_bytes()
    }
}

impl Readable for HighLimit {
    type Out = ResultFields;
    fn decode(b: &[u8; REGISTER_BYTES]) -> Self::Out {
        ResultFields::from_bits(u16::from_be_bytes(*b))
    }
}

impl Writable for HighLimit {
    type In = ResultFields;
    fn encode(v: &Self::In) -> [u8; REGISTER_BYTES] {
        v.bits().to_be_bytes()
    }
}

impl Readable for Config {
    type Out = ConfigFields;
    fn decode(b: &[u8; REGISTER_BYTES]) -> Self::Out {
        ConfigFields::from_bits(u16::from_be_bytes(*b))
    }
}

impl Writable for Config {
    type In = ConfigFields;
    fn encode(v: &Self::In) -> [u8; REGISTER_BYTES] {
        v.bits().to_be_bytes()
    }
}

impl Readable for ManufacturerId {
    type Out = u16;
    fn decode(b: &[u8; REGISTER_BYTES]) -> Self::Out {
        u16::from_be_bytes(*b)
    }
}

impl Readable for DeviceId {
    type Out = u16;
    fn decode(b: &[u8; REGISTER_BYTES]) -> Self::Out {
        u16::from_be_bytes(*b)
    }
}

const READING_MASK: u16 = 0x0FFF;
const EXPONENT_SHIFT: u16 = 12;
const EXPONENT_MASK: u8 = 0x0F;

/// Scale of one LSB at exponent 0, in tenths of nW/cm² (1.2 nW/cm²).
const LSB_TENTH_NW_PER_CM2: u32 = 12;

/// Layout shared by the Result, Low Limit and High Limit registers:
/// a 12-bit mantissa in bits 11:0 and a 4-bit exponent in bits 15:12.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResultFields {
    /// Fractional part of the value. Only the low 12 bits are encoded.
    pub reading: u16,
    /// Binary exponent. Only the low 4 bits are encoded.
    pub exponent: u8,
}

impl ResultFields {
    pub const fn new(reading: u16, exponent: u8) -> Self {
        Self { reading, exponent }
    }

    pub const fn from_bits(raw: u16) -> Self {
        Self {
            reading: raw & READING_MASK,
            exponent: (raw >> EXPONENT_SHIFT) as u8 & EXPONENT_MASK,
        }
    }

    /// Packs the fields into the raw register word, truncating each to its width.
    pub const fn bits(&self) -> u16 {
        (self.reading & READING_MASK) | ((self.exponent & EXPONENT_MASK) as u16) << EXPONENT_SHIFT
    }

    /// Converts the word to optical power in nW/cm²: `reading * 2^exponent * 1.2`
    pub fn optical_power(&self) -> f32 {
        // (0xFFF << 15) * 12 fits in a u32
        let reading = (self.reading & READING_MASK) as u32;
        let tenths = (reading << (self.exponent & EXPONENT_MASK)) * LSB_TENTH_NW_PER_CM2;
        tenths as f32 / 10.0
    }
}

/// Number of consecutive faults needed before the interrupt is raised.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultCount {
    One = 0b00,
    Two = 0b01,
    Four = 0b10,
    Eight = 0b11,
}

impl From<u8> for FaultCount {
    fn from(field: u8) -> Self {
        match field & 0b11 {
            0b00 => FaultCount::One,
            0b01 => FaultCount::Two,
            0b10 => FaultCount::Four,
            _ => FaultCount::Eight,
        }
    }
}

/// Polarity of the INT pin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptPolarity {
    /// Needs a pull-up resistor on INT.
    ActiveLow = 0,
    ActiveHigh = 1,
}

/// Latch behaviour of the interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptLatch {
    /// Self-clearing once the measurement is back inside the limits.
    Hysteresis = 0,
    /// Stays set until the configuration register is read.
    Latched = 1,
}

/// Conversion mode of the sensor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Low power state, power-on default.
    Shutdown = 0b00,
    /// One conversion, then back to shutdown.
    SingleShot = 0b01,
    Continuous = 0b10,
}

impl From<u8> for Mode {
    fn from(field: u8) -> Self {
        // 0b11 is also continuous on the device
        match field & 0b11 {
            0b00 => Mode::Shutdown,
            0b01 => Mode::SingleShot,
            _ => Mode::Continuous,
        }
    }
}

/// Integration time of one conversion.
///
/// A short integration time lowers the effective full-scale range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionTime {
    Ms100 = 0,
    Ms800 = 1,
}

impl ConversionTime {
    pub const fn millis(&self) -> u32 {
        match self {
            ConversionTime::Ms100 => 100,
            ConversionTime::Ms800 => 800,
        }
    }
}

/// Full-scale range setting.
///
/// Names follow the approximate full-scale value in nW/cm².
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Range {
    R40 = 0,
    R80 = 1,
    R160 = 2,
    R320 = 3,
    R640 = 4,
    R1K3 = 5,
    R2K6 = 6,
    R5K2 = 7,
    R10K = 8,
    R21K = 9,
    R42K = 10,
    R84K = 11,
    /// The device picks the range for each conversion.
    Auto = 0b1100,
}

impl Range {
    /// Maps a raw 4-bit range code. Codes above `0b1100` are reserved and yield `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code & 0x0F {
            0 => Range::R40,
            1 => Range::R80,
            2 => Range::R160,
            3 => Range::R320,
            4 => Range::R640,
            5 => Range::R1K3,
            6 => Range::R2K6,
            7 => Range::R5K2,
            8 => Range::R10K,
            9 => Range::R21K,
            10 => Range::R42K,
            11 => Range::R84K,
            12 => Range::Auto,
            _ => return None,
        })
    }

    /// Largest value the range can represent, in nW/cm². `None` for [`Range::Auto`].
    pub fn full_scale(&self) -> Option<f32> {
        match self {
            Range::Auto => None,
            fixed => Some(ResultFields::new(0x0FFF, *fixed as u8).optical_power()),
        }
    }
}

const FAULT_COUNT_SHIFT: u16 = 0;
const MASK_EXPONENT_BIT: u16 = 2;
const POLARITY_BIT: u16 = 3;
const LATCH_BIT: u16 = 4;
const FLAG_LOW_BIT: u16 = 5;
const FLAG_HIGH_BIT: u16 = 6;
const CONVERSION_READY_BIT: u16 = 7;
const OVERFLOW_BIT: u16 = 8;
const MODE_SHIFT: u16 = 9;
const CONVERSION_TIME_BIT: u16 = 11;
const RANGE_SHIFT: u16 = 12;

/// Value of the configuration register after power-on.
pub const CONFIG_RESET_VALUE: u16 = 0xC810;

/// Contents of the Configuration (`0x01`) register.
///
/// Fields hold the raw bit values; multi-bit fields are truncated to their width when encoded.
/// The typed accessors ([`mode`](Self::mode), [`range`](Self::range), ...) read and write the
/// same fields.
///
/// `flag_low`, `flag_high`, `conversion_ready` and `overflow` are reported by the device and
/// ignored by it on write. They are still stored and encoded like every other field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigFields {
    /// Bits 1:0, see [`FaultCount`].
    pub fault_count: u8,
    /// Bit 2. Forces the result exponent to zero when a fixed range is selected.
    pub mask_exponent: bool,
    /// Bit 3, see [`InterruptPolarity`].
    pub interrupt_polarity: bool,
    /// Bit 4, see [`InterruptLatch`].
    pub latch: bool,
    /// Bit 5. Read-only: the last conversion was below the low limit.
    pub flag_low: bool,
    /// Bit 6. Read-only: the last conversion was above the high limit.
    pub flag_high: bool,
    /// Bit 7. Read-only: a conversion has completed.
    pub conversion_ready: bool,
    /// Bit 8. Read-only: the ADC overflowed.
    pub overflow: bool,
    /// Bits 10:9, see [`Mode`].
    pub mode: u8,
    /// Bit 11, see [`ConversionTime`].
    pub conversion_time: u8,
    /// Bits 15:12, see [`Range`].
    pub range: u8,
}

impl Default for ConfigFields {
    fn default() -> Self {
        Self::from_bits(CONFIG_RESET_VALUE)
    }
}

#[inline]
const fn bit(raw: u16, n: u16) -> bool {
    raw & (1 << n) != 0
}

impl ConfigFields {
    pub const fn from_bits(raw: u16) -> Self {
        Self {
            fault_count: ((raw >> FAULT_COUNT_SHIFT) & 0b11) as u8,
            mask_exponent: bit(raw, MASK_EXPONENT_BIT),
            interrupt_polarity: bit(raw, POLARITY_BIT),
            latch: bit(raw, LATCH_BIT),
            flag_low: bit(raw, FLAG_LOW_BIT),
            flag_high: bit(raw, FLAG_HIGH_BIT),
            conversion_ready: bit(raw, CONVERSION_READY_BIT),
            overflow: bit(raw, OVERFLOW_BIT),
            mode: ((raw >> MODE_SHIFT) & 0b11) as u8,
            conversion_time: ((raw >> CONVERSION_TIME_BIT) & 0b1) as u8,
            range: ((raw >> RANGE_SHIFT) & 0b1111) as u8,
        }
    }

    /// Packs the fields into the raw register word.
    pub const fn bits(&self) -> u16 {
        ((self.fault_count as u16 & 0b11) << FAULT_COUNT_SHIFT)
            | (self.mask_exponent as u16) << MASK_EXPONENT_BIT
            | (self.interrupt_polarity as u16) << POLARITY_BIT
            | (self.latch as u16) << LATCH_BIT
            | (self.flag_low as u16) << FLAG_LOW_BIT
            | (self.flag_high as u16) << FLAG_HIGH_BIT
            | (self.conversion_ready as u16) << CONVERSION_READY_BIT
            | (self.overflow as u16) << OVERFLOW_BIT
            | (self.mode as u16 & 0b11) << MODE_SHIFT
            | (self.conversion_time as u16 & 0b1) << CONVERSION_TIME_BIT
            | (self.range as u16 & 0b1111) << RANGE_SHIFT
    }

    pub fn fault_count(&self) -> FaultCount {
        FaultCount::from(self.fault_count)
    }

    pub fn interrupt_polarity(&self) -> InterruptPolarity {
        if self.interrupt_polarity { InterruptPolarity::ActiveHigh } else { InterruptPolarity::ActiveLow }
    }

    pub fn latch(&self) -> InterruptLatch {
        if self.latch { InterruptLatch::Latched } else { InterruptLatch::Hysteresis }
    }

    pub fn mode(&self) -> Mode {
        Mode::from(self.mode)
    }

    pub fn conversion_time(&self) -> ConversionTime {
        if self.conversion_time & 0b1 == 0 { ConversionTime::Ms100 } else { ConversionTime::Ms800 }
    }

    /// `None` when the register holds one of the reserved codes `0b1101..=0b1111`.
    pub fn range(&self) -> Option<Range> {
        Range::from_code(self.range)
    }

    pub fn with_fault_count(mut self, count: FaultCount) -> Self {
        self.fault_count = count as u8;
        self
    }

    pub fn with_mask_exponent(mut self, mask: bool) -> Self {
        self.mask_exponent = mask;
        self
    }

    pub fn with_interrupt_polarity(mut self, polarity: InterruptPolarity) -> Self {
        self.interrupt_polarity = polarity == InterruptPolarity::ActiveHigh;
        self
    }

    pub fn with_latch(mut self, latch: InterruptLatch) -> Self {
        self.latch = latch == InterruptLatch::Latched;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode as u8;
        self
    }

    pub fn with_conversion_time(mut self, time: ConversionTime) -> Self {
        self.conversion_time = time as u8;
        self
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = range as u8;
        self
    }
}
