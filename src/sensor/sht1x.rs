//! Bit-banged driver for the Sensirion SHT1x (SHT10/11/15).
//!
//! The chip talks a two-wire protocol that looks like I2C but is not: a
//! custom start condition, no addressing, and completion is signalled by the
//! sensor pulling DATA low. DATA must be an open-drain pin with a pull-up.

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::{InputPin, OutputPin};

use crate::error::Error;
use crate::sensor::{Sensor, SensorKind};

const MEASURE_TEMPERATURE_COMMAND: u8 = 0b0000_0011;
const MEASURE_HUMIDITY_COMMAND: u8 = 0b0000_0101;

const CLOCK_HALF_PERIOD_US: u32 = 2;
const RESET_PULSES: usize = 9;

/// Worst case conversion time, 14-bit temperature, according to the datasheet.
/// A sampler's ready timeout should not be shorter than twice this, the two
/// kinds share one converter.
pub const MAX_CONVERSION_MS: u64 = 320;

/// Where a kind is in its measurement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Idle,
    /// Activated, waiting for the converter to be free
    Queued,
    /// Command sent, the chip pulls DATA low when done
    Running,
    /// Result clocked out, nothing left until deactivated
    Done,
}

pub struct Sht1x<DATA, SCK, D> {
    data: DATA,
    sck: SCK,
    delay: D,
    temperature: Conversion,
    humidity: Conversion,
}

impl<DATA, SCK, D> Sht1x<DATA, SCK, D>
where
    DATA: InputPin + OutputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    pub fn new(data: DATA, sck: SCK, delay: D) -> Self {
        Self {
            data,
            sck,
            delay,
            temperature: Conversion::Idle,
            humidity: Conversion::Idle,
        }
    }

    pub fn release(self) -> (DATA, SCK, D) {
        (self.data, self.sck, self.delay)
    }

    fn conversion(&mut self, kind: SensorKind) -> &mut Conversion {
        match kind {
            SensorKind::Temperature => &mut self.temperature,
            SensorKind::Humidity => &mut self.humidity,
        }
    }

    fn converter_busy(&self) -> bool {
        self.temperature == Conversion::Running || self.humidity == Conversion::Running
    }

    fn data_high(&mut self) -> Result<(), Error> {
        self.data.set_high().map_err(|_| Error::Pin)
    }

    fn data_low(&mut self) -> Result<(), Error> {
        self.data.set_low().map_err(|_| Error::Pin)
    }

    fn data_is_high(&mut self) -> Result<bool, Error> {
        self.data.is_high().map_err(|_| Error::Pin)
    }

    fn sck_high(&mut self) -> Result<(), Error> {
        self.sck.set_high().map_err(|_| Error::Pin)?;
        self.delay.delay_us(CLOCK_HALF_PERIOD_US);
        Ok(())
    }

    fn sck_low(&mut self) -> Result<(), Error> {
        self.sck.set_low().map_err(|_| Error::Pin)?;
        self.delay.delay_us(CLOCK_HALF_PERIOD_US);
        Ok(())
    }

    /// Nine clocks with DATA released, recovers a confused interface
    fn connection_reset(&mut self) -> Result<(), Error> {
        self.data_high()?;
        self.sck_low()?;
        for _ in 0..RESET_PULSES {
            self.sck_high()?;
            self.sck_low()?;
        }
        Ok(())
    }

    // DATA falls while SCK is high, then rises during the next high phase
    fn transmission_start(&mut self) -> Result<(), Error> {
        self.data_high()?;
        self.sck_low()?;
        self.sck_high()?;
        self.data_low()?;
        self.sck_low()?;
        self.sck_high()?;
        self.data_high()?;
        self.sck_low()
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        for bit in (0..8).rev() {
            if byte & (1 << bit) != 0 {
                self.data_high()?;
            } else {
                self.data_low()?;
            }
            self.sck_high()?;
            self.sck_low()?;
        }

        self.data_high()?;
        self.sck_high()?;
        let acknowledged = !self.data_is_high()?;
        self.sck_low()?;

        if acknowledged {
            Ok(())
        } else {
            Err(Error::NoAcknowledge)
        }
    }

    fn read_byte(&mut self, acknowledge: bool) -> Result<u8, Error> {
        let mut byte = 0u8;
        self.data_high()?;
        for _ in 0..8 {
            self.sck_high()?;
            byte = (byte << 1) | u8::from(self.data_is_high()?);
            self.sck_low()?;
        }

        if acknowledge {
            self.data_low()?;
        }
        self.sck_high()?;
        self.sck_low()?;
        self.data_high()?;

        Ok(byte)
    }

    /// Send the measurement command, the conversion then runs on the chip
    fn start_conversion(&mut self, kind: SensorKind) -> Result<(), Error> {
        let command = match kind {
            SensorKind::Temperature => MEASURE_TEMPERATURE_COMMAND,
            SensorKind::Humidity => MEASURE_HUMIDITY_COMMAND,
        };

        self.transmission_start()?;
        self.write_byte(command)?;
        *self.conversion(kind) = Conversion::Running;
        Ok(())
    }
}

impl<DATA, SCK, D> Sensor for Sht1x<DATA, SCK, D>
where
    DATA: InputPin + OutputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    /// Queue a conversion of `kind` and start it right away if the converter is free
    fn activate(&mut self, kind: SensorKind) -> Result<(), Error> {
        if self.temperature == Conversion::Idle && self.humidity == Conversion::Idle {
            self.connection_reset()?;
        }
        *self.conversion(kind) = Conversion::Queued;

        if self.converter_busy() {
            return Ok(());
        }
        self.start_conversion(kind)
    }

    fn deactivate(&mut self, kind: SensorKind) -> Result<(), Error> {
        let abandoned = *self.conversion(kind) == Conversion::Running;
        // the chip enters sleep on its own after every measurement
        *self.conversion(kind) = Conversion::Idle;
        if abandoned {
            self.connection_reset()?;
        }
        Ok(())
    }

    /// True once the chip pulled DATA low to signal the end of the conversion
    fn is_ready(&mut self, kind: SensorKind) -> bool {
        let conversion = *self.conversion(kind);
        match conversion {
            Conversion::Running => self.data_is_high().map(|high| !high).unwrap_or(false),
            Conversion::Queued if !self.converter_busy() => {
                if let Err(e) = self.start_conversion(kind) {
                    warn!("sht1x: {} conversion not started: {:?}", kind.name(), e);
                }
                false
            }
            _ => false,
        }
    }

    fn read_raw(&mut self, kind: SensorKind) -> Result<u16, Error> {
        let conversion = *self.conversion(kind);
        match conversion {
            Conversion::Running => {}
            Conversion::Idle => return Err(Error::SensorInactive),
            Conversion::Queued | Conversion::Done => return Err(Error::NotReady),
        }

        let msb = self.read_byte(true)?;
        // NACK after the second byte skips the CRC
        let lsb = self.read_byte(false)?;
        *self.conversion(kind) = Conversion::Done;
        let raw = u16::from_be_bytes([msb, lsb]);

        debug!("sht1x: {} raw {}", kind.name(), raw);

        Ok(raw)
    }
}
