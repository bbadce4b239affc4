use crate::error::Error;

pub mod calibration;
pub mod sht1x;

/// Physical quantity a sampler is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    Temperature,
    Humidity,
}

impl SensorKind {
    pub const fn unit(self) -> &'static str {
        match self {
            SensorKind::Temperature => "C",
            SensorKind::Humidity => "%",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibratedReading {
    pub kind: SensorKind,
    pub value: i32,
}

impl CalibratedReading {
    pub const fn new(kind: SensorKind, value: i32) -> Self {
        Self { kind, value }
    }

    pub fn from_raw(kind: SensorKind, raw: u16) -> Self {
        Self::new(kind, calibration::calibrate(kind, raw))
    }
}

/// Trait to describe the sensor as seen by a sampler.
/// A sampler drives it strictly in activate, poll ready, read, deactivate
/// order, once per cycle and per kind. Both kinds may be served by the same
/// physical chip, so implementations must tolerate interleaved cycles.
///
/// None of the methods may wait on a conversion, that is what
/// [`Sensor::is_ready`] is polled for.
pub trait Sensor {
    /// Power up or otherwise prepare the sensor for a measurement of `kind`
    fn activate(&mut self, kind: SensorKind) -> Result<(), Error>;

    /// Release the sensor, it may go to sleep once no kind is active
    fn deactivate(&mut self, kind: SensorKind) -> Result<(), Error>;

    /// Non-blocking readiness check, polled once per scheduling pass
    fn is_ready(&mut self, kind: SensorKind) -> bool;

    /// Raw, uncalibrated measurement, only valid once `is_ready` returned true
    fn read_raw(&mut self, kind: SensorKind) -> Result<u16, Error>;
}
