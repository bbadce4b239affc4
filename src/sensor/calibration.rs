//! Raw to physical conversion for the SHT1x family.
//!
//! Coefficients are the 14-bit temperature and 12-bit humidity ones from the
//! datasheet, evaluated at 5 V. Results are truncated toward zero.

use super::SensorKind;

// -39.60 C offset and 0.01 C per count, in hundredths of a degree
const TEMPERATURE_D1_CENTI: i32 = -3960;
const TEMPERATURE_D2_DIVISOR: i32 = 100;

const HUMIDITY_C1: f64 = -2.0468;
const HUMIDITY_C2: f64 = 0.0367;
const HUMIDITY_C3: f64 = -1.5955e-6;

pub fn calibrate(kind: SensorKind, raw: u16) -> i32 {
    match kind {
        SensorKind::Temperature => temperature(raw),
        SensorKind::Humidity => humidity(raw),
    }
}

/// Degrees Celsius
pub fn temperature(raw: u16) -> i32 {
    // exact in integers, integer division truncates toward zero
    (i32::from(raw) + TEMPERATURE_D1_CENTI) / TEMPERATURE_D2_DIVISOR
}

/// Relative humidity in percent, without temperature compensation
pub fn humidity(raw: u16) -> i32 {
    let raw = f64::from(raw);
    (HUMIDITY_C1 + HUMIDITY_C2 * raw + HUMIDITY_C3 * raw * raw) as i32
}
