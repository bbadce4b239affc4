//! State shared between the samplers, the transmission cycle and the reply
//! handler.
//!
//! Each field has exactly one writer: samplers store readings, the
//! transmission scheduler bumps `sent`/`missed`, the reply decoder bumps
//! `received`. Readers may observe a temperature and a humidity from
//! different sampling cycles.

use portable_atomic::{AtomicI32, AtomicU32, Ordering};

use crate::sensor::{CalibratedReading, SensorKind};

/// Latest calibrated value per kind
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    pub temperature: i32,
    pub humidity: i32,
}

impl Readings {
    pub const fn new() -> Self {
        Self {
            temperature: 0,
            humidity: 0,
        }
    }

    pub fn get(&self, kind: SensorKind) -> i32 {
        match kind {
            SensorKind::Temperature => self.temperature,
            SensorKind::Humidity => self.humidity,
        }
    }
}

/// Delivery counters. Increments saturate so the values never decrease.
#[derive(Debug, Default)]
pub struct TransmissionStats {
    sent: AtomicU32,
    received: AtomicU32,
    missed: AtomicU32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatsSnapshot {
    pub sent: u32,
    pub received: u32,
    pub missed: u32,
}

impl TransmissionStats {
    pub const fn new() -> Self {
        Self {
            sent: AtomicU32::new(0),
            received: AtomicU32::new(0),
            missed: AtomicU32::new(0),
        }
    }

    pub fn sent(&self) -> u32 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u32 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn missed(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent(),
            received: self.received(),
            missed: self.missed(),
        }
    }

    pub(crate) fn record_sent(&self) -> u32 {
        increment(&self.sent)
    }

    pub(crate) fn record_received(&self) -> u32 {
        increment(&self.received)
    }

    pub(crate) fn record_missed(&self) -> u32 {
        increment(&self.missed)
    }
}

fn increment(counter: &AtomicU32) -> u32 {
    match counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_add(1)) {
        Ok(previous) => previous + 1,
        Err(saturated) => saturated,
    }
}

#[derive(Debug, Default)]
pub struct NodeContext {
    temperature: AtomicI32,
    humidity: AtomicI32,
    stats: TransmissionStats,
}

impl NodeContext {
    pub const fn new() -> Self {
        Self {
            temperature: AtomicI32::new(0),
            humidity: AtomicI32::new(0),
            stats: TransmissionStats::new(),
        }
    }

    pub fn readings(&self) -> Readings {
        Readings {
            temperature: self.temperature.load(Ordering::Relaxed),
            humidity: self.humidity.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn store(&self, reading: CalibratedReading) {
        let slot = match reading.kind {
            SensorKind::Temperature => &self.temperature,
            SensorKind::Humidity => &self.humidity,
        };
        slot.store(reading.value, Ordering::Relaxed);
    }

    pub fn stats(&self) -> &TransmissionStats {
        &self.stats
    }
}
