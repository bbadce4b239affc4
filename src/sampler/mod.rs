use embassy_time::{Duration, Instant};

use crate::config::NodeConfig;
use crate::context::NodeContext;
use crate::sensor::{CalibratedReading, Sensor, SensorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplerState {
    Idle,
    Activating,
    /// Waiting on the sensor since the given instant
    AwaitingReady { since: Instant },
    Reading,
    Cooldown { until: Instant },
}

/// Resumable sampling loop for one physical quantity.
///
/// Every call to [`SensorSampler::step`] runs the loop until it hits a
/// suspension point: the sensor not being ready yet, or the cooldown not
/// having elapsed. Nothing in here blocks beyond a single sensor access.
pub struct SensorSampler<'a> {
    kind: SensorKind,
    state: SamplerState,
    ctx: &'a NodeContext,
    sample_interval: Duration,
    ready_timeout: Option<Duration>,
    ready_poll_interval: Duration,
}

impl<'a> SensorSampler<'a> {
    pub fn new(kind: SensorKind, ctx: &'a NodeContext, config: &NodeConfig) -> Self {
        Self {
            kind,
            state: SamplerState::Idle,
            ctx,
            sample_interval: config.sample_interval,
            ready_timeout: config.ready_timeout,
            ready_poll_interval: config.ready_poll_interval,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Resume the loop at its last suspension point.
    ///
    /// Returns the reading completed during this step, if any.
    pub fn step<S: Sensor>(&mut self, now: Instant, sensor: &mut S) -> Option<CalibratedReading> {
        let mut completed = None;

        loop {
            self.state = match self.state {
                SamplerState::Idle => SamplerState::Activating,
                SamplerState::Activating => {
                    if let Err(e) = sensor.activate(self.kind) {
                        warn!("{}: activation failed: {:?}", self.kind.name(), e);
                    }
                    SamplerState::AwaitingReady { since: now }
                }
                SamplerState::AwaitingReady { since } => {
                    if sensor.is_ready(self.kind) {
                        SamplerState::Reading
                    } else if self.ready_timeout.is_some_and(|timeout| now >= since + timeout) {
                        warn!("{}: sensor not ready, skipping cycle", self.kind.name());
                        self.finish(now, sensor)
                    } else {
                        return completed;
                    }
                }
                SamplerState::Reading => {
                    match sensor.read_raw(self.kind) {
                        Ok(raw) => {
                            let reading = CalibratedReading::from_raw(self.kind, raw);
                            self.ctx.store(reading);
                            info!("{}: {} {}", self.kind.name(), reading.value, self.kind.unit());
                            completed = Some(reading);
                        }
                        Err(e) => warn!("{}: read failed: {:?}", self.kind.name(), e),
                    }
                    self.finish(now, sensor)
                }
                SamplerState::Cooldown { until } => {
                    if now < until {
                        return completed;
                    }
                    SamplerState::Activating
                }
            };
        }
    }

    /// When the sampler next has something to do, `None` while idle
    pub fn next_wake(&self, now: Instant) -> Option<Instant> {
        match self.state {
            SamplerState::Idle => None,
            SamplerState::Activating | SamplerState::Reading => Some(now),
            SamplerState::AwaitingReady { since } => {
                let poll = now + self.ready_poll_interval;
                match self.ready_timeout {
                    Some(timeout) => Some(poll.min(since + timeout)),
                    None => Some(poll),
                }
            }
            SamplerState::Cooldown { until } => Some(until),
        }
    }

    fn finish<S: Sensor>(&mut self, now: Instant, sensor: &mut S) -> SamplerState {
        if let Err(e) = sensor.deactivate(self.kind) {
            warn!("{}: deactivation failed: {:?}", self.kind.name(), e);
        }
        SamplerState::Cooldown {
            until: now + self.sample_interval,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Call {
        Activate(SensorKind),
        Deactivate(SensorKind),
        Read(SensorKind),
    }

    /// Sensor double. Readiness is granted after `ready_after` polls.
    pub struct FakeSensor {
        pub temperature_raw: u16,
        pub humidity_raw: u16,
        pub ready_after: usize,
        pub fail_reads: bool,
        pub calls: Vec<Call>,
        polls: usize,
    }

    impl FakeSensor {
        pub fn new(temperature_raw: u16, humidity_raw: u16) -> Self {
            Self {
                temperature_raw,
                humidity_raw,
                ready_after: 0,
                fail_reads: false,
                calls: Vec::new(),
                polls: 0,
            }
        }
    }

    impl Sensor for FakeSensor {
        fn activate(&mut self, kind: SensorKind) -> Result<(), Error> {
            self.calls.push(Call::Activate(kind));
            Ok(())
        }

        fn deactivate(&mut self, kind: SensorKind) -> Result<(), Error> {
            self.calls.push(Call::Deactivate(kind));
            Ok(())
        }

        fn is_ready(&mut self, _kind: SensorKind) -> bool {
            self.polls += 1;
            self.polls > self.ready_after
        }

        fn read_raw(&mut self, kind: SensorKind) -> Result<u16, Error> {
            self.calls.push(Call::Read(kind));
            if self.fail_reads {
                return Err(Error::NotReady);
            }
            Ok(match kind {
                SensorKind::Temperature => self.temperature_raw,
                SensorKind::Humidity => self.humidity_raw,
            })
        }
    }

    fn at(secs: u64) -> Instant {
        Instant::from_secs(secs)
    }

    #[test]
    fn completes_a_cycle_in_one_step_when_sensor_is_ready() {
        let ctx = NodeContext::new();
        let mut sensor = FakeSensor::new(4000, 700);
        let mut sampler = SensorSampler::new(SensorKind::Temperature, &ctx, &NodeConfig::default());

        let reading = sampler.step(at(0), &mut sensor);

        assert_eq!(reading, Some(CalibratedReading::new(SensorKind::Temperature, 0)));
        assert_eq!(sampler.state(), SamplerState::Cooldown { until: at(5) });
        assert_eq!(
            sensor.calls,
            [
                Call::Activate(SensorKind::Temperature),
                Call::Read(SensorKind::Temperature),
                Call::Deactivate(SensorKind::Temperature),
            ]
        );
    }

    #[test]
    fn stores_latest_value_in_context() {
        let ctx = NodeContext::new();
        let mut sensor = FakeSensor::new(4000, 700);
        let mut sampler = SensorSampler::new(SensorKind::Humidity, &ctx, &NodeConfig::default());

        sampler.step(at(0), &mut sensor);
        assert_eq!(ctx.readings().humidity, 22);

        sensor.humidity_raw = 1600;
        sampler.step(at(5), &mut sensor);
        assert_eq!(ctx.readings().humidity, 52);
        assert_eq!(ctx.readings().temperature, 0);
    }

    #[test]
    fn resuming_during_cooldown_is_a_no_op() {
        let ctx = NodeContext::new();
        let mut sensor = FakeSensor::new(4000, 700);
        let mut sampler = SensorSampler::new(SensorKind::Temperature, &ctx, &NodeConfig::default());

        sampler.step(at(0), &mut sensor);
        let calls = sensor.calls.len();

        assert_eq!(sampler.step(at(1), &mut sensor), None);
        assert_eq!(sampler.step(at(4), &mut sensor), None);
        assert_eq!(sensor.calls.len(), calls);
        assert_eq!(sampler.next_wake(at(4)), Some(at(5)));
    }

    #[test]
    fn suspends_until_sensor_reports_ready() {
        let ctx = NodeContext::new();
        let mut sensor = FakeSensor::new(6500, 700);
        sensor.ready_after = 2;
        let mut sampler = SensorSampler::new(SensorKind::Temperature, &ctx, &NodeConfig::default());

        assert_eq!(sampler.step(at(0), &mut sensor), None);
        assert_eq!(sampler.state(), SamplerState::AwaitingReady { since: at(0) });
        assert_eq!(sampler.step(at(0), &mut sensor), None);

        let reading = sampler.step(at(1), &mut sensor);
        assert_eq!(reading.map(|r| r.value), Some(25));
        assert_eq!(sampler.state(), SamplerState::Cooldown { until: at(6) });
    }

    #[test]
    fn skips_cycle_when_sensor_never_becomes_ready() {
        let ctx = NodeContext::new();
        let mut sensor = FakeSensor::new(6500, 700);
        sensor.ready_after = usize::MAX;
        let mut sampler = SensorSampler::new(SensorKind::Temperature, &ctx, &NodeConfig::default());

        sampler.step(at(0), &mut sensor);
        assert_eq!(sampler.step(at(1), &mut sensor), None);
        assert!(matches!(sampler.state(), SamplerState::AwaitingReady { .. }));

        assert_eq!(sampler.step(at(2), &mut sensor), None);
        assert_eq!(sampler.state(), SamplerState::Cooldown { until: at(7) });
        assert_eq!(sensor.calls.last(), Some(&Call::Deactivate(SensorKind::Temperature)));
        assert_eq!(ctx.readings().temperature, 0);
    }

    #[test]
    fn waits_forever_without_ready_timeout() {
        let ctx = NodeContext::new();
        let mut sensor = FakeSensor::new(6500, 700);
        sensor.ready_after = usize::MAX;
        let config = NodeConfig {
            ready_timeout: None,
            ..NodeConfig::default()
        };
        let mut sampler = SensorSampler::new(SensorKind::Temperature, &ctx, &config);

        sampler.step(at(0), &mut sensor);
        sampler.step(at(3600), &mut sensor);

        assert_eq!(sampler.state(), SamplerState::AwaitingReady { since: at(0) });
    }

    #[test]
    fn failed_read_keeps_previous_value() {
        let ctx = NodeContext::new();
        let mut sensor = FakeSensor::new(6500, 700);
        let mut sampler = SensorSampler::new(SensorKind::Temperature, &ctx, &NodeConfig::default());

        sampler.step(at(0), &mut sensor);
        sensor.fail_reads = true;
        sensor.temperature_raw = 3000;

        assert_eq!(sampler.step(at(5), &mut sensor), None);
        assert_eq!(ctx.readings().temperature, 25);
        assert_eq!(sampler.state(), SamplerState::Cooldown { until: at(10) });
    }

    #[test]
    fn restarts_after_cooldown_elapses() {
        let ctx = NodeContext::new();
        let mut sensor = FakeSensor::new(4000, 700);
        let mut sampler = SensorSampler::new(SensorKind::Humidity, &ctx, &NodeConfig::default());

        sampler.step(at(0), &mut sensor);
        let reading = sampler.step(at(5), &mut sensor);

        assert_eq!(reading, Some(CalibratedReading::new(SensorKind::Humidity, 22)));
        let activations = sensor
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Activate(_)))
            .count();
        assert_eq!(activations, 2);
    }
}
