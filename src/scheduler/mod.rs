use embassy_futures::yield_now;
use embassy_time::{Instant, Timer};
use rand_core::RngCore;

use crate::config::NodeConfig;
use crate::context::NodeContext;
use crate::sampler::SensorSampler;
use crate::sensor::{CalibratedReading, Sensor, SensorKind};
use crate::transceiver::{Routing, Transport};
use crate::transmission::{TransmissionOutcome, TransmissionScheduler};

/// What happened during one pass, in the order it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PassReport {
    pub temperature: Option<CalibratedReading>,
    pub humidity: Option<CalibratedReading>,
    pub transmission: TransmissionOutcome,
}

/// Single-threaded driver of both samplers and the transmission cycle.
///
/// Every pass steps the temperature sampler, then the humidity sampler, then
/// checks the transmission timer. The order never changes, so temperature
/// output always precedes humidity output within a pass.
pub struct CooperativeScheduler<'a, S, Rt, Tx, R> {
    config: NodeConfig,
    sensor: S,
    routing: Rt,
    transport: Tx,
    temperature: SensorSampler<'a>,
    humidity: SensorSampler<'a>,
    transmission: TransmissionScheduler<'a, R>,
}

impl<'a, S, Rt, Tx, R> CooperativeScheduler<'a, S, Rt, Tx, R>
where
    S: Sensor,
    Rt: Routing,
    Tx: Transport<Address = Rt::Address>,
    R: RngCore,
{
    pub fn new(
        ctx: &'a NodeContext,
        config: NodeConfig,
        sensor: S,
        routing: Rt,
        transport: Tx,
        rng: R,
        start: Instant,
    ) -> Self {
        Self {
            temperature: SensorSampler::new(SensorKind::Temperature, ctx, &config),
            humidity: SensorSampler::new(SensorKind::Humidity, ctx, &config),
            transmission: TransmissionScheduler::new(ctx, &config, rng, start),
            config,
            sensor,
            routing,
            transport,
        }
    }

    /// Advance every component exactly once
    pub async fn pass(&mut self, now: Instant) -> PassReport {
        let temperature = self.temperature.step(now, &mut self.sensor);
        let humidity = self.humidity.step(now, &mut self.sensor);
        let transmission = self.transmission.poll(now, &mut self.routing, &mut self.transport).await;

        PassReport {
            temperature,
            humidity,
            transmission,
        }
    }

    /// Earliest instant at which a pass can make progress
    pub fn next_wake(&self, now: Instant) -> Instant {
        [self.temperature.next_wake(now), self.humidity.next_wake(now)]
            .into_iter()
            .flatten()
            .fold(self.transmission.deadline(), Instant::min)
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn transport(&self) -> &Tx {
        &self.transport
    }

    pub fn routing_mut(&mut self) -> &mut Rt {
        &mut self.routing
    }

    /// Bind the transport and loop forever, sleeping between passes
    pub async fn run(&mut self) -> ! {
        if let Err(e) = self.transport.bind(self.config.local_port, self.config.remote_port).await {
            error!("failed to bind port {}: {:?}", self.config.local_port, e);
        }
        info!("node started, sampling temperature and humidity");

        loop {
            let report = self.pass(Instant::now()).await;
            if report.transmission != TransmissionOutcome::Pending {
                // give the reply handler a chance to run
                yield_now().await;
            }
            Timer::at(self.next_wake(Instant::now())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::tests::{Call, FakeSensor};
    use crate::transmission::tests::{FakeRouting, FakeTransport, SequenceRng};
    use embassy_futures::block_on;
    use embassy_futures::select::select;
    use embassy_time::Duration;

    type TestScheduler<'a> = CooperativeScheduler<'a, FakeSensor, FakeRouting, FakeTransport, SequenceRng>;

    fn at(secs: u64) -> Instant {
        Instant::from_secs(secs)
    }

    /// First transmission fires at `first_send` (< 5), later ones exactly 5 s apart
    fn scheduler(ctx: &NodeContext, first_send: u64, routing: FakeRouting) -> TestScheduler<'_> {
        // any odd number of seconds lands mid-window for the 2 s jitter range
        let seed = if first_send % 2 == 1 { first_send } else { first_send + 5 };
        let rng = SequenceRng::new(&[Duration::from_secs(seed).as_ticks()]);
        CooperativeScheduler::new(
            ctx,
            NodeConfig::default(),
            FakeSensor::new(4000, 700),
            routing,
            FakeTransport::default(),
            rng,
            at(0),
        )
    }

    #[test]
    fn temperature_is_stepped_before_humidity() {
        let ctx = NodeContext::new();
        let mut node = scheduler(&ctx, 3, FakeRouting::reachable());

        let report = block_on(node.pass(at(0)));

        assert_eq!(report.temperature, Some(CalibratedReading::new(SensorKind::Temperature, 0)));
        assert_eq!(report.humidity, Some(CalibratedReading::new(SensorKind::Humidity, 22)));
        assert_eq!(report.transmission, TransmissionOutcome::Pending);
        assert_eq!(
            node.sensor().calls,
            [
                Call::Activate(SensorKind::Temperature),
                Call::Read(SensorKind::Temperature),
                Call::Deactivate(SensorKind::Temperature),
                Call::Activate(SensorKind::Humidity),
                Call::Read(SensorKind::Humidity),
                Call::Deactivate(SensorKind::Humidity),
            ]
        );
    }

    #[test]
    fn sends_readings_sampled_in_the_same_pass() {
        let ctx = NodeContext::new();
        let mut node = scheduler(&ctx, 0, FakeRouting::reachable());

        let report = block_on(node.pass(at(0)));

        assert_eq!(report.transmission, TransmissionOutcome::Sent(22));
        assert_eq!(node.transport().sent, [([22, 0, 0, 0], 1)]);
    }

    #[test]
    fn next_wake_is_the_earliest_pending_deadline() {
        let ctx = NodeContext::new();
        let mut node = scheduler(&ctx, 3, FakeRouting::reachable());

        block_on(node.pass(at(0)));
        // samplers cool down until 5 s, transmission fires at 3 s
        assert_eq!(node.next_wake(at(0)), at(3));

        block_on(node.pass(at(3)));
        // transmission re-armed to 8 s
        assert_eq!(node.next_wake(at(3)), at(5));
    }

    #[test]
    fn passes_between_deadlines_change_nothing() {
        let ctx = NodeContext::new();
        let mut node = scheduler(&ctx, 3, FakeRouting::reachable());

        block_on(node.pass(at(0)));
        let calls = node.sensor().calls.len();
        let report = block_on(node.pass(at(1)));

        assert_eq!(
            report,
            PassReport {
                temperature: None,
                humidity: None,
                transmission: TransmissionOutcome::Pending,
            }
        );
        assert_eq!(node.sensor().calls.len(), calls);
    }

    #[test]
    fn records_misses_only_after_a_successful_send() {
        let ctx = NodeContext::new();
        let mut node = scheduler(&ctx, 0, FakeRouting::default());

        assert_eq!(block_on(node.pass(at(0))).transmission, TransmissionOutcome::Unreachable);

        node.routing_mut().reachable = true;
        node.routing_mut().destination = Some(1);
        assert_eq!(block_on(node.pass(at(5))).transmission, TransmissionOutcome::Sent(22));

        node.routing_mut().reachable = false;
        assert_eq!(block_on(node.pass(at(10))).transmission, TransmissionOutcome::Missed);

        assert_eq!(
            ctx.stats().snapshot(),
            crate::StatsSnapshot {
                sent: 1,
                received: 0,
                missed: 1
            }
        );
    }

    #[test]
    fn samplers_keep_running_while_collector_is_unreachable() {
        let ctx = NodeContext::new();
        let mut node = scheduler(&ctx, 0, FakeRouting::default());

        let report = block_on(node.pass(at(0)));

        assert_eq!(report.transmission, TransmissionOutcome::Unreachable);
        assert!(report.temperature.is_some());
        assert!(report.humidity.is_some());
        assert!(node.transport().sent.is_empty());
    }

    #[test]
    fn ten_cycles_send_ten_payloads() {
        let ctx = NodeContext::new();
        let mut node = scheduler(&ctx, 0, FakeRouting::reachable());

        for cycle in 0..10 {
            block_on(node.pass(at(cycle * 5)));
        }

        assert_eq!(ctx.stats().sent(), 10);
        assert_eq!(node.transport().sent.len(), 10);
    }

    #[test]
    fn run_binds_the_configured_ports_before_the_first_pass() {
        let ctx = NodeContext::new();
        let mut node = scheduler(&ctx, 0, FakeRouting::reachable());

        // run yields after the first transmission, which lets select finish
        block_on(select(node.run(), core::future::ready(())));

        assert_eq!(
            node.transport().bound,
            Some((NodeConfig::UDP_CLIENT_PORT, NodeConfig::UDP_SERVER_PORT))
        );
        assert_eq!(node.transport().sent.len(), 1);
    }
}
