//! Periodic, reachability-gated uplink of the latest readings.

use embassy_time::{Duration, Instant};
use rand_core::RngCore;

use crate::config::NodeConfig;
use crate::context::NodeContext;
use crate::transceiver::payload;
use crate::transceiver::{Routing, Transport};

/// Statistics are logged before every this many sends
const STATS_EVERY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmissionOutcome {
    /// Timer has not fired yet
    Pending,
    /// Payload was handed to the transport
    Sent(i32),
    /// Collector unreachable after at least one earlier send
    Missed,
    /// Collector unreachable and nothing was ever sent
    Unreachable,
}

pub struct TransmissionScheduler<'a, R> {
    ctx: &'a NodeContext,
    rng: R,
    deadline: Instant,
    send_interval: Duration,
    send_jitter: Duration,
    summaries: u32,
}

impl<'a, R: RngCore> TransmissionScheduler<'a, R> {
    /// The first cycle fires at a random point within one send interval of `start`
    pub fn new(ctx: &'a NodeContext, config: &NodeConfig, mut rng: R, start: Instant) -> Self {
        let first = random_below(&mut rng, config.send_interval);
        Self {
            ctx,
            rng,
            deadline: start + first,
            send_interval: config.send_interval,
            send_jitter: config.send_jitter.min(config.send_interval),
            summaries: 0,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// How many statistics summaries were logged so far
    pub fn summaries(&self) -> u32 {
        self.summaries
    }

    /// Run one cycle if the timer has fired, then re-arm it
    pub async fn poll<Rt, Tx>(&mut self, now: Instant, routing: &mut Rt, transport: &mut Tx) -> TransmissionOutcome
    where
        Rt: Routing,
        Tx: Transport<Address = Rt::Address>,
    {
        if !self.expired(now) {
            return TransmissionOutcome::Pending;
        }

        let destination = if routing.is_reachable().await {
            routing.resolve_destination().await
        } else {
            None
        };

        let ctx = self.ctx;
        let stats = ctx.stats();
        let outcome = match destination {
            Some(destination) => {
                if summary_due(stats.sent()) {
                    info!("tx/rx/missed: {}/{}/{}", stats.sent(), stats.received(), stats.missed());
                    self.summaries = self.summaries.saturating_add(1);
                }

                let readings = ctx.readings();
                let value = payload::encode(readings.temperature, readings.humidity);
                info!("sending {} to collector", value);

                if let Err(e) = transport.send_to(&payload::to_bytes(value), &destination).await {
                    warn!("send failed: {:?}", e);
                }
                stats.record_sent();

                TransmissionOutcome::Sent(value)
            }
            None => {
                info!("not reachable yet");
                if stats.sent() > 0 {
                    stats.record_missed();
                    TransmissionOutcome::Missed
                } else {
                    TransmissionOutcome::Unreachable
                }
            }
        };

        self.deadline = now + self.next_interval();
        outcome
    }

    /// `send_interval - jitter + rand[0, 2 * jitter)`
    fn next_interval(&mut self) -> Duration {
        let window = self.send_jitter + self.send_jitter;
        self.send_interval - self.send_jitter + random_below(&mut self.rng, window)
    }
}

fn summary_due(sent: u32) -> bool {
    sent % STATS_EVERY == 0
}

fn random_below<R: RngCore>(rng: &mut R, bound: Duration) -> Duration {
    match bound.as_ticks() {
        0 => Duration::from_ticks(0),
        ticks => Duration::from_ticks(rng.next_u64() % ticks),
    }
}
