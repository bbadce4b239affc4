//! Temperature and humidity sensor node.
//!
//! Two sampling state machines and a jittered, reachability-gated
//! transmission cycle share a single cooperative loop. Replies from the
//! collector arrive on a channel and are counted by a separate handler.

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

// must go first so the logging macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod config;
pub mod context;
pub mod error;
pub mod reply;
pub mod sampler;
pub mod scheduler;
pub mod sensor;
pub mod transceiver;
pub mod transmission;

pub use config::NodeConfig;
pub use context::{NodeContext, Readings, StatsSnapshot, TransmissionStats};
pub use error::Error;
pub use reply::{Reply, ReplyDecoder, ReplyPayload};
pub use sampler::{SamplerState, SensorSampler};
pub use scheduler::{CooperativeScheduler, PassReport};
pub use sensor::{CalibratedReading, Sensor, SensorKind};
pub use transceiver::{Routing, Transport};
pub use transmission::{TransmissionOutcome, TransmissionScheduler};
