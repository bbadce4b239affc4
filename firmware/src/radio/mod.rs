use defmt::{error, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use sht_node::{Error, NodeConfig, Reply, Routing, Transport};

use crate::config::Config;

pub mod lora_radio;

pub use lora_radio::LoraRadio;

pub const REPLY_QUEUE_SIZE: usize = 4;

pub type SharedRadio = Mutex<CriticalSectionRawMutex, LoraRadio>;
pub type ReplySender = Sender<'static, CriticalSectionRawMutex, Reply, REPLY_QUEUE_SIZE>;

// Application FPorts are 1..=223, the rest is reserved by the MAC
const FPORT_RANGE: core::ops::RangeInclusive<u16> = 1..=223;

/// Collector as seen from a LoRaWAN end device: the network server behind
/// the session identified by `dev_addr`
#[derive(Clone, Copy, defmt::Format)]
pub struct Collector {
    pub dev_addr: [u8; 4],
}

enum Session {
    Join,
    Joined,
    Sleep,
}

/// Joins the LoRaWAN network and rejoins when the session is lost.
/// Runs as its own task so reachability checks never wait on a join.
pub async fn maintain_session(radio: &SharedRadio) -> ! {
    let mut session = Session::Join;
    let mut join_counter: u8 = 0;

    loop {
        session = match session {
            Session::Join => {
                let response = radio.lock().await.join_otaa().await;
                match response {
                    Ok(()) => {
                        info!("radio: successfully joined lora network");
                        join_counter = 0;
                        Session::Joined
                    }
                    Err(e) => {
                        warn!("radio: failed to join lora network, attempt {=u8}: {:?}", join_counter, e);
                        if join_counter >= Config::JOIN_ATTEMPTS {
                            error!("failed to join network {=u8} times, sleeping", join_counter);
                            Session::Sleep
                        } else {
                            join_counter += 1;
                            Timer::after(Config::JOIN_RETRY_DELAY).await;
                            Session::Join
                        }
                    }
                }
            }
            Session::Joined => {
                Timer::after(Config::SESSION_CHECK_INTERVAL).await;
                if radio.lock().await.is_joined() {
                    Session::Joined
                } else {
                    warn!("radio: session lost, rejoining");
                    Session::Join
                }
            }
            Session::Sleep => {
                Timer::after(Config::JOIN_BACKOFF).await;
                join_counter = 0;
                Session::Join
            }
        };
    }
}

/// Reachability is an active LoRaWAN session, kept up by [`maintain_session`]
pub struct LoraRouting<'a> {
    radio: &'a SharedRadio,
}

impl<'a> LoraRouting<'a> {
    pub fn new(radio: &'a SharedRadio) -> Self {
        Self { radio }
    }
}

impl Routing for LoraRouting<'_> {
    type Address = Collector;

    async fn is_reachable(&mut self) -> bool {
        // a join in progress holds the radio, which means not joined yet
        match self.radio.try_lock() {
            Ok(radio) => radio.is_joined(),
            Err(_) => false,
        }
    }

    async fn resolve_destination(&mut self) -> Option<Collector> {
        let radio = self.radio.lock().await;
        radio.dev_addr().map(|dev_addr| Collector { dev_addr })
    }
}

/// Uplinks on one FPort, downlinks on the reply FPort go to the reply channel
pub struct LoraTransport<'a> {
    radio: &'a SharedRadio,
    replies: ReplySender,
    uplink_fport: u8,
    reply_fport: u8,
}

impl<'a> LoraTransport<'a> {
    /// Starts out on the FPorts of `config`, [`Transport::bind`] may move them
    pub fn new(radio: &'a SharedRadio, replies: ReplySender, config: &NodeConfig) -> Result<Self, Error> {
        Ok(Self {
            radio,
            replies,
            uplink_fport: fport(config.local_port)?,
            reply_fport: fport(config.remote_port)?,
        })
    }
}

fn fport(port: u16) -> Result<u8, Error> {
    if FPORT_RANGE.contains(&port) {
        u8::try_from(port).map_err(|_| Error::Transport)
    } else {
        Err(Error::Transport)
    }
}

impl Transport for LoraTransport<'_> {
    type Address = Collector;

    async fn bind(&mut self, local_port: u16, remote_port: u16) -> Result<(), Error> {
        self.uplink_fport = fport(local_port)?;
        self.reply_fport = fport(remote_port)?;
        info!("radio: uplink fport {=u8}, reply fport {=u8}", self.uplink_fport, self.reply_fport);
        Ok(())
    }

    async fn send_to(&mut self, payload: &[u8], destination: &Collector) -> Result<(), Error> {
        let mut radio = self.radio.lock().await;
        info!("radio: uplink {=[u8]:x} via {=[u8]:x}", payload, &destination.dev_addr[..]);

        match radio.uplink(payload, self.uplink_fport).await {
            Ok(Some(reply)) if reply.source_port == u16::from(self.reply_fport) => {
                if self.replies.try_send(reply).is_err() {
                    warn!("radio: reply queue full, dropping downlink");
                }
                Ok(())
            }
            Ok(Some(reply)) => {
                warn!("radio: ignoring downlink on fport {=u16}", reply.source_port);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!("radio: uplink failed: {:?}", e);
                Err(Error::Transport)
            }
        }
    }
}
