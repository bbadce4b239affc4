use embassy_time::Duration;

/// Timing and port settings of the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Delay between the end of one sampling cycle and the next activation
    pub sample_interval: Duration,
    /// Base period of the transmission cycle
    pub send_interval: Duration,
    /// Half-width of the window the send period is randomised in
    pub send_jitter: Duration,
    /// How long a sampler waits for the sensor to become ready.
    /// `None` waits forever.
    pub ready_timeout: Option<Duration>,
    /// How often a sampler waiting on readiness wants to be resumed
    pub ready_poll_interval: Duration,
    /// Local port datagrams are sent from
    pub local_port: u16,
    /// Port replies from the collector are expected on
    pub remote_port: u16,
}

impl NodeConfig {
    pub const UDP_CLIENT_PORT: u16 = 8765;
    pub const UDP_SERVER_PORT: u16 = 5678;

    pub const fn new() -> Self {
        Self {
            sample_interval: Duration::from_secs(5),
            send_interval: Duration::from_secs(5),
            send_jitter: Duration::from_secs(1),
            ready_timeout: Some(Duration::from_secs(2)),
            ready_poll_interval: Duration::from_millis(50),
            local_port: Self::UDP_CLIENT_PORT,
            remote_port: Self::UDP_SERVER_PORT,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new()
    }
}
