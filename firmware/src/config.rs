use embassy_time::Duration;
use lorawan_device::region;
use sht_node::NodeConfig;

pub struct Config;

impl Config {
    // OTAA credentials, LSB first as printed by most network servers
    pub const DEV_EUI: [u8; 8] = [0x6b, 0x3f, 0x05, 0xd0, 0x7e, 0xd5, 0xb3, 0x70];
    pub const APP_EUI: [u8; 8] = [0x00; 8];
    pub const APP_KEY: [u8; 16] = [
        0x3c, 0x8f, 0x26, 0x27, 0x39, 0xbf, 0xe3, 0xb7, 0xbc, 0x08, 0x26, 0x99, 0x1a, 0xd0, 0x50, 0x4d,
    ];

    pub const LORAWAN_REGION: region::Region = region::Region::EU868;
    pub const RX_WINDOW_LEAD_TIME: u32 = 50;
    pub const RX_WINDOW_BUFFER: u32 = 100;

    pub const JOIN_ATTEMPTS: u8 = 5;
    pub const JOIN_RETRY_DELAY: Duration = Duration::from_secs(10);
    pub const JOIN_BACKOFF: Duration = Duration::from_secs(60 * 10);
    pub const SESSION_CHECK_INTERVAL: Duration = Duration::from_secs(60);

    /// Uplinks go out on FPort 1, replies are accepted on FPort 2
    pub const NODE: NodeConfig = NodeConfig {
        local_port: 1,
        remote_port: 2,
        ..NodeConfig::new()
    };
}
