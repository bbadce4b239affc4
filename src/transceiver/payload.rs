//! Uplink payload: temperature and humidity folded into one `i32`.
//!
//! `value = temperature * 100 + humidity`, sent as four little-endian bytes.
//! The fold is only reversible while `0 <= humidity < 100`; anything else
//! aliases another pair and is decoded as that pair.

pub const PAYLOAD_SIZE: usize = 4;

pub fn encode(temperature: i32, humidity: i32) -> i32 {
    temperature.wrapping_mul(100).wrapping_add(humidity)
}

pub fn decode(value: i32) -> (i32, i32) {
    (value.div_euclid(100), value.rem_euclid(100))
}

pub fn to_bytes(value: i32) -> [u8; PAYLOAD_SIZE] {
    value.to_le_bytes()
}

pub fn from_bytes(bytes: [u8; PAYLOAD_SIZE]) -> i32 {
    i32::from_le_bytes(bytes)
}
