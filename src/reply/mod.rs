//! Replies from the collector.
//!
//! Transports push raw datagrams into a channel; [`ReplyDecoder::run`]
//! drains it outside of the cooperative pass and keeps the receive count.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Receiver;
use heapless::Vec;

use crate::context::NodeContext;

pub const MAX_REPLY_LEN: usize = 64;

pub type ReplyPayload = Vec<u8, MAX_REPLY_LEN>;

/// Inbound datagram as queued by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Port the datagram was sent from
    pub source_port: u16,
    pub payload: ReplyPayload,
}

impl Reply {
    /// Bytes past [`MAX_REPLY_LEN`] are dropped, they never contribute to
    /// the decoded value.
    pub fn new(source_port: u16, bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_REPLY_LEN);
        let mut payload = ReplyPayload::new();
        // cannot fail, len is bounded by the capacity
        let _ = payload.extend_from_slice(&bytes[..len]);
        Self { source_port, payload }
    }
}

/// Assemble bytes little-endian first into an unsigned value.
///
/// Short payloads decode to smaller values, only the first four bytes fit.
pub fn decode_reply(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .enumerate()
        .fold(0, |value, (i, byte)| value | (u32::from(*byte) << (8 * i)))
}

pub struct ReplyDecoder<'a> {
    ctx: &'a NodeContext,
}

impl<'a> ReplyDecoder<'a> {
    pub fn new(ctx: &'a NodeContext) -> Self {
        Self { ctx }
    }

    /// Decode one datagram and count it
    pub fn on_receive(&self, source_port: u16, payload: &[u8]) -> u32 {
        let value = decode_reply(payload);
        let received = self.ctx.stats().record_received();
        info!(
            "received response {} ({} bytes) from port {}, rx count {}",
            value,
            payload.len(),
            source_port,
            received
        );
        value
    }

    pub async fn run<M: RawMutex, const N: usize>(&self, replies: Receiver<'_, M, Reply, N>) -> ! {
        loop {
            let reply = replies.receive().await;
            self.on_receive(reply.source_port, &reply.payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::select::{select, Either};
    use embassy_futures::{block_on, yield_now};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_sync::channel::Channel;

    #[test]
    fn assembles_little_endian() {
        assert_eq!(decode_reply(&[0x01]), 1);
        assert_eq!(decode_reply(&[0x34, 0x12]), 0x1234);
        assert_eq!(decode_reply(&[0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
    }

    #[test]
    fn empty_payload_decodes_to_zero() {
        assert_eq!(decode_reply(&[]), 0);
    }

    #[test]
    fn bytes_past_the_fourth_are_ignored() {
        assert_eq!(decode_reply(&[1, 0, 0, 0, 0xff, 0xff]), 1);
    }

    #[test]
    fn oversized_datagrams_are_truncated() {
        let bytes = [7u8; MAX_REPLY_LEN + 10];
        assert_eq!(Reply::new(2, &bytes).payload.len(), MAX_REPLY_LEN);
        assert_eq!(Reply::new(2, &[1, 2]).payload.as_slice(), &[1, 2]);
    }

    #[test]
    fn keeps_the_source_port_with_the_bytes() {
        let reply = Reply::new(5678, &[0x2a, 0x01]);

        assert_eq!(reply.source_port, 5678);
        assert_eq!(decode_reply(&reply.payload), 0x012a);
    }

    #[test]
    fn every_reply_is_counted() {
        let ctx = NodeContext::new();
        let decoder = ReplyDecoder::new(&ctx);

        assert_eq!(decoder.on_receive(5678, &[22]), 22);
        decoder.on_receive(5678, &[]);

        assert_eq!(ctx.stats().received(), 2);
        assert_eq!(ctx.stats().sent(), 0);
    }

    #[test]
    fn drains_the_reply_channel() {
        let ctx = NodeContext::new();
        let decoder = ReplyDecoder::new(&ctx);
        let channel = Channel::<NoopRawMutex, Reply, 4>::new();
        for bytes in [&[1u8][..], &[2, 0], &[3, 0, 0, 0]] {
            assert!(channel.try_send(Reply::new(5678, bytes)).is_ok());
        }

        let drained = async {
            while ctx.stats().received() < 3 {
                yield_now().await;
            }
        };

        match block_on(select(decoder.run(channel.receiver()), drained)) {
            Either::First(_) => unreachable!(),
            Either::Second(()) => {}
        }
        assert!(channel.is_empty());
    }
}
