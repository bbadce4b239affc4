use crate::error::Error;

pub mod payload;

/// Reachability of the upstream collector.
/// Both questions are asked before every send attempt.
pub trait Routing {
    /// Whatever the transport needs to address the collector
    type Address;

    /// Whether a path to the collector currently exists
    async fn is_reachable(&mut self) -> bool;

    /// Address of the collector, `None` if it cannot be resolved right now
    async fn resolve_destination(&mut self) -> Option<Self::Address>;
}

/// Best-effort datagram transport.
///
/// Inbound datagrams are not returned from here; implementations forward
/// them to the reply channel consumed by [`crate::reply::ReplyDecoder`].
pub trait Transport {
    type Address;

    /// Register the local port and the port replies are expected from
    async fn bind(&mut self, local_port: u16, remote_port: u16) -> Result<(), Error>;

    /// Hand a datagram over. Success means accepted for sending, not delivered.
    async fn send_to(&mut self, payload: &[u8], destination: &Self::Address) -> Result<(), Error>;
}
