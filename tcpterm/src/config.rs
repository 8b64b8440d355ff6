//! Tunables of an endpoint.
//!
//! The defaults reproduce a small, predictable host: every connection starts at sequence number
//! zero, advertises a window of 10240 octets and retransmits unacknowledged data once a second up
//! to seven times.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::layer::tcp::FourTuple;
use crate::wire::TcpSeqNumber;

/// The window advertised for new connections.
pub const DEFAULT_WINDOW: u16 = 10240;

/// The time to live of emitted datagrams.
pub const DEFAULT_HOP_LIMIT: u8 = 64;

/// The pause between two transmissions of the same segment.
pub const DEFAULT_RETRANSMISSION_INTERVAL: Duration = Duration::from_secs(1);

/// The number of transmissions before a send is given up.
pub const DEFAULT_MAX_RETRIES: usize = 7;

/// The number of threads running retransmissions.
pub const DEFAULT_WORKERS: usize = 10;

/// The size of the buffer the ingestion loop reads datagrams into.
pub const DEFAULT_READ_BUFFER: usize = 1055;

/// Chooses the initial send sequence number of a connection.
pub trait IsnSource: fmt::Debug + Send + Sync {
    fn isn(&self, flow: FourTuple) -> TcpSeqNumber;
}

/// Start every connection at the same sequence number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedIsn(pub TcpSeqNumber);

impl IsnSource for FixedIsn {
    fn isn(&self, _: FourTuple) -> TcpSeqNumber {
        self.0
    }
}

/// The configuration of an [`Endpoint`](crate::Endpoint).
#[derive(Debug, Clone)]
pub struct Config {
    /// Source of the initial send sequence number.
    pub isn: Arc<dyn IsnSource>,
    /// Window advertised and assumed for the send space of new connections.
    pub window: u16,
    /// Time to live of every emitted datagram.
    pub hop_limit: u8,
    pub retransmission_interval: Duration,
    /// Transmissions of a data segment before giving up, the first one included.
    pub max_retries: usize,
    /// Size of the retransmission worker pool.
    pub workers: usize,
    /// Buffer size for a single datagram read from the device.
    pub read_buffer: usize,
}

impl Config {
    pub fn with_isn(self, isn: impl IsnSource + 'static) -> Self {
        Config { isn: Arc::new(isn), ..self }
    }

    pub fn with_window(self, window: u16) -> Self {
        Config { window, ..self }
    }

    pub fn with_hop_limit(self, hop_limit: u8) -> Self {
        Config { hop_limit, ..self }
    }

    pub fn with_retransmission_interval(self, retransmission_interval: Duration) -> Self {
        Config { retransmission_interval, ..self }
    }

    pub fn with_max_retries(self, max_retries: usize) -> Self {
        Config { max_retries, ..self }
    }

    /// Set the size of the worker pool, at least one worker is always started.
    pub fn with_workers(self, workers: usize) -> Self {
        Config { workers, ..self }
    }

    pub fn with_read_buffer(self, read_buffer: usize) -> Self {
        Config { read_buffer, ..self }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            isn: Arc::new(FixedIsn(TcpSeqNumber(0))),
            window: DEFAULT_WINDOW,
            hop_limit: DEFAULT_HOP_LIMIT,
            retransmission_interval: DEFAULT_RETRANSMISSION_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            workers: DEFAULT_WORKERS,
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Ipv4Address;

    #[test]
    fn builders_override_defaults() {
        let flow = FourTuple {
            local: Ipv4Address::new(10, 0, 0, 1),
            local_port: 1,
            remote: Ipv4Address::new(10, 0, 0, 2),
            remote_port: 2,
        };

        let config = Config::default();
        assert_eq!(config.isn.isn(flow), TcpSeqNumber(0));
        assert_eq!(config.window, 10240);
        assert_eq!(config.max_retries, 7);

        let config = config
            .with_isn(FixedIsn(TcpSeqNumber(77)))
            .with_window(512)
            .with_retransmission_interval(Duration::from_millis(5));
        assert_eq!(config.isn.isn(flow), TcpSeqNumber(77));
        assert_eq!(config.window, 512);
        assert_eq!(config.retransmission_interval, Duration::from_millis(5));
        assert_eq!(config.hop_limit, 64);
    }
}
