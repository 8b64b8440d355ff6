use std::time::Duration;

use structopt::StructOpt;

use tcpterm::wire::{Ipv4Address, Ipv4Cidr};

/// Command line options of the shell.
#[derive(Clone, StructOpt)]
pub struct Config {
    /// Name of the TUN interface to create or attach to.
    pub tun: String,

    /// Address and prefix assigned to the interface.
    #[structopt(long = "interface", default_value = "192.168.0.1/24")]
    pub interface: Ipv4Cidr,

    /// Local address of the terminal used for `send:` and `connect:`.
    #[structopt(long = "host", default_value = "192.168.0.2")]
    pub host: Ipv4Address,

    #[structopt(long = "window", default_value = "10240")]
    pub window: u16,

    #[structopt(long = "ttl", default_value = "64")]
    pub ttl: u8,

    /// Milliseconds between two transmissions of the same data.
    #[structopt(long = "retransmission-ms", default_value = "1000")]
    pub retransmission_ms: u64,

    #[structopt(long = "retries", default_value = "7")]
    pub retries: usize,

    #[structopt(long = "workers", default_value = "10")]
    pub workers: usize,

    /// Use a fixed initial sequence number instead of generating one per connection.
    #[structopt(long = "isn")]
    pub isn: Option<u32>,
}

impl Config {
    pub fn from_args() -> Self {
        StructOpt::from_args()
    }

    /// The endpoint configuration selected by the options.
    pub fn endpoint(&self) -> tcpterm::Config {
        let config = tcpterm::Config::default()
            .with_window(self.window)
            .with_hop_limit(self.ttl)
            .with_retransmission_interval(Duration::from_millis(self.retransmission_ms))
            .with_max_retries(self.retries)
            .with_workers(self.workers);

        match self.isn {
            Some(isn) => config.with_isn(tcpterm::config::FixedIsn(tcpterm::wire::TcpSeqNumber(isn))),
            None => config.with_isn(tcpterm::layer::tcp::IsnGenerator::from_std_hash()),
        }
    }
}
