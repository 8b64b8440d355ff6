//! A user-space TCP endpoint for virtual network interfaces.
//!
//! The crate terminates TCP connections that arrive as raw IPv4 datagrams on a TUN device. It
//! performs the passive handshake, accepts in-order data and acknowledges it, and retransmits
//! locally sent data until the peer acknowledges it.
//!
//! ## Structure
//!
//! 1. [The wire module](wire/index.html) parses and emits IPv4 and TCP headers.
//! 2. [The tcp layer](layer/tcp/index.html) holds the connection table, the per connection state
//!    machine and the retransmission of data.
//! 3. [Network interfaces](nic/index.html) move datagrams in and out, either through a Linux TUN
//!    interface or an in-memory loopback for tests.
//! 4. A small [worker pool](pool/index.html) runs retransmissions in the background.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::thread;
//!
//! use tcpterm::{Config, Endpoint};
//! use tcpterm::nic::TunInterface;
//!
//! let tun = TunInterface::open("tun0", "192.168.0.1/24".parse().unwrap()).unwrap();
//! let endpoint = Arc::new(Endpoint::new(tun, Config::default()).unwrap());
//!
//! let ingestion = endpoint.clone();
//! thread::spawn(move || ingestion.run());
//! ```
//!
//! ## Logging
//!
//! The crate logs through the `log` facade. State transitions and received data are logged at
//! `info`, dropped segments at `debug`, device errors and exhausted retransmissions at `warn`.
//! Packet summaries are logged at `trace` under the target `tcpterm::net`.
#![warn(unreachable_pub)]

#[macro_use] mod macros;

pub mod config;
pub mod error;
pub mod layer;
pub mod nic;
pub mod pool;
pub mod wire;

pub use self::config::Config;
pub use self::error::{Error, Result};
pub use self::layer::tcp::Endpoint;
