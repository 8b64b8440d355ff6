//! Errors of endpoint operations.
use std::io;

use thiserror::Error;

use crate::layer::tcp::{FourTuple, State};
use crate::wire;

/// Errors reported to callers of [`Endpoint`](crate::Endpoint) operations.
///
/// Malformed inbound datagrams are returned as `Wire` by `Endpoint::receive`. The ingestion loop
/// logs and drops them.
#[derive(Error, Debug)]
pub enum Error {
    /// No connection exists for the flow.
    #[error("no connection for {0}")]
    NoConnection(FourTuple),
    /// A connection for the flow was already created.
    #[error("connection {0} already exists")]
    ConnectionExists(FourTuple),
    /// Data can only be sent on an established connection.
    #[error("connection {flow} is not established but in {state}")]
    NotEstablished {
        flow: FourTuple,
        state: State,
    },
    /// The payload does not fit into a single datagram.
    #[error("payload of {len} bytes exceeds the maximum of {max}")]
    PayloadTooLarge {
        len: usize,
        max: usize,
    },
    /// The device failed.
    #[error("device error")]
    Io(#[from] io::Error),
    /// A datagram could not be decoded.
    #[error("malformed datagram: {0}")]
    Wire(#[from] wire::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
