//! The TCP layer.
//!
//! Terminates TCP connections arriving as raw IPv4 datagrams on a [`Device`]. The layer consists
//! of a few pieces, each in its own module:
//!
//! * The [`Endpoint`] owns the device and the table of connections. It demultiplexes inbound
//!   segments by their [`FourTuple`], creating a listening connection for every flow it has not
//!   seen before, and writes the answers of the connections back to the device.
//! * A [`Connection`] is the state machine of one flow. It never touches the device, it only
//!   returns the segment to send in answer. Each connection sits behind its own lock.
//! * The sequence spaces and the checks every segment has to pass live in `space`.
//! * Data handed to [`Endpoint::send`] is retransmitted by a pool of workers until it is
//!   acknowledged or the configured number of attempts is used up. The returned [`SendHandle`]
//!   reports the [`SendOutcome`].
//!
//! Only the passive open is implemented. A connection moves from `Listen` over `SynReceived` to
//! `Established` and stays there, there is no teardown. No resets are ever sent, invalid
//! segments are dropped silently.
//!
//! Connections are never removed from the table, so a long running endpoint grows with every
//! new flow it sees.
//!
//! [`Device`]: ../../nic/trait.Device.html
//! [`Endpoint`]: struct.Endpoint.html
//! [`Endpoint::send`]: struct.Endpoint.html#method.send
//! [`FourTuple`]: struct.FourTuple.html
//! [`Connection`]: struct.Connection.html
//! [`SendHandle`]: struct.SendHandle.html
//! [`SendOutcome`]: enum.SendOutcome.html
mod connection;
mod endpoint;
mod retransmit;
mod siphash;
mod space;

pub use self::connection::{
    Connection,
    Outgoing,
    Snapshot,
    State,
};

pub use self::endpoint::{
    Endpoint,
    FourTuple,
};

pub use self::retransmit::{
    SendHandle,
    SendOutcome,
};

pub use self::siphash::IsnGenerator;

pub use self::space::{
    ReceiveSpace,
    SendSpace,
    ack_acceptable,
    segment_acceptable,
    wrapping_le_lt,
    wrapping_lt_le,
};
