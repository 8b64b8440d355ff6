/*! Low-level packet access and construction.

The `wire` module deals with the IPv4 and TCP headers a virtual interface in TUN mode hands to
us. Each protocol comes in two layers:

 * A byte wrapper (`ipv4_packet`, `tcp_packet`) that gives field access to a borrowed buffer.
   Its `new_checked` constructor verifies that every accessor is in bounds, so no accessor
   panics afterwards.
 * A `Repr` that is a plain, owned, high-level description of the header. `Repr::parse`
   validates the header and never panics on arbitrary bytes, `Repr::emit` writes it back.

[`Datagram`] glues both layers together into the unit the endpoint works with: the IP header,
the TCP header and the payload.

```rust
use tcpterm::wire::{Checksum, Datagram, Ipv4Address, Ipv4Repr, TcpRepr, TcpFlags, TcpSeqNumber};

let datagram = Datagram::new(
    Ipv4Repr {
        src_addr: Ipv4Address::new(192, 168, 0, 2),
        dst_addr: Ipv4Address::new(192, 168, 0, 1),
        protocol: tcpterm::wire::IpProtocol::Tcp,
        payload_len: 0,
        hop_limit: 64,
    },
    TcpRepr {
        src_port: 80,
        dst_port: 4242,
        flags: TcpFlags::default(),
        seq_number: TcpSeqNumber(0),
        ack_number: None,
        window_len: 10240,
        payload_len: 0,
    },
    b"hello".to_vec(),
);

let bytes = datagram.emit(Checksum::Manual);
let parsed = Datagram::parse(&bytes, Checksum::Manual).expect("well formed");
assert_eq!(parsed.payload, b"hello");
assert_eq!(parsed.tcp.seq_number, TcpSeqNumber(0));
```
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

mod datagram;
mod error;
pub(crate) mod ip;
mod ipv4;
mod tcp;

pub use self::datagram::Datagram;

pub use self::error::{Error, Result};

pub use self::ip::Protocol as IpProtocol;

pub use self::ipv4::{
    Address as Ipv4Address,
    Cidr as Ipv4Cidr,
    Repr as Ipv4Repr,
    ipv4 as ipv4_packet,
};

pub use self::tcp::{
    Checksum as TcpChecksum,
    Flags as TcpFlags,
    Repr as TcpRepr,
    SeqNumber as TcpSeqNumber,
    tcp as tcp_packet,
};

/// Describes how to handle checksums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Checksum must be computed or checked manually.
    Manual,

    /// The checksum field is filled or checked by someone else.
    Ignored,
}

impl Checksum {
    /// Whether checksums need to be computed and verified here.
    pub fn manual(self) -> bool {
        self == Checksum::Manual
    }
}
