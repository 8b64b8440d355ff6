use core::fmt;

use super::{Checksum, Error, Result};
use super::{IpProtocol, Ipv4Repr, TcpChecksum, TcpRepr, ipv4_packet, tcp_packet};

/// A TCP segment inside an IPv4 datagram, with an owned copy of its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub ip: Ipv4Repr,
    pub tcp: TcpRepr,
    pub payload: Vec<u8>,
    tcp_header_len: usize,
}

impl Datagram {
    /// Assemble a datagram to be emitted.
    ///
    /// The payload lengths of both headers are derived from `payload`.
    pub fn new(mut ip: Ipv4Repr, mut tcp: TcpRepr, payload: Vec<u8>) -> Self {
        let tcp_header_len = tcp.header_len();
        tcp.payload_len = payload.len() as u16;
        ip.protocol = IpProtocol::Tcp;
        ip.payload_len = tcp_header_len + payload.len();
        Datagram { ip, tcp, payload, tcp_header_len }
    }

    /// Parse an IPv4 datagram carrying a TCP segment.
    ///
    /// Fails with `Error::NotIpv4` and `Error::NotTcp` for datagrams of other protocols, which
    /// callers usually skip silently. TCP options are skipped but counted in
    /// [`segment_len`](#method.segment_len).
    pub fn parse(bytes: &[u8], checksum: Checksum) -> Result<Self> {
        let ip_packet = ipv4_packet::new_unchecked(bytes);
        let ip = Ipv4Repr::parse(ip_packet, checksum)?;
        if ip.protocol != IpProtocol::Tcp {
            return Err(Error::NotTcp(ip.protocol));
        }

        let tcp_packet = tcp_packet::new_checked(ip_packet.payload_slice())?;
        let tcp_checksum = if checksum.manual() {
            TcpChecksum::Manual { src_addr: ip.src_addr, dst_addr: ip.dst_addr }
        } else {
            TcpChecksum::Ignored
        };
        let tcp = TcpRepr::parse(tcp_packet, tcp_checksum)?;

        Ok(Datagram {
            ip,
            tcp,
            payload: tcp_packet.payload_slice().to_vec(),
            tcp_header_len: usize::from(tcp_packet.header_len()),
        })
    }

    /// The largest payload a datagram without IP or TCP options can carry.
    pub const MAX_PAYLOAD: usize = u16::MAX as usize - 20 - 20;

    /// The length of the TCP segment in octets, header and options included.
    ///
    /// This is the length the admissibility checks of a connection measure.
    pub fn segment_len(&self) -> usize {
        self.tcp_header_len + self.payload.len()
    }

    /// The number of octets `emit` produces.
    pub fn buffer_len(&self) -> usize {
        self.ip.buffer_len() + self.tcp.header_len() + self.payload.len()
    }

    /// Serialize the datagram, filling in both checksums when requested.
    pub fn emit(&self, checksum: Checksum) -> Vec<u8> {
        let mut ip = self.ip;
        ip.protocol = IpProtocol::Tcp;
        ip.payload_len = self.tcp.header_len() + self.payload.len();
        let mut tcp = self.tcp;
        tcp.payload_len = self.payload.len() as u16;

        let mut buffer = vec![0; self.buffer_len()];
        let ip_packet = ipv4_packet::new_unchecked_mut(&mut buffer);
        ip.emit(ip_packet, checksum);

        let tcp_packet = tcp_packet::new_unchecked_mut(ip_packet.payload_mut_slice());
        tcp_packet.set_header_len(tcp.header_len() as u8);
        tcp_packet.payload_mut_slice().copy_from_slice(&self.payload);
        let tcp_checksum = if checksum.manual() {
            TcpChecksum::Manual { src_addr: ip.src_addr, dst_addr: ip.dst_addr }
        } else {
            TcpChecksum::Ignored
        };
        tcp.emit(tcp_packet, tcp_checksum);

        buffer
    }
}

impl fmt::Display for Datagram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.ip, self.tcp)
    }
}
