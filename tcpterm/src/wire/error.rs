use core::fmt;

use super::IpProtocol;

/// The error type for the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An incoming packet was shorter than its headers claim.
    Truncated,

    /// An incoming packet had an incorrect checksum and was dropped.
    WrongChecksum,

    /// An incoming packet could not be parsed because some of its fields were out of bounds of
    /// the received data or contained values that are never valid.
    Malformed,

    /// An incoming packet used a feature this stack does not handle, such as IPv4 fragments.
    Unsupported,

    /// The datagram does not carry an IPv4 header.
    NotIpv4,

    /// The IPv4 datagram carries a protocol other than TCP.
    NotTcp(IpProtocol),
}

/// The result type for the codec.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "truncated packet"),
            Error::WrongChecksum => write!(f, "checksum error"),
            Error::Malformed => write!(f, "malformed packet"),
            Error::Unsupported => write!(f, "unsupported packet"),
            Error::NotIpv4 => write!(f, "not an ipv4 datagram"),
            Error::NotTcp(protocol) => write!(f, "not a tcp segment, protocol {}", protocol),
        }
    }
}

impl std::error::Error for Error {}
