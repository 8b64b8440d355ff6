//! Encapsulates the virtual network interface.
//!
//! The endpoint only needs to move whole IP datagrams in and out, so a device is reduced to a
//! pair of blocking read and write calls on shared references. Errors are treated as transient by
//! all callers.
use std::io;
use std::sync::Arc;

pub mod loopback;

#[cfg(target_os = "linux")]
#[path="sys/mod.rs"]
mod sys_internal;

pub use self::loopback::Loopback;

#[cfg(target_os = "linux")]
pub use self::sys_internal::exports as sys;

#[cfg(target_os = "linux")]
pub use self::sys_internal::exports::TunInterface;

/// A device carrying raw IP datagrams, one per call.
///
/// Both operations take `&self` since reads of the ingestion thread and writes of retransmission
/// workers happen concurrently.
pub trait Device: Send + Sync {
    /// Receive a single datagram into the buffer, returning its length.
    ///
    /// A datagram larger than the buffer is truncated.
    fn recv(&self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Send a single datagram.
    fn send(&self, buffer: &[u8]) -> io::Result<usize>;
}

impl<D: Device + ?Sized> Device for Arc<D> {
    fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        (**self).recv(buffer)
    }

    fn send(&self, buffer: &[u8]) -> io::Result<usize> {
        (**self).send(buffer)
    }
}
