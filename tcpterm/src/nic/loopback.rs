//! Implementation of an in-memory device.
use std::collections::VecDeque;
use std::io;

use parking_lot::Mutex;

use super::Device;

/// An in-memory device.
///
/// Datagrams queued with [`inject`] are handed out by `recv` in order, everything sent is
/// recorded and can be inspected with [`sent`]. Receiving from an empty queue does not block but
/// fails with `WouldBlock`.
///
/// [`inject`]: #method.inject
/// [`sent`]: #method.sent
#[derive(Debug, Default)]
pub struct Loopback {
    inbound: Mutex<VecDeque<Vec<u8>>>,
    outbound: Mutex<Vec<Vec<u8>>>,
}

impl Loopback {
    pub fn new() -> Self {
        Loopback::default()
    }

    /// Queue a datagram for a later `recv`.
    pub fn inject(&self, datagram: Vec<u8>) {
        self.inbound.lock().push_back(datagram);
    }

    /// A copy of all datagrams sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.outbound.lock().clone()
    }

    /// Remove and return all datagrams sent so far.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::replace(&mut *self.outbound.lock(), Vec::new())
    }

    /// The number of datagrams sent so far.
    pub fn sent_count(&self) -> usize {
        self.outbound.lock().len()
    }
}

impl Device for Loopback {
    fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let datagram = self.inbound.lock()
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))?;
        let len = datagram.len().min(buffer.len());
        buffer[..len].copy_from_slice(&datagram[..len]);
        Ok(len)
    }

    fn send(&self, buffer: &[u8]) -> io::Result<usize> {
        self.outbound.lock().push(buffer.to_vec());
        Ok(buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_and_truncation() {
        let device = Loopback::new();
        device.inject(vec![1, 2, 3]);
        device.inject(vec![4]);

        let mut buffer = [0; 2];
        assert_eq!(device.recv(&mut buffer).unwrap(), 2);
        assert_eq!(buffer, [1, 2]);
        assert_eq!(device.recv(&mut buffer).unwrap(), 1);
        assert_eq!(device.recv(&mut buffer).unwrap_err().kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn records_sent() {
        let device = Loopback::new();
        assert_eq!(device.send(&[7, 7]).unwrap(), 2);
        assert_eq!(device.sent(), vec![vec![7, 7]]);
        assert_eq!(device.take_sent().len(), 1);
        assert_eq!(device.sent_count(), 0);
    }
}
