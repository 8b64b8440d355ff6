//! Retransmission of data segments.
//!
//! Every accepted send is driven by a job on the worker pool. The job transmits the segment,
//! sleeps for the interval and checks the acknowledgment state of the connection, until either
//! the peer acknowledged the whole segment or the attempts are used up.
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;

use super::connection::{Connection, Outgoing};
use super::endpoint::FourTuple;
use crate::nic::Device;
use crate::pool::Task;
use crate::wire::{Checksum, TcpSeqNumber};

/// How the retransmission of a data segment ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SendOutcome {
    /// The peer acknowledged the segment, observed after the given number of transmissions.
    Acknowledged {
        attempts: usize,
    },
    /// All transmissions were made without the peer acknowledging the segment.
    Exhausted {
        attempts: usize,
    },
}

/// Handle to a data segment being retransmitted in the background.
pub struct SendHandle {
    flow: FourTuple,
    seq_number: TcpSeqNumber,
    len: usize,
    task: Task<SendOutcome>,
}

impl SendOutcome {
    pub fn is_acknowledged(self) -> bool {
        match self {
            SendOutcome::Acknowledged { .. } => true,
            SendOutcome::Exhausted { .. } => false,
        }
    }

    /// The number of transmissions made.
    pub fn attempts(self) -> usize {
        match self {
            SendOutcome::Acknowledged { attempts } | SendOutcome::Exhausted { attempts } => attempts,
        }
    }
}

impl SendHandle {
    pub(crate) fn new(flow: FourTuple, outgoing: &Outgoing, task: Task<SendOutcome>) -> Self {
        SendHandle {
            flow,
            seq_number: outgoing.seq_number,
            len: outgoing.payload.len(),
            task,
        }
    }

    pub fn flow(&self) -> FourTuple {
        self.flow
    }

    /// The sequence number assigned to the first octet of the payload.
    pub fn seq_number(&self) -> TcpSeqNumber {
        self.seq_number
    }

    /// The number of payload octets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Block until the retransmission ended.
    pub fn wait(self) -> SendOutcome {
        self.task.wait()
    }
}

/// Transmit a segment until it is acknowledged or `max_retries` transmissions were made.
///
/// The connection lock is only held while building a datagram and while checking the
/// acknowledgment state, never while writing to the device or sleeping.
pub(crate) fn transmit<D: Device + ?Sized>(
    connection: &Mutex<Connection>,
    device: &D,
    outgoing: &Outgoing,
    interval: Duration,
    max_retries: usize,
) -> SendOutcome {
    let mut attempts = 0;

    while attempts < max_retries {
        let (flow, bytes) = {
            let connection = connection.lock();
            let datagram = connection.retransmission(outgoing);
            net_trace!("{}: transmit {}", connection.flow(), datagram);
            (connection.flow(), datagram.emit(Checksum::Manual))
        };

        attempts += 1;
        if let Err(err) = device.send(&bytes) {
            warn!("{}: failed to transmit seq={}: {}", flow, outgoing.seq_number, err);
        }

        thread::sleep(interval);

        if connection.lock().is_acknowledged(outgoing) {
            debug!("{}: seq={} acknowledged after {} attempts", flow, outgoing.seq_number, attempts);
            return SendOutcome::Acknowledged { attempts };
        }
    }

    warn!("{}: giving up on seq={} after {} attempts",
        connection.lock().flow(), outgoing.seq_number, attempts);
    SendOutcome::Exhausted { attempts }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, FixedIsn};
    use crate::nic::Loopback;
    use crate::wire::{Datagram, IpProtocol, Ipv4Address, Ipv4Repr, TcpFlags, TcpRepr};

    const ISS: TcpSeqNumber = TcpSeqNumber(1000);

    fn flow() -> FourTuple {
        FourTuple {
            local: Ipv4Address::new(10, 0, 0, 2),
            local_port: 80,
            remote: Ipv4Address::new(10, 0, 0, 1),
            remote_port: 5555,
        }
    }

    fn segment(flags: TcpFlags, seq: u32, ack: Option<TcpSeqNumber>) -> Datagram {
        let flow = flow();
        Datagram::new(
            Ipv4Repr {
                src_addr: flow.remote,
                dst_addr: flow.local,
                protocol: IpProtocol::Tcp,
                payload_len: 0,
                hop_limit: 64,
            },
            TcpRepr {
                src_port: flow.remote_port,
                dst_port: flow.local_port,
                flags,
                seq_number: TcpSeqNumber(seq),
                ack_number: ack,
                window_len: 4096,
                payload_len: 0,
            },
            Vec::new(),
        )
    }

    fn established() -> Connection {
        let config = Config::default().with_isn(FixedIsn(ISS));
        let mut syn = TcpFlags::default();
        syn.set_syn(true);
        let first = segment(syn, 300, None);
        let mut connection = Connection::from_segment(flow(), &config, &first);
        assert!(connection.arrives(&first).is_some());
        connection.arrives(&segment(TcpFlags::default(), 301, Some(ISS + 1)));
        connection
    }

    #[test]
    fn exhausts_after_max_retries() {
        let connection = Mutex::new(established());
        let device = Loopback::new();
        let outgoing = connection.lock().send(b"ping".to_vec()).unwrap();

        let interval = Duration::from_millis(10);
        let start = std::time::Instant::now();
        let outcome = transmit(&connection, &device, &outgoing, interval, 3);
        assert_eq!(outcome, SendOutcome::Exhausted { attempts: 3 });
        assert!(start.elapsed() >= 3 * interval);

        let sent = device.take_sent();
        assert_eq!(sent.len(), 3);
        for bytes in sent {
            let datagram = Datagram::parse(&bytes, Checksum::Manual).unwrap();
            assert_eq!(datagram.payload, b"ping");
            assert_eq!(datagram.tcp.seq_number, ISS + 1);
            assert_eq!(datagram.tcp.ack_number, Some(TcpSeqNumber(301)));
            assert!(datagram.tcp.flags.psh());
        }
    }

    #[test]
    fn no_retries_sends_nothing() {
        let connection = Mutex::new(established());
        let device = Loopback::new();
        let outgoing = connection.lock().send(b"ping".to_vec()).unwrap();

        let outcome = transmit(&connection, &device, &outgoing, Duration::from_millis(1), 0);
        assert_eq!(outcome, SendOutcome::Exhausted { attempts: 0 });
        assert_eq!(device.sent_count(), 0);
    }

    #[test]
    fn stops_once_acknowledged() {
        let connection = Arc::new(Mutex::new(established()));
        let device = Arc::new(Loopback::new());
        let outgoing = connection.lock().send(b"ping".to_vec()).unwrap();

        let worker = {
            let connection = connection.clone();
            let device = device.clone();
            let outgoing = outgoing.clone();
            thread::spawn(move || {
                transmit(&connection, &*device, &outgoing, Duration::from_millis(50), 100)
            })
        };

        while device.sent_count() == 0 {
            thread::yield_now();
        }

        let ack = segment(TcpFlags::default(), 301, Some(ISS + 5));
        assert!(connection.lock().arrives(&ack).is_none());

        let outcome = worker.join().unwrap();
        assert!(outcome.is_acknowledged());
        assert!(outcome.attempts() < 100);
        assert_eq!(device.sent_count(), outcome.attempts());
    }
}
