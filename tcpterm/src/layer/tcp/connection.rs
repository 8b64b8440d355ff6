use core::fmt;

use log::{debug, info};

use super::endpoint::FourTuple;
use super::space::{self, ReceiveSpace, SendSpace};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::wire::{Datagram, IpProtocol, Ipv4Repr, TcpFlags, TcpRepr, TcpSeqNumber};

/// The state of a connection.
///
/// Only the passive open path is driven: `Listen`, `SynReceived` and `Established`. The other
/// states exist but never process segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Closed,
    Listen,
    SynSent,
    SynReceived,
    Established,
}

/// The per flow state of the protocol.
///
/// All methods expect to be called with the connection's lock held by the caller, they never
/// block or touch the device. Answers are returned for the caller to transmit.
#[derive(Debug)]
pub struct Connection {
    flow: FourTuple,
    state: State,
    send: SendSpace,
    recv: ReceiveSpace,
    /// Whether the receive space was taken from a segment of the peer.
    seeded: bool,
    hop_limit: u8,
    received: Vec<u8>,
}

/// A copy of the state of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub state: State,
    pub send: SendSpace,
    pub recv: ReceiveSpace,
}

/// A data segment handed to retransmission.
///
/// The payload and sequence number are fixed when the send is accepted, only the acknowledgment
/// number is refreshed on every attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outgoing {
    pub seq_number: TcpSeqNumber,
    pub payload: Vec<u8>,
}

impl Connection {
    /// A listening connection for a flow which has not seen any segment yet.
    pub fn new(flow: FourTuple, config: &Config) -> Self {
        Connection {
            flow,
            state: State::Listen,
            send: SendSpace::new(config.isn.isn(flow), config.window),
            recv: ReceiveSpace::default(),
            seeded: false,
            hop_limit: config.hop_limit,
            received: Vec::new(),
        }
    }

    /// A listening connection whose receive space is seeded from the first segment of the flow.
    pub fn from_segment(flow: FourTuple, config: &Config, segment: &Datagram) -> Self {
        Connection {
            recv: ReceiveSpace::new(segment.tcp.seq_number, segment.tcp.window_len),
            seeded: true,
            ..Connection::new(flow, config)
        }
    }

    pub fn flow(&self) -> FourTuple {
        self.flow
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn send_space(&self) -> SendSpace {
        self.send
    }

    pub fn receive_space(&self) -> ReceiveSpace {
        self.recv
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            send: self.send,
            recv: self.recv,
        }
    }

    /// Remove all payload delivered in order so far.
    pub fn take_received(&mut self) -> Vec<u8> {
        core::mem::replace(&mut self.received, Vec::new())
    }

    /// Handle an inbound segment of this flow.
    ///
    /// Returns the segment to send in answer, if any.
    pub fn arrives(&mut self, segment: &Datagram) -> Option<Datagram> {
        let (next, answer) = match self.state {
            State::Listen => self.arrives_listen(segment),
            State::SynReceived => self.arrives_syn_received(segment),
            State::Established => self.arrives_established(segment),
            State::SynSent | State::Closed => {
                debug!("{}: ignoring segment in {}", self.flow, self.state);
                (self.state, None)
            },
        };

        self.switch_state(next);
        answer
    }

    /// Handle a request to open the connection actively.
    ///
    /// Active open is not supported, no state sends a SYN.
    pub fn open(&mut self) {
        match self.state {
            State::Listen => info!("{}: listening, active open is not supported", self.flow),
            other => debug!("{}: open in {} has no effect", self.flow, other),
        }
    }

    /// Accept payload for transmission.
    ///
    /// Assigns the next sequence numbers to the payload. The caller is responsible for actually
    /// transmitting it, usually through the retransmission engine.
    pub fn send(&mut self, payload: Vec<u8>) -> Result<Outgoing> {
        match self.state {
            State::Established if payload.len() > Datagram::MAX_PAYLOAD => {
                Err(Error::PayloadTooLarge { len: payload.len(), max: Datagram::MAX_PAYLOAD })
            },
            State::Established => {
                let seq_number = self.send.nxt;
                self.send.nxt += payload.len();
                Ok(Outgoing { seq_number, payload })
            },
            state => Err(Error::NotEstablished { flow: self.flow, state }),
        }
    }

    /// Build the datagram for one transmission attempt of a data segment.
    pub fn retransmission(&self, outgoing: &Outgoing) -> Datagram {
        let mut flags = TcpFlags::default();
        flags.set_psh(true);
        self.segment(flags, outgoing.seq_number, Some(self.recv.nxt), outgoing.payload.clone())
    }

    /// Whether the peer acknowledged the whole data segment.
    pub fn is_acknowledged(&self, outgoing: &Outgoing) -> bool {
        self.send.una >= outgoing.seq_number + outgoing.payload.len()
    }

    fn arrives_listen(&mut self, segment: &Datagram) -> (State, Option<Datagram>) {
        let tcp = &segment.tcp;

        if !self.seeded && tcp.flags.syn() && !tcp.flags.rst() && tcp.ack_number.is_none() {
            // Connections created by `open` have not seen the peer yet.
            self.recv = ReceiveSpace::new(tcp.seq_number, tcp.window_len);
            self.seeded = true;
        }

        if !self.is_valid(segment) {
            return (State::Listen, None);
        }

        if tcp.flags.rst() {
            debug!("{}: ignoring RST in {}", self.flow, State::Listen);
            return (State::Listen, None);
        }

        if tcp.ack_number.is_some() {
            debug!("{}: dropping ACK in {}, no reset sent", self.flow, State::Listen);
            return (State::Listen, None);
        }

        if !tcp.flags.syn() {
            debug!("{}: dropping segment without SYN in {}", self.flow, State::Listen);
            return (State::Listen, None);
        }

        let mut flags = TcpFlags::default();
        flags.set_syn(true);
        let answer = self.segment(flags, self.send.nxt, Some(tcp.seq_number + 1), Vec::new());
        (State::SynReceived, Some(answer))
    }

    fn arrives_syn_received(&mut self, segment: &Datagram) -> (State, Option<Datagram>) {
        let tcp = &segment.tcp;

        if !self.is_valid(segment) {
            return (State::SynReceived, None);
        }

        if tcp.flags.rst() {
            debug!("{}: ignoring RST in {}", self.flow, State::SynReceived);
            return (State::SynReceived, None);
        }

        if tcp.flags.syn() {
            debug!("{}: ignoring duplicate SYN", self.flow);
            return (State::SynReceived, None);
        }

        if tcp.ack_number.is_some() {
            // Our SYN occupies one sequence number.
            self.send.nxt += 1;
            info!("{}: handshake complete", self.flow);
            return (State::Established, None);
        }

        (State::SynReceived, None)
    }

    fn arrives_established(&mut self, segment: &Datagram) -> (State, Option<Datagram>) {
        let tcp = &segment.tcp;

        if !self.is_valid(segment) {
            return (State::Established, None);
        }

        if tcp.flags.rst() || tcp.flags.syn() {
            info!("{}: ignoring{} in {}", self.flow, tcp.flags, State::Established);
            return (State::Established, None);
        }

        if let Some(ack) = tcp.ack_number {
            self.send.una = ack;
        }

        if segment.payload.is_empty() {
            return (State::Established, None);
        }

        if tcp.seq_number != self.recv.nxt {
            debug!("{}: dropping out of order segment seq={} expected={}",
                self.flow, tcp.seq_number, self.recv.nxt);
            return (State::Established, None);
        }

        self.recv.nxt += segment.payload.len();
        self.received.extend_from_slice(&segment.payload);
        info!("{}: received {} bytes: {}",
            self.flow, segment.payload.len(), String::from_utf8_lossy(&segment.payload));

        let answer = self.segment(TcpFlags::default(), self.send.nxt, Some(self.recv.nxt), Vec::new());
        (State::Established, Some(answer))
    }

    /// Check the acknowledgment and the sequence number of a segment.
    fn is_valid(&self, segment: &Datagram) -> bool {
        if let Some(ack) = segment.tcp.ack_number {
            if !space::ack_acceptable(&self.send, ack) {
                debug!("{}: unacceptable ack={} una={} nxt={}",
                    self.flow, ack, self.send.una, self.send.nxt);
                return false;
            }
        }

        let len = segment.segment_len();
        if !space::segment_acceptable(&self.recv, segment.tcp.seq_number, len) {
            debug!("{}: segment seq={} len={} outside of window nxt={} wnd={}",
                self.flow, segment.tcp.seq_number, len, self.recv.nxt, self.recv.wnd);
            return false;
        }

        true
    }

    /// A segment from the local to the remote end of the flow.
    fn segment(
        &self,
        flags: TcpFlags,
        seq_number: TcpSeqNumber,
        ack_number: Option<TcpSeqNumber>,
        payload: Vec<u8>,
    ) -> Datagram {
        let ip = Ipv4Repr {
            src_addr: self.flow.local,
            dst_addr: self.flow.remote,
            protocol: IpProtocol::Tcp,
            payload_len: 0,
            hop_limit: self.hop_limit,
        };
        let tcp = TcpRepr {
            src_port: self.flow.local_port,
            dst_port: self.flow.remote_port,
            flags,
            seq_number,
            ack_number,
            window_len: self.send.wnd,
            payload_len: 0,
        };
        Datagram::new(ip, tcp, payload)
    }

    fn switch_state(&mut self, next: State) {
        if next != self.state {
            info!("{}: {} -> {}", self.flow, self.state, next);
            self.state = next;
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            State::Closed => write!(f, "CLOSED"),
            State::Listen => write!(f, "LISTEN"),
            State::SynSent => write!(f, "SYN-SENT"),
            State::SynReceived => write!(f, "SYN-RECEIVED"),
            State::Established => write!(f, "ESTABLISHED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixedIsn;
    use crate::wire::{Checksum, Ipv4Address};

    const ISS: TcpSeqNumber = TcpSeqNumber(5000);

    fn flow() -> FourTuple {
        FourTuple {
            local: Ipv4Address::new(192, 168, 0, 2),
            local_port: 80,
            remote: Ipv4Address::new(192, 168, 0, 1),
            remote_port: 40000,
        }
    }

    fn config() -> Config {
        Config::default().with_isn(FixedIsn(ISS))
    }

    fn inbound(flags: TcpFlags, seq: u32, ack: Option<TcpSeqNumber>, payload: &[u8]) -> Datagram {
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
            payload.to_vec(),
        )
    }

    fn syn(seq: u32) -> Datagram {
        let mut flags = TcpFlags::default();
        flags.set_syn(true);
        inbound(flags, seq, None, &[])
    }

    fn established(client_seq: u32) -> Connection {
        let syn = syn(client_seq);
        let mut connection = Connection::from_segment(flow(), &config(), &syn);
        assert!(connection.arrives(&syn).is_some());
        let ack = inbound(TcpFlags::default(), client_seq + 1, Some(ISS + 1), &[]);
        assert!(connection.arrives(&ack).is_none());
        assert_eq!(connection.state(), State::Established);
        connection
    }

    #[test]
    fn syn_answered_with_syn_ack() {
        let syn = syn(100);
        let mut connection = Connection::from_segment(flow(), &config(), &syn);
        let answer = connection.arrives(&syn).expect("answers a SYN");

        assert_eq!(connection.state(), State::SynReceived);
        assert!(answer.tcp.flags.syn());
        assert_eq!(answer.tcp.seq_number, ISS);
        assert_eq!(answer.tcp.ack_number, Some(TcpSeqNumber(101)));
        assert_eq!(answer.tcp.window_len, crate::config::DEFAULT_WINDOW);
        assert_eq!(answer.ip.dst_addr, flow().remote);
        assert_eq!(answer.tcp.dst_port, flow().remote_port);
        assert_eq!(answer.ip.hop_limit, 64);
    }

    #[test]
    fn listen_drops_ack_and_rst() {
        let mut flags = TcpFlags::default();
        flags.set_rst(true);
        let rst = inbound(flags, 7, None, &[]);
        let mut connection = Connection::from_segment(flow(), &config(), &rst);
        assert!(connection.arrives(&rst).is_none());

        let ack = inbound(TcpFlags::default(), 7, Some(TcpSeqNumber(1)), &[]);
        assert!(connection.arrives(&ack).is_none());
        assert_eq!(connection.state(), State::Listen);
    }

    #[test]
    fn opened_connection_accepts_syn() {
        let mut connection = Connection::new(flow(), &config());
        connection.open();
        assert_eq!(connection.state(), State::Listen);

        assert!(connection.arrives(&syn(7)).is_some());
        assert_eq!(connection.state(), State::SynReceived);
        assert_eq!(connection.receive_space().nxt, TcpSeqNumber(8));
    }

    #[test]
    fn handshake_advances_send_next() {
        let connection = established(100);
        assert_eq!(connection.send_space().nxt, ISS + 1);
        assert_eq!(connection.send_space().una, ISS);
    }

    #[test]
    fn duplicate_syn_ignored() {
        let syn = syn(100);
        let mut connection = Connection::from_segment(flow(), &config(), &syn);
        connection.arrives(&syn);
        assert!(connection.arrives(&syn).is_none());
        assert_eq!(connection.state(), State::SynReceived);
        assert_eq!(connection.send_space().nxt, ISS);
    }

    #[test]
    fn in_order_payload_is_acknowledged() {
        let mut connection = established(100);
        let data = inbound(TcpFlags::default(), 101, Some(ISS + 1), b"hello");
        let answer = connection.arrives(&data).expect("acknowledges data");

        assert_eq!(connection.receive_space().nxt, TcpSeqNumber(106));
        assert_eq!(answer.tcp.ack_number, Some(TcpSeqNumber(106)));
        assert_eq!(answer.tcp.seq_number, ISS + 1);
        assert!(answer.payload.is_empty());
        assert_eq!(connection.take_received(), b"hello");
        assert!(connection.take_received().is_empty());
    }

    #[test]
    fn out_of_order_payload_is_dropped() {
        let mut connection = established(100);
        let ack = inbound(TcpFlags::default(), 101, Some(ISS + 1), &[]);
        assert!(connection.arrives(&ack).is_none());

        let before = connection.snapshot();
        let data = inbound(TcpFlags::default(), 201, Some(ISS + 1), b"hello");
        assert!(connection.arrives(&data).is_none());
        assert_eq!(connection.snapshot(), before);
        assert!(connection.take_received().is_empty());
    }

    #[test]
    fn send_requires_established() {
        let mut connection = Connection::new(flow(), &config());
        match connection.send(b"data".to_vec()) {
            Err(Error::NotEstablished { state: State::Listen, .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(connection.send_space().nxt, ISS);
    }

    #[test]
    fn send_assigns_sequence_numbers() {
        let mut connection = established(100);
        let first = connection.send(b"abc".to_vec()).unwrap();
        let second = connection.send(b"de".to_vec()).unwrap();
        assert_eq!(first.seq_number, ISS + 1);
        assert_eq!(second.seq_number, ISS + 4);
        assert_eq!(connection.send_space().nxt, ISS + 6);

        let datagram = connection.retransmission(&first);
        assert!(datagram.tcp.flags.psh());
        assert_eq!(datagram.tcp.ack_number, Some(TcpSeqNumber(101)));
        assert_eq!(datagram.payload, b"abc");
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut connection = established(100);
        match connection.send(vec![b'x'; Datagram::MAX_PAYLOAD + 1]) {
            Err(Error::PayloadTooLarge { len, max }) => {
                assert_eq!(len, Datagram::MAX_PAYLOAD + 1);
                assert_eq!(max, Datagram::MAX_PAYLOAD);
            },
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(connection.send_space().nxt, ISS + 1);

        let largest = connection.send(vec![b'x'; Datagram::MAX_PAYLOAD]).unwrap();
        assert_eq!(connection.send_space().nxt, ISS + 1 + Datagram::MAX_PAYLOAD);
        let bytes = connection.retransmission(&largest).emit(Checksum::Manual);
        assert_eq!(bytes.len(), usize::from(u16::MAX));
        let parsed = Datagram::parse(&bytes, Checksum::Manual).unwrap();
        assert_eq!(parsed.payload.len(), Datagram::MAX_PAYLOAD);
    }

    #[test]
    fn listen_keeps_receive_space_of_first_segment() {
        let first = inbound(TcpFlags::default(), 7, None, &[]);
        let mut connection = Connection::from_segment(flow(), &config(), &first);
        assert!(connection.arrives(&first).is_none());
        let before = connection.receive_space();

        assert!(connection.arrives(&syn(100)).is_some());
        assert_eq!(connection.state(), State::SynReceived);
        assert_eq!(connection.receive_space(), before);
    }

    #[test]
    fn ack_with_nothing_in_flight_moves_una_beyond_nxt() {
        let mut connection = established(100);
        let ack = inbound(TcpFlags::default(), 101, Some(ISS + 1), &[]);
        connection.arrives(&ack);
        assert_eq!(connection.send_space().una, connection.send_space().nxt);

        let ahead = inbound(TcpFlags::default(), 101, Some(ISS + 1000), &[]);
        assert!(connection.arrives(&ahead).is_none());
        assert_eq!(connection.send_space().una, ISS + 1000);
        assert_eq!(connection.send_space().nxt, ISS + 1);

        // Data sent afterwards counts as acknowledged before its first transmission.
        let outgoing = connection.send(b"abc".to_vec()).unwrap();
        assert!(connection.is_acknowledged(&outgoing));
    }

    #[test]
    fn ack_bookkeeping() {
        let mut connection = established(100);
        let outgoing = connection.send(b"abcde".to_vec()).unwrap();
        assert!(!connection.is_acknowledged(&outgoing));

        // Beyond anything sent.
        let bogus = inbound(TcpFlags::default(), 101, Some(ISS + 100), &[]);
        connection.arrives(&bogus);
        assert_eq!(connection.send_space().una, ISS);

        let partial = inbound(TcpFlags::default(), 101, Some(ISS + 3), &[]);
        connection.arrives(&partial);
        assert_eq!(connection.send_space().una, ISS + 3);
        assert!(!connection.is_acknowledged(&outgoing));

        let full = inbound(TcpFlags::default(), 101, Some(ISS + 6), &[]);
        connection.arrives(&full);
        assert_eq!(connection.send_space().una, ISS + 6);
        assert!(connection.is_acknowledged(&outgoing));
    }
}
