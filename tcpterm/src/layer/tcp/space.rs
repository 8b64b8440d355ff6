//! Sequence space bookkeeping and the admissibility checks for inbound segments.
//!
//! The checks compare raw sequence numbers numerically and treat a right bound that is not
//! numerically above the left bound as a window wrapping past 2<sup>32</sup>.
use crate::wire::TcpSeqNumber;

/// The send sequence space of a connection.
///
/// Invariant: `una` precedes or equals `nxt`, modulo 2<sup>32</sup>.
///
/// Not enforced with nothing in flight: when `una == nxt` every acknowledgment number passes
/// `ack_acceptable`, and an ACK in Established then moves `una` past `nxt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSpace {
    /// Oldest unacknowledged sequence number.
    pub una: TcpSeqNumber,
    /// Next sequence number to send.
    pub nxt: TcpSeqNumber,
    /// Send window, also advertised on every emitted segment.
    pub wnd: u16,
    /// Segment sequence number of the last window update. Not maintained.
    pub wl1: TcpSeqNumber,
    /// Segment acknowledgment number of the last window update. Not maintained.
    pub wl2: TcpSeqNumber,
    /// Initial send sequence number.
    pub iss: TcpSeqNumber,
}

/// The receive sequence space of a connection.
///
/// Invariant: `nxt` only advances over contiguous, in-order payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveSpace {
    /// Next sequence number expected.
    pub nxt: TcpSeqNumber,
    /// Receive window.
    pub wnd: u16,
    /// Initial receive sequence number.
    pub irs: TcpSeqNumber,
}

impl SendSpace {
    /// A send space where nothing was sent yet.
    pub fn new(iss: TcpSeqNumber, wnd: u16) -> Self {
        SendSpace {
            una: iss,
            nxt: iss,
            wnd,
            wl1: TcpSeqNumber(0),
            wl2: TcpSeqNumber(0),
            iss,
        }
    }
}

impl ReceiveSpace {
    /// A receive space seeded from the initial segment of the peer.
    pub fn new(irs: TcpSeqNumber, wnd: u16) -> Self {
        ReceiveSpace {
            nxt: irs + 1,
            wnd,
            irs,
        }
    }

    /// The first sequence number beyond the window.
    fn end(&self) -> TcpSeqNumber {
        self.nxt + usize::from(self.wnd)
    }
}

/// Check `l < m <= r` on the circle of sequence numbers.
pub fn wrapping_lt_le(l: TcpSeqNumber, m: TcpSeqNumber, r: TcpSeqNumber) -> bool {
    let (l, m, r) = (l.0, m.0, r.0);
    if l < r {
        l < m && m <= r
    } else {
        m > l || m <= r
    }
}

/// Check `l <= m < r` on the circle of sequence numbers.
pub fn wrapping_le_lt(l: TcpSeqNumber, m: TcpSeqNumber, r: TcpSeqNumber) -> bool {
    let (l, m, r) = (l.0, m.0, r.0);
    if l <= r {
        l <= m && m < r
    } else {
        m >= l || m < r
    }
}

/// Whether an acknowledgment number is acceptable: `una < ack <= nxt`.
///
/// Note that with nothing in flight (`una == nxt`) every acknowledgment passes.
pub fn ack_acceptable(send: &SendSpace, ack: TcpSeqNumber) -> bool {
    wrapping_lt_le(send.una, ack, send.nxt)
}

/// Whether a segment of `len` octets starting at `seq` overlaps the receive window.
pub fn segment_acceptable(recv: &ReceiveSpace, seq: TcpSeqNumber, len: usize) -> bool {
    match (len, recv.wnd) {
        (0, 0) => seq == recv.nxt,
        (0, _) => wrapping_le_lt(recv.nxt, seq, recv.end()),
        (_, 0) => false,
        (len, _) => {
            let last = seq + (len - 1);
            wrapping_le_lt(recv.nxt, seq, recv.end())
                || wrapping_le_lt(recv.nxt, last, recv.end())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: u32) -> TcpSeqNumber {
        TcpSeqNumber(n)
    }

    #[test]
    fn open_closed_interval() {
        assert!(wrapping_lt_le(seq(10), seq(11), seq(20)));
        assert!(wrapping_lt_le(seq(10), seq(20), seq(20)));
        assert!(!wrapping_lt_le(seq(10), seq(10), seq(20)));
        assert!(!wrapping_lt_le(seq(10), seq(21), seq(20)));
    }

    #[test]
    fn open_closed_across_wrap() {
        let l = seq(4294967290);
        assert!(wrapping_lt_le(l, seq(5), seq(10)));
        assert!(wrapping_lt_le(l, seq(4294967295), seq(10)));
        assert!(wrapping_lt_le(l, seq(10), seq(10)));
        assert!(!wrapping_lt_le(l, l, seq(10)));
        assert!(!wrapping_lt_le(l, seq(100), seq(10)));
    }

    #[test]
    fn closed_open_interval() {
        assert!(wrapping_le_lt(seq(10), seq(10), seq(20)));
        assert!(wrapping_le_lt(seq(10), seq(19), seq(20)));
        assert!(!wrapping_le_lt(seq(10), seq(20), seq(20)));
        assert!(!wrapping_le_lt(seq(10), seq(9), seq(20)));
    }

    #[test]
    fn closed_open_across_wrap() {
        let l = seq(4294967290);
        assert!(wrapping_le_lt(l, l, seq(10)));
        assert!(wrapping_le_lt(l, seq(5), seq(10)));
        assert!(wrapping_le_lt(l, seq(0), seq(10)));
        assert!(!wrapping_le_lt(seq(100), seq(50), seq(10)));
        assert!(!wrapping_le_lt(seq(100), seq(10), seq(10)));
    }

    #[test]
    fn ack_in_flight() {
        let mut send = SendSpace::new(seq(1000), 512);
        // Nothing in flight, anything goes.
        assert!(ack_acceptable(&send, seq(3)));

        send.nxt = seq(1010);
        assert!(ack_acceptable(&send, seq(1001)));
        assert!(ack_acceptable(&send, seq(1010)));
        assert!(!ack_acceptable(&send, seq(1000)));
        assert!(!ack_acceptable(&send, seq(1011)));
    }

    #[test]
    fn receive_window() {
        let recv = ReceiveSpace::new(seq(99), 100);
        assert_eq!(recv.nxt, seq(100));
        assert!(segment_acceptable(&recv, seq(100), 0));
        assert!(segment_acceptable(&recv, seq(199), 0));
        assert!(!segment_acceptable(&recv, seq(200), 0));
        // Only the last octet overlaps.
        assert!(segment_acceptable(&recv, seq(90), 20));
        assert!(!segment_acceptable(&recv, seq(80), 20));
        assert!(segment_acceptable(&recv, seq(190), 20));
        assert!(!segment_acceptable(&recv, seq(200), 20));
    }

    #[test]
    fn zero_window() {
        let recv = ReceiveSpace::new(seq(99), 0);
        assert!(segment_acceptable(&recv, seq(100), 0));
        assert!(!segment_acceptable(&recv, seq(101), 0));
        assert!(!segment_acceptable(&recv, seq(100), 1));
    }

    #[test]
    fn receive_window_across_wrap() {
        let recv = ReceiveSpace::new(seq(u32::max_value() - 10), 100);
        assert!(segment_acceptable(&recv, seq(u32::max_value()), 0));
        assert!(segment_acceptable(&recv, seq(20), 0));
        assert!(!segment_acceptable(&recv, seq(90), 0));
        assert!(segment_acceptable(&recv, seq(u32::max_value() - 20), 20));
    }
}
