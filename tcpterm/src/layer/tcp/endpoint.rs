use core::fmt;
use std::collections::hash_map::{Entry, HashMap};
use std::io;
use std::sync::Arc;
use std::thread;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use super::connection::{Connection, Snapshot, State};
use super::retransmit::{self, SendHandle};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::nic::Device;
use crate::pool::Pool;
use crate::wire::{self, Checksum, Datagram, Ipv4Address};

/// The key identifying a connection.
///
/// Always seen from the local side: for an inbound segment the local address and port are its
/// destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourTuple {
    pub local: Ipv4Address,
    pub local_port: u16,
    pub remote: Ipv4Address,
    pub remote_port: u16,
}

/// The endpoint terminating all TCP connections of a device.
///
/// Holds the table of connections, one entry per flow. Inbound datagrams are fed in by
/// [`run`] (or one by one with [`receive`]), local data is handed out with [`send`] and
/// retransmitted by a pool of workers.
///
/// Connections are never removed from the table.
///
/// [`run`]: #method.run
/// [`receive`]: #method.receive
/// [`send`]: #method.send
pub struct Endpoint<D: Device + 'static> {
    device: Arc<D>,
    config: Config,
    connections: RwLock<HashMap<FourTuple, Arc<Mutex<Connection>>>>,
    last_received: Mutex<Option<FourTuple>>,
    pool: Pool,
}

impl FourTuple {
    /// The flow an inbound segment belongs to.
    pub fn of_arrival(datagram: &Datagram) -> Self {
        FourTuple {
            local: datagram.ip.dst_addr,
            local_port: datagram.tcp.dst_port,
            remote: datagram.ip.src_addr,
            remote_port: datagram.tcp.src_port,
        }
    }
}

impl<D: Device + 'static> Endpoint<D> {
    /// Create an endpoint and start its retransmission workers.
    pub fn new(device: D, config: Config) -> Result<Self> {
        let pool = Pool::new(config.workers)?;
        Ok(Endpoint {
            device: Arc::new(device),
            config,
            connections: RwLock::new(HashMap::new()),
            last_received: Mutex::new(None),
            pool,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read and handle datagrams from the device forever.
    ///
    /// No error ends the loop. Device errors are logged as warnings, malformed datagrams are
    /// logged and dropped.
    pub fn run(&self) -> ! {
        let mut buffer = vec![0; self.config.read_buffer];
        loop {
            match self.poll(&mut buffer) {
                Ok(()) => (),
                Err(Error::Io(ref err)) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::yield_now()
                },
                Err(Error::Io(err)) => warn!("device error: {}", err),
                Err(err) => net_debug!("dropping datagram: {}", err),
            }
        }
    }

    /// Read a single datagram from the device and handle it.
    pub fn poll(&self, buffer: &mut [u8]) -> Result<()> {
        let len = self.device.recv(buffer)?;
        self.receive(&buffer[..len])
    }

    /// Handle a single inbound datagram.
    ///
    /// Datagrams that are not IPv4 or do not carry TCP are silently skipped. Any other decoding
    /// failure is returned, as is a failure to transmit the answer.
    pub fn receive(&self, bytes: &[u8]) -> Result<()> {
        let datagram = match Datagram::parse(bytes, Checksum::Manual) {
            Ok(datagram) => datagram,
            Err(wire::Error::NotIpv4) => {
                net_trace!("skipping non IPv4 datagram of {} bytes", bytes.len());
                return Ok(());
            },
            Err(wire::Error::NotTcp(protocol)) => {
                net_trace!("skipping {} datagram", protocol);
                return Ok(());
            },
            Err(err) => return Err(err.into()),
        };

        let flow = FourTuple::of_arrival(&datagram);
        net_trace!("{}: recv {}", flow, datagram);
        if !datagram.payload.is_empty() {
            net_trace!("{}: payload {:02x?}", flow, datagram.payload);
        }

        *self.last_received.lock() = Some(flow);

        let connection = self.connection_for(flow, &datagram);
        let answer = connection.lock().arrives(&datagram);

        if let Some(answer) = answer {
            net_trace!("{}: send {}", flow, answer);
            self.device.send(&answer.emit(Checksum::Manual))?;
        }

        Ok(())
    }

    /// Send data on an established connection.
    ///
    /// The data is assigned its sequence numbers immediately and transmitted by a worker until
    /// the peer acknowledges it or the retries are used up. The returned handle reports which.
    pub fn send(&self, flow: FourTuple, payload: impl Into<Vec<u8>>) -> Result<SendHandle> {
        let connection = self.connection(flow).ok_or(Error::NoConnection(flow))?;
        let outgoing = connection.lock().send(payload.into())?;
        debug!("{}: queued {} bytes at seq={}", flow, outgoing.payload.len(), outgoing.seq_number);

        let task = {
            let device = self.device.clone();
            let outgoing = outgoing.clone();
            let interval = self.config.retransmission_interval;
            let max_retries = self.config.max_retries;
            self.pool.spawn(move || {
                retransmit::transmit(&connection, &*device, &outgoing, interval, max_retries)
            })
        };

        Ok(SendHandle::new(flow, &outgoing, task))
    }

    /// Create a connection for a flow that has not been seen yet.
    ///
    /// The connection waits in `Listen` for the peer's SYN. No SYN is sent.
    pub fn open(&self, flow: FourTuple) -> Result<()> {
        match self.connections.write().entry(flow) {
            Entry::Occupied(_) => Err(Error::ConnectionExists(flow)),
            Entry::Vacant(entry) => {
                let mut connection = Connection::new(flow, &self.config);
                connection.open();
                entry.insert(Arc::new(Mutex::new(connection)));
                Ok(())
            },
        }
    }

    /// The flow of the most recently handled inbound segment.
    pub fn last_received(&self) -> Option<FourTuple> {
        *self.last_received.lock()
    }

    pub fn state(&self, flow: FourTuple) -> Option<State> {
        self.connection(flow).map(|connection| connection.lock().state())
    }

    pub fn snapshot(&self, flow: FourTuple) -> Option<Snapshot> {
        self.connection(flow).map(|connection| connection.lock().snapshot())
    }

    /// Take the in-order payload received on a connection so far.
    pub fn take_received(&self, flow: FourTuple) -> Option<Vec<u8>> {
        self.connection(flow).map(|connection| connection.lock().take_received())
    }

    /// The number of connections in the table.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    fn connection(&self, flow: FourTuple) -> Option<Arc<Mutex<Connection>>> {
        self.connections.read().get(&flow).cloned()
    }

    /// Look up the connection of an inbound segment, creating it in `Listen` if necessary.
    fn connection_for(&self, flow: FourTuple, segment: &Datagram) -> Arc<Mutex<Connection>> {
        if let Some(connection) = self.connection(flow) {
            return connection;
        }

        self.connections.write()
            .entry(flow)
            .or_insert_with(|| {
                debug!("{}: new connection", flow);
                Arc::new(Mutex::new(Connection::from_segment(flow, &self.config, segment)))
            })
            .clone()
    }
}

impl fmt::Display for FourTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{} <-> {}:{}", self.local, self.local_port, self.remote, self.remote_port)
    }
}
