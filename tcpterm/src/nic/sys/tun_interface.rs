// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use std::io;
use std::os::unix::io::{RawFd, AsRawFd};

use libc;
use super::{Errno, FdResult, InetSocket, IoLenResult, LibcResult, ifreq};
use super::linux::{IfAddr, IfFlags, TunSetIf};

use crate::nic::Device;
use crate::wire::Ipv4Cidr;

/// A tun interface, exchanging raw IP datagrams with the kernel.
///
/// Contains the file descriptor and a pre-filled `ifreq` structure with the interface name that is
/// required for `ioctl` calls. The descriptor is opened in blocking mode, a `recv` waits until the
/// kernel routes a datagram to the interface.
#[derive(Debug)]
pub struct TunInterface {
    lower: libc::c_int,
    ifreq: ifreq,
}

impl AsRawFd for TunInterface {
    fn as_raw_fd(&self) -> RawFd {
        self.lower
    }
}

static TUN_PATH: &'static [u8] = b"/dev/net/tun\0";

impl TunInterface {
    /// Open, attach, address and bring up the named interface.
    ///
    /// This is the usual way to get a usable device. Requires `CAP_NET_ADMIN`.
    pub fn open(name: &str, cidr: Ipv4Cidr) -> io::Result<Self> {
        let mut tun = TunInterface::new(name)?;
        tun.attach_interface()?;
        tun.set_address(cidr)?;
        tun.bring_up()?;
        Ok(tun)
    }

    /// Try to open the clone device for the named interface.
    ///
    /// Note that this does *not* yet set the interface for the file descriptor, it only creates
    /// the necessary structures involved in doing so. Call [`attach_interface`] afterwards.
    ///
    /// [`attach_interface`]: #method.attach_interface
    pub fn new(name: &str) -> Result<TunInterface, Errno> {
        let lower = unsafe {
            libc::open(
                TUN_PATH.as_ptr() as *const libc::c_char,
                libc::O_RDWR)
        };

        FdResult(lower).errno()?;

        Ok(TunInterface {
            lower,
            ifreq: ifreq::new(name),
        })
    }

    /// Update the file descriptor to the named interface, creating it if necessary.
    ///
    /// See `ioctl` with `TUNSETIFF` for details on errors.
    pub fn attach_interface(&mut self) -> Result<(), Errno> {
        self.ifreq.tun_set_tun(self.lower)
    }

    /// The name of the interface as reported by the kernel.
    pub fn name(&self) -> String {
        let bytes: Vec<u8> = self.ifreq.ifr_name.iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Assign an address and netmask to the interface.
    pub fn set_address(&mut self, cidr: Ipv4Cidr) -> Result<(), Errno> {
        let socket = InetSocket::new()?;
        self.ifreq.set_addr(socket.0, cidr.address())?;
        self.ifreq.set_netmask(socket.0, cidr.netmask())
    }

    /// Set the interface administratively up.
    pub fn bring_up(&mut self) -> Result<(), Errno> {
        let socket = InetSocket::new()?;
        let flags = self.ifreq.get_flags(socket.0)?;
        self.ifreq.set_flags(socket.0, flags | ifreq::IFF_UP | ifreq::IFF_RUNNING)
    }

    /// Receive a single datagram from the interface into the buffer.
    pub fn recv(&self, buffer: &mut [u8]) -> Result<usize, Errno> {
        let len = unsafe {
            libc::read(
                self.lower,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len())
        };
        IoLenResult(len).errno()?;
        Ok(len as usize)
    }

    /// Send a single datagram onto the interface from the buffer.
    pub fn send(&self, buffer: &[u8]) -> Result<usize, Errno> {
        let len = unsafe {
            libc::write(
                self.lower,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len())
        };
        IoLenResult(len).errno()?;
        Ok(len as usize)
    }
}

impl Device for TunInterface {
    fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        TunInterface::recv(self, buffer).map_err(io::Error::from)
    }

    fn send(&self, buffer: &[u8]) -> io::Result<usize> {
        TunInterface::send(self, buffer).map_err(io::Error::from)
    }
}

impl Drop for TunInterface {
    fn drop(&mut self) {
        unsafe { libc::close(self.lower); }
    }
}
