// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use super::{ifreq, Errno, LibcResult, IoctlResult};
use crate::wire::Ipv4Address;
use libc;

/// Adds a method to open a tun.
///
/// This is an extension trait implemented for `ifreq` in Linux.
pub(crate) trait TunSetIf {
    /// Attach to an existing interface or create a new one.
    fn tun_set_if(&mut self, fd: libc::c_int, kind: libc::c_short) -> Result<(), Errno>;

    /// Convenience method over `set_if` for a tun without packet information header.
    fn tun_set_tun(&mut self, fd: libc::c_int) -> Result<(), Errno>;
}

/// Adds methods to assign an IPv4 address and netmask.
pub(crate) trait IfAddr {
    fn set_addr(&mut self, fd: libc::c_int, addr: Ipv4Address) -> Result<(), Errno>;

    fn set_netmask(&mut self, fd: libc::c_int, mask: Ipv4Address) -> Result<(), Errno>;
}

/// Adds methods to read and modify the interface flags.
pub(crate) trait IfFlags {
    fn get_flags(&mut self, fd: libc::c_int) -> Result<libc::c_short, Errno>;

    fn set_flags(&mut self, fd: libc::c_int, flags: libc::c_short) -> Result<(), Errno>;
}

impl ifreq {
    pub(crate) const SIOCGIFFLAGS:   libc::Ioctl = 0x8913;
    pub(crate) const SIOCSIFFLAGS:   libc::Ioctl = 0x8914;
    pub(crate) const SIOCSIFADDR:    libc::Ioctl = 0x8916;
    pub(crate) const SIOCSIFNETMASK: libc::Ioctl = 0x891c;

    pub(crate) const TUNSETIFF:      libc::Ioctl = 0x400454CA;
    pub(crate) const IFF_TUN:        libc::c_short = 0x0001;
    pub(crate) const IFF_NO_PI:      libc::c_short = 0x1000;

    pub(crate) const IFF_UP:         libc::c_short = 0x0001;
    pub(crate) const IFF_RUNNING:    libc::c_short = 0x0040;

    /// The size of the union following the name in the kernel's `struct ifreq`.
    const UNION_LEN: usize = 24;
}

/// A request carrying a single short, such as the flags.
#[repr(C)]
struct ShortRequest {
    interface: ifreq,
    value: libc::c_short,
    _pad: [u8; ifreq::UNION_LEN - 2],
}

/// A request carrying a socket address.
#[repr(C)]
struct AddrRequest {
    interface: ifreq,
    addr: libc::sockaddr_in,
    _pad: [u8; ifreq::UNION_LEN - 16],
}

impl ShortRequest {
    fn new(interface: ifreq, value: libc::c_short) -> Self {
        ShortRequest { interface, value, _pad: [0; ifreq::UNION_LEN - 2] }
    }
}

impl AddrRequest {
    fn new(interface: ifreq, addr: Ipv4Address) -> Self {
        let addr = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: 0,
            sin_addr: libc::in_addr { s_addr: u32::from_ne_bytes(addr.0) },
            sin_zero: [0; 8],
        };
        AddrRequest { interface, addr, _pad: [0; ifreq::UNION_LEN - 16] }
    }

    fn ioctl(&mut self, fd: libc::c_int, request: libc::Ioctl) -> Result<(), Errno> {
        let res = unsafe {
            libc::ioctl(fd, request, self as *mut _)
        };
        IoctlResult(res).errno()
    }
}

impl TunSetIf for ifreq {
    fn tun_set_if(&mut self, fd: libc::c_int, kind: libc::c_short) -> Result<(), Errno> {
        let mut request = ShortRequest::new(*self, kind);

        let res = unsafe {
            libc::ioctl(fd, Self::TUNSETIFF, &mut request as *mut _)
        };

        IoctlResult(res).errno()?;

        // The kernel reports the name it actually chose.
        *self = request.interface;
        Ok(())
    }

    fn tun_set_tun(&mut self, fd: libc::c_int) -> Result<(), Errno> {
        self.tun_set_if(fd, Self::IFF_TUN | Self::IFF_NO_PI)
    }
}

impl IfAddr for ifreq {
    fn set_addr(&mut self, fd: libc::c_int, addr: Ipv4Address) -> Result<(), Errno> {
        AddrRequest::new(*self, addr).ioctl(fd, Self::SIOCSIFADDR)
    }

    fn set_netmask(&mut self, fd: libc::c_int, mask: Ipv4Address) -> Result<(), Errno> {
        AddrRequest::new(*self, mask).ioctl(fd, Self::SIOCSIFNETMASK)
    }
}

impl IfFlags for ifreq {
    fn get_flags(&mut self, fd: libc::c_int) -> Result<libc::c_short, Errno> {
        let mut request = ShortRequest::new(*self, 0);

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCGIFFLAGS, &mut request as *mut _)
        };

        IoctlResult(res).errno()?;

        Ok(request.value)
    }

    fn set_flags(&mut self, fd: libc::c_int, flags: libc::c_short) -> Result<(), Errno> {
        let mut request = ShortRequest::new(*self, flags);

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCSIFFLAGS, &mut request as *mut _)
        };

        IoctlResult(res).errno()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_match_kernel_ifreq_size() {
        let expected = libc::IF_NAMESIZE + ifreq::UNION_LEN;
        assert_eq!(core::mem::size_of::<ShortRequest>(), expected);
        assert_eq!(core::mem::size_of::<AddrRequest>(), expected);
    }
}
