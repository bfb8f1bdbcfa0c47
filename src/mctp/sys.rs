// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Thin syscall wrappers for MCTP and packet sockets.
//!
//! Every function returns `io::Result` built from `errno`; no descriptor is
//! ever closed here. Ownership of a descriptor lives in the `OwnedFd`
//! returned by [`socket`].

use std::io;
use std::mem;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use crate::engine_core::models::EndpointAddress;

/// `struct sockaddr_mctp` from linux/mctp.h.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SockaddrMctp {
    pub smctp_family: libc::sa_family_t,
    pub smctp_pad0: u16,
    pub smctp_network: u32,
    pub smctp_addr: u8,
    pub smctp_type: u8,
    pub smctp_tag: u8,
    pub smctp_pad1: u8,
}

impl SockaddrMctp {
    pub fn from_address(addr: &EndpointAddress) -> Self {
        Self {
            smctp_family: crate::engine_core::constants::mctp::AF_MCTP as libc::sa_family_t,
            smctp_pad0: 0,
            smctp_network: addr.network_id,
            smctp_addr: addr.endpoint_id,
            smctp_type: addr.message_type,
            smctp_tag: addr.tag,
            smctp_pad1: 0,
        }
    }

    pub fn to_address(&self) -> EndpointAddress {
        EndpointAddress {
            network_id: self.smctp_network,
            endpoint_id: self.smctp_addr,
            message_type: self.smctp_type,
            tag: self.smctp_tag,
        }
    }
}

/// `struct packet_mreq` from linux/if_packet.h.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PacketMreq {
    pub mr_ifindex: libc::c_int,
    pub mr_type: libc::c_ushort,
    pub mr_alen: libc::c_ushort,
    pub mr_address: [libc::c_uchar; 8],
}

/// Plain socket address structs that may be handed to the kernel by pointer.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` structs for which all-zero bytes are a
/// valid value.
pub unsafe trait RawSockAddr: Copy {
    fn zeroed() -> Self {
        // SAFETY: guaranteed by the trait contract.
        unsafe { mem::zeroed() }
    }
}

// SAFETY: repr(C), integers only.
unsafe impl RawSockAddr for SockaddrMctp {}
// SAFETY: libc definition of struct sockaddr_ll, integers only.
unsafe impl RawSockAddr for libc::sockaddr_ll {}

fn cvt(ret: libc::c_int) -> io::Result<()> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn cvt_len(ret: libc::ssize_t) -> io::Result<usize> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

fn addr_len<A>() -> libc::socklen_t {
    mem::size_of::<A>() as libc::socklen_t
}

/// Create a non-blocking, close-on-exec socket.
pub fn socket(domain: libc::c_int, ty: libc::c_int, protocol: libc::c_int) -> io::Result<OwnedFd> {
    // SAFETY: plain syscall with integer arguments.
    let fd = unsafe {
        libc::socket(
            domain,
            ty | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
            protocol,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `fd` is a freshly created descriptor that nothing else owns.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

pub fn bind<A: RawSockAddr>(fd: RawFd, addr: &A) -> io::Result<()> {
    // SAFETY: `addr` points to a valid A for the duration of the call.
    cvt(unsafe { libc::bind(fd, addr as *const A as *const libc::sockaddr, addr_len::<A>()) })
}

pub fn set_option<T>(fd: RawFd, level: libc::c_int, name: libc::c_int, value: &T) -> io::Result<()> {
    // SAFETY: `value` points to a valid T of the advertised length.
    cvt(unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            value as *const T as *const libc::c_void,
            mem::size_of::<T>() as libc::socklen_t,
        )
    })
}

pub fn send_to<A: RawSockAddr>(fd: RawFd, buf: &[u8], addr: &A) -> io::Result<usize> {
    // SAFETY: both pointers reference live memory of the given lengths.
    cvt_len(unsafe {
        libc::sendto(
            fd,
            buf.as_ptr() as *const libc::c_void,
            buf.len(),
            0,
            addr as *const A as *const libc::sockaddr,
            addr_len::<A>(),
        )
    })
}

/// Receive one unit with `MSG_TRUNC`: the returned length is the full
/// length on the wire, which may exceed `buf.len()`.
pub fn recv_from<A: RawSockAddr>(fd: RawFd, buf: &mut [u8]) -> io::Result<(usize, A)> {
    let mut addr = A::zeroed();
    let mut len = addr_len::<A>();
    // SAFETY: `buf` and `addr` are valid for writes of the given lengths.
    let n = cvt_len(unsafe {
        libc::recvfrom(
            fd,
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            libc::MSG_TRUNC,
            &mut addr as *mut A as *mut libc::sockaddr,
            &mut len,
        )
    })?;
    Ok((n, addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sockaddr_mctp_layout_matches_kernel() {
        assert_eq!(mem::size_of::<SockaddrMctp>(), 12);
        assert_eq!(mem::size_of::<PacketMreq>(), 16);
    }

    #[test]
    fn test_sockaddr_mctp_round_trips_address() {
        let addr = EndpointAddress::request(3, 8, 0x7e);
        let raw = SockaddrMctp::from_address(&addr);
        assert_eq!(raw.smctp_family, 45);
        assert_eq!(raw.smctp_tag, 0x08);
        assert_eq!(raw.to_address(), addr);
    }
}
