use std::os::unix::io::{AsRawFd, RawFd};
use std::{io, mem, ptr};

use crate::phy::RxMeta;
use crate::wire::{Ipv6Address, Ipv6AddressExt};

const SOL_ICMPV6: libc::c_int = 58;
const ICMP6_FILTER: libc::c_int = 1;

/// Room for the packet info and hop limit control messages, 8-byte aligned.
const CONTROL_WORDS: usize = 16;

#[repr(C)]
#[allow(non_camel_case_types)]
struct icmp6_filter {
    data: [u32; 8],
}

/// A raw `AF_INET6` socket for one ICMPv6 protocol.
#[derive(Debug)]
pub struct Icmpv6SocketDesc {
    lower: libc::c_int,
}

impl AsRawFd for Icmpv6SocketDesc {
    fn as_raw_fd(&self) -> RawFd {
        self.lower
    }
}

impl Icmpv6SocketDesc {
    /// Open a non-blocking socket that reports the arrival interface and the
    /// hop limit of every datagram.
    pub fn new() -> io::Result<Icmpv6SocketDesc> {
        let lower = unsafe {
            libc::socket(
                libc::AF_INET6,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                libc::IPPROTO_ICMPV6,
            )
        };
        if lower == -1 {
            return Err(io::Error::last_os_error());
        }

        let desc = Icmpv6SocketDesc { lower };
        desc.set_option(libc::IPPROTO_IPV6, libc::IPV6_RECVPKTINFO, &1)?;
        desc.set_option(libc::IPPROTO_IPV6, libc::IPV6_RECVHOPLIMIT, &1)?;
        Ok(desc)
    }

    pub fn set_option<T>(&self, level: libc::c_int, name: libc::c_int, value: &T) -> io::Result<()> {
        let res = unsafe {
            libc::setsockopt(
                self.lower,
                level,
                name,
                value as *const T as *const libc::c_void,
                mem::size_of::<T>() as libc::socklen_t,
            )
        };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Drop every ICMPv6 message whose type is not `msg_type` in the kernel.
    pub fn filter_type(&self, msg_type: u8) -> io::Result<()> {
        // A set bit blocks the type.
        let mut filter = icmp6_filter { data: [u32::MAX; 8] };
        filter.data[usize::from(msg_type >> 5)] &= !(1u32 << (msg_type & 31));
        self.set_option(SOL_ICMPV6, ICMP6_FILTER, &filter)
    }

    pub fn join_multicast(&self, ifindex: u32, group: Ipv6Address) -> io::Result<()> {
        let mreq = libc::ipv6_mreq {
            ipv6mr_multiaddr: libc::in6_addr {
                s6_addr: group.octets(),
            },
            ipv6mr_interface: ifindex as _,
        };
        self.set_option(libc::IPPROTO_IPV6, libc::IPV6_ADD_MEMBERSHIP, &mreq)
    }

    /// Send `payload` to `dst`, leaving through interface `ifindex`.
    pub fn send(&mut self, ifindex: u32, dst: Ipv6Address, payload: &[u8]) -> io::Result<usize> {
        let mut addr: libc::sockaddr_in6 = unsafe { mem::zeroed() };
        addr.sin6_family = libc::AF_INET6 as libc::sa_family_t;
        addr.sin6_addr = libc::in6_addr {
            s6_addr: dst.octets(),
        };
        if dst.is_multicast() || dst.is_link_local() {
            addr.sin6_scope_id = ifindex;
        }

        let mut iov = libc::iovec {
            iov_base: payload.as_ptr() as *mut libc::c_void,
            iov_len: payload.len(),
        };
        let mut control = [0u64; CONTROL_WORDS];
        let info_len = mem::size_of::<libc::in6_pktinfo>() as libc::c_uint;

        let mut msg: libc::msghdr = unsafe { mem::zeroed() };
        msg.msg_name = &mut addr as *mut libc::sockaddr_in6 as *mut libc::c_void;
        msg.msg_namelen = mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;
        msg.msg_control = control.as_mut_ptr() as *mut libc::c_void;
        msg.msg_controllen = unsafe { libc::CMSG_SPACE(info_len) } as _;

        unsafe {
            let cmsg = libc::CMSG_FIRSTHDR(&msg);
            (*cmsg).cmsg_level = libc::IPPROTO_IPV6;
            (*cmsg).cmsg_type = libc::IPV6_PKTINFO;
            (*cmsg).cmsg_len = libc::CMSG_LEN(info_len) as _;
            let info = libc::in6_pktinfo {
                ipi6_addr: libc::in6_addr { s6_addr: [0; 16] },
                ipi6_ifindex: ifindex as _,
            };
            ptr::write_unaligned(libc::CMSG_DATA(cmsg) as *mut libc::in6_pktinfo, info);
        }

        let len = unsafe { libc::sendmsg(self.lower, &msg, 0) };
        if len == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(len as usize)
    }

    /// Receive one datagram, or `None` if none is queued.
    pub fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<RxMeta>> {
        let mut addr: libc::sockaddr_in6 = unsafe { mem::zeroed() };
        let mut iov = libc::iovec {
            iov_base: buffer.as_mut_ptr() as *mut libc::c_void,
            iov_len: buffer.len(),
        };
        let mut control = [0u64; CONTROL_WORDS];

        let mut msg: libc::msghdr = unsafe { mem::zeroed() };
        msg.msg_name = &mut addr as *mut libc::sockaddr_in6 as *mut libc::c_void;
        msg.msg_namelen = mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;
        msg.msg_control = control.as_mut_ptr() as *mut libc::c_void;
        msg.msg_controllen = mem::size_of_val(&control) as _;

        let len = unsafe { libc::recvmsg(self.lower, &mut msg, 0) };
        if len == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(None);
            }
            return Err(err);
        }

        let mut ifindex = 0;
        let mut hop_limit = 0;
        unsafe {
            let mut cmsg = libc::CMSG_FIRSTHDR(&msg);
            while !cmsg.is_null() {
                if (*cmsg).cmsg_level == libc::IPPROTO_IPV6 {
                    match (*cmsg).cmsg_type {
                        libc::IPV6_PKTINFO => {
                            let info: libc::in6_pktinfo =
                                ptr::read_unaligned(libc::CMSG_DATA(cmsg) as *const _);
                            ifindex = info.ipi6_ifindex as u32;
                        }
                        libc::IPV6_HOPLIMIT => {
                            let hops: libc::c_int =
                                ptr::read_unaligned(libc::CMSG_DATA(cmsg) as *const _);
                            hop_limit = hops as u8;
                        }
                        _ => (),
                    }
                }
                cmsg = libc::CMSG_NXTHDR(&msg, cmsg);
            }
        }

        Ok(Some(RxMeta {
            len: len as usize,
            src: Ipv6Address::from(addr.sin6_addr.s6_addr),
            ifindex,
            hop_limit,
        }))
    }
}

impl Drop for Icmpv6SocketDesc {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.lower);
        }
    }
}
