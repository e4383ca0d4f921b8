use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use super::{sys, RxMeta, Transport};
use crate::wire::{Icmpv6Message, Ipv6Address, LINK_LOCAL_ALL_RPL_NODES};

/// Hop limit of every message sent; RPL control messages stay on the link.
const HOP_LIMIT: libc::c_int = 255;

/// A raw ICMPv6 socket that only ever sees RPL control messages.
#[derive(Debug)]
pub struct Icmpv6Socket {
    lower: sys::Icmpv6SocketDesc,
}

impl AsRawFd for Icmpv6Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.lower.as_raw_fd()
    }
}

impl Icmpv6Socket {
    /// Opens the socket.
    ///
    /// This requires superuser privileges or a corresponding capability bit
    /// set on the executable.
    pub fn new() -> io::Result<Icmpv6Socket> {
        let lower = sys::Icmpv6SocketDesc::new()?;
        lower.filter_type(Icmpv6Message::RplControl.into())?;
        lower.set_option(libc::IPPROTO_IPV6, libc::IPV6_MULTICAST_HOPS, &HOP_LIMIT)?;
        lower.set_option(libc::IPPROTO_IPV6, libc::IPV6_UNICAST_HOPS, &HOP_LIMIT)?;
        lower.set_option(libc::IPPROTO_IPV6, libc::IPV6_MULTICAST_LOOP, &0 as &libc::c_int)?;
        Ok(Icmpv6Socket { lower })
    }

    /// Join the all-RPL-nodes group on the interface `ifindex`.
    pub fn join(&self, ifindex: u32) -> io::Result<()> {
        self.lower.join_multicast(ifindex, LINK_LOCAL_ALL_RPL_NODES)
    }
}

impl Transport for Icmpv6Socket {
    fn send(&mut self, ifindex: u32, dst: Ipv6Address, payload: &[u8]) -> io::Result<()> {
        let len = self.lower.send(ifindex, dst, payload)?;
        if len != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "short write on ICMPv6 socket",
            ));
        }
        Ok(())
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<RxMeta>> {
        self.lower.recv(buffer)
    }
}
