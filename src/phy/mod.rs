/*! Access to the host network stack.

The `phy` module deals with what the daemon talks to. It provides a trait
for sending and receiving ICMPv6 datagrams, [Transport](trait.Transport.html),
and implementations of it:

  * the [_loopback_](struct.Loopback.html), an in-memory medium for testing
    and simulation;
  * the _adapter_ [Icmpv6Socket](struct.Icmpv6Socket.html), a raw ICMPv6
    socket on the host OS.

It also provides [Netlink](struct.Netlink.html), the Linux implementation of
[RouteTable](crate::iface::RouteTable), and the few kernel queries the
daemon needs at startup.
*/

use std::io;

use crate::wire::Ipv6Address;

#[cfg(all(feature = "phy-raw_socket", target_os = "linux"))]
mod sys;

mod loopback;
#[cfg(all(feature = "phy-raw_socket", target_os = "linux"))]
mod netlink;
#[cfg(all(feature = "phy-raw_socket", target_os = "linux"))]
mod raw_socket;

pub use self::loopback::{Loopback, Received, Sent};
#[cfg(all(feature = "phy-raw_socket", target_os = "linux"))]
pub use self::netlink::Netlink;
#[cfg(all(feature = "phy-raw_socket", target_os = "linux"))]
pub use self::raw_socket::Icmpv6Socket;
#[cfg(all(feature = "phy-raw_socket", target_os = "linux"))]
pub use self::sys::{if_nametoindex, interface_addresses, wait, write_sysctl};

/// Metadata of a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxMeta {
    /// Octets written into the receive buffer.
    pub len: usize,
    pub src: Ipv6Address,
    /// Index of the interface the datagram arrived on.
    pub ifindex: u32,
    pub hop_limit: u8,
}

/// A way to exchange ICMPv6 messages with neighbors.
///
/// Implementations deliver only RPL control messages, and are expected to
/// have joined the all-RPL-nodes group on every interface in use.
pub trait Transport {
    /// Send `payload`, a complete ICMPv6 message, to `dst` through the
    /// interface `ifindex`.
    fn send(&mut self, ifindex: u32, dst: Ipv6Address, payload: &[u8]) -> io::Result<()>;

    /// Receive one message into `buffer`, or return `None` if nothing is
    /// pending.
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<RxMeta>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, ifindex: u32, dst: Ipv6Address, payload: &[u8]) -> io::Result<()> {
        (**self).send(ifindex, dst, payload)
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<RxMeta>> {
        (**self).recv(buffer)
    }
}
