use std::io;

use byteorder::{ByteOrder, NativeEndian};

use super::sys;
use crate::iface::route::{RouteError, RouteTable, ADDRESS_PREFIX_LEN};
use crate::storage::{Full, GrowBuffer};
use crate::wire::{Ipv6Address, Ipv6Cidr};

mod field {
    pub type Field = core::ops::Range<usize>;

    pub const NLMSG_LEN: Field = 0..4;
    pub const NLMSG_TYPE: Field = 4..6;
    pub const NLMSG_FLAGS: Field = 6..8;
    pub const NLMSG_SEQ: Field = 8..12;
    pub const NLMSG_HDRLEN: usize = 16;

    /// `struct nlmsgerr` starts with the negated errno.
    pub const ERR_CODE: Field = 16..20;

    /// `struct ifinfomsg` is 16 octets.
    pub const IFINFO_LEN: usize = 16;
    pub const RTA_LEN: Field = 0..2;
    pub const RTA_TYPE: Field = 2..4;
    pub const RTA_HDRLEN: usize = 4;
}

const fn align(len: usize) -> usize {
    (len + 3) & !3
}

fn request(kind: u16, flags: u16, seq: u32) -> Result<GrowBuffer, Full> {
    let mut buffer = GrowBuffer::new();
    buffer.pad(field::NLMSG_HDRLEN)?;
    let header = buffer.as_mut_slice();
    NativeEndian::write_u16(&mut header[field::NLMSG_TYPE], kind);
    NativeEndian::write_u16(&mut header[field::NLMSG_FLAGS], flags);
    NativeEndian::write_u32(&mut header[field::NLMSG_SEQ], seq);
    Ok(buffer)
}

fn append_attr(buffer: &mut GrowBuffer, kind: u16, data: &[u8]) -> Result<(), Full> {
    let len = field::RTA_HDRLEN + data.len();
    let mut header = [0u8; field::RTA_HDRLEN];
    NativeEndian::write_u16(&mut header[field::RTA_LEN], len as u16);
    NativeEndian::write_u16(&mut header[field::RTA_TYPE], kind);
    buffer.append(&header)?;
    buffer.append(data)?;
    buffer.pad(align(len) - len)
}

fn finish(mut buffer: GrowBuffer) -> GrowBuffer {
    let len = buffer.len() as u32;
    NativeEndian::write_u32(&mut buffer.as_mut_slice()[field::NLMSG_LEN], len);
    buffer
}

/// `RTM_NEWADDR` for `address/64` on `ifindex`.
fn new_addr(seq: u32, ifindex: u32, address: Ipv6Address) -> Result<GrowBuffer, Full> {
    let flags = libc::NLM_F_REQUEST | libc::NLM_F_ACK | libc::NLM_F_CREATE | libc::NLM_F_EXCL;
    let mut buffer = request(libc::RTM_NEWADDR as u16, flags as u16, seq)?;

    // struct ifaddrmsg
    buffer.append(&[
        libc::AF_INET6 as u8,
        ADDRESS_PREFIX_LEN,
        0,
        libc::RT_SCOPE_UNIVERSE as u8,
    ])?;
    buffer.append(&ifindex.to_ne_bytes())?;

    append_attr(&mut buffer, libc::IFA_LOCAL as u16, &address.octets())?;
    append_attr(&mut buffer, libc::IFA_ADDRESS as u16, &address.octets())?;
    Ok(finish(buffer))
}

/// `RTM_NEWROUTE` or `RTM_DELROUTE` for `dst` on `ifindex`.
fn route(
    kind: u16,
    seq: u32,
    ifindex: u32,
    dst: Ipv6Cidr,
    via: Option<Ipv6Address>,
) -> Result<GrowBuffer, Full> {
    let delete = kind == libc::RTM_DELROUTE as u16;
    let flags = if delete {
        libc::NLM_F_REQUEST | libc::NLM_F_ACK
    } else {
        libc::NLM_F_REQUEST | libc::NLM_F_ACK | libc::NLM_F_CREATE | libc::NLM_F_EXCL
    };
    let mut buffer = request(kind, flags as u16, seq)?;

    // struct rtmsg
    let (protocol, scope, rtm_type) = if delete {
        (0, libc::RT_SCOPE_NOWHERE as u8, 0)
    } else {
        (
            libc::RTPROT_BOOT as u8,
            libc::RT_SCOPE_UNIVERSE as u8,
            libc::RTN_UNICAST as u8,
        )
    };
    buffer.append(&[
        libc::AF_INET6 as u8,
        dst.prefix_len(),
        0,
        0,
        libc::RT_TABLE_MAIN as u8,
        protocol,
        scope,
        rtm_type,
    ])?;
    buffer.append(&0u32.to_ne_bytes())?;

    if dst.prefix_len() > 0 {
        append_attr(&mut buffer, libc::RTA_DST as u16, &dst.address().octets())?;
    }
    if let Some(via) = via {
        append_attr(&mut buffer, libc::RTA_GATEWAY as u16, &via.octets())?;
    }
    append_attr(&mut buffer, libc::RTA_OIF as u16, &ifindex.to_ne_bytes())?;
    Ok(finish(buffer))
}

/// `RTM_GETLINK` for the interface `ifindex`.
fn get_link(seq: u32, ifindex: u32) -> Result<GrowBuffer, Full> {
    let mut buffer = request(libc::RTM_GETLINK as u16, libc::NLM_F_REQUEST as u16, seq)?;
    // struct ifinfomsg
    buffer.append(&[libc::AF_UNSPEC as u8, 0, 0, 0])?;
    buffer.append(&(ifindex as i32).to_ne_bytes())?;
    buffer.pad(8)?;
    Ok(finish(buffer))
}

/// Map the status of an `NLMSG_ERROR` message.
fn status(code: i32) -> Result<(), RouteError> {
    match -code {
        0 => Ok(()),
        libc::EEXIST => Err(RouteError::Exists),
        libc::ESRCH | libc::ENOENT => Err(RouteError::NotFound),
        errno => Err(RouteError::Io(io::Error::from_raw_os_error(errno))),
    }
}

/// Iterate over the netlink messages in `data` as (type, sequence, message).
fn messages(data: &[u8]) -> impl Iterator<Item = (u16, u32, &[u8])> + '_ {
    let mut offset = 0;
    core::iter::from_fn(move || {
        let rest = data.get(offset..)?;
        if rest.len() < field::NLMSG_HDRLEN {
            return None;
        }
        let len = NativeEndian::read_u32(&rest[field::NLMSG_LEN]) as usize;
        if len < field::NLMSG_HDRLEN || len > rest.len() {
            return None;
        }
        offset += align(len);
        Some((
            NativeEndian::read_u16(&rest[field::NLMSG_TYPE]),
            NativeEndian::read_u32(&rest[field::NLMSG_SEQ]),
            &rest[..len],
        ))
    })
}

/// Find the attribute `kind` in the attributes of a link message.
fn link_attr(message: &[u8], kind: u16) -> Option<&[u8]> {
    let mut attrs = message.get(field::NLMSG_HDRLEN + field::IFINFO_LEN..)?;
    while attrs.len() >= field::RTA_HDRLEN {
        let len = NativeEndian::read_u16(&attrs[field::RTA_LEN]) as usize;
        if len < field::RTA_HDRLEN || len > attrs.len() {
            return None;
        }
        if NativeEndian::read_u16(&attrs[field::RTA_TYPE]) == kind {
            return Some(&attrs[field::RTA_HDRLEN..len]);
        }
        attrs = attrs.get(align(len)..).unwrap_or(&[]);
    }
    None
}

fn full(err: Full) -> io::Error {
    io::Error::new(io::ErrorKind::OutOfMemory, err)
}

/// The kernel routing table, programmed over rtnetlink.
#[derive(Debug)]
pub struct Netlink {
    lower: sys::NetlinkDesc,
    seq: u32,
    reply: Vec<u8>,
}

impl Netlink {
    pub fn new() -> io::Result<Netlink> {
        Ok(Netlink {
            lower: sys::NetlinkDesc::new()?,
            seq: 0,
            reply: vec![0; 16 * 1024],
        })
    }

    fn next_seq(&mut self) -> u32 {
        self.seq = self.seq.wrapping_add(1);
        self.seq
    }

    /// Send a request and wait for its acknowledgement.
    fn transact(&mut self, request: Result<GrowBuffer, Full>) -> Result<(), RouteError> {
        let request = request.map_err(full)?;
        self.lower.send(request.as_slice())?;

        loop {
            let len = self.lower.recv(&mut self.reply)?;
            for (kind, seq, message) in messages(&self.reply[..len]) {
                if kind == libc::NLMSG_ERROR as u16 && seq == self.seq {
                    let code = message
                        .get(field::ERR_CODE)
                        .map(NativeEndian::read_i32)
                        .unwrap_or(0);
                    return status(code);
                }
            }
        }
    }

    /// Return the link-layer address of the interface `ifindex`.
    pub fn link_address(&mut self, ifindex: u32) -> io::Result<Vec<u8>> {
        let seq = self.next_seq();
        let request = get_link(seq, ifindex).map_err(full)?;
        self.lower.send(request.as_slice())?;

        loop {
            let len = self.lower.recv(&mut self.reply)?;
            for (kind, msg_seq, message) in messages(&self.reply[..len]) {
                if msg_seq != seq {
                    continue;
                }
                if kind == libc::NLMSG_ERROR as u16 {
                    let code = message
                        .get(field::ERR_CODE)
                        .map(NativeEndian::read_i32)
                        .unwrap_or(0);
                    return Err(io::Error::from_raw_os_error(-code));
                }
                if kind == libc::RTM_NEWLINK as u16 {
                    return link_attr(message, libc::IFLA_ADDRESS as u16)
                        .map(<[u8]>::to_vec)
                        .ok_or_else(|| {
                            io::Error::new(io::ErrorKind::NotFound, "link has no address")
                        });
                }
            }
        }
    }
}

impl RouteTable for Netlink {
    fn add_address(&mut self, ifindex: u32, address: Ipv6Address) -> Result<(), RouteError> {
        let seq = self.next_seq();
        self.transact(new_addr(seq, ifindex, address))
    }

    fn add_host_route(
        &mut self,
        ifindex: u32,
        dst: Ipv6Address,
        via: Ipv6Address,
    ) -> Result<(), RouteError> {
        let seq = self.next_seq();
        let dst = Ipv6Cidr::new(dst, 128);
        self.transact(route(libc::RTM_NEWROUTE as u16, seq, ifindex, dst, Some(via)))
    }

    fn add_default_route(&mut self, ifindex: u32, via: Ipv6Address) -> Result<(), RouteError> {
        let seq = self.next_seq();
        let dst = Ipv6Cidr::new(Ipv6Address::UNSPECIFIED, 0);
        self.transact(route(libc::RTM_NEWROUTE as u16, seq, ifindex, dst, Some(via)))
    }

    fn delete_route(
        &mut self,
        ifindex: u32,
        dst: Ipv6Cidr,
        via: Option<Ipv6Address>,
    ) -> Result<(), RouteError> {
        let seq = self.next_seq();
        self.transact(route(libc::RTM_DELROUTE as u16, seq, ifindex, dst, via))
    }
}
