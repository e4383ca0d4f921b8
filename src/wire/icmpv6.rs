use core::fmt;

use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};

enum_with_unknown! {
    /// ICMPv6 message type. Only RPL control messages are handled; the
    /// others are named so that dropped packets read well in the log.
    pub enum Message(u8) {
        EchoRequest     = 0x80,
        EchoReply       = 0x81,
        RouterSolicit   = 0x85,
        RouterAdvert    = 0x86,
        NeighborSolicit = 0x87,
        NeighborAdvert  = 0x88,
        RplControl      = 0x9b,
    }
}

impl Message {
    /// Types below 128 report errors (RFC 4443, section 2.1).
    pub fn is_error(&self) -> bool {
        u8::from(*self) < 0x80
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Message::EchoRequest => "echo request",
            Message::EchoReply => "echo reply",
            Message::RouterSolicit => "RS",
            Message::RouterAdvert => "RA",
            Message::NeighborSolicit => "NS",
            Message::NeighborAdvert => "NA",
            Message::RplControl => "RPL control",
            Message::Unknown(id) if id < 0x80 => return write!(f, "ICMPv6 error {}", id),
            Message::Unknown(id) => return write!(f, "ICMPv6 type {}", id),
        };
        f.write_str(name)
    }
}

/// A read/write wrapper around an Internet Control Message Protocol version 6 packet buffer.
///
/// Only the common header is interpreted here; the RPL control message
/// body accessors live in [wire::rpl](super::rpl).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Packet<T: AsRef<[u8]>> {
    pub(super) buffer: T,
}

pub(super) mod field {
    use crate::wire::field::*;

    // ICMPv6: See https://tools.ietf.org/html/rfc4443
    pub const TYPE: usize = 0;
    pub const CODE: usize = 1;
    pub const CHECKSUM: Field = 2..4;

    pub const HEADER_END: usize = 4;
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with ICMPv6 packet structure.
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer is shorter than the common header.
    pub fn check_len(&self) -> Result<()> {
        if self.buffer.as_ref().len() < field::HEADER_END {
            Err(Error)
        } else {
            Ok(())
        }
    }

    /// Consume the packet, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the message type field.
    #[inline]
    pub fn msg_type(&self) -> Message {
        let data = self.buffer.as_ref();
        Message::from(data[field::TYPE])
    }

    /// Return the message code field.
    #[inline]
    pub fn msg_code(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::CODE]
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u16(&data[field::CHECKSUM])
    }

    /// Return the total length of the message, header included.
    pub fn len(&self) -> usize {
        self.buffer.as_ref().len()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the message type field.
    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        let data = self.buffer.as_mut();
        data[field::TYPE] = value.into()
    }

    /// Set the message code field.
    #[inline]
    pub fn set_msg_code(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::CODE] = value
    }

    /// Set the checksum field.
    ///
    /// Raw ICMPv6 sockets have the kernel compute the checksum, so emitters
    /// leave it zero.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::CHECKSUM], value)
    }
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Packet<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}
