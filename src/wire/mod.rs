/*! RPL control messages on the wire.

Everything rpld sends or receives is an ICMPv6 message of type 155. The kernel
strips the IPv6 header, so this module starts at the ICMPv6 header.

Each format comes in two layers:

 * a `Packet` wrapper over a byte buffer, with one getter and one setter per
   header field, e.g. [Icmpv6Packet] and [RplOptionPacket];
 * a `Repr` value holding the decoded message, e.g. [RplRepr] and
   [RplOptionRepr], with `parse`, `buffer_len` and `emit`.

Received bytes must go through `Packet::new_checked`. Once it returns `Ok`,
no getter panics and `Repr::parse` either succeeds or returns [Error]. When
building a message, allocate exactly `Repr::buffer_len()` octets and wrap them
with `Packet::new_unchecked`, since a zeroed buffer says nothing about the
length of the message that will be written into it.
*/

use core::fmt;

mod field {
    pub type Field = ::core::ops::Range<usize>;
}

pub mod icmpv6;
pub mod ipv6;
pub mod rpl;

pub use self::icmpv6::{Message as Icmpv6Message, Packet as Icmpv6Packet};

pub use self::ipv6::{
    Address as Ipv6Address, AddressExt as Ipv6AddressExt, Cidr as Ipv6Cidr,
    LINK_LOCAL_ALL_RPL_NODES,
};

pub use self::rpl::{
    options::{
        OptionType as RplOptionType, Packet as RplOptionPacket, Repr as RplOptionRepr,
    },
    DaoAckFlags as RplDaoAckFlags, DaoFlags as RplDaoFlags,
    DestinationAdvertisementObject as RplDao, DestinationAdvertisementObjectAck as RplDaoAck,
    DodagInformationObject as RplDio, DodagInformationSolicitation as RplDis,
    InstanceId as RplInstanceId, ModeOfOperation as RplModeOfOperation,
    RplControlMessage, Repr as RplRepr,
};

/// Parsing a packet failed.
///
/// Either it is malformed, or it is not supported by rpld.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wire::Error")
    }
}

pub type Result<T> = core::result::Result<T, Error>;
