//! Implementation of the RPL packet formats. See [RFC 6550 § 6].
//!
//! [RFC 6550 § 6]: https://datatracker.ietf.org/doc/html/rfc6550#section-6

use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};
use crate::config::RPL_MAX_OPTIONS;
use crate::wire::icmpv6::{Message, Packet};
use crate::wire::ipv6::{Address, AddressExt};

pub mod instance_id;
pub mod options;

pub use instance_id::InstanceId;

mod field {
    use crate::wire::field::*;

    pub const RPL_INSTANCE_ID: usize = 4;

    // DODAG information solicitation fields (DIS)
    pub const DIS_FLAGS: usize = 4;
    pub const DIS_RESERVED: usize = 5;
    pub const DIS_END: usize = 6;

    // DODAG information object fields (DIO)
    pub const DIO_VERSION_NUMBER: usize = 5;
    pub const DIO_RANK: Field = 6..8;
    pub const DIO_GROUNDED: usize = 8;
    pub const DIO_MOP: usize = 8;
    pub const DIO_PRF: usize = 8;
    pub const DIO_DTSN: usize = 9;
    pub const DIO_FLAGS: usize = 10;
    pub const DIO_RESERVED: usize = 11;
    pub const DIO_DODAG_ID: Field = 12..12 + 16;

    // Destination advertisement object (DAO)
    pub const DAO_FLAGS: usize = 5;
    pub const DAO_RESERVED: usize = 6;
    pub const DAO_SEQUENCE: usize = 7;
    pub const DAO_DODAG_ID: Field = 8..8 + 16;

    // Destination advertisement object ack (DAO-ACK)
    pub const DAO_ACK_FLAGS: usize = 5;
    pub const DAO_ACK_RESERVED: usize = 6;
    pub const DAO_ACK_SEQUENCE: usize = 7;
    pub const DAO_ACK_STATUS: usize = 8;
    pub const DAO_ACK_DODAG_ID: Field = 9..9 + 16;
}

enum_with_unknown! {
    /// RPL Control Message subtypes.
    pub enum RplControlMessage(u8) {
        DodagInformationSolicitation = 0x00,
        DodagInformationObject = 0x01,
        DestinationAdvertisementObject = 0x02,
        DestinationAdvertisementObjectAck = 0x03,
        SecureDodagInformationSolicitation = 0x80,
        SecureDodagInformationObject = 0x81,
        SecureDestinationAdvertisementObject = 0x82,
        SecureDestinationAdvertisementObjectAck = 0x83,
        ConsistencyCheck = 0x8a,
    }
}

impl core::fmt::Display for RplControlMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RplControlMessage::DodagInformationSolicitation => write!(f, "DIS"),
            RplControlMessage::DodagInformationObject => write!(f, "DIO"),
            RplControlMessage::DestinationAdvertisementObject => write!(f, "DAO"),
            RplControlMessage::DestinationAdvertisementObjectAck => write!(f, "DAO-ACK"),
            RplControlMessage::SecureDodagInformationSolicitation => write!(f, "secure DIS"),
            RplControlMessage::SecureDodagInformationObject => write!(f, "secure DIO"),
            RplControlMessage::SecureDestinationAdvertisementObject => write!(f, "secure DAO"),
            RplControlMessage::SecureDestinationAdvertisementObjectAck => {
                write!(f, "secure DAO-ACK")
            }
            RplControlMessage::ConsistencyCheck => write!(f, "consistency check"),
            RplControlMessage::Unknown(id) => write!(f, "0x{:02x}", id),
        }
    }
}

impl RplControlMessage {
    /// Whether rpld knows how to decode this message.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            RplControlMessage::DodagInformationSolicitation
                | RplControlMessage::DodagInformationObject
                | RplControlMessage::DestinationAdvertisementObject
                | RplControlMessage::DestinationAdvertisementObjectAck
        )
    }
}

bitflags! {
    /// Flags of a DAO message.
    pub struct DaoFlags: u8 {
        /// The sender expects a DAO-ACK.
        const ACK_REQUEST = 0b1000_0000;
        /// The DODAGID field is present.
        const DODAG_ID_PRESENT = 0b0100_0000;
    }
}

bitflags! {
    /// Flags of a DAO-ACK message.
    pub struct DaoAckFlags: u8 {
        /// Echoes the request of the acknowledged DAO.
        const ACK_REQUEST = 0b1000_0000;
        /// The DODAGID field is present.
        const DODAG_ID_PRESENT = 0b0100_0000;
    }
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the RPL instance ID.
    #[inline]
    pub fn rpl_instance_id(&self) -> InstanceId {
        InstanceId::from(self.buffer.as_ref()[field::RPL_INSTANCE_ID])
    }

    /// Return the RPL control message code.
    #[inline]
    pub fn rpl_control_message(&self) -> RplControlMessage {
        RplControlMessage::from(self.msg_code())
    }

    /// Ensure that the fixed part of the RPL message fits in the buffer.
    ///
    /// Returns `Err(Error)` for codes rpld does not decode.
    pub fn check_rpl_len(&self) -> Result<()> {
        self.check_len()?;
        let len = self.buffer.as_ref().len();
        let end = match self.rpl_control_message() {
            RplControlMessage::DodagInformationSolicitation => field::DIS_END,
            RplControlMessage::DodagInformationObject => field::DIO_DODAG_ID.end,
            RplControlMessage::DestinationAdvertisementObject => {
                if len <= field::DAO_FLAGS {
                    return Err(Error);
                }
                if self.dao_flags().contains(DaoFlags::DODAG_ID_PRESENT) {
                    field::DAO_DODAG_ID.end
                } else {
                    field::DAO_SEQUENCE + 1
                }
            }
            RplControlMessage::DestinationAdvertisementObjectAck => {
                if len <= field::DAO_ACK_FLAGS {
                    return Err(Error);
                }
                if self.dao_ack_flags().contains(DaoAckFlags::DODAG_ID_PRESENT) {
                    field::DAO_ACK_DODAG_ID.end
                } else {
                    field::DAO_ACK_STATUS + 1
                }
            }
            _ => return Err(Error),
        };

        if len < end {
            Err(Error)
        } else {
            Ok(())
        }
    }

    /// Return the offset at which the options start.
    ///
    /// Only meaningful after [check_rpl_len](#method.check_rpl_len) succeeded.
    fn options_offset(&self) -> usize {
        match self.rpl_control_message() {
            RplControlMessage::DodagInformationSolicitation => field::DIS_END,
            RplControlMessage::DodagInformationObject => field::DIO_DODAG_ID.end,
            RplControlMessage::DestinationAdvertisementObject
                if self.dao_flags().contains(DaoFlags::DODAG_ID_PRESENT) =>
            {
                field::DAO_DODAG_ID.end
            }
            RplControlMessage::DestinationAdvertisementObject => field::DAO_SEQUENCE + 1,
            RplControlMessage::DestinationAdvertisementObjectAck
                if self.dao_ack_flags().contains(DaoAckFlags::DODAG_ID_PRESENT) =>
            {
                field::DAO_ACK_DODAG_ID.end
            }
            _ => field::DAO_ACK_STATUS + 1,
        }
    }
}

impl<'p, T: AsRef<[u8]> + ?Sized> Packet<&'p T> {
    /// Return a pointer to the options.
    pub fn options(&self) -> Result<&'p [u8]> {
        self.check_rpl_len()?;
        let buffer: &'p T = self.buffer;
        let buffer: &'p [u8] = buffer.as_ref();
        Ok(&buffer[self.options_offset()..])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the RPL Instance ID field.
    #[inline]
    pub fn set_rpl_instance_id(&mut self, value: InstanceId) {
        self.buffer.as_mut()[field::RPL_INSTANCE_ID] = value.into();
    }

    /// Return a mutable pointer to the options.
    ///
    /// The code and flags must have been written before.
    pub fn options_mut(&mut self) -> &mut [u8] {
        let offset = self.options_offset();
        &mut self.buffer.as_mut()[offset..]
    }
}

/// Getters for the DODAG information solicitation (DIS) message.
///
/// ```txt
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Flags     |   Reserved    |   Option(s)...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the DIS flags field.
    #[inline]
    pub fn dis_flags(&self) -> u8 {
        self.buffer.as_ref()[field::DIS_FLAGS]
    }
}

/// Setters for the DODAG information solicitation (DIS) message.
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Clear the DIS flags and reserved fields.
    pub fn clear_dis_flags(&mut self) {
        let data = self.buffer.as_mut();
        data[field::DIS_FLAGS] = 0;
        data[field::DIS_RESERVED] = 0;
    }
}

enum_with_unknown! {
    pub enum ModeOfOperation(u8) {
        NoDownwardRoutesMaintained = 0x00,
        NonStoringMode = 0x01,
        StoringModeWithoutMulticast = 0x02,
        StoringModeWithMulticast = 0x03,
    }
}

impl Default for ModeOfOperation {
    fn default() -> Self {
        Self::StoringModeWithoutMulticast
    }
}

/// Getters for the DODAG information object (DIO) message.
///
/// ```txt
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | RPLInstanceID |Version Number |             Rank              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |G|0| MOP | Prf |     DTSN      |     Flags     |   Reserved    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                                                               +
/// |                                                               |
/// +                            DODAGID                            +
/// |                                                               |
/// +                                                               +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Option(s)...
/// +-+-+-+-+-+-+-+-+
/// ```
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the Version Number field.
    #[inline]
    pub fn dio_version_number(&self) -> u8 {
        self.buffer.as_ref()[field::DIO_VERSION_NUMBER]
    }

    /// Return the Rank field.
    #[inline]
    pub fn dio_rank(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DIO_RANK])
    }

    /// Return the value of the Grounded flag.
    #[inline]
    pub fn dio_grounded(&self) -> bool {
        (self.buffer.as_ref()[field::DIO_GROUNDED] >> 7) & 0b1 == 0b1
    }

    /// Return the mode of operation field.
    #[inline]
    pub fn dio_mode_of_operation(&self) -> ModeOfOperation {
        ModeOfOperation::from((self.buffer.as_ref()[field::DIO_MOP] >> 3) & 0b111)
    }

    /// Return the DODAG preference field.
    #[inline]
    pub fn dio_dodag_preference(&self) -> u8 {
        self.buffer.as_ref()[field::DIO_PRF] & 0b111
    }

    /// Return the destination advertisement trigger sequence number.
    #[inline]
    pub fn dio_dest_adv_trigger_seq_number(&self) -> u8 {
        self.buffer.as_ref()[field::DIO_DTSN]
    }

    /// Return the DODAG id, which is an IPv6 address.
    #[inline]
    pub fn dio_dodag_id(&self) -> Address {
        Address::from_bytes(&self.buffer.as_ref()[field::DIO_DODAG_ID])
    }
}

/// Setters for the DODAG information object (DIO) message.
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the Version Number field.
    #[inline]
    pub fn set_dio_version_number(&mut self, value: u8) {
        self.buffer.as_mut()[field::DIO_VERSION_NUMBER] = value;
    }

    /// Set the Rank field.
    #[inline]
    pub fn set_dio_rank(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::DIO_RANK], value);
    }

    /// Set the Grounded flag, the mode of operation and the DODAG preference.
    #[inline]
    pub fn set_dio_flags(&mut self, grounded: bool, mode: ModeOfOperation, preference: u8) {
        let raw = ((grounded as u8) << 7) | ((u8::from(mode) & 0b111) << 3) | (preference & 0b111);
        self.buffer.as_mut()[field::DIO_GROUNDED] = raw;
    }

    /// Set the destination advertisement trigger sequence number.
    #[inline]
    pub fn set_dio_dest_adv_trigger_seq_number(&mut self, value: u8) {
        self.buffer.as_mut()[field::DIO_DTSN] = value;
    }

    /// Clear the DIO flags and reserved fields.
    #[inline]
    pub fn clear_dio_reserved(&mut self) {
        let data = self.buffer.as_mut();
        data[field::DIO_FLAGS] = 0;
        data[field::DIO_RESERVED] = 0;
    }

    /// Set the DODAG id, which is an IPv6 address.
    #[inline]
    pub fn set_dio_dodag_id(&mut self, address: Address) {
        self.buffer.as_mut()[field::DIO_DODAG_ID].copy_from_slice(&address.octets());
    }
}

/// Getters for the Destination Advertisement Object (DAO) message.
///
/// ```txt
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | RPLInstanceID |K|D|   Flags   |   Reserved    | DAOSequence   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                                                               +
/// |                                                               |
/// +                            DODAGID*                           +
/// |                                                               |
/// +                                                               +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Option(s)...
/// +-+-+-+-+-+-+-+-+
/// ```
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the DAO flags.
    #[inline]
    pub fn dao_flags(&self) -> DaoFlags {
        DaoFlags::from_bits_truncate(self.buffer.as_ref()[field::DAO_FLAGS])
    }

    /// Return the DAO sequence number.
    #[inline]
    pub fn dao_sequence(&self) -> u8 {
        self.buffer.as_ref()[field::DAO_SEQUENCE]
    }

    /// Return the DODAG ID, an IPv6 address, when it is present.
    #[inline]
    pub fn dao_dodag_id(&self) -> Option<Address> {
        if self.dao_flags().contains(DaoFlags::DODAG_ID_PRESENT) {
            Some(Address::from_bytes(
                &self.buffer.as_ref()[field::DAO_DODAG_ID],
            ))
        } else {
            None
        }
    }
}

/// Setters for the Destination Advertisement Object (DAO) message.
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the DAO flags, clearing the reserved field.
    #[inline]
    pub fn set_dao_flags(&mut self, flags: DaoFlags) {
        let data = self.buffer.as_mut();
        data[field::DAO_FLAGS] = flags.bits();
        data[field::DAO_RESERVED] = 0;
    }

    /// Set the DAO sequence number.
    #[inline]
    pub fn set_dao_sequence(&mut self, value: u8) {
        self.buffer.as_mut()[field::DAO_SEQUENCE] = value;
    }

    /// Set the DODAG ID.
    #[inline]
    pub fn set_dao_dodag_id(&mut self, address: Address) {
        self.buffer.as_mut()[field::DAO_DODAG_ID].copy_from_slice(&address.octets());
    }
}

/// Getters for the Destination Advertisement Object acknowledgement (DAO-ACK) message.
///
/// Unlike [RFC 6550 § 6.5] this layout keeps a reserved octet after the
/// flags, so the DODAGID starts at octet 9 of the ICMPv6 message:
///
/// [RFC 6550 § 6.5]: https://datatracker.ietf.org/doc/html/rfc6550#section-6.5
///
/// ```txt
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | RPLInstanceID |K|D|   Flags   |   Reserved    |  DAOSequence  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    Status     |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// |                            DODAGID*                           |
/// .                                                               .
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the DAO-ACK flags.
    #[inline]
    pub fn dao_ack_flags(&self) -> DaoAckFlags {
        DaoAckFlags::from_bits_truncate(self.buffer.as_ref()[field::DAO_ACK_FLAGS])
    }

    /// Return the acknowledged DAO sequence number.
    #[inline]
    pub fn dao_ack_sequence(&self) -> u8 {
        self.buffer.as_ref()[field::DAO_ACK_SEQUENCE]
    }

    /// Return the DAO-ACK status field.
    #[inline]
    pub fn dao_ack_status(&self) -> u8 {
        self.buffer.as_ref()[field::DAO_ACK_STATUS]
    }

    /// Returns the DODAG ID, an IPv6 address, when it is present.
    #[inline]
    pub fn dao_ack_dodag_id(&self) -> Option<Address> {
        if self.dao_ack_flags().contains(DaoAckFlags::DODAG_ID_PRESENT) {
            Some(Address::from_bytes(
                &self.buffer.as_ref()[field::DAO_ACK_DODAG_ID],
            ))
        } else {
            None
        }
    }
}

/// Setters for the Destination Advertisement Object acknowledgement (DAO-ACK) message.
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the DAO-ACK flags, clearing the reserved field.
    #[inline]
    pub fn set_dao_ack_flags(&mut self, flags: DaoAckFlags) {
        let data = self.buffer.as_mut();
        data[field::DAO_ACK_FLAGS] = flags.bits();
        data[field::DAO_ACK_RESERVED] = 0;
    }

    /// Set the acknowledged DAO sequence number.
    #[inline]
    pub fn set_dao_ack_sequence(&mut self, value: u8) {
        self.buffer.as_mut()[field::DAO_ACK_SEQUENCE] = value;
    }

    /// Set the DAO-ACK status field.
    #[inline]
    pub fn set_dao_ack_status(&mut self, value: u8) {
        self.buffer.as_mut()[field::DAO_ACK_STATUS] = value;
    }

    /// Set the DODAG ID.
    #[inline]
    pub fn set_dao_ack_dodag_id(&mut self, address: Address) {
        self.buffer.as_mut()[field::DAO_ACK_DODAG_ID].copy_from_slice(&address.octets());
    }
}

/// The options of a RPL control message.
///
/// A parsed message borrows its options from the datagram, so it may carry
/// any number of them; they were all decoded once by [RplOptions::parse].
/// A message being built holds up to `RPL_MAX_OPTIONS` of them.
#[derive(Debug, Clone)]
pub struct RplOptions<'p> {
    inner: OptionsInner<'p>,
}

#[derive(Debug, Clone)]
enum OptionsInner<'p> {
    Wire(&'p [u8]),
    List(heapless::Vec<options::Repr<'p>, RPL_MAX_OPTIONS>),
}

impl<'p> RplOptions<'p> {
    pub const fn new() -> Self {
        RplOptions {
            inner: OptionsInner::List(heapless::Vec::new()),
        }
    }

    /// Decode every option in `data`. Fails on the first malformed one.
    pub fn parse(data: &'p [u8]) -> Result<Self> {
        for opt in options::OptionsIterator::new(data) {
            opt?;
        }
        Ok(RplOptions {
            inner: OptionsInner::Wire(data),
        })
    }

    /// Append an option to a message being built.
    ///
    /// Returns the option back if the list is full or the options were parsed.
    pub fn push(
        &mut self,
        option: options::Repr<'p>,
    ) -> core::result::Result<(), options::Repr<'p>> {
        match &mut self.inner {
            OptionsInner::List(list) => list.push(option),
            OptionsInner::Wire(_) => Err(option),
        }
    }

    pub fn iter(&self) -> OptionsIter<'_, 'p> {
        match &self.inner {
            OptionsInner::Wire(data) => OptionsIter::Wire(options::OptionsIterator::new(*data)),
            OptionsInner::List(list) => OptionsIter::List(list.iter()),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        match &self.inner {
            OptionsInner::Wire(data) => data.is_empty(),
            OptionsInner::List(list) => list.is_empty(),
        }
    }

    /// Return the length of the encoded options.
    pub fn buffer_len(&self) -> usize {
        match &self.inner {
            OptionsInner::Wire(data) => data.len(),
            OptionsInner::List(list) => list.iter().map(|o| o.buffer_len()).sum(),
        }
    }

    fn emit(&self, mut buffer: &mut [u8]) {
        match &self.inner {
            OptionsInner::Wire(data) => buffer[..data.len()].copy_from_slice(data),
            OptionsInner::List(list) => {
                for opt in list {
                    let len = opt.buffer_len();
                    opt.emit(&mut options::Packet::new_unchecked(&mut buffer[..len]));
                    buffer = &mut buffer[len..];
                }
            }
        }
    }
}

impl Default for RplOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for RplOptions<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for RplOptions<'_> {}

/// Iterator over [RplOptions].
#[derive(Debug)]
pub enum OptionsIter<'a, 'p> {
    Wire(options::OptionsIterator<'p>),
    List(core::slice::Iter<'a, options::Repr<'p>>),
}

impl<'p> Iterator for OptionsIter<'_, 'p> {
    type Item = options::Repr<'p>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            // Validated by RplOptions::parse.
            OptionsIter::Wire(iter) => iter.next().and_then(|opt| opt.ok()),
            OptionsIter::List(iter) => iter.next().copied(),
        }
    }
}

/// A high-level representation of a RPL control packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Repr<'p> {
    DodagInformationSolicitation(DodagInformationSolicitation<'p>),
    DodagInformationObject(DodagInformationObject<'p>),
    DestinationAdvertisementObject(DestinationAdvertisementObject<'p>),
    DestinationAdvertisementObjectAck(DestinationAdvertisementObjectAck),
}

/// A high-level representation of a RPL DODAG Information Solicitation (DIS).
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct DodagInformationSolicitation<'p> {
    pub options: RplOptions<'p>,
}

/// A high-level representation of a RPL DODAG Information Object (DIO).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DodagInformationObject<'p> {
    pub rpl_instance_id: InstanceId,
    pub version_number: u8,
    pub rank: u16,
    pub grounded: bool,
    pub mode_of_operation: ModeOfOperation,
    pub dodag_preference: u8,
    pub dtsn: u8,
    pub dodag_id: Address,
    pub options: RplOptions<'p>,
}

/// A high-level representation of a RPL Destination Advertisement Object (DAO).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DestinationAdvertisementObject<'p> {
    pub rpl_instance_id: InstanceId,
    pub expect_ack: bool,
    pub sequence: u8,
    pub dodag_id: Option<Address>,
    pub options: RplOptions<'p>,
}

/// A high-level representation of a RPL Destination Advertisement Object Acknowledgement
/// (DAO-ACK).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DestinationAdvertisementObjectAck {
    pub rpl_instance_id: InstanceId,
    pub sequence: u8,
    pub status: u8,
    pub dodag_id: Option<Address>,
}

impl DestinationAdvertisementObjectAck {
    /// Status values of 128 and above reject the DAO.
    pub fn is_rejection(&self) -> bool {
        self.status >= 128
    }
}

impl core::fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Repr::DodagInformationSolicitation(DodagInformationSolicitation { options }) => {
                write!(f, "DIS options={}", options.len())
            }
            Repr::DodagInformationObject(dio) => write!(
                f,
                "DIO IID={} V={} R={} G={} MOP={:?} Pref={} DTSN={} DODAGID={}",
                dio.rpl_instance_id,
                dio.version_number,
                dio.rank,
                dio.grounded,
                dio.mode_of_operation,
                dio.dodag_preference,
                dio.dtsn,
                dio.dodag_id
            ),
            Repr::DestinationAdvertisementObject(dao) => write!(
                f,
                "DAO IID={} Ack={} Seq={} DODAGID={:?} options={}",
                dao.rpl_instance_id,
                dao.expect_ack,
                dao.sequence,
                dao.dodag_id,
                dao.options.len()
            ),
            Repr::DestinationAdvertisementObjectAck(ack) => write!(
                f,
                "DAO-ACK IID={} Seq={} Status={} DODAGID={:?}",
                ack.rpl_instance_id, ack.sequence, ack.status, ack.dodag_id
            ),
        }
    }
}

impl<'p> Repr<'p> {
    /// Parse a RPL packet and return a high-level representation.
    ///
    /// All options are decoded before anything is returned; a single
    /// malformed option fails the whole message.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(packet: &Packet<&'p T>) -> Result<Self> {
        if packet.msg_type() != Message::RplControl {
            return Err(Error);
        }
        let data = packet.options()?;

        let options = RplOptions::parse(data)?;

        match packet.rpl_control_message() {
            RplControlMessage::DodagInformationSolicitation => Ok(
                Repr::DodagInformationSolicitation(DodagInformationSolicitation { options }),
            ),
            RplControlMessage::DodagInformationObject => {
                Ok(Repr::DodagInformationObject(DodagInformationObject {
                    rpl_instance_id: packet.rpl_instance_id(),
                    version_number: packet.dio_version_number(),
                    rank: packet.dio_rank(),
                    grounded: packet.dio_grounded(),
                    mode_of_operation: packet.dio_mode_of_operation(),
                    dodag_preference: packet.dio_dodag_preference(),
                    dtsn: packet.dio_dest_adv_trigger_seq_number(),
                    dodag_id: packet.dio_dodag_id(),
                    options,
                }))
            }
            RplControlMessage::DestinationAdvertisementObject => Ok(
                Repr::DestinationAdvertisementObject(DestinationAdvertisementObject {
                    rpl_instance_id: packet.rpl_instance_id(),
                    expect_ack: packet.dao_flags().contains(DaoFlags::ACK_REQUEST),
                    sequence: packet.dao_sequence(),
                    dodag_id: packet.dao_dodag_id(),
                    options,
                }),
            ),
            RplControlMessage::DestinationAdvertisementObjectAck => Ok(
                Repr::DestinationAdvertisementObjectAck(DestinationAdvertisementObjectAck {
                    rpl_instance_id: packet.rpl_instance_id(),
                    sequence: packet.dao_ack_sequence(),
                    status: packet.dao_ack_status(),
                    dodag_id: packet.dao_ack_dodag_id(),
                }),
            ),
            // check_rpl_len() rejected everything else.
            _ => Err(Error),
        }
    }

    fn options(&self) -> Option<&RplOptions<'p>> {
        match self {
            Repr::DodagInformationSolicitation(DodagInformationSolicitation { options })
            | Repr::DodagInformationObject(DodagInformationObject { options, .. })
            | Repr::DestinationAdvertisementObject(DestinationAdvertisementObject {
                options,
                ..
            }) => Some(options),
            Repr::DestinationAdvertisementObjectAck(_) => None,
        }
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    /// The length also contains the lengths of the emitted options.
    pub fn buffer_len(&self) -> usize {
        let header = match self {
            Repr::DodagInformationSolicitation(_) => field::DIS_END,
            Repr::DodagInformationObject(_) => field::DIO_DODAG_ID.end,
            Repr::DestinationAdvertisementObject(DestinationAdvertisementObject {
                dodag_id: Some(_),
                ..
            }) => field::DAO_DODAG_ID.end,
            Repr::DestinationAdvertisementObject(_) => field::DAO_SEQUENCE + 1,
            Repr::DestinationAdvertisementObjectAck(DestinationAdvertisementObjectAck {
                dodag_id: Some(_),
                ..
            }) => field::DAO_ACK_DODAG_ID.end,
            Repr::DestinationAdvertisementObjectAck(_) => field::DAO_ACK_STATUS + 1,
        };

        header + self.options().map_or(0, |options| options.buffer_len())
    }

    /// Emit a high-level representation into an ICMPv6 packet. This also emits the options the
    /// high-level representation contains.
    ///
    /// The checksum is left zero for the kernel to fill in.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]> + ?Sized>(&self, packet: &mut Packet<&mut T>) {
        packet.set_msg_type(Message::RplControl);
        packet.set_checksum(0);

        match self {
            Repr::DodagInformationSolicitation(_) => {
                packet.set_msg_code(RplControlMessage::DodagInformationSolicitation.into());
                packet.clear_dis_flags();
            }
            Repr::DodagInformationObject(dio) => {
                packet.set_msg_code(RplControlMessage::DodagInformationObject.into());
                packet.set_rpl_instance_id(dio.rpl_instance_id);
                packet.set_dio_version_number(dio.version_number);
                packet.set_dio_rank(dio.rank);
                packet.set_dio_flags(dio.grounded, dio.mode_of_operation, dio.dodag_preference);
                packet.set_dio_dest_adv_trigger_seq_number(dio.dtsn);
                packet.clear_dio_reserved();
                packet.set_dio_dodag_id(dio.dodag_id);
            }
            Repr::DestinationAdvertisementObject(dao) => {
                let mut flags = DaoFlags::empty();
                flags.set(DaoFlags::ACK_REQUEST, dao.expect_ack);
                flags.set(DaoFlags::DODAG_ID_PRESENT, dao.dodag_id.is_some());

                packet.set_msg_code(RplControlMessage::DestinationAdvertisementObject.into());
                packet.set_rpl_instance_id(dao.rpl_instance_id);
                packet.set_dao_flags(flags);
                packet.set_dao_sequence(dao.sequence);
                if let Some(dodag_id) = dao.dodag_id {
                    packet.set_dao_dodag_id(dodag_id);
                }
            }
            Repr::DestinationAdvertisementObjectAck(ack) => {
                let flags = if ack.dodag_id.is_some() {
                    DaoAckFlags::ACK_REQUEST | DaoAckFlags::DODAG_ID_PRESENT
                } else {
                    DaoAckFlags::empty()
                };

                packet.set_msg_code(RplControlMessage::DestinationAdvertisementObjectAck.into());
                packet.set_rpl_instance_id(ack.rpl_instance_id);
                packet.set_dao_ack_flags(flags);
                packet.set_dao_ack_sequence(ack.sequence);
                packet.set_dao_ack_status(ack.status);
                if let Some(dodag_id) = ack.dodag_id {
                    packet.set_dao_ack_dodag_id(dodag_id);
                }
            }
        }

        if let Some(options) = self.options() {
            options.emit(packet.options_mut());
        }
    }
}
