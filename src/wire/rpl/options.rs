use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};
use crate::wire::ipv6::{prefix_octets, Cidr, ADDR_SIZE};

/// A read/write wrapper around a RPL Control Message Option.
#[derive(Debug, Clone)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

enum_with_unknown! {
    pub enum OptionType(u8) {
        Pad1 = 0x00,
        PadN = 0x01,
        DagMetricContainer = 0x02,
        RouteInformation = 0x03,
        DodagConfiguration = 0x04,
        RplTarget = 0x05,
        TransitInformation = 0x06,
        SolicitedInformation = 0x07,
        PrefixInformation = 0x08,
        RplTargetDescriptor = 0x09,
    }
}

impl From<&Repr<'_>> for OptionType {
    fn from(repr: &Repr) -> Self {
        match repr {
            Repr::Pad1 => Self::Pad1,
            Repr::PadN(_) => Self::PadN,
            Repr::RouteInformation { .. } => Self::RouteInformation,
            Repr::RplTarget { .. } => Self::RplTarget,
            Repr::Unknown { option_type, .. } => Self::from(*option_type),
        }
    }
}

mod field {
    use crate::wire::field::*;

    // Generic fields.
    pub const TYPE: usize = 0;
    pub const LENGTH: usize = 1;

    // Route Information fields.
    pub const ROUTE_INFO_PREFIX_LENGTH: usize = 2;
    pub const ROUTE_INFO_PREFERENCE: usize = 3;
    pub const ROUTE_INFO_LIFETIME: Field = 4..8;
    pub const ROUTE_INFO_PREFIX: usize = 8;

    // RPL Target fields.
    pub const RPL_TARGET_FLAGS: usize = 2;
    pub const RPL_TARGET_PREFIX_LENGTH: usize = 3;
    pub const RPL_TARGET_PREFIX: usize = 4;
}

/// Getters for the RPL Control Message Options.
impl<T: AsRef<[u8]>> Packet<T> {
    /// Create a raw octet buffer with RPL Control Message Option structure.
    #[inline]
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    #[inline]
    pub fn new_checked(buffer: T) -> Result<Self> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    ///
    /// The declared option length must fit in the buffer, and the options
    /// `rpld` interprets must be long enough for their fixed fields and for
    /// the prefix length they announce.
    pub fn check_len(&self) -> Result<()> {
        let data = self.buffer.as_ref();
        if data.is_empty() {
            return Err(Error);
        }
        if self.option_type() == OptionType::Pad1 {
            return Ok(());
        }
        if data.len() <= field::LENGTH {
            return Err(Error);
        }

        let total = self.total_len();
        if data.len() < total {
            return Err(Error);
        }

        let prefix_fits = |start: usize, prefix_len: u8| {
            prefix_len <= 128
                && total >= start
                && total - start >= prefix_octets(prefix_len)
                && total - start <= ADDR_SIZE
        };

        match self.option_type() {
            OptionType::RouteInformation if total < field::ROUTE_INFO_PREFIX => Err(Error),
            OptionType::RouteInformation
                if !prefix_fits(field::ROUTE_INFO_PREFIX, self.prefix_length()) =>
            {
                Err(Error)
            }
            OptionType::RplTarget if total < field::RPL_TARGET_PREFIX => Err(Error),
            OptionType::RplTarget if !prefix_fits(field::RPL_TARGET_PREFIX, self.prefix_length()) => {
                Err(Error)
            }
            _ => Ok(()),
        }
    }

    /// Return the type field.
    #[inline]
    pub fn option_type(&self) -> OptionType {
        OptionType::from(self.buffer.as_ref()[field::TYPE])
    }

    /// Return the length field.
    #[inline]
    pub fn option_length(&self) -> u8 {
        self.buffer.as_ref()[field::LENGTH]
    }

    /// Return the number of octets the option occupies, type and length included.
    #[inline]
    pub fn total_len(&self) -> usize {
        match self.option_type() {
            OptionType::Pad1 => 1,
            _ => 2 + self.option_length() as usize,
        }
    }

    /// Return the data following the length field.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer.as_ref()[field::LENGTH + 1..self.total_len()]
    }

    /// Return the prefix length of a Route Information or RPL Target option;
    /// both carry it in the same octet.
    #[inline]
    fn prefix_length(&self) -> u8 {
        self.buffer.as_ref()[field::ROUTE_INFO_PREFIX_LENGTH]
    }
}

/// Getters for the Route Information Option.
///
/// ```txt
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Type = 0x03 | Option Length | Prefix Length |Resvd|Prf|Resvd|
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Route Lifetime                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// .                   Prefix (Variable Length)                    .
/// .                                                               .
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the Prefix Length field.
    #[inline]
    pub fn route_info_prefix_length(&self) -> u8 {
        self.buffer.as_ref()[field::ROUTE_INFO_PREFIX_LENGTH]
    }

    /// Return the Route Preference field.
    #[inline]
    pub fn route_info_route_preference(&self) -> u8 {
        (self.buffer.as_ref()[field::ROUTE_INFO_PREFERENCE] >> 3) & 0b11
    }

    /// Return the Route Lifetime field.
    #[inline]
    pub fn route_info_lifetime(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::ROUTE_INFO_LIFETIME])
    }

    /// Return the Prefix field.
    #[inline]
    pub fn route_info_prefix(&self) -> &[u8] {
        &self.buffer.as_ref()[field::ROUTE_INFO_PREFIX..self.total_len()]
    }
}

/// Setters for the Route Information Option.
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the Prefix Length field.
    #[inline]
    pub fn set_route_info_prefix_length(&mut self, value: u8) {
        self.buffer.as_mut()[field::ROUTE_INFO_PREFIX_LENGTH] = value;
    }

    /// Set the Route Preference field.
    #[inline]
    pub fn set_route_info_route_preference(&mut self, value: u8) {
        self.buffer.as_mut()[field::ROUTE_INFO_PREFERENCE] = (value & 0b11) << 3;
    }

    /// Set the Route Lifetime field.
    #[inline]
    pub fn set_route_info_lifetime(&mut self, value: u32) {
        NetworkEndian::write_u32(
            &mut self.buffer.as_mut()[field::ROUTE_INFO_LIFETIME],
            value,
        );
    }

    /// Set the prefix field.
    #[inline]
    pub fn set_route_info_prefix(&mut self, prefix: &[u8]) {
        self.buffer.as_mut()[field::ROUTE_INFO_PREFIX..][..prefix.len()].copy_from_slice(prefix);
    }
}

/// Getters for the RPL Target Option.
///
/// ```txt
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Type = 0x05 | Option Length |     Flags     | Prefix Length |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                                                               +
/// |                Target Prefix (Variable Length)                |
/// .                                                               .
/// .                                                               .
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the Target Prefix Length field.
    #[inline]
    pub fn target_prefix_length(&self) -> u8 {
        self.buffer.as_ref()[field::RPL_TARGET_PREFIX_LENGTH]
    }

    /// Return the Target Prefix field.
    #[inline]
    pub fn target_prefix(&self) -> &[u8] {
        &self.buffer.as_ref()[field::RPL_TARGET_PREFIX..self.total_len()]
    }
}

/// Setters for the RPL Target Option.
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Clear the Flags field.
    #[inline]
    pub fn clear_rpl_target_flags(&mut self) {
        self.buffer.as_mut()[field::RPL_TARGET_FLAGS] = 0;
    }

    /// Set the Target Prefix Length field.
    #[inline]
    pub fn set_rpl_target_prefix_length(&mut self, value: u8) {
        self.buffer.as_mut()[field::RPL_TARGET_PREFIX_LENGTH] = value;
    }

    /// Set the Target Prefix field.
    #[inline]
    pub fn set_rpl_target_prefix(&mut self, prefix: &[u8]) {
        self.buffer.as_mut()[field::RPL_TARGET_PREFIX..][..prefix.len()].copy_from_slice(prefix);
    }
}

/// Setters for the generic fields.
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the type field.
    #[inline]
    pub fn set_option_type(&mut self, option_type: OptionType) {
        self.buffer.as_mut()[field::TYPE] = option_type.into();
    }

    /// Set the length field.
    #[inline]
    pub fn set_option_length(&mut self, length: u8) {
        self.buffer.as_mut()[field::LENGTH] = length;
    }

    /// Zero the data following the length field.
    #[inline]
    pub fn clear_padn(&mut self, size: u8) {
        for b in &mut self.buffer.as_mut()[field::LENGTH + 1..][..size as usize] {
            *b = 0;
        }
    }

    /// Copy raw data after the length field.
    #[inline]
    pub fn set_data(&mut self, data: &[u8]) {
        self.buffer.as_mut()[field::LENGTH + 1..][..data.len()].copy_from_slice(data);
    }
}

/// The destination prefix a DODAG root advertises in its DIO.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RouteInformation {
    pub prefix: Cidr,
    pub preference: u8,
    pub lifetime: u32,
}

/// An address (or prefix) reachable through the sender of a DAO.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RplTarget {
    pub prefix: Cidr,
}

/// A high-level representation of a RPL Control Message Option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr<'p> {
    Pad1,
    PadN(u8),
    RouteInformation(RouteInformation),
    RplTarget(RplTarget),
    /// Any option rpld does not act on; skipped by its declared length.
    Unknown { option_type: u8, data: &'p [u8] },
}

impl core::fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Repr::Pad1 => write!(f, "Pad1"),
            Repr::PadN(n) => write!(f, "PadN({})", n),
            Repr::RouteInformation(RouteInformation {
                prefix,
                preference,
                lifetime,
            }) => write!(f, "ROUTE INFO Prefix={} Prf={} Lifetime={}", prefix, preference, lifetime),
            Repr::RplTarget(RplTarget { prefix }) => write!(f, "RPL Target Prefix={}", prefix),
            Repr::Unknown { option_type, data } => {
                write!(f, "Unknown({}) {} octets", option_type, data.len())
            }
        }
    }
}

impl<'p> Repr<'p> {
    /// Parse a RPL Control Message Option and return a high-level representation.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(packet: &Packet<&'p T>) -> Result<Self> {
        packet.check_len()?;
        let buffer: &'p T = packet.buffer;
        let buffer: &'p [u8] = buffer.as_ref();
        let total = packet.total_len();

        match packet.option_type() {
            OptionType::Pad1 => Ok(Repr::Pad1),
            OptionType::PadN => Ok(Repr::PadN(packet.option_length())),
            OptionType::RouteInformation => {
                let prefix_len = packet.route_info_prefix_length();
                let bytes = &buffer[field::ROUTE_INFO_PREFIX..total];
                Ok(Repr::RouteInformation(RouteInformation {
                    prefix: Cidr::from_prefix_bytes(bytes, prefix_len)?,
                    preference: packet.route_info_route_preference(),
                    lifetime: packet.route_info_lifetime(),
                }))
            }
            OptionType::RplTarget => {
                let prefix_len = packet.target_prefix_length();
                let bytes = &buffer[field::RPL_TARGET_PREFIX..total];
                Ok(Repr::RplTarget(RplTarget {
                    prefix: Cidr::from_prefix_bytes(bytes, prefix_len)?,
                }))
            }
            other => Ok(Repr::Unknown {
                option_type: other.into(),
                data: &buffer[field::LENGTH + 1..total],
            }),
        }
    }

    /// Return the length of an option that will be emitted from this high-level representation.
    pub fn buffer_len(&self) -> usize {
        match self {
            Repr::Pad1 => 1,
            Repr::PadN(size) => 2 + *size as usize,
            Repr::RouteInformation(RouteInformation { prefix, .. }) => {
                field::ROUTE_INFO_PREFIX + prefix_octets(prefix.prefix_len())
            }
            // Targets always carry the full address.
            Repr::RplTarget(_) => field::RPL_TARGET_PREFIX + ADDR_SIZE,
            Repr::Unknown { data, .. } => 2 + data.len(),
        }
    }

    /// Emit a high-level representation into a RPL Control Message Option.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]> + ?Sized>(&self, packet: &mut Packet<&mut T>) {
        let option_type: OptionType = self.into();
        packet.set_option_type(option_type);
        if let Repr::Pad1 = self {
            return;
        }
        packet.set_option_length((self.buffer_len() - 2) as u8);

        match self {
            Repr::Pad1 => {}
            Repr::PadN(size) => packet.clear_padn(*size),
            Repr::RouteInformation(RouteInformation {
                prefix,
                preference,
                lifetime,
            }) => {
                packet.set_route_info_prefix_length(prefix.prefix_len());
                packet.set_route_info_route_preference(*preference);
                packet.set_route_info_lifetime(*lifetime);
                packet.set_route_info_prefix(&prefix.prefix_bytes());
            }
            Repr::RplTarget(RplTarget { prefix }) => {
                packet.clear_rpl_target_flags();
                packet.set_rpl_target_prefix_length(prefix.prefix_len());
                packet.set_rpl_target_prefix(&prefix.address().octets());
            }
            Repr::Unknown { data, .. } => packet.set_data(data),
        }
    }
}

/// A iterator for RPL options.
#[derive(Debug)]
pub struct OptionsIterator<'a> {
    pos: usize,
    length: usize,
    data: &'a [u8],
    hit_error: bool,
}

impl<'a> OptionsIterator<'a> {
    /// Create a new `OptionsIterator`, used to iterate over the
    /// options contained in a RPL control message.
    pub fn new(data: &'a [u8]) -> Self {
        let length = data.len();
        Self {
            pos: 0,
            hit_error: false,
            length,
            data,
        }
    }
}

impl<'a> Iterator for OptionsIterator<'a> {
    type Item = Result<Repr<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.length && !self.hit_error {
            // If we still have data to parse and we have not previously
            // hit an error, attempt to parse the next option.
            match Packet::new_checked(&self.data[self.pos..]) {
                Ok(hdr) => match Repr::parse(&hdr) {
                    Ok(repr) => {
                        // Advance by the declared length, not by what we understood.
                        self.pos += hdr.total_len();
                        Some(Ok(repr))
                    }
                    Err(e) => {
                        self.hit_error = true;
                        Some(Err(e))
                    }
                },
                Err(e) => {
                    self.hit_error = true;
                    Some(Err(e))
                }
            }
        } else {
            // If we failed to parse a previous option or hit the end of the
            // buffer, we do not continue to iterate.
            None
        }
    }
}
