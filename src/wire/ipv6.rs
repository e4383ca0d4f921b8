#![deny(missing_docs)]

//! IPv6 addresses and CIDR prefixes.

use core::fmt;
use core::str::FromStr;

use super::{Error, Result};

/// Size of IPv6 adderess in octets.
///
/// [RFC 8200 § 2]: https://www.rfc-editor.org/rfc/rfc4291#section-2
pub const ADDR_SIZE: usize = 16;

/// The link-local [all RPL nodes multicast address].
///
/// [all RPL nodes multicast address]: https://www.rfc-editor.org/rfc/rfc6550.html#section-20.19
pub const LINK_LOCAL_ALL_RPL_NODES: Address = Address::new(0xff02, 0, 0, 0, 0, 0, 0, 0x1a);

/// Prefix length stateless address autoconfiguration operates on.
pub const SLAAC_PREFIX_LEN: u8 = 64;

pub use core::net::Ipv6Addr as Address;

/// Helpers `rpld` needs on top of [core::net::Ipv6Addr].
pub trait AddressExt {
    /// Construct an IPv6 address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not sixteen octets long.
    fn from_bytes(data: &[u8]) -> Address;

    /// Query whether the IPv6 address is an unicast address.
    ///
    /// `x_` prefix is to avoid a collision with the still-unstable method in `core::ip`.
    fn x_is_unicast(&self) -> bool;

    /// Query whether the IPv6 address is a [link-local unicast address].
    ///
    /// [link-local unicast address]: https://tools.ietf.org/html/rfc4291#section-2.5.6
    fn is_link_local(&self) -> bool;

    /// Query whether the IPv6 address is a [Unique Local Address] (ULA).
    ///
    /// [Unique Local Address]: https://tools.ietf.org/html/rfc4193
    fn x_is_unique_local(&self) -> bool;

    /// Helper function used to mask an address given a prefix.
    ///
    /// # Panics
    /// This function panics if `mask` is greater than 128.
    fn mask(&self, mask: u8) -> [u8; ADDR_SIZE];
}

impl AddressExt for Address {
    fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; ADDR_SIZE];
        bytes.copy_from_slice(data);
        Address::from(bytes)
    }

    fn x_is_unicast(&self) -> bool {
        !(self.is_multicast() || self.is_unspecified())
    }

    fn is_link_local(&self) -> bool {
        self.octets()[0..8] == [0xfe, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    }

    fn x_is_unique_local(&self) -> bool {
        (self.octets()[0] & 0b1111_1110) == 0xfc
    }

    fn mask(&self, mask: u8) -> [u8; ADDR_SIZE] {
        assert!(mask <= 128);
        let mut bytes = [0u8; ADDR_SIZE];
        let idx = (mask as usize) / 8;
        let modulus = (mask as usize) % 8;
        let octets = self.octets();
        let (first, second) = octets.split_at(idx);
        bytes[0..idx].copy_from_slice(first);
        if idx < ADDR_SIZE {
            let part = second[0];
            bytes[idx] = part & (!(0xff >> modulus) as u8);
        }
        bytes
    }
}

/// Number of octets needed to carry a prefix of `prefix_len` bits.
pub const fn prefix_octets(prefix_len: u8) -> usize {
    (prefix_len as usize).div_ceil(8)
}

/// Derive a modified EUI-64 interface identifier from a link-layer address.
///
/// An eight-octet (IEEE 802.15.4 extended) address is used as is; a six-octet
/// (Ethernet) address is expanded by inserting `ff:fe`. In both cases the
/// universal/local bit is inverted. Other lengths have no identifier.
pub fn interface_id(link_addr: &[u8]) -> Option<[u8; 8]> {
    let mut id = [0u8; 8];
    match link_addr.len() {
        8 => id.copy_from_slice(link_addr),
        6 => {
            id[0..3].copy_from_slice(&link_addr[0..3]);
            id[3] = 0xff;
            id[4] = 0xfe;
            id[5..8].copy_from_slice(&link_addr[3..6]);
        }
        _ => return None,
    }
    id[0] ^= 0x02;
    Some(id)
}

/// A specification of an IPv6 CIDR block, containing an address and a variable-length
/// subnet masking prefix length.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct Cidr {
    address: Address,
    prefix_len: u8,
}

impl Cidr {
    /// Create an IPv6 CIDR block from the given address and prefix length.
    ///
    /// # Panics
    /// This function panics if the prefix length is larger than 128.
    pub const fn new(address: Address, prefix_len: u8) -> Cidr {
        assert!(prefix_len <= 128);
        Cidr {
            address,
            prefix_len,
        }
    }

    /// Create a CIDR block from the leading octets of a prefix, as carried on
    /// the wire. Octets missing from `bytes` are zero.
    pub fn from_prefix_bytes(bytes: &[u8], prefix_len: u8) -> Result<Cidr> {
        if prefix_len > 128 || bytes.len() > ADDR_SIZE || bytes.len() < prefix_octets(prefix_len)
        {
            return Err(Error);
        }
        let mut octets = [0u8; ADDR_SIZE];
        octets[..bytes.len()].copy_from_slice(bytes);
        Ok(Cidr::new(Address::from(octets), prefix_len))
    }

    /// Return the address of this IPv6 CIDR block.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Return the prefix length of this IPv6 CIDR block.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Return the masked prefix, truncated to the octets the prefix length covers.
    pub fn prefix_bytes(&self) -> heapless::Vec<u8, ADDR_SIZE> {
        let masked = self.address.mask(self.prefix_len);
        let mut bytes = heapless::Vec::new();
        // Never longer than ADDR_SIZE.
        let _ = bytes.extend_from_slice(&masked[..prefix_octets(self.prefix_len)]);
        bytes
    }

    /// Query whether the subnetwork described by this IPv6 CIDR block contains
    /// the given address.
    pub fn contains_addr(&self, addr: &Address) -> bool {
        // right shift by 128 is not legal
        if self.prefix_len == 0 {
            return true;
        }

        self.address.mask(self.prefix_len) == addr.mask(self.prefix_len)
    }

    /// Combine a /64 prefix with the interface identifier of `link_addr`
    /// (stateless address autoconfiguration, [RFC 4862]).
    ///
    /// Returns `None` when the prefix is not a /64 or the link-layer address
    /// has no interface identifier.
    ///
    /// [RFC 4862]: https://www.rfc-editor.org/rfc/rfc4862
    pub fn slaac(&self, link_addr: &[u8]) -> Option<Address> {
        if self.prefix_len != SLAAC_PREFIX_LEN {
            return None;
        }
        let id = interface_id(link_addr)?;
        let mut octets = self.address.mask(SLAAC_PREFIX_LEN);
        octets[8..].copy_from_slice(&id);
        Some(Address::from(octets))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // https://tools.ietf.org/html/rfc4291#section-2.3
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Cidr {
    type Err = Error;

    /// Parse `address/prefix-length`.
    fn from_str(s: &str) -> Result<Cidr> {
        let (address, prefix_len) = s.split_once('/').ok_or(Error)?;
        let address = Address::from_str(address).map_err(|_| Error)?;
        let prefix_len = u8::from_str(prefix_len).map_err(|_| Error)?;
        if prefix_len > 128 {
            return Err(Error);
        }
        Ok(Cidr::new(address, prefix_len))
    }
}
