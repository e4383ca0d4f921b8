use core::fmt;
use std::io;

use crate::wire::{Ipv6Address, Ipv6Cidr};

/// Prefix length of addresses installed by [RouteTable::add_address].
pub const ADDRESS_PREFIX_LEN: u8 = 64;

/// Error returned by a [RouteTable].
#[derive(Debug)]
pub enum RouteError {
    /// The address or route is already installed.
    Exists,
    /// The route to delete is not installed.
    NotFound,
    Io(io::Error),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Exists => write!(f, "already exists"),
            RouteError::NotFound => write!(f, "not found"),
            RouteError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for RouteError {
    fn from(err: io::Error) -> Self {
        RouteError::Io(err)
    }
}

/// The kernel state the daemon programs.
pub trait RouteTable {
    /// Add `address/64` to the interface.
    fn add_address(&mut self, ifindex: u32, address: Ipv6Address) -> Result<(), RouteError>;

    /// Route `dst/128` via the neighbor `via`.
    fn add_host_route(
        &mut self,
        ifindex: u32,
        dst: Ipv6Address,
        via: Ipv6Address,
    ) -> Result<(), RouteError>;

    /// Route `::/0` via the neighbor `via`.
    fn add_default_route(&mut self, ifindex: u32, via: Ipv6Address) -> Result<(), RouteError>;

    /// Delete the route to `dst`, optionally only the one via `via`.
    fn delete_route(
        &mut self,
        ifindex: u32,
        dst: Ipv6Cidr,
        via: Option<Ipv6Address>,
    ) -> Result<(), RouteError>;
}

impl<R: RouteTable + ?Sized> RouteTable for &mut R {
    fn add_address(&mut self, ifindex: u32, address: Ipv6Address) -> Result<(), RouteError> {
        (**self).add_address(ifindex, address)
    }

    fn add_host_route(
        &mut self,
        ifindex: u32,
        dst: Ipv6Address,
        via: Ipv6Address,
    ) -> Result<(), RouteError> {
        (**self).add_host_route(ifindex, dst, via)
    }

    fn add_default_route(&mut self, ifindex: u32, via: Ipv6Address) -> Result<(), RouteError> {
        (**self).add_default_route(ifindex, via)
    }

    fn delete_route(
        &mut self,
        ifindex: u32,
        dst: Ipv6Cidr,
        via: Option<Ipv6Address>,
    ) -> Result<(), RouteError> {
        (**self).delete_route(ifindex, dst, via)
    }
}

/// A route installed in a [Routes] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub ifindex: u32,
    pub cidr: Ipv6Cidr,
    pub via_router: Option<Ipv6Address>,
}

const IPV6_DEFAULT: Ipv6Cidr = Ipv6Cidr::new(Ipv6Address::UNSPECIFIED, 0);

/// An in-memory route table, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct Routes {
    addresses: Vec<(u32, Ipv6Cidr)>,
    routes: Vec<Route>,
}

impl Routes {
    /// Creates a new empty routing table.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addresses(&self) -> &[(u32, Ipv6Cidr)] {
        &self.addresses
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Return the next hop towards `addr`, by longest prefix match.
    pub fn lookup(&self, addr: &Ipv6Address) -> Option<Ipv6Address> {
        self.routes
            .iter()
            .filter(|route| route.cidr.contains_addr(addr))
            .max_by_key(|route| route.cidr.prefix_len())
            .and_then(|route| route.via_router)
    }

    /// Return the default gateway, if any.
    pub fn default_route(&self) -> Option<Ipv6Address> {
        self.routes
            .iter()
            .find(|r| r.cidr == IPV6_DEFAULT)
            .and_then(|r| r.via_router)
    }

    fn add_route(&mut self, route: Route) -> Result<(), RouteError> {
        if self
            .routes
            .iter()
            .any(|r| r.ifindex == route.ifindex && r.cidr == route.cidr)
        {
            return Err(RouteError::Exists);
        }
        self.routes.push(route);
        Ok(())
    }
}

impl RouteTable for Routes {
    fn add_address(&mut self, ifindex: u32, address: Ipv6Address) -> Result<(), RouteError> {
        let cidr = Ipv6Cidr::new(address, ADDRESS_PREFIX_LEN);
        if self.addresses.contains(&(ifindex, cidr)) {
            return Err(RouteError::Exists);
        }
        self.addresses.push((ifindex, cidr));
        Ok(())
    }

    fn add_host_route(
        &mut self,
        ifindex: u32,
        dst: Ipv6Address,
        via: Ipv6Address,
    ) -> Result<(), RouteError> {
        self.add_route(Route {
            ifindex,
            cidr: Ipv6Cidr::new(dst, 128),
            via_router: Some(via),
        })
    }

    fn add_default_route(&mut self, ifindex: u32, via: Ipv6Address) -> Result<(), RouteError> {
        self.add_route(Route {
            ifindex,
            cidr: IPV6_DEFAULT,
            via_router: Some(via),
        })
    }

    fn delete_route(
        &mut self,
        ifindex: u32,
        dst: Ipv6Cidr,
        via: Option<Ipv6Address>,
    ) -> Result<(), RouteError> {
        let idx = self
            .routes
            .iter()
            .position(|r| {
                r.ifindex == ifindex
                    && r.cidr == dst
                    && (via.is_none() || r.via_router == via)
            })
            .ok_or(RouteError::NotFound)?;
        self.routes.remove(idx);
        Ok(())
    }
}
