//! The startup configuration: which interfaces to run on, and the DODAGs
//! each root interface creates.
//!
//! ```toml
//! [[ifaces]]
//! ifname = "lowpan0"
//! dodag_root = true
//!
//! [[ifaces.rpls]]
//! instance = 1
//!
//! [[ifaces.rpls.dags]]
//! dest_prefix = "2001:db8::/64"
//! dodagid = "2001:db8::1"
//! trickle_t = 5
//! version = 1
//! ```

use core::fmt;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use serde::{de, Deserialize, Deserializer};

use crate::wire::{Ipv6Address, Ipv6Cidr};

/// Error returned when loading a seed.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Parse(toml::de::Error),
    /// The document is well-formed but describes an impossible topology.
    Invalid(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "failed to read config: {}", err),
            Error::Parse(err) => write!(f, "failed to parse config: {}", err),
            Error::Invalid(reason) => write!(f, "invalid config: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Parse(err) => Some(err),
            Error::Invalid(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Parse(err)
    }
}

/// The whole configuration file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Seed {
    #[serde(default)]
    pub ifaces: Vec<IfaceSeed>,
}

/// An `[[ifaces]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IfaceSeed {
    pub ifname: String,
    /// Whether the interface roots the DODAGs listed under it.
    pub dodag_root: bool,
    #[serde(default)]
    pub rpls: Vec<InstanceSeed>,
}

/// An `[[ifaces.rpls]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceSeed {
    pub instance: u8,
    #[serde(default)]
    pub dags: Vec<DagSeed>,
}

/// An `[[ifaces.rpls.dags]]` entry. Everything is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DagSeed {
    /// Prefix advertised by the DODAG; a random unique local /64 if unset.
    #[serde(default, deserialize_with = "prefix")]
    pub dest_prefix: Option<Ipv6Cidr>,
    /// Defaults to the autoconfigured address in `dest_prefix`.
    pub dodagid: Option<Ipv6Address>,
    /// DIO period in seconds.
    pub trickle_t: Option<u64>,
    pub version: Option<u8>,
    /// Use the Trickle timer instead of a fixed DIO period.
    #[serde(default)]
    pub trickle: bool,
}

fn prefix<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Ipv6Cidr>, D::Error> {
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    text.parse()
        .map(Some)
        .map_err(|_| de::Error::custom(format!("`{}` is not an IPv6 prefix", text)))
}

impl Seed {
    /// Load and validate the configuration file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a configuration document.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let seed: Seed = toml::from_str(s)?;
        seed.validate()?;
        Ok(seed)
    }

    fn validate(&self) -> Result<(), Error> {
        let mut names = BTreeSet::new();
        for iface in &self.ifaces {
            if iface.ifname.is_empty() {
                return Err(Error::Invalid("empty interface name".to_string()));
            }
            if !names.insert(iface.ifname.as_str()) {
                return Err(Error::Invalid(format!(
                    "interface {} listed twice",
                    iface.ifname
                )));
            }
            if !iface.dodag_root && !iface.rpls.is_empty() {
                return Err(Error::Invalid(format!(
                    "{}: only a DODAG root configures instances",
                    iface.ifname
                )));
            }
            for dag in iface.rpls.iter().flat_map(|rpl| rpl.dags.iter()) {
                if dag.trickle_t == Some(0) {
                    return Err(Error::Invalid(format!(
                        "{}: trickle_t must be at least one second",
                        iface.ifname
                    )));
                }
            }
        }
        Ok(())
    }
}
