//! Compile-time limits and protocol defaults.

use crate::time::Duration;

/// Maximum number of options a locally built RPL control message holds.
/// Received messages are bounded only by the datagram.
pub const RPL_MAX_OPTIONS: usize = 64;

/// Growth granularity of [GrowBuffer](crate::storage::GrowBuffer).
pub const BUFFER_BLOCK: usize = 64;

/// Hard ceiling of a [GrowBuffer](crate::storage::GrowBuffer).
pub const BUFFER_MAX: usize = 64 * 1024;

/// Outstanding DAO sequence numbers remembered per DODAG.
pub const MAX_PENDING_DAO_ACKS: usize = 8;

/// Longest link-layer address an interface can carry (EUI-64).
pub const MAX_LINK_ADDR_LEN: usize = 8;

/// Period of the fixed DIO re-announcement timer.
pub const DEFAULT_DIO_INTERVAL: Duration = Duration::from_secs(5);

/// Version number of a DODAG created without an explicit one.
pub const DEFAULT_DAG_VERSION: u8 = 1;

/// Delay between startup and the one-shot DIS on every interface.
pub const DIS_START_DELAY: Duration = Duration::from_secs(1);

/// Size of the datagram buffer used when reading from the transport.
pub const RECV_BUFFER_SIZE: usize = 1500;

/// Where the daemon looks for its configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rpld.toml";
