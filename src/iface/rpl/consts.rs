// ------------------------------------
// Constants used for the trickle timer:
// ------------------------------------
/// RFC 6550 suggests 3; Contiki-derived deployments use 12 (4.096 s).
pub const DEFAULT_DIO_INTERVAL_MIN: u8 = 12;
/// RFC 6550 suggests 20; Contiki-derived deployments use 8.
pub(crate) const DEFAULT_DIO_INTERVAL_DOUBLINGS: u8 = 8;
pub(crate) const DEFAULT_DIO_REDUNDANCY_CONSTANT: u8 = 10;

// ------------------------------------
// Constants used in DAO-ACK messages:
// ------------------------------------
/// Status of a DAO-ACK accepting the advertised targets.
pub const DAO_ACK_STATUS_ACCEPT: u8 = 0;

// ------------------------------------
// Constants used in the DIO route option:
// ------------------------------------
/// Route lifetime meaning "forever".
pub const INFINITE_LIFETIME: u32 = 0xffff_ffff;
