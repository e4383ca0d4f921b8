//! Specialized containers.
//!
//! The `storage` module provides the write-only byte buffer every outbound
//! message and netlink request is assembled in.

mod grow_buffer;

pub use self::grow_buffer::{Full, GrowBuffer};
