//! `rpld` is a routing daemon for the IPv6 Routing Protocol for Low-Power and
//! Lossy Networks (RPL, [RFC 6550]) in storing mode.
//!
//! It builds one Destination-Oriented DAG (DODAG) per configured RPL instance,
//! exchanges DIS/DIO/DAO/DAO-ACK control messages with its neighbors and
//! programs the resulting topology into the kernel routing table.
//!
//! # The layers
//!
//! ## The wire layer
//! The `wire` module deals with the packet *representation*. It provides two
//! levels of functionality.
//!
//!  * First, it provides functions to extract fields from sequences of octets,
//!    and to insert fields into sequences of octets. This happens through
//!    `Packet` family of structures, e.g. the RPL accessors on
//!    [Icmpv6Packet](wire/struct.Icmpv6Packet.html).
//!  * Second, in cases where the space of valid field values is much smaller
//!    than the space of possible field values, it provides a compact, high-level
//!    representation of packet data that can be parsed from and emitted into
//!    a sequence of octets. This happens through the `Repr` family of structs
//!    and enums, e.g. [RplRepr](wire/enum.RplRepr.html).
//!
//! The functions in the `wire` module are designed for use together with
//! `-Cpanic=abort`. `Packet::new_checked` never panics, and every accessor is
//! safe to call once it returned `Ok(_)`.
//!
//! ## The interface layer
//! The `iface` module holds the topology (interfaces, RPL instances, DODAGs,
//! parents, children, downward route trees) and the [Daemon](iface/struct.Daemon.html)
//! that runs the protocol state machine over it.
//!
//! ## The physical layer
//! The `phy` module provides the collaborators the daemon drives: a transport
//! that moves ICMPv6 datagrams and a route table that programs the kernel.
//! Both exist as traits with a Linux implementation and an in-memory one.
//!
//! [RFC 6550]: https://datatracker.ietf.org/doc/html/rfc6550

#![deny(unsafe_code)]
#![cfg_attr(not(feature = "log"), allow(unused))]

#[macro_use]
mod macros;
mod rand;

pub mod config;
pub mod iface;
pub mod phy;
pub mod seed;
pub mod storage;
pub mod time;
pub mod wire;
