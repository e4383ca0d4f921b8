use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use super::{RxMeta, Transport};
use crate::wire::Ipv6Address;

/// A datagram handed to a [Loopback] for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub ifindex: u32,
    pub dst: Ipv6Address,
    pub payload: Vec<u8>,
}

/// A datagram waiting to be received from a [Loopback].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub ifindex: u32,
    pub src: Ipv6Address,
    pub hop_limit: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct Queues {
    tx: VecDeque<Sent>,
    rx: VecDeque<Received>,
}

/// An in-memory transport.
///
/// Sent datagrams are queued until taken with [take_sent](Loopback::take_sent);
/// received datagrams are whatever was [injected](Loopback::inject). Clones
/// share their queues, so a test can keep one handle while the daemon owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct Loopback(Rc<RefCell<Queues>>);

impl Loopback {
    /// Creates a loopback transport with empty queues.
    pub fn new() -> Loopback {
        Loopback::default()
    }

    /// Queue a datagram for reception.
    pub fn inject(&self, ifindex: u32, src: Ipv6Address, payload: &[u8], hop_limit: u8) {
        self.0.borrow_mut().rx.push_back(Received {
            ifindex,
            src,
            hop_limit,
            payload: payload.to_vec(),
        });
    }

    /// Remove and return everything sent so far, oldest first.
    pub fn take_sent(&self) -> Vec<Sent> {
        self.0.borrow_mut().tx.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.0.borrow().rx.len()
    }
}

impl Transport for Loopback {
    fn send(&mut self, ifindex: u32, dst: Ipv6Address, payload: &[u8]) -> io::Result<()> {
        self.0.borrow_mut().tx.push_back(Sent {
            ifindex,
            dst,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    /// Datagrams longer than `buffer` are truncated.
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<RxMeta>> {
        let Some(received) = self.0.borrow_mut().rx.pop_front() else {
            return Ok(None);
        };
        let len = received.payload.len().min(buffer.len());
        buffer[..len].copy_from_slice(&received.payload[..len]);
        Ok(Some(RxMeta {
            len,
            src: received.src,
            ifindex: received.ifindex,
            hop_limit: received.hop_limit,
        }))
    }
}
