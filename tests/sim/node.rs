use rpld::config::RECV_BUFFER_SIZE;
use rpld::iface::{Daemon, Dag, Interface, Routes};
use rpld::phy::{Loopback, Transport};
use rpld::seed::Seed;
use rpld::time::Instant;
use rpld::wire::{Ipv6Address, RplInstanceId};

use super::Message;

/// Every simulated node has a single interface.
pub const IFINDEX: u32 = 1;

pub struct Node {
    pub id: usize,
    pub link_addr: [u8; 8],
    /// Source address of everything the node sends.
    pub ll: Ipv6Address,
    pub neighbors: Vec<usize>,
    pub enabled: bool,
    pub daemon: Daemon<Loopback, Routes>,
    pub medium: Loopback,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("ll", &self.ll)
            .field("neighbors", &self.neighbors)
            .field("enabled", &self.enabled)
            .field("routes", self.daemon.routes())
            .finish()
    }
}

impl Node {
    /// Create a node from a seed document naming at most one interface.
    pub fn new(id: usize, seed: &str) -> Self {
        let link_addr = [0x02, 0, 0, 0, 0, 0, 0, id as u8 + 1];
        let ll = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, id as u16 + 1);

        let medium = Loopback::new();
        let mut daemon = Daemon::new(medium.clone(), Routes::new(), id as u64 + 1);

        let seed = Seed::parse(seed).unwrap();
        let root = seed.ifaces.first().map(|i| i.dodag_root).unwrap_or(false);
        let mut iface = Interface::new(IFINDEX, "lowpan0", &link_addr, root);
        iface.add_address(ll);
        match seed.ifaces.first() {
            Some(iface_seed) => {
                daemon.seed_interface(iface, iface_seed);
            }
            None => {
                daemon.add_interface(iface);
            }
        }

        Self {
            id,
            link_addr,
            ll,
            neighbors: vec![],
            enabled: true,
            daemon,
            medium,
        }
    }

    /// Take everything the daemon sent since the last call.
    pub fn outgoing(&mut self, now: Instant) -> Vec<Message> {
        self.medium
            .take_sent()
            .into_iter()
            .map(|sent| Message {
                at: now,
                from: self.id,
                src: self.ll,
                dst: sent.dst,
                data: sent.payload,
            })
            .collect()
    }

    pub fn receive_message(&mut self, msg: &Message) {
        self.medium.inject(IFINDEX, msg.src, &msg.data, 255);
    }

    /// Drain the receive queue into the daemon, like the event loop does.
    pub fn process(&mut self, now: Instant) {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        while let Ok(Some(meta)) = self.daemon.transport_mut().recv(&mut buffer) {
            self.daemon.process(
                now,
                meta.ifindex,
                meta.src,
                &buffer[..meta.len],
                meta.hop_limit,
            );
        }
    }

    pub fn dag(&self, instance: u8) -> Option<&Dag> {
        let iface = self.daemon.interface(IFINDEX)?;
        let mut dags = iface.dags().filter(|d| d.instance_id() == RplInstanceId::from(instance));
        dags.next()
    }

    pub fn routes(&self) -> &Routes {
        self.daemon.routes()
    }

    /// Address autoconfigured in `2001:db8::/64`.
    pub fn global(&self) -> Ipv6Address {
        Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, self.id as u16 + 1)
    }
}
