/*! Topology and protocol logic.

The `iface` module holds the interfaces the daemon runs on, the RPL instances
and DODAGs configured or learned on each of them, and the [Daemon] that reacts
to control messages and timers by updating that topology, answering
neighbors and programming the kernel through a [RouteTable].
*/

mod interface;
pub mod route;
pub mod rpl;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub use self::interface::{Interface, RplInstance};
pub use self::route::{Route, RouteError, RouteTable, Routes};
pub use self::rpl::{Dag, DagError, DioTimer, Rank};

use crate::config::{DEFAULT_DAG_VERSION, DEFAULT_DIO_INTERVAL, DIS_START_DELAY};
use crate::phy::Transport;
use crate::rand::Rand;
use crate::seed::IfaceSeed;
use crate::storage::{Full, GrowBuffer};
use crate::time::{Duration, Instant};
use crate::wire::{Ipv6Address, Ipv6Cidr, RplInstanceId, LINK_LOCAL_ALL_RPL_NODES};

/// The RPL daemon: the topology of every interface together with the
/// transport it talks through and the route table it programs.
///
/// The daemon never blocks and never reads the clock. The caller feeds it
/// received datagrams with [process](Daemon::process) and calls
/// [poll](Daemon::poll) at the instant returned by
/// [poll_at](Daemon::poll_at).
#[derive(Debug)]
pub struct Daemon<T: Transport, R: RouteTable> {
    interfaces: BTreeMap<u32, Interface>,
    transport: T,
    routes: R,
    rand: Rand,
    trickle: bool,
}

impl<T: Transport, R: RouteTable> Daemon<T, R> {
    /// Create a daemon without interfaces. `seed` initializes the generator
    /// used for random prefixes and Trickle jitter.
    pub fn new(transport: T, routes: R, seed: u64) -> Self {
        Self {
            interfaces: BTreeMap::new(),
            transport,
            routes,
            rand: Rand::new(seed),
            trickle: false,
        }
    }

    /// Drive the DIOs of DODAGs created from now on with the Trickle timer
    /// instead of the fixed period.
    pub fn set_trickle(&mut self, enabled: bool) {
        self.trickle = enabled;
    }

    pub fn trickle(&self) -> bool {
        self.trickle
    }

    /// Add an interface, replacing any previous one with the same index.
    pub fn add_interface(&mut self, iface: Interface) -> &mut Interface {
        match self.interfaces.entry(iface.index()) {
            Entry::Occupied(mut entry) => {
                net_warn!("interface {} replaced by {}", entry.get().name(), iface.name());
                entry.insert(iface);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(iface),
        }
    }

    /// Add an interface and create the root DODAGs its seed describes.
    ///
    /// A DODAG without a prefix gets a random unique local /64; one without
    /// a DODAGID takes the autoconfigured address of the interface in that
    /// prefix, and is skipped when there is none. Duplicate DODAGs are
    /// skipped, the others are kept.
    pub fn seed_interface(&mut self, mut iface: Interface, seed: &IfaceSeed) -> &mut Interface {
        for instance in &seed.rpls {
            let instance_id = RplInstanceId::from(instance.instance);
            for dag in &instance.dags {
                let dest = match dag.dest_prefix {
                    Some(prefix) => prefix,
                    None => random_ula(&mut self.rand),
                };
                let dodag_id = match dag.dodagid.or_else(|| iface.slaac(&dest)) {
                    Some(address) => address,
                    None => {
                        net_error!(
                            "{}: instance {}: no DODAGID for {}, skipped",
                            iface.name(),
                            instance_id,
                            dest
                        );
                        continue;
                    }
                };
                let dio_timer = if dag.trickle || self.trickle {
                    DioTimer::trickle()
                } else {
                    DioTimer::fixed(
                        dag.trickle_t
                            .map(Duration::from_secs)
                            .unwrap_or(DEFAULT_DIO_INTERVAL),
                    )
                };
                let version = dag.version.unwrap_or(DEFAULT_DAG_VERSION);

                match iface.create_dag(instance_id, dodag_id, Rank::ROOT, version, dest, dio_timer) {
                    Ok(dag) => dag.self_address = Some(dodag_id),
                    Err(err) => net_error!(
                        "{}: instance {} DODAG {}: {}",
                        iface.name(),
                        instance_id,
                        dodag_id,
                        err
                    ),
                }
            }
        }
        self.add_interface(iface)
    }

    pub fn interface(&self, ifindex: u32) -> Option<&Interface> {
        self.interfaces.get(&ifindex)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> + '_ {
        self.interfaces.values()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn routes(&self) -> &R {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut R {
        &mut self.routes
    }

    /// Install the root addresses and arm every timer.
    ///
    /// DIO timers first fire one interval after `now`; the one-shot DIS of
    /// each interface fires [DIS_START_DELAY] after `now`.
    pub fn start(&mut self, now: Instant) {
        let Daemon {
            interfaces,
            routes,
            rand,
            ..
        } = self;

        for iface in interfaces.values_mut() {
            if iface.is_root() {
                let roots: Vec<Ipv6Address> = iface
                    .dags()
                    .filter(|dag| dag.is_root())
                    .map(|dag| dag.dodag_id())
                    .collect();
                for address in roots {
                    match routes.add_address(iface.index(), address) {
                        Ok(()) | Err(RouteError::Exists) => iface.add_address(address),
                        Err(err) => {
                            net_error!("{}: adding {} failed: {}", iface.name(), address, err)
                        }
                    }
                }
            }

            for dag in iface.dags_mut() {
                dag.dio_timer.start(now, rand);
            }
            iface.dis_timer.arm(now + DIS_START_DELAY);
        }
    }

    /// Fire every timer that is due at `now`.
    ///
    /// Returns `true` if at least one message was sent.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Daemon {
            interfaces,
            transport,
            rand,
            ..
        } = self;

        let mut sent = false;
        for iface in interfaces.values_mut() {
            let ifindex = iface.index();
            if iface.dis_timer.poll(now) {
                net_debug!("{}: soliciting DIOs", iface.name());
                sent |= send(
                    transport,
                    ifindex,
                    LINK_LOCAL_ALL_RPL_NODES,
                    rpl::build_dis(),
                    "DIS",
                );
            }
            for dag in iface.dags_mut() {
                if dag.dio_timer.poll(now, rand) {
                    net_trace!("{}: DIO interval {}", dag, dag.dio_timer.interval());
                    sent |= send(
                        transport,
                        ifindex,
                        LINK_LOCAL_ALL_RPL_NODES,
                        dag.build_dio(),
                        "DIO",
                    );
                }
            }
        }
        sent
    }

    /// Return the earliest instant a timer expires, if any is armed.
    pub fn poll_at(&self) -> Option<Instant> {
        self.interfaces
            .values()
            .flat_map(|iface| {
                iface
                    .dis_timer
                    .poll_at()
                    .into_iter()
                    .chain(iface.dags().filter_map(|dag| dag.dio_timer.poll_at()))
            })
            .min()
    }

    /// Return how long to wait before calling [poll](Daemon::poll), or `None`
    /// if no timer is armed.
    pub fn poll_delay(&self, now: Instant) -> Option<Duration> {
        match self.poll_at() {
            Some(at) if now < at => Some(at - now),
            Some(_) => Some(Duration::ZERO),
            None => None,
        }
    }
}

/// Hand a built message to the transport. Returns `true` if it went out.
pub(crate) fn send<T: Transport>(
    transport: &mut T,
    ifindex: u32,
    dst: Ipv6Address,
    message: Result<GrowBuffer, Full>,
    kind: &str,
) -> bool {
    let buffer = match message {
        Ok(buffer) => buffer,
        Err(Full) => {
            net_error!("{} to {} does not fit in a buffer, dropped", kind, dst);
            return false;
        }
    };

    match transport.send(ifindex, dst, buffer.as_slice()) {
        Ok(()) => {
            net_trace!("sent {} to {} on {} ({} octets)", kind, dst, ifindex, buffer.len());
            true
        }
        Err(err) => {
            net_warn!("sending {} to {} on {} failed: {}", kind, dst, ifindex, err);
            false
        }
    }
}

/// A random unique local /64: `fd` followed by 40 random bits and a zero
/// subnet ID.
fn random_ula(rand: &mut Rand) -> Ipv6Cidr {
    let mut octets = [0u8; 16];
    octets[0] = 0xfd;
    rand.rand_bytes(&mut octets[1..6]);
    Ipv6Cidr::new(Ipv6Address::from(octets), 64)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::phy::Loopback;
    use crate::seed::Seed;
    use crate::wire::{Icmpv6Packet, RplRepr};

    const LINK_ADDR: [u8; 8] = [0x02, 0, 0, 0, 0, 0, 0, 0x01];

    fn daemon(seed: &str) -> Daemon<Loopback, Routes> {
        let seed = Seed::parse(seed).unwrap();
        let mut daemon = Daemon::new(Loopback::new(), Routes::new(), 1);
        for (index, iface) in seed.ifaces.iter().enumerate() {
            let index = index as u32 + 1;
            let interface = Interface::new(index, &iface.ifname, &LINK_ADDR, iface.dodag_root);
            daemon.seed_interface(interface, iface);
        }
        daemon
    }

    #[test]
    fn seed_derives_missing_identifiers() {
        let daemon = daemon(
            r#"
            [[ifaces]]
            ifname = "lowpan0"
            dodag_root = true
            [[ifaces.rpls]]
            instance = 1
            [[ifaces.rpls.dags]]
            dest_prefix = "2001:db8::/64"
            [[ifaces.rpls.dags]]
            "#,
        );

        let dags: Vec<&Dag> = daemon.interface(1).unwrap().dags().collect();
        assert_eq!(dags.len(), 2);

        let slaac = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
        let dag = dags.iter().find(|d| d.dodag_id() == slaac).unwrap();
        assert_eq!(dag.rank(), Rank::ROOT);
        assert_eq!(dag.self_address(), Some(slaac));
        assert_eq!(dag.version(), DEFAULT_DAG_VERSION);

        let ula = dags.iter().find(|d| d.dodag_id() != slaac).unwrap();
        assert_eq!(ula.dest().prefix_len(), 64);
        assert_eq!(ula.dest().address().octets()[0], 0xfd);
        assert_eq!(&ula.dest().address().octets()[6..], &[0; 10]);
    }

    #[test]
    fn seed_skips_duplicate_dag() {
        let daemon = daemon(
            r#"
            [[ifaces]]
            ifname = "lowpan0"
            dodag_root = true
            [[ifaces.rpls]]
            instance = 1
            [[ifaces.rpls.dags]]
            dodagid = "2001:db8::1"
            dest_prefix = "2001:db8::/64"
            [[ifaces.rpls.dags]]
            dodagid = "2001:db8::1"
            dest_prefix = "2001:db8:1::/64"
            [[ifaces.rpls.dags]]
            dodagid = "2001:db8::2"
            dest_prefix = "2001:db8:2::/64"
            "#,
        );
        assert_eq!(daemon.interface(1).unwrap().dags().count(), 2);
    }

    #[test]
    fn timers_drive_dis_then_dio() {
        let mut daemon = daemon(
            r#"
            [[ifaces]]
            ifname = "lowpan0"
            dodag_root = true
            [[ifaces.rpls]]
            instance = 1
            [[ifaces.rpls.dags]]
            dodagid = "2001:db8::1"
            dest_prefix = "2001:db8::/64"
            trickle_t = 3
            "#,
        );
        let medium = daemon.transport().clone();

        assert_eq!(daemon.poll_at(), None);
        daemon.start(Instant::ZERO);
        assert_eq!(
            daemon.routes().addresses(),
            &[(1, Ipv6Cidr::new(Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), 64))]
        );
        assert_eq!(daemon.poll_at(), Some(Instant::from_secs(1)));
        assert_eq!(
            daemon.poll_delay(Instant::from_millis(250)),
            Some(Duration::from_millis(750))
        );

        assert!(!daemon.poll(Instant::from_millis(999)));
        assert!(daemon.poll(Instant::from_secs(1)));
        assert!(daemon.poll(Instant::from_secs(3)));
        assert!(!daemon.poll(Instant::from_secs(4)));

        let sent = medium.take_sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|tx| tx.dst == LINK_LOCAL_ALL_RPL_NODES));

        let dis = Icmpv6Packet::new_checked(&sent[0].payload[..]).unwrap();
        assert!(matches!(
            RplRepr::parse(&dis),
            Ok(RplRepr::DodagInformationSolicitation(_))
        ));
        let dio = Icmpv6Packet::new_checked(&sent[1].payload[..]).unwrap();
        match RplRepr::parse(&dio) {
            Ok(RplRepr::DodagInformationObject(dio)) => assert_eq!(dio.rank, 1),
            other => panic!("expected a DIO, got {:?}", other),
        }

        // The DIS is one-shot, the DIO keeps its period.
        assert_eq!(daemon.poll_at(), Some(Instant::from_secs(6)));
    }
}
