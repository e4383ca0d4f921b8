use super::consts::DAO_ACK_STATUS_ACCEPT;
use super::{Dag, DioTimer, Rank};
use crate::config::DEFAULT_DIO_INTERVAL;
use crate::iface::route::{RouteError, RouteTable};
use crate::iface::{send, Daemon, Interface};
use crate::phy::Transport;
use crate::time::Instant;
use crate::wire::{
    Icmpv6Message, Icmpv6Packet, Ipv6Address, Ipv6Cidr, RplDao, RplDaoAck, RplDio,
    RplInstanceId, RplOptionRepr, RplRepr, LINK_LOCAL_ALL_RPL_NODES,
};

/// Hop limit of link-local RPL control messages that were not forwarded.
const EXPECTED_HOP_LIMIT: u8 = 255;

impl<T: Transport, R: RouteTable> Daemon<T, R> {
    /// Process an ICMPv6 message received from `src` on interface `ifindex`.
    ///
    /// Malformed messages and messages about unknown DODAGs are logged and
    /// dropped; nothing here is fatal.
    pub fn process(
        &mut self,
        now: Instant,
        ifindex: u32,
        src: Ipv6Address,
        payload: &[u8],
        hop_limit: u8,
    ) {
        let name = match self.interfaces.get(&ifindex) {
            Some(iface) => iface.name().to_string(),
            None => {
                net_debug!("message from {} on unknown interface {}, drop", src, ifindex);
                return;
            }
        };

        let packet = match Icmpv6Packet::new_checked(payload) {
            Ok(packet) => packet,
            Err(_) => {
                net_debug!(
                    "{}: message of {} octets from {} too short, drop",
                    name,
                    payload.len(),
                    src
                );
                return;
            }
        };

        if packet.msg_type() != Icmpv6Message::RplControl {
            net_debug!("{}: {} from {} is not RPL, drop", name, packet.msg_type(), src);
            return;
        }

        if hop_limit != EXPECTED_HOP_LIMIT {
            net_trace!("{}: hop limit {} from {}", name, hop_limit, src);
        }

        let code = packet.rpl_control_message();
        if !code.is_supported() {
            net_debug!("{}: unsupported RPL code {} from {}, drop", name, code, src);
            return;
        }

        let repr = match RplRepr::parse(&packet) {
            Ok(repr) => repr,
            Err(err) => {
                net_debug!("{}: malformed {} from {}: {}, drop", name, code, src, err);
                return;
            }
        };
        net_trace!("{}: {} from {}", name, repr, src);

        match repr {
            RplRepr::DodagInformationSolicitation(_) => self.process_dis(ifindex, src),
            RplRepr::DodagInformationObject(dio) => self.process_dio(now, ifindex, src, dio),
            RplRepr::DestinationAdvertisementObject(dao) => self.process_dao(ifindex, src, dao),
            RplRepr::DestinationAdvertisementObjectAck(ack) => {
                self.process_dao_ack(ifindex, src, ack)
            }
        }
    }

    /// Answer a solicitation with the DIO of every DODAG on the interface.
    fn process_dis(&mut self, ifindex: u32, src: Ipv6Address) {
        let Daemon {
            interfaces,
            transport,
            ..
        } = self;
        let Some(iface) = interfaces.get_mut(&ifindex) else {
            return;
        };

        net_debug!("{}: DIS from {}", iface.name(), src);
        for dag in iface.dags_mut() {
            send(
                transport,
                ifindex,
                LINK_LOCAL_ALL_RPL_NODES,
                dag.build_dio(),
                "DIO",
            );
        }
    }

    fn process_dio(&mut self, now: Instant, ifindex: u32, src: Ipv6Address, dio: RplDio) {
        let Daemon {
            interfaces,
            transport,
            routes,
            rand,
            trickle,
        } = self;
        let Some(iface) = interfaces.get_mut(&ifindex) else {
            return;
        };
        let name = iface.name().to_string();

        let instance_id = dio.rpl_instance_id;
        let dodag_id = dio.dodag_id;
        let rank = Rank::new(dio.rank);

        // Nothing ranks below the root.
        if rank == Rank::INFINITE || rank < Rank::ROOT {
            net_debug!("{}: DIO from {} with rank {}, drop", name, src, rank);
            return;
        }

        let known = iface
            .find_dag(instance_id, &dodag_id)
            .map(|dag| (dag.is_root(), dag.version()));
        match known {
            Some((true, _)) => {
                net_trace!("{}: DIO from {} for our own DODAG", name, src);
                return;
            }
            Some((_, version)) if version != dio.version_number => {
                net_trace!(
                    "{}: DIO from {} carries version {}, ours is {}",
                    name,
                    src,
                    dio.version_number,
                    version
                );
            }
            Some(_) => (),
            None => {
                let Some(dest) = destination_prefix(&dio) else {
                    net_debug!(
                        "{}: DIO from {} for unknown DODAG {} lacks a prefix, drop",
                        name,
                        src,
                        dodag_id
                    );
                    return;
                };
                let dio_timer = if *trickle {
                    DioTimer::trickle()
                } else {
                    DioTimer::fixed(DEFAULT_DIO_INTERVAL)
                };
                match iface.create_dag(
                    instance_id,
                    dodag_id,
                    Rank::INFINITE,
                    dio.version_number,
                    dest,
                    dio_timer,
                ) {
                    Ok(dag) => {
                        dag.set_mode_of_operation(dio.mode_of_operation);
                        dag.dio_timer.start(now, rand);
                    }
                    Err(err) => {
                        net_error!("{}: DODAG {}: {}", name, dodag_id, err);
                        return;
                    }
                }
            }
        }

        let Some(dag) = iface.find_dag_mut(instance_id, &dodag_id) else {
            return;
        };
        let previous = dag.parent().copied();
        if !dag.select_parent(src, rank) {
            net_trace!(
                "{}: DIO from {} with rank {} does not beat {}",
                name,
                src,
                rank,
                previous.map(|p| p.rank).unwrap_or(Rank::INFINITE)
            );
            dag.dio_timer.hear_consistent();
            return;
        }

        let dest = dag.dest();
        match previous {
            Some(parent) if parent.address == src && parent.rank == rank => {
                dag.dio_timer.hear_consistent();
            }
            Some(parent) => {
                net_info!(
                    "{}: instance {} DODAG {}: parent {} replaced by {}, rank {}",
                    name,
                    instance_id,
                    dodag_id,
                    parent,
                    src,
                    dag.rank()
                );
                dag.dio_timer.hear_inconsistent(now, rand);
                if parent.address != src {
                    forget_default_route(routes, ifindex, parent.address);
                }
            }
            None => {
                net_info!(
                    "{}: instance {} DODAG {}: joined via {}, rank {}",
                    name,
                    instance_id,
                    dodag_id,
                    src,
                    dag.rank()
                );
                dag.dio_timer.hear_inconsistent(now, rand);
            }
        }

        let self_address = autoconfigure(iface, routes, dest);

        let Some(dag) = iface.find_dag_mut(instance_id, &dodag_id) else {
            return;
        };
        if self_address.is_some() {
            dag.self_address = self_address;
        }
        send(transport, ifindex, src, dag.build_dao(), "DAO");
    }

    fn process_dao(&mut self, ifindex: u32, src: Ipv6Address, dao: RplDao) {
        let Daemon {
            interfaces,
            transport,
            routes,
            ..
        } = self;
        let Some(iface) = interfaces.get_mut(&ifindex) else {
            return;
        };
        let name = iface.name().to_string();

        let Some(dag) = lookup_dag(iface, dao.rpl_instance_id, dao.dodag_id) else {
            net_debug!(
                "{}: DAO from {} for unknown DODAG in instance {}, drop",
                name,
                src,
                dao.rpl_instance_id
            );
            return;
        };

        for option in dao.options.iter() {
            if let RplOptionRepr::RplTarget(target) = option {
                let address = target.prefix.address();
                if dag.register_target(address, src) {
                    net_info!("{}: {}: child {} via {}", name, dag, address, src);
                }
            }
        }

        for child in dag.children() {
            match routes.add_host_route(ifindex, child.address, child.via) {
                Ok(()) => net_debug!("{}: route to {}", name, child),
                Err(RouteError::Exists) => (),
                Err(err) => net_warn!("{}: route to {} failed: {}", name, child, err),
            }
        }

        send(
            transport,
            ifindex,
            src,
            dag.build_dao_ack(dao.sequence, DAO_ACK_STATUS_ACCEPT),
            "DAO-ACK",
        );
    }

    fn process_dao_ack(&mut self, ifindex: u32, src: Ipv6Address, ack: RplDaoAck) {
        let Daemon {
            interfaces, routes, ..
        } = self;
        let Some(iface) = interfaces.get_mut(&ifindex) else {
            return;
        };
        let name = iface.name().to_string();

        let Some(dag) = lookup_dag(iface, ack.rpl_instance_id, ack.dodag_id) else {
            net_debug!(
                "{}: DAO-ACK from {} for unknown DODAG in instance {}, drop",
                name,
                src,
                ack.rpl_instance_id
            );
            return;
        };

        if !dag.ack_pending(ack.sequence) {
            net_debug!(
                "{}: DAO-ACK {} from {} matches no pending DAO, drop",
                name,
                ack.sequence,
                src
            );
            return;
        }
        if ack.is_rejection() {
            net_warn!(
                "{}: DAO {} rejected by {} with status {}",
                name,
                ack.sequence,
                src,
                ack.status
            );
            return;
        }

        let Some(via) = dag.parent().map(|parent| parent.address) else {
            return;
        };
        match routes.add_default_route(ifindex, via) {
            Ok(()) => net_info!("{}: default route via {}", name, via),
            Err(RouteError::Exists) => (),
            Err(err) => net_warn!("{}: default route via {} failed: {}", name, via, err),
        }
    }
}

/// The Route Information option of a DIO names the prefix of the DODAG.
fn destination_prefix(dio: &RplDio) -> Option<Ipv6Cidr> {
    dio.options.iter().find_map(|option| match option {
        RplOptionRepr::RouteInformation(info) => Some(info.prefix),
        _ => None,
    })
}

/// A message without a DODAGID refers to the first DODAG of its instance.
fn lookup_dag(
    iface: &mut Interface,
    instance_id: RplInstanceId,
    dodag_id: Option<Ipv6Address>,
) -> Option<&mut Dag> {
    match dodag_id {
        Some(dodag_id) => iface.find_dag_mut(instance_id, &dodag_id),
        None => iface.first_dag_mut(instance_id),
    }
}

/// Take the autoconfigured address in `dest` and drop the standing route to
/// `dest`, which now points the wrong way.
///
/// Returns the address once it is installed.
fn autoconfigure<R: RouteTable>(
    iface: &mut Interface,
    routes: &mut R,
    dest: Ipv6Cidr,
) -> Option<Ipv6Address> {
    let Some(address) = iface.slaac(&dest) else {
        net_debug!("{}: no autoconfigured address in {}", iface.name(), dest);
        return None;
    };

    match routes.add_address(iface.index(), address) {
        Ok(()) | Err(RouteError::Exists) => iface.add_address(address),
        Err(err) => {
            net_error!("{}: adding {} failed: {}", iface.name(), address, err);
            return None;
        }
    }

    match routes.delete_route(iface.index(), dest, None) {
        Ok(()) | Err(RouteError::NotFound) => (),
        Err(err) => net_warn!("{}: deleting route to {} failed: {}", iface.name(), dest, err),
    }
    Some(address)
}

fn forget_default_route<R: RouteTable>(routes: &mut R, ifindex: u32, via: Ipv6Address) {
    let default = Ipv6Cidr::new(Ipv6Address::UNSPECIFIED, 0);
    match routes.delete_route(ifindex, default, Some(via)) {
        Ok(()) | Err(RouteError::NotFound) => (),
        Err(err) => net_warn!("default route via {} not deleted: {}", via, err),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::iface::Routes;
    use crate::phy::Loopback;
    use crate::wire::rpl::options::RplTarget;
    use crate::wire::rpl::RplOptions;

    const IFINDEX: u32 = 4;
    const ROOT_LL: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    const A: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 0xa);
    const B: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 0xb);
    const DODAG_ID: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
    const NODE: [u8; 8] = [0x02, 0x11, 0x22, 0xff, 0xfe, 0x33, 0x44, 0x55];

    fn prefix() -> Ipv6Cidr {
        Ipv6Cidr::new(Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 64)
    }

    fn node() -> (Daemon<Loopback, Routes>, Loopback) {
        let medium = Loopback::new();
        let mut daemon = Daemon::new(medium.clone(), Routes::new(), 7);
        daemon.add_interface(Interface::new(IFINDEX, "lowpan0", &NODE, false));
        (daemon, medium)
    }

    fn dio_from_root(rank: u16) -> Vec<u8> {
        let mut dag = Dag::new(
            RplInstanceId::from(1),
            DODAG_ID,
            Rank::new(rank),
            1,
            prefix(),
            DioTimer::fixed(DEFAULT_DIO_INTERVAL),
        );
        dag.build_dio().unwrap().into_inner()
    }

    fn dao(sequence: u8, targets: &[Ipv6Address]) -> Vec<u8> {
        let mut options = RplOptions::new();
        for target in targets {
            options
                .push(RplOptionRepr::RplTarget(RplTarget {
                    prefix: Ipv6Cidr::new(*target, 128),
                }))
                .unwrap();
        }
        let repr = RplRepr::DestinationAdvertisementObject(RplDao {
            rpl_instance_id: RplInstanceId::from(1),
            expect_ack: true,
            sequence,
            dodag_id: Some(DODAG_ID),
            options,
        });
        let mut buffer = vec![0u8; repr.buffer_len()];
        repr.emit(&mut Icmpv6Packet::new_unchecked(&mut buffer[..]));
        buffer
    }

    fn parse(payload: &[u8]) -> RplRepr<'_> {
        RplRepr::parse(&Icmpv6Packet::new_checked(payload).unwrap()).unwrap()
    }

    fn dag(daemon: &Daemon<Loopback, Routes>) -> &Dag {
        daemon
            .interface(IFINDEX)
            .unwrap()
            .find_dag(RplInstanceId::from(1), &DODAG_ID)
            .unwrap()
    }

    #[test]
    fn dio_creates_dag_and_sends_dao() {
        let (mut daemon, medium) = node();
        daemon.process(Instant::ZERO, IFINDEX, ROOT_LL, &dio_from_root(1), 255);

        let dag = dag(&daemon);
        assert_eq!(dag.rank(), Rank::new(2));
        assert_eq!(dag.parent().map(|p| p.address), Some(ROOT_LL));
        assert_eq!(dag.dest(), prefix());

        let self_address = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0x0011, 0x22ff, 0xfe33, 0x4455);
        assert_eq!(dag.self_address(), Some(self_address));
        assert_eq!(
            daemon.routes().addresses(),
            &[(IFINDEX, Ipv6Cidr::new(self_address, 64))]
        );

        let sent = medium.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].dst, ROOT_LL);
        match parse(&sent[0].payload) {
            RplRepr::DestinationAdvertisementObject(dao) => {
                assert_eq!(dao.sequence, 0);
                assert_eq!(dao.options.len(), 1);
            }
            other => panic!("expected a DAO, got {}", other),
        };
    }

    #[test]
    fn parent_selection_sequence() {
        let (mut daemon, _medium) = node();
        daemon.process(Instant::ZERO, IFINDEX, A, &dio_from_root(5), 255);
        assert_eq!(dag(&daemon).rank(), Rank::new(6));

        daemon.process(Instant::ZERO, IFINDEX, B, &dio_from_root(3), 255);
        assert_eq!(dag(&daemon).rank(), Rank::new(4));
        assert_eq!(dag(&daemon).parent().map(|p| p.address), Some(B));

        daemon.process(Instant::ZERO, IFINDEX, A, &dio_from_root(5), 255);
        assert_eq!(dag(&daemon).rank(), Rank::new(4));
        assert_eq!(dag(&daemon).parent().map(|p| p.address), Some(B));
    }

    #[test]
    fn rank_zero_dio_is_dropped() {
        let (mut daemon, medium) = node();
        daemon.process(Instant::ZERO, IFINDEX, A, &dio_from_root(0), 255);
        daemon.process(Instant::ZERO, IFINDEX, B, &dio_from_root(0), 255);
        assert!(daemon
            .interface(IFINDEX)
            .unwrap()
            .find_dag(RplInstanceId::from(1), &DODAG_ID)
            .is_none());
        assert!(medium.take_sent().is_empty());

        // A real root is still followed, and an equal rank replaces it.
        daemon.process(Instant::ZERO, IFINDEX, A, &dio_from_root(1), 255);
        daemon.process(Instant::ZERO, IFINDEX, B, &dio_from_root(1), 255);
        let dag = dag(&daemon);
        assert!(!dag.is_root());
        assert_eq!(dag.rank(), Rank::new(2));
        assert_eq!(dag.parent().map(|p| p.address), Some(B));
    }

    #[test]
    fn dao_for_unknown_dag_is_dropped() {
        let (mut daemon, medium) = node();
        daemon.process(Instant::ZERO, IFINDEX, A, &dao(3, &[A]), 255);
        assert!(medium.take_sent().is_empty());
        assert!(daemon.routes().routes().is_empty());
    }

    #[test]
    fn dao_ack_installs_default_route_once_matched() {
        let (mut daemon, medium) = node();
        daemon.process(Instant::ZERO, IFINDEX, ROOT_LL, &dio_from_root(1), 255);
        let sent = medium.take_sent();
        let RplRepr::DestinationAdvertisementObject(dao) = parse(&sent[0].payload) else {
            panic!("expected a DAO");
        };

        let ack = |sequence: u8| {
            let repr = RplRepr::DestinationAdvertisementObjectAck(RplDaoAck {
                rpl_instance_id: RplInstanceId::from(1),
                sequence,
                status: 0,
                dodag_id: Some(DODAG_ID),
            });
            let mut buffer = vec![0u8; repr.buffer_len()];
            repr.emit(&mut Icmpv6Packet::new_unchecked(&mut buffer[..]));
            buffer
        };

        daemon.process(Instant::ZERO, IFINDEX, ROOT_LL, &ack(dao.sequence + 1), 255);
        assert_eq!(daemon.routes().default_route(), None);

        daemon.process(Instant::ZERO, IFINDEX, ROOT_LL, &ack(dao.sequence), 255);
        assert_eq!(daemon.routes().default_route(), Some(ROOT_LL));
        assert!(dag(&daemon).pending_acks().is_empty());
    }

    #[test]
    fn garbage_is_dropped() {
        let (mut daemon, medium) = node();
        daemon.process(Instant::ZERO, IFINDEX, A, &[0x9b, 0x01], 255);
        daemon.process(Instant::ZERO, IFINDEX, A, &[0x80, 0x00, 0x00, 0x00], 255);
        daemon.process(Instant::ZERO, IFINDEX, A, &[0x9b, 0x80, 0x00, 0x00, 0x00], 255);
        daemon.process(Instant::ZERO, IFINDEX + 1, A, &dio_from_root(1), 255);
        assert!(medium.take_sent().is_empty());
        assert_eq!(daemon.interface(IFINDEX).unwrap().dags().count(), 0);
    }
}
