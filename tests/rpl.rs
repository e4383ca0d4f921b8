use rstest::rstest;

use rpld::config::{
    DEFAULT_DAG_VERSION, DEFAULT_DIO_INTERVAL, RECV_BUFFER_SIZE, RPL_MAX_OPTIONS,
};
use rpld::iface::{Dag, DioTimer, Rank};
use rpld::time::*;
use rpld::wire::rpl::options::RplTarget;
use rpld::wire::rpl::RplOptions;
use rpld::wire::{
    Icmpv6Packet, Ipv6Address, Ipv6Cidr, RplDao, RplDis, RplInstanceId, RplOptionRepr, RplRepr,
    LINK_LOCAL_ALL_RPL_NODES,
};

mod sim;

use sim::IFINDEX;

const ONE_MINUTE: Duration = Duration::from_secs(60);
const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

const NEIGHBOR: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 0xaa);
const TARGET: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0xaa);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn emit(repr: &RplRepr) -> Vec<u8> {
    let mut buffer = vec![0u8; repr.buffer_len()];
    repr.emit(&mut Icmpv6Packet::new_unchecked(&mut buffer[..]));
    buffer
}

fn dis() -> Vec<u8> {
    emit(&RplRepr::DodagInformationSolicitation(RplDis {
        options: RplOptions::new(),
    }))
}

fn dao(dodag_id: Ipv6Address, sequence: u8, targets: &[Ipv6Address]) -> Vec<u8> {
    let mut options = RplOptions::new();
    for target in targets {
        options
            .push(RplOptionRepr::RplTarget(RplTarget {
                prefix: Ipv6Cidr::new(*target, 128),
            }))
            .unwrap();
    }
    emit(&RplRepr::DestinationAdvertisementObject(RplDao {
        rpl_instance_id: RplInstanceId::from(1),
        expect_ack: true,
        sequence,
        dodag_id: Some(dodag_id),
        options,
    }))
}

/// A root alone on its link only ever announces itself.
#[rstest]
#[case::fixed(sim::ROOT_SEED, ONE_MINUTE, 12..=12)]
#[case::trickle(
    "[[ifaces]]\nifname = \"lowpan0\"\ndodag_root = true\n\
     [[ifaces.rpls]]\ninstance = 1\n\
     [[ifaces.rpls.dags]]\ndest_prefix = \"2001:db8::/64\"\ntrickle = true\n",
    ONE_HOUR,
    8..=12
)]
fn root_node_only(
    #[case] seed: &str,
    #[case] duration: Duration,
    #[case] expected: std::ops::RangeInclusive<usize>,
) {
    init_logging();
    let mut sim = sim::NetworkSim::new();
    sim.create_node(seed);
    sim.run(duration);

    let dio_count = sim.msgs().iter().filter(|m| m.is_dio()).count();
    assert!(expected.contains(&dio_count), "{} DIOs", dio_count);

    // Apart from the startup solicitation.
    assert_eq!(sim.msgs().iter().filter(|m| m.is_dis()).count(), 1);
    assert!(sim.msgs().iter().all(|m| m.is_broadcast()));
}

/// A node without a root in range solicits once and stays silent.
#[test]
fn normal_node_without_dodag() {
    init_logging();
    let mut sim = sim::NetworkSim::new();
    sim.create_node("");
    sim.run(ONE_HOUR);

    assert_eq!(sim.msgs().len(), 1);
    assert!(sim.msgs()[0].is_dis());
    assert!(sim.nodes[0].dag(1).is_none());
}

/// DIS, then DAO, against a root driven by hand.
#[test]
fn root_answers_dis_and_dao() {
    init_logging();
    let mut sim = sim::NetworkSim::new();
    sim.create_node(sim::ROOT_SEED);
    let root = &mut sim.nodes[0];
    let dodag_id = root.global();
    root.daemon.start(Instant::ZERO);

    root.medium.inject(IFINDEX, NEIGHBOR, &dis(), 255);
    root.process(Instant::from_millis(100));
    let sent = root.outgoing(Instant::from_millis(100));
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].dst, LINK_LOCAL_ALL_RPL_NODES);
    match sent[0].repr() {
        Some(RplRepr::DodagInformationObject(dio)) => {
            assert_eq!(dio.rank, Rank::ROOT.value());
            assert_eq!(dio.dodag_id, dodag_id);
            assert!(dio.options.iter().any(|option| matches!(
                option,
                RplOptionRepr::RouteInformation(info)
                    if info.prefix == Ipv6Cidr::new(Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 64)
            )));
        }
        other => panic!("expected a DIO, got {:?}", other),
    }

    root.medium.inject(IFINDEX, NEIGHBOR, &dao(dodag_id, 7, &[TARGET]), 255);
    root.process(Instant::from_millis(200));

    let dag = root.dag(1).unwrap();
    let child = dag.child(&TARGET).unwrap();
    assert_eq!(child.via, NEIGHBOR);
    assert_eq!(root.routes().lookup(&TARGET), Some(NEIGHBOR));

    let sent = root.outgoing(Instant::from_millis(200));
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].dst, NEIGHBOR);
    match sent[0].repr() {
        Some(RplRepr::DestinationAdvertisementObjectAck(ack)) => {
            assert_eq!(ack.sequence, 7);
            assert_eq!(ack.status, 0);
            assert_eq!(ack.dodag_id, Some(dodag_id));
        }
        other => panic!("expected a DAO-ACK, got {:?}", other),
    };
}

/// Every node of a chain joins one hop below its neighbor, and the root
/// learns a host route to each of them through the first hop.
#[rstest]
#[case::one_hop(2)]
#[case::two_hops(3)]
#[case::three_hops(4)]
fn chain(#[case] len: usize) {
    init_logging();
    let mut sim = sim::chain(len);
    sim.run(ONE_MINUTE);

    for id in 1..len {
        let node = &sim.nodes[id];
        let upstream = sim.nodes[id - 1].ll;

        let dag = node.dag(1).unwrap();
        assert_eq!(dag.rank(), Rank::new(id as u16 + 1));
        assert_eq!(dag.parent().map(|p| p.address), Some(upstream));
        assert_eq!(dag.self_address(), Some(node.global()));
        assert_eq!(node.routes().default_route(), Some(upstream));
    }

    let root = &sim.nodes[0];
    let first_hop = sim.nodes[1].ll;
    for id in 1..len {
        let target = sim.nodes[id].global();
        assert_eq!(root.routes().lookup(&target), Some(first_hop));
        assert!(root.dag(1).unwrap().route_path(&target).is_some());
    }

    assert!(sim.msgs().iter().any(|m| m.is_dao_ack()));
}

/// The same DAO twice leaves one child and one route, and is acknowledged
/// both times.
#[test]
fn repeated_dao_is_idempotent() {
    init_logging();
    let mut sim = sim::NetworkSim::new();
    sim.create_node(sim::ROOT_SEED);
    let root = &mut sim.nodes[0];
    let dodag_id = root.global();

    for _ in 0..2 {
        root.medium.inject(IFINDEX, NEIGHBOR, &dao(dodag_id, 3, &[TARGET]), 255);
    }
    root.process(Instant::ZERO);

    assert_eq!(root.dag(1).unwrap().children().count(), 1);
    assert_eq!(root.routes().routes().len(), 1);

    let acks = root.outgoing(Instant::ZERO);
    assert_eq!(acks.len(), 2);
    assert!(acks.iter().all(|m| m.is_dao_ack() && m.dst == NEIGHBOR));
}

/// Hearing the same DIO again changes nothing but the DAO sequence.
#[test]
fn repeated_dio_is_idempotent() {
    init_logging();
    let mut sim = sim::chain(2);
    sim.run(Duration::from_secs(2));
    let before = sim.nodes[1].routes().clone();

    sim.run(Duration::from_secs(20));
    let node = &sim.nodes[1];
    assert_eq!(node.routes().addresses(), before.addresses());
    assert_eq!(node.routes().routes(), before.routes());
    assert_eq!(node.daemon.interface(IFINDEX).unwrap().dags().count(), 1);
}

/// A DAO listing more targets, or carrying more padding, than a message
/// built locally may hold is still taken whole.
#[rstest]
#[case::many_children(70, 0)]
#[case::padded(1, RPL_MAX_OPTIONS + 16)]
fn large_dao(#[case] children: u16, #[case] padding: usize) {
    init_logging();
    let mut sim = sim::NetworkSim::new();
    sim.create_node(sim::ROOT_SEED);
    let root = &mut sim.nodes[0];

    let mut sender = Dag::new(
        RplInstanceId::from(1),
        root.global(),
        Rank::new(2),
        DEFAULT_DAG_VERSION,
        Ipv6Cidr::new(Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 64),
        DioTimer::fixed(DEFAULT_DIO_INTERVAL),
    );
    let targets: Vec<_> = (0..children)
        .map(|i| Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 1, i))
        .collect();
    for (i, target) in targets.iter().enumerate() {
        let via = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 1, i as u16);
        sender.register_target(*target, via);
    }
    let mut data = sender.build_dao().unwrap().into_inner();
    data.extend(core::iter::repeat(0x00).take(padding));
    assert!(data.len() <= RECV_BUFFER_SIZE);

    root.medium.inject(IFINDEX, NEIGHBOR, &data, 255);
    root.process(Instant::ZERO);

    let dag = root.dag(1).unwrap();
    assert_eq!(dag.children().count(), targets.len());
    for target in &targets {
        assert_eq!(root.routes().lookup(target), Some(NEIGHBOR));
    }
    let acks = root.outgoing(Instant::ZERO);
    assert_eq!(acks.len(), 1);
    assert!(acks[0].is_dao_ack());
}

/// Unsolicited DAO-ACKs and DIOs of foreign instances without a prefix
/// leave no trace.
#[test]
fn stray_messages_are_ignored() {
    init_logging();
    let mut sim = sim::chain(2);
    sim.run(Duration::from_secs(2));

    let node = &mut sim.nodes[1];
    let before = node.routes().clone();

    let stray = emit(&RplRepr::DestinationAdvertisementObjectAck(
        rpld::wire::RplDaoAck {
            rpl_instance_id: RplInstanceId::from(9),
            sequence: 0,
            status: 0,
            dodag_id: None,
        },
    ));
    node.medium.inject(IFINDEX, NEIGHBOR, &stray, 255);
    node.medium.inject(IFINDEX, NEIGHBOR, &[0x9b, 0x01, 0x00], 255);
    node.process(Instant::from_secs(2));

    assert!(node.outgoing(Instant::from_secs(2)).is_empty());
    assert_eq!(node.routes().routes(), before.routes());
}
