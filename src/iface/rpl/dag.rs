use core::fmt;

use super::consts::INFINITE_LIFETIME;
use super::parents::{ParentSlot, Peer};
use super::rank::Rank;
use super::relations::{Child, Children};
use super::timer::DioTimer;
use super::tree::{NodeId, RouteTree};
use crate::config::MAX_PENDING_DAO_ACKS;
use crate::storage::{Full, GrowBuffer};
use crate::wire::rpl::options::{RouteInformation, RplTarget};
use crate::wire::rpl::{
    DestinationAdvertisementObject, DestinationAdvertisementObjectAck, DodagInformationObject,
    DodagInformationSolicitation, RplOptions,
};
use crate::wire::{
    Icmpv6Packet, Ipv6Address, Ipv6Cidr, RplInstanceId, RplModeOfOperation, RplOptionPacket,
    RplOptionRepr, RplRepr,
};

/// Error returned when a DODAG cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DagError {
    /// The (instance, DODAGID) pair already exists on the interface.
    Duplicate,
}

impl fmt::Display for DagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DagError::Duplicate => write!(f, "DODAG already exists"),
        }
    }
}

impl std::error::Error for DagError {}

/// A Destination-Oriented DAG this node takes part in.
#[derive(Debug, Clone)]
pub struct Dag {
    instance_id: RplInstanceId,
    dodag_id: Ipv6Address,
    version: u8,
    /// DAO trigger sequence number, advanced on every DIO built.
    dtsn: u8,
    /// DAO sequence number, advanced on every DAO built.
    dsn: u8,
    mode_of_operation: RplModeOfOperation,
    dest: Ipv6Cidr,

    pub(crate) rank: Rank,
    pub(crate) parent: ParentSlot,
    pub(crate) children: Children,
    pending_acks: heapless::Vec<u8, MAX_PENDING_DAO_ACKS>,
    /// Routable address of this node in the DODAG.
    pub(crate) self_address: Option<Ipv6Address>,
    tree: RouteTree,
    pub(crate) dio_timer: DioTimer,
}

impl Dag {
    pub fn new(
        instance_id: RplInstanceId,
        dodag_id: Ipv6Address,
        rank: Rank,
        version: u8,
        dest: Ipv6Cidr,
        dio_timer: DioTimer,
    ) -> Self {
        Self {
            instance_id,
            dodag_id,
            version,
            dtsn: 0,
            dsn: 0,
            mode_of_operation: RplModeOfOperation::default(),
            dest,
            rank,
            parent: ParentSlot::default(),
            children: Children::default(),
            pending_acks: heapless::Vec::new(),
            self_address: None,
            tree: RouteTree::new(dodag_id, dodag_id),
            dio_timer,
        }
    }

    pub fn instance_id(&self) -> RplInstanceId {
        self.instance_id
    }

    pub fn dodag_id(&self) -> Ipv6Address {
        self.dodag_id
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn dtsn(&self) -> u8 {
        self.dtsn
    }

    pub fn dsn(&self) -> u8 {
        self.dsn
    }

    pub fn mode_of_operation(&self) -> RplModeOfOperation {
        self.mode_of_operation
    }

    pub(crate) fn set_mode_of_operation(&mut self, mode: RplModeOfOperation) {
        self.mode_of_operation = mode;
    }

    /// The prefix this DODAG advertises.
    pub fn dest(&self) -> Ipv6Cidr {
        self.dest
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// A DODAG without a parent at rank 1 is rooted at this node.
    pub fn is_root(&self) -> bool {
        self.rank.is_root() && self.parent.is_empty()
    }

    pub fn parent(&self) -> Option<&Peer> {
        self.parent.get()
    }

    pub fn children(&self) -> impl Iterator<Item = &Child> + '_ {
        self.children.iter()
    }

    pub fn child(&self, address: &Ipv6Address) -> Option<&Child> {
        self.children.find(address)
    }

    pub fn self_address(&self) -> Option<Ipv6Address> {
        self.self_address
    }

    pub fn pending_acks(&self) -> &[u8] {
        &self.pending_acks
    }

    pub fn dio_timer(&self) -> &DioTimer {
        &self.dio_timer
    }

    /// Offer the sender of a DIO as parent. On acceptance the rank of this
    /// node becomes one more than the parent's.
    pub fn select_parent(&mut self, address: Ipv6Address, rank: Rank) -> bool {
        if self.is_root() {
            return false;
        }
        if !self.parent.offer(Peer::new(address, rank)) {
            return false;
        }
        self.rank = rank.child_rank();
        true
    }

    /// Register a DAO target learned from `via`.
    ///
    /// Returns `true` when the child is new. The downward route tree gains a
    /// node for `via` below the root and, unless the neighbor advertised
    /// itself, a node for `target` below `via`.
    pub fn register_target(&mut self, target: Ipv6Address, via: Ipv6Address) -> bool {
        let (_, created) = self.children.find_or_create(target, via);

        let root = self.tree.root_address();
        if self.tree.find(&via).is_none() && self.tree.insert(&root, via, via).is_none() {
            net_debug!("route tree: no root {} for {}", root, via);
        }
        if target != via && !self.tree.contains_target(&target) {
            match self.tree.insert(&via, target, target) {
                Some(node) => net_trace!("route tree: path {:?}", self.tree.path(node)),
                None => net_debug!("route tree: no parent {} for {}", via, target),
            }
        }

        created
    }

    /// The downward path from the root to `address`, as (address, target)
    /// pairs starting at `address`.
    pub fn route_path(&self, address: &Ipv6Address) -> Option<Vec<(Ipv6Address, Ipv6Address)>> {
        let node: NodeId = self.tree.find(address)?;
        Some(self.tree.path(node))
    }

    /// Match a DAO-ACK against the outstanding DAO sequence numbers,
    /// forgetting it on success.
    pub fn ack_pending(&mut self, sequence: u8) -> bool {
        match self.pending_acks.iter().position(|s| *s == sequence) {
            Some(idx) => {
                self.pending_acks.remove(idx);
                true
            }
            None => false,
        }
    }

    fn record_pending(&mut self, sequence: u8) {
        if self.pending_acks.is_full() {
            let oldest = self.pending_acks.remove(0);
            net_debug!("DAO {} never acknowledged", oldest);
        }
        // Cannot fail, a slot was freed above.
        let _ = self.pending_acks.push(sequence);
    }

    pub fn dio_repr(&self) -> RplRepr<'static> {
        let mut options = RplOptions::new();
        // The vector is empty, there is room for one option.
        let _ = options.push(RplOptionRepr::RouteInformation(RouteInformation {
            prefix: self.dest,
            preference: 0,
            lifetime: INFINITE_LIFETIME,
        }));

        RplRepr::DodagInformationObject(DodagInformationObject {
            rpl_instance_id: self.instance_id,
            version_number: self.version,
            rank: self.rank.value(),
            grounded: true,
            mode_of_operation: self.mode_of_operation,
            dodag_preference: 0,
            dtsn: self.dtsn,
            dodag_id: self.dodag_id,
            options,
        })
    }

    /// Build a DIO advertising this DODAG and its destination prefix.
    pub fn build_dio(&mut self) -> Result<GrowBuffer, Full> {
        let buffer = emit(&self.dio_repr())?;
        self.dtsn = self.dtsn.wrapping_add(1);
        Ok(buffer)
    }

    /// Build a DAO naming this node and all its children as targets.
    ///
    /// The sequence number used is remembered until it is acknowledged.
    pub fn build_dao(&mut self) -> Result<GrowBuffer, Full> {
        let header = RplRepr::DestinationAdvertisementObject(DestinationAdvertisementObject {
            rpl_instance_id: self.instance_id,
            expect_ack: true,
            sequence: self.dsn,
            dodag_id: Some(self.dodag_id),
            options: RplOptions::new(),
        });
        let mut buffer = emit(&header)?;

        let targets = self
            .self_address
            .into_iter()
            .chain(self.children.iter().map(|c| c.address));
        for target in targets {
            let option = RplOptionRepr::RplTarget(RplTarget {
                prefix: Ipv6Cidr::new(target, 128),
            });
            append_option(&mut buffer, &option)?;
        }

        let sequence = self.dsn;
        self.record_pending(sequence);
        self.dsn = self.dsn.wrapping_add(1);
        Ok(buffer)
    }

    /// Build a DAO-ACK for the DAO numbered `sequence`.
    pub fn build_dao_ack(&self, sequence: u8, status: u8) -> Result<GrowBuffer, Full> {
        emit(&RplRepr::DestinationAdvertisementObjectAck(
            DestinationAdvertisementObjectAck {
                rpl_instance_id: self.instance_id,
                sequence,
                status,
                dodag_id: Some(self.dodag_id),
            },
        ))
    }
}

impl fmt::Display for Dag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instance {} DODAG {} v{} rank {} prefix {}",
            self.instance_id, self.dodag_id, self.version, self.rank, self.dest
        )
    }
}

/// Build a DIS soliciting DIOs from every neighbor.
pub fn build_dis() -> Result<GrowBuffer, Full> {
    emit(&RplRepr::DodagInformationSolicitation(
        DodagInformationSolicitation::default(),
    ))
}

fn emit(repr: &RplRepr) -> Result<GrowBuffer, Full> {
    let mut buffer = GrowBuffer::new();
    buffer.pad(repr.buffer_len())?;
    repr.emit(&mut Icmpv6Packet::new_unchecked(buffer.as_mut_slice()));
    Ok(buffer)
}

fn append_option(buffer: &mut GrowBuffer, option: &RplOptionRepr) -> Result<(), Full> {
    let start = buffer.len();
    buffer.pad(option.buffer_len())?;
    option.emit(&mut RplOptionPacket::new_unchecked(
        &mut buffer.as_mut_slice()[start..],
    ));
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DEFAULT_DIO_INTERVAL;
    use crate::wire::RplDaoAck;

    const DODAG_ID: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
    const A: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 0xa);
    const B: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 0xb);
    const T: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 7);

    fn prefix() -> Ipv6Cidr {
        Ipv6Cidr::new(Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 0), 64)
    }

    fn dag(rank: Rank) -> Dag {
        Dag::new(
            RplInstanceId::from(1),
            DODAG_ID,
            rank,
            1,
            prefix(),
            DioTimer::fixed(DEFAULT_DIO_INTERVAL),
        )
    }

    fn parse(buffer: &GrowBuffer) -> RplRepr<'_> {
        RplRepr::parse(&Icmpv6Packet::new_checked(buffer.as_slice()).unwrap()).unwrap()
    }

    #[test]
    fn dio_fields_survive_the_wire() {
        let mut dag = dag(Rank::new(256));
        let expected = dag.dio_repr();
        let buffer = dag.build_dio().unwrap();
        assert_eq!(parse(&buffer), expected);
        assert_eq!(dag.dtsn(), 1);
    }

    #[test]
    fn counters_wrap() {
        let mut dag = dag(Rank::ROOT);
        for _ in 0..256 {
            dag.build_dio().unwrap();
            dag.build_dao().unwrap();
        }
        assert_eq!(dag.dtsn(), 0);
        assert_eq!(dag.dsn(), 0);
        assert_eq!(dag.pending_acks().len(), MAX_PENDING_DAO_ACKS);
        assert_eq!(dag.pending_acks()[MAX_PENDING_DAO_ACKS - 1], 255);
    }

    #[test]
    fn parent_selection() {
        let mut dag = dag(Rank::INFINITE);
        assert!(dag.select_parent(A, Rank::new(5)));
        assert_eq!(dag.rank(), Rank::new(6));
        assert!(dag.select_parent(B, Rank::new(3)));
        assert_eq!(dag.rank(), Rank::new(4));
        assert!(!dag.select_parent(A, Rank::new(5)));
        assert_eq!(dag.parent().map(|p| p.address), Some(B));
        assert_eq!(dag.rank(), Rank::new(4));
    }

    #[test]
    fn root_never_takes_a_parent() {
        let mut dag = dag(Rank::ROOT);
        assert!(dag.is_root());
        assert!(!dag.select_parent(A, Rank::ROOT));
        assert_eq!(dag.rank(), Rank::ROOT);
    }

    #[test]
    fn dao_lists_self_then_children() {
        let mut dag = dag(Rank::new(2));
        dag.self_address = Some(Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 2));
        dag.register_target(T, A);

        let buffer = dag.build_dao().unwrap();
        match parse(&buffer) {
            RplRepr::DestinationAdvertisementObject(dao) => {
                assert_eq!(dao.sequence, 0);
                assert!(dao.expect_ack);
                assert_eq!(dao.dodag_id, Some(DODAG_ID));
                let targets: Vec<_> = dao
                    .options
                    .iter()
                    .map(|o| match o {
                        RplOptionRepr::RplTarget(t) => t.prefix.address(),
                        _ => unreachable!(),
                    })
                    .collect();
                assert_eq!(targets, vec![dag.self_address().unwrap(), T]);
            }
            _ => unreachable!(),
        }
        assert_eq!(dag.pending_acks(), &[0]);
        assert!(dag.ack_pending(0));
        assert!(!dag.ack_pending(0));
    }

    #[test]
    fn dao_ack_echoes_sequence() {
        let dag = dag(Rank::ROOT);
        let buffer = dag.build_dao_ack(42, 0).unwrap();
        assert_eq!(buffer.len(), 25);
        assert_eq!(
            parse(&buffer),
            RplRepr::DestinationAdvertisementObjectAck(RplDaoAck {
                rpl_instance_id: RplInstanceId::from(1),
                sequence: 42,
                status: 0,
                dodag_id: Some(DODAG_ID),
            })
        );
    }

    #[test]
    fn dis_is_six_octets() {
        let buffer = build_dis().unwrap();
        assert_eq!(buffer.as_slice(), &[0x9b, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn route_tree_follows_dao_senders() {
        let mut dag = dag(Rank::ROOT);
        assert!(dag.register_target(A, A));
        assert!(dag.register_target(T, A));
        assert!(!dag.register_target(T, A));

        assert_eq!(
            dag.route_path(&T),
            Some(vec![(T, T), (A, A), (DODAG_ID, DODAG_ID)])
        );
        assert_eq!(dag.route_path(&B), None);
    }
}
