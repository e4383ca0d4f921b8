use std::collections::BTreeMap;

use super::rpl::{Dag, DagError, DioTimer, OneShotTimer, Rank};
use crate::config::MAX_LINK_ADDR_LEN;
use crate::wire::{Ipv6Address, Ipv6AddressExt, Ipv6Cidr, RplInstanceId};

/// The DODAGs sharing one RPL instance identifier on an interface.
#[derive(Debug, Default, Clone)]
pub struct RplInstance {
    dags: BTreeMap<Ipv6Address, Dag>,
}

impl RplInstance {
    pub fn dag(&self, dodag_id: &Ipv6Address) -> Option<&Dag> {
        self.dags.get(dodag_id)
    }

    pub fn dags(&self) -> impl Iterator<Item = &Dag> + '_ {
        self.dags.values()
    }

    pub fn len(&self) -> usize {
        self.dags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dags.is_empty()
    }
}

/// A network attachment point the daemon runs RPL on.
#[derive(Debug)]
pub struct Interface {
    index: u32,
    name: String,
    link_addr: heapless::Vec<u8, MAX_LINK_ADDR_LEN>,
    addresses: Vec<Ipv6Address>,
    root: bool,
    instances: BTreeMap<RplInstanceId, RplInstance>,
    pub(crate) dis_timer: OneShotTimer,
}

impl Interface {
    /// Create an interface. Link-layer addresses longer than eight octets
    /// are truncated away, which leaves the interface without SLAAC.
    pub fn new(index: u32, name: &str, link_addr: &[u8], root: bool) -> Self {
        let mut ll = heapless::Vec::new();
        if ll.extend_from_slice(link_addr).is_err() {
            net_warn!("{}: link-layer address of {} octets ignored", name, link_addr.len());
        }
        Self {
            index,
            name: name.to_string(),
            link_addr: ll,
            addresses: Vec::new(),
            root,
            instances: BTreeMap::new(),
            dis_timer: OneShotTimer::default(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link_addr(&self) -> &[u8] {
        &self.link_addr
    }

    /// Whether the interface roots its configured DODAGs.
    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn addresses(&self) -> &[Ipv6Address] {
        &self.addresses
    }

    pub fn add_address(&mut self, address: Ipv6Address) {
        if !self.addresses.contains(&address) {
            self.addresses.push(address);
        }
    }

    /// The first link-local address, used as the source of outgoing messages.
    pub fn link_local(&self) -> Option<Ipv6Address> {
        self.addresses.iter().copied().find(|a| a.is_link_local())
    }

    /// Address this interface would take in `prefix` by stateless
    /// autoconfiguration.
    pub fn slaac(&self, prefix: &Ipv6Cidr) -> Option<Ipv6Address> {
        prefix.slaac(&self.link_addr)
    }

    /// Create a DODAG, and its RPL instance if needed.
    pub fn create_dag(
        &mut self,
        instance_id: RplInstanceId,
        dodag_id: Ipv6Address,
        rank: Rank,
        version: u8,
        dest: Ipv6Cidr,
        dio_timer: DioTimer,
    ) -> Result<&mut Dag, DagError> {
        let instance = self.instances.entry(instance_id).or_default();
        if instance.dags.contains_key(&dodag_id) {
            return Err(DagError::Duplicate);
        }

        let dag = Dag::new(instance_id, dodag_id, rank, version, dest, dio_timer);
        net_info!("{}: created {}", self.name, dag);
        Ok(instance.dags.entry(dodag_id).or_insert(dag))
    }

    pub fn find_instance(&self, instance_id: RplInstanceId) -> Option<&RplInstance> {
        self.instances.get(&instance_id)
    }

    pub fn find_dag(&self, instance_id: RplInstanceId, dodag_id: &Ipv6Address) -> Option<&Dag> {
        self.instances.get(&instance_id)?.dags.get(dodag_id)
    }

    pub fn find_dag_mut(
        &mut self,
        instance_id: RplInstanceId,
        dodag_id: &Ipv6Address,
    ) -> Option<&mut Dag> {
        self.instances.get_mut(&instance_id)?.dags.get_mut(dodag_id)
    }

    /// The DODAG a message without a DODAGID refers to: the first one of
    /// the instance.
    pub(crate) fn first_dag_mut(&mut self, instance_id: RplInstanceId) -> Option<&mut Dag> {
        self.instances.get_mut(&instance_id)?.dags.values_mut().next()
    }

    /// Every DODAG on the interface, by instance then DODAGID.
    pub fn dags(&self) -> impl Iterator<Item = &Dag> + '_ {
        self.instances.values().flat_map(|i| i.dags.values())
    }

    pub fn dags_mut(&mut self) -> impl Iterator<Item = &mut Dag> + '_ {
        self.instances.values_mut().flat_map(|i| i.dags.values_mut())
    }
}
