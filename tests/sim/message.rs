use rpld::time::Instant;
use rpld::wire::{Icmpv6Packet, Ipv6Address, RplRepr, LINK_LOCAL_ALL_RPL_NODES};

/// A datagram that crossed the simulated link.
#[derive(Debug, Clone)]
pub struct Message {
    pub at: Instant,
    /// Id of the sending node.
    pub from: usize,
    pub src: Ipv6Address,
    pub dst: Ipv6Address,
    pub data: Vec<u8>,
}

impl Message {
    pub fn is_broadcast(&self) -> bool {
        self.dst == LINK_LOCAL_ALL_RPL_NODES
    }

    pub fn repr(&self) -> Option<RplRepr<'_>> {
        let packet = Icmpv6Packet::new_checked(&self.data[..]).ok()?;
        RplRepr::parse(&packet).ok()
    }

    pub fn is_dis(&self) -> bool {
        matches!(self.repr(), Some(RplRepr::DodagInformationSolicitation(_)))
    }

    pub fn is_dio(&self) -> bool {
        matches!(self.repr(), Some(RplRepr::DodagInformationObject(_)))
    }

    pub fn is_dao(&self) -> bool {
        matches!(self.repr(), Some(RplRepr::DestinationAdvertisementObject(_)))
    }

    pub fn is_dao_ack(&self) -> bool {
        matches!(
            self.repr(),
            Some(RplRepr::DestinationAdvertisementObjectAck(_))
        )
    }
}
