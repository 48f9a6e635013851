use crate::Community;
use ipnetwork::{IpNetwork, Ipv4Network};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// AFI/SAFI pair of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4Unicast,
    Ipv6Unicast,
    Other { afi: u16, safi: u8 },
}

/// ORIGIN path attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathOrigin {
    #[default]
    Igp,
    Egp,
    Incomplete,
}

/// Containment mode for RIB lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixLookup {
    /// Only the exact prefix.
    Exact,
    /// The prefix itself and every less specific prefix covering it.
    ShorterOrEqual,
    /// The prefix itself and every more specific prefix inside it.
    Longer,
}

/// A single BGP path as exchanged with the routing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpPath {
    pub family: AddressFamily,
    pub prefix: IpNetwork,
    pub next_hop: IpAddr,
    pub origin: PathOrigin,
    pub as_path: Vec<u32>,
    /// `None` when the COMMUNITIES attribute is absent altogether.
    pub communities: Option<Vec<Community>>,
    pub is_withdraw: bool,
}

impl BgpPath {
    /// Locally originated /32 for a resolved address.
    pub fn host_route(
        address: Ipv4Addr,
        router_id: Ipv4Addr,
        local_asn: u32,
        communities: &[Community],
    ) -> Self {
        Self {
            family: AddressFamily::Ipv4Unicast,
            prefix: IpNetwork::V4(Ipv4Network::from(address)),
            next_hop: IpAddr::V4(router_id),
            origin: PathOrigin::Igp,
            as_path: vec![local_asn],
            communities: if communities.is_empty() {
                None
            } else {
                Some(communities.to_vec())
            },
            is_withdraw: false,
        }
    }

    pub fn withdrawn(mut self) -> Self {
        self.is_withdraw = true;
        self
    }

    pub fn ipv4_prefix(&self) -> Option<Ipv4Network> {
        match (self.family, self.prefix) {
            (AddressFamily::Ipv4Unicast, IpNetwork::V4(net)) => Some(net),
            _ => None,
        }
    }

    pub fn ipv4_next_hop(&self) -> Option<Ipv4Addr> {
        match self.next_hop {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        }
    }

    pub fn has_community(&self, community: Community) -> bool {
        self.communities
            .as_deref()
            .is_some_and(|list| list.contains(&community))
    }
}

impl fmt::Display for BgpPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}", self.prefix, self.next_hop)?;
        if self.is_withdraw {
            f.write_str(" (withdrawn)")?;
        }
        Ok(())
    }
}
