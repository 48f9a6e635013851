use bgp_dns_domain::config::PeerConfig;
use bgp_dns_domain::{AddressFamily, BgpPath, Community};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Accept,
    Reject,
}

/// Accepts paths of one family and stamps extra communities on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportStatement {
    pub family: AddressFamily,
    pub add_communities: Vec<Community>,
}

impl ExportStatement {
    fn apply(&self, path: &BgpPath) -> Option<BgpPath> {
        if path.family != self.family {
            return None;
        }
        let mut exported = path.clone();
        let list = exported.communities.get_or_insert_with(Vec::new);
        for c in &self.add_communities {
            if !list.contains(c) {
                list.push(*c);
            }
        }
        Some(exported)
    }
}

/// Export policy attached to one neighbor.
///
/// Export accepts everything towards iBGP neighbors and
/// rejects by default towards eBGP neighbors, unless the neighbor has
/// communities configured: those become an export statement for IPv4 unicast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPolicy {
    pub name: String,
    pub export_default: PolicyAction,
    pub statements: Vec<ExportStatement>,
}

impl PeerPolicy {
    pub fn for_peer(peer: &PeerConfig, local_asn: u32) -> Self {
        let export_default = if peer.is_ibgp(local_asn) {
            PolicyAction::Accept
        } else {
            PolicyAction::Reject
        };

        let statements = if peer.communities.is_empty() {
            Vec::new()
        } else {
            vec![ExportStatement {
                family: AddressFamily::Ipv4Unicast,
                add_communities: peer.communities.clone(),
            }]
        };

        Self {
            name: Self::name_for(peer),
            export_default,
            statements,
        }
    }

    /// `peer-192-0-2-7` for 192.0.2.7, colons become dashes for IPv6.
    pub fn name_for(peer: &PeerConfig) -> String {
        let addr: String = peer
            .address
            .to_string()
            .chars()
            .map(|c| if c == '.' || c == ':' { '-' } else { c })
            .collect();
        format!("peer-{}", addr)
    }

    /// The path as it would be sent to this neighbor, or `None` if rejected.
    pub fn export(&self, path: &BgpPath) -> Option<BgpPath> {
        if let Some(exported) = self.statements.iter().find_map(|s| s.apply(path)) {
            return Some(exported);
        }
        match self.export_default {
            PolicyAction::Accept => Some(path.clone()),
            PolicyAction::Reject => None,
        }
    }
}
