use ipnetwork::Ipv4Network;
use std::fmt;
use std::net::Ipv4Addr;

/// Identity of a kernel route: destination plus metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub destination: Ipv4Network,
    pub metric: u32,
}

impl RouteKey {
    pub fn new(destination: Ipv4Network, metric: u32) -> Self {
        Self {
            destination,
            metric,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} metric {}", self.destination, self.metric)
    }
}

/// Full kernel route: one next-hop is a plain gateway route, several form a multipath route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub key: RouteKey,
    pub next_hops: Vec<Ipv4Addr>,
}

impl RouteSpec {
    pub fn new(key: RouteKey, next_hops: Vec<Ipv4Addr>) -> Self {
        Self { key, next_hops }
    }

    pub fn is_multipath(&self) -> bool {
        self.next_hops.len() > 1
    }
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key.destination)?;
        for hop in &self.next_hops {
            write!(f, " via {}", hop)?;
        }
        write!(f, " metric {}", self.key.metric)
    }
}
