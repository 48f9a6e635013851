use super::netlink::{
    self, NetlinkSocket, NLMSG_DONE, NLM_F_CREATE, NLM_F_EXCL, NLM_F_REPLACE, RTM_DELROUTE,
    RTM_NEWROUTE, RT_TABLE_MAIN,
};
use async_trait::async_trait;
use bgp_dns_application::ports::KernelRouteTable;
use bgp_dns_domain::{DomainError, RouteKey, RouteSpec};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

const RECV_BUFFER: usize = 32 * 1024;

/// Main-table IPv4 routes over rtnetlink, tagged with one protocol number.
pub struct NetlinkRouteTable {
    protocol: u8,
    metric: u32,
    seq: AtomicU32,
}

impl NetlinkRouteTable {
    /// Opens a throwaway netlink socket so a missing capability fails at startup.
    pub fn new(protocol: u8, metric: u32) -> Result<Self, DomainError> {
        NetlinkSocket::new()
            .map_err(|e| DomainError::KernelRoute(format!("netlink socket: {}", e)))?;
        Ok(Self {
            protocol,
            metric,
            seq: AtomicU32::new(1),
        })
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, route: String, msg: Vec<u8>) -> Result<(), DomainError> {
        tokio::task::spawn_blocking(move || transact(&route, &msg))
            .await
            .map_err(|e| DomainError::KernelRoute(format!("netlink task: {}", e)))?
    }

    async fn write(&self, route: &RouteSpec, flags: u16) -> Result<(), DomainError> {
        let msg = netlink::route_request(
            RTM_NEWROUTE,
            flags,
            self.next_seq(),
            self.protocol,
            route.key.destination,
            route.key.metric,
            &route.next_hops,
        );
        self.request(route.to_string(), msg).await
    }
}

/// Send one request and wait for its ACK.
fn transact(route: &str, msg: &[u8]) -> Result<(), DomainError> {
    let socket = NetlinkSocket::new()
        .map_err(|e| DomainError::KernelRoute(format!("netlink socket: {}", e)))?;
    socket
        .send(msg)
        .map_err(|e| DomainError::KernelRoute(format!("{}: send: {}", route, e)))?;

    let mut buf = vec![0u8; RECV_BUFFER];
    let len = socket
        .recv(&mut buf)
        .map_err(|e| DomainError::KernelRoute(format!("{}: recv: {}", route, e)))?;

    for message in netlink::messages(&buf[..len]) {
        match netlink::error_code(&message) {
            Some(0) => return Ok(()),
            Some(code) if -code == libc::EEXIST => {
                return Err(DomainError::KernelRouteExists(route.to_string()))
            }
            Some(code) => {
                let err = std::io::Error::from_raw_os_error(-code);
                return Err(DomainError::KernelRoute(format!("{}: {}", route, err)));
            }
            None => continue,
        }
    }
    Err(DomainError::KernelRoute(format!("{}: no acknowledgement", route)))
}

fn dump(seq: u32, protocol: u8, metric: u32) -> Result<Vec<RouteSpec>, DomainError> {
    let socket = NetlinkSocket::new()
        .map_err(|e| DomainError::KernelRoute(format!("netlink socket: {}", e)))?;
    socket
        .send(&netlink::dump_request(seq))
        .map_err(|e| DomainError::KernelRoute(format!("route dump: send: {}", e)))?;

    let mut routes = Vec::new();
    let mut buf = vec![0u8; RECV_BUFFER];
    loop {
        let len = socket
            .recv(&mut buf)
            .map_err(|e| DomainError::KernelRoute(format!("route dump: recv: {}", e)))?;
        if len == 0 {
            return Ok(routes);
        }

        for message in netlink::messages(&buf[..len]) {
            if message.header.nlmsg_type == NLMSG_DONE {
                return Ok(routes);
            }
            if let Some(code) = netlink::error_code(&message) {
                let err = std::io::Error::from_raw_os_error(-code);
                return Err(DomainError::KernelRoute(format!("route dump: {}", err)));
            }
            if message.header.nlmsg_type != RTM_NEWROUTE {
                continue;
            }
            let Some(entry) = netlink::parse_route(message.payload) else {
                continue;
            };
            if entry.header.rtm_protocol != protocol
                || entry.table != u32::from(RT_TABLE_MAIN)
                || entry.metric != metric
                || entry.next_hops.is_empty()
            {
                continue;
            }
            routes.push(RouteSpec::new(
                RouteKey::new(entry.destination, entry.metric),
                entry.next_hops,
            ));
        }
    }
}

#[async_trait]
impl KernelRouteTable for NetlinkRouteTable {
    async fn add(&self, route: &RouteSpec) -> Result<(), DomainError> {
        debug!(route = %route, "netlink add");
        self.write(route, NLM_F_CREATE | NLM_F_EXCL).await
    }

    async fn replace(&self, route: &RouteSpec) -> Result<(), DomainError> {
        debug!(route = %route, "netlink replace");
        self.write(route, NLM_F_CREATE | NLM_F_REPLACE).await
    }

    async fn delete(&self, key: &RouteKey) -> Result<(), DomainError> {
        debug!(route = %key, "netlink delete");
        let msg = netlink::route_request(
            RTM_DELROUTE,
            0,
            self.next_seq(),
            self.protocol,
            key.destination,
            key.metric,
            &[],
        );
        self.request(key.to_string(), msg).await
    }

    async fn list(&self) -> Result<Vec<RouteSpec>, DomainError> {
        let (seq, protocol, metric) = (self.next_seq(), self.protocol, self.metric);
        let routes = tokio::task::spawn_blocking(move || dump(seq, protocol, metric))
            .await
            .map_err(|e| DomainError::KernelRoute(format!("netlink task: {}", e)))??;
        if routes.is_empty() {
            debug!(protocol, metric, "No kernel routes to adopt");
        } else {
            warn!(count = routes.len(), protocol, "Found kernel routes from a previous run");
        }
        Ok(routes)
    }
}
