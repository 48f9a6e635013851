#![allow(dead_code)]

pub mod dns_server_mock;
pub mod scripted_transport;

pub use dns_server_mock::MockDnsServer;
pub use scripted_transport::{Behavior, ScriptedTransport};

use bgp_dns_domain::config::PeerConfig;
use bgp_dns_domain::{BgpPath, Community};
use hickory_proto::op::{Message, OpCode, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use ipnetwork::{IpNetwork, Ipv4Network};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const ROUTER_ID: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
pub const LOCAL_ASN: u32 = 65001;

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

pub fn server(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([198, 51, 100, last_octet], 53))
}

/// Reply to `query` echoing its id and question.
pub fn build_reply(query: &Message, rcode: ResponseCode, ips: &[Ipv4Addr], ttl: u32) -> Vec<u8> {
    let mut reply = Message::response(query.id(), OpCode::Query);
    reply.set_recursion_desired(true);
    reply.set_recursion_available(true);
    reply.set_response_code(rcode);
    for q in query.queries() {
        reply.add_query(q.clone());
    }
    if let Some(q) = query.queries().first() {
        for addr in ips {
            reply.add_answer(Record::from_rdata(q.name().clone(), ttl, RData::A(A(*addr))));
        }
    }
    reply.to_vec().unwrap()
}

pub fn peer(address: &str, asn: u32, communities: &[Community]) -> PeerConfig {
    PeerConfig {
        address: address.parse().unwrap(),
        asn,
        multihop: None,
        passive: false,
        communities: communities.to_vec(),
    }
}

pub fn path(prefix: &str, next_hop: &str, communities: Option<Vec<Community>>) -> BgpPath {
    let net: Ipv4Network = prefix.parse().unwrap();
    BgpPath {
        prefix: IpNetwork::V4(net),
        next_hop: IpAddr::V4(ip(next_hop)),
        communities,
        ..BgpPath::host_route(net.network(), ROUTER_ID, LOCAL_ASN, &[])
    }
}
