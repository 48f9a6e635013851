use bytes::Bytes;
use std::net::Ipv4Addr;

/// Response code class of an upstream answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    NoError,
    NxDomain,
    /// Any other response code (SERVFAIL, REFUSED, ...), numeric value kept for logging.
    Failure { rcode: u16 },
}

/// Decoded upstream reply to an A query.
#[derive(Debug, Clone)]
pub struct UpstreamAnswer {
    pub status: AnswerStatus,
    pub addresses: Vec<Ipv4Addr>,
    /// Largest TTL across the A records, `None` without A records.
    pub ttl: Option<u32>,
    /// Complete wire response, replayed to DNS clients.
    pub raw: Bytes,
}

impl UpstreamAnswer {
    pub fn is_nxdomain(&self) -> bool {
        self.status == AnswerStatus::NxDomain
    }

    pub fn is_empty(&self) -> bool {
        self.status == AnswerStatus::NoError && self.addresses.is_empty()
    }
}
