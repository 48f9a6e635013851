//! DNS Message Builder
//!
//! Constructs A queries and cached replies in wire format using `hickory-proto`.

use bgp_dns_domain::{DomainError, Fqdn};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, Record, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::str::FromStr;

/// Builds DNS query messages in wire format
pub struct MessageBuilder;

impl MessageBuilder {
    /// Build a recursive A query for `name`.
    ///
    /// Returns the random message ID alongside the serialized bytes so the
    /// caller can match the reply.
    pub fn build_a_query(name: &Fqdn) -> Result<(u16, Vec<u8>), DomainError> {
        let qname = Name::from_str(name.as_str()).map_err(|e| {
            DomainError::InvalidDomainName(format!("Invalid domain '{}': {}", name, e))
        })?;

        let id = fastrand::u16(..);
        let mut message = Message::new(id, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(Query::query(qname, RecordType::A));

        let bytes = Self::serialize_message(&message)?;
        Ok((id, bytes))
    }

    /// Serialize a DNS message to wire format
    pub fn serialize_message(message: &Message) -> Result<Vec<u8>, DomainError> {
        let mut buffer = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buffer);
        message.emit(&mut encoder).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to serialize DNS message: {}", e))
        })?;
        Ok(buffer)
    }

    /// Answer `request` from a cached upstream response.
    ///
    /// The reply carries the client's ID and question, and every record of
    /// the cached answer section with its TTL set to `ttl`.
    pub fn build_cached_reply(
        request: &Message,
        cached: &[u8],
        ttl: u32,
    ) -> Result<Vec<u8>, DomainError> {
        let cached = Message::from_vec(cached).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to parse cached response: {}", e))
        })?;

        let mut reply = Message::response(request.id(), OpCode::Query);
        reply.set_recursion_desired(request.recursion_desired());
        reply.set_recursion_available(true);
        reply.set_response_code(cached.response_code());
        for query in request.queries() {
            reply.add_query(query.clone());
        }
        for record in cached.answers() {
            reply.add_answer(Record::from_rdata(
                record.name().clone(),
                ttl,
                record.data().clone(),
            ));
        }

        Self::serialize_message(&reply)
    }
}

