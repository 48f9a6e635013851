use bgp_dns_domain::{AnswerStatus, DomainError, UpstreamAnswer};
use bytes::Bytes;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RData;

pub struct ResponseParser;

impl ResponseParser {
    /// Decode wire bytes into a message.
    pub fn decode(response_bytes: &[u8]) -> Result<Message, DomainError> {
        Message::from_vec(response_bytes).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to parse DNS response: {}", e))
        })
    }

    /// Extract the A records of an already decoded reply.
    ///
    /// The answer TTL is the largest TTL across A records. CNAMEs and other
    /// record types are skipped; the raw bytes are kept for replay.
    pub fn to_answer(message: &Message, raw: Bytes) -> UpstreamAnswer {
        let status = match message.response_code() {
            ResponseCode::NoError => AnswerStatus::NoError,
            ResponseCode::NXDomain => AnswerStatus::NxDomain,
            other => AnswerStatus::Failure {
                rcode: u16::from(other),
            },
        };

        let mut addresses = Vec::new();
        let mut ttl: Option<u32> = None;
        for record in message.answers() {
            if let RData::A(a) = record.data() {
                addresses.push(a.0);
                ttl = Some(ttl.map_or(record.ttl(), |t| t.max(record.ttl())));
            }
        }

        UpstreamAnswer {
            status,
            addresses,
            ttl,
            raw,
        }
    }

    pub fn parse_bytes(response_bytes: Bytes) -> Result<UpstreamAnswer, DomainError> {
        let message = Self::decode(&response_bytes)?;
        Ok(Self::to_answer(&message, response_bytes))
    }

    /// Response codes that count as a failed attempt and move on to the next resolver.
    pub fn is_server_error(code: ResponseCode) -> bool {
        matches!(code, ResponseCode::ServFail | ResponseCode::Refused)
    }
}
