//! Framing and codec for the driver protocol.
//!
//! Every message travels as `[u32 LE length][payload]`, where the payload
//! is a protobuf-encoded [`Query`] (outbound) or [`Response`] (inbound).
//! Both directions are provided so tooling and tests can script a server
//! end of the wire.

use prost::Message;

use crate::error::{DriverError, DriverResult};
use crate::proto::{Query, Response};

/// Version tag sent immediately after connecting, as a bare 4-byte
/// little-endian integer with no length prefix.
pub const PROTOCOL_VERSION: u32 = 0x3f61_ba36;

/// Maximum frame payload size (16 MB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Encode a query with its length prefix, ready to go out as one frame.
pub fn encode_query(query: &Query) -> DriverResult<Vec<u8>> {
    frame(query.encode_to_vec())
}

/// Decode a query payload (without its length prefix).
pub fn decode_query(data: &[u8]) -> DriverResult<Query> {
    Query::decode(data)
        .map_err(|e| DriverError::ProtocolViolation(format!("query decode failed: {}", e)))
}

/// Encode a response with its length prefix.
pub fn encode_response(response: &Response) -> DriverResult<Vec<u8>> {
    frame(response.encode_to_vec())
}

/// Decode a response payload (without its length prefix).
pub fn decode_response(data: &[u8]) -> DriverResult<Response> {
    Response::decode(data)
        .map_err(|e| DriverError::ProtocolViolation(format!("response decode failed: {}", e)))
}

fn frame(payload: Vec<u8>) -> DriverResult<Vec<u8>> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(DriverError::ProtocolViolation(format!(
            "message of {} bytes exceeds the {} byte frame limit",
            payload.len(),
            MAX_MESSAGE_SIZE
        )));
    }

    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}
