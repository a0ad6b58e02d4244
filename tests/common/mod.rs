//! Scriptable in-memory server for driver tests.
//!
//! Speaks the real wire protocol over any stream, so tests can hand the
//! driver one end of a `tokio::io::duplex` pipe (or a TCP socket) and
//! script the other end response by response.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};

use reefdb_client::convert::value_to_datum;
use reefdb_client::proto::{Query, Response, ResponseType};
use reefdb_client::protocol::{decode_query, encode_response, PROTOCOL_VERSION};
use serde_json::Value;

pub struct MockServer<S = DuplexStream> {
    stream: S,
}

impl MockServer<DuplexStream> {
    /// An in-memory pipe: the server side, and the client side to hand to
    /// `ConnectionBuilder::connect_stream`.
    pub fn pair() -> (MockServer<DuplexStream>, DuplexStream) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        (MockServer { stream: server }, client)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> MockServer<S> {
    pub fn over(stream: S) -> MockServer<S> {
        MockServer { stream }
    }

    /// Consume and check the bare 4-byte version tag the client sends
    /// before any frame.
    pub async fn expect_handshake(&mut self) {
        let mut tag = [0u8; 4];
        self.stream.read_exact(&mut tag).await.expect("handshake read");
        assert_eq!(u32::from_le_bytes(tag), PROTOCOL_VERSION);
    }

    /// Read one framed query.
    pub async fn read_query(&mut self) -> Query {
        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .expect("frame length read");
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        self.stream
            .read_exact(&mut payload)
            .await
            .expect("frame payload read");
        decode_query(&payload).expect("query decode")
    }

    /// Write one framed response.
    pub async fn send_response(&mut self, response: &Response) {
        let frame = encode_response(response).expect("response encode");
        self.stream.write_all(&frame).await.expect("frame write");
        self.stream.flush().await.expect("frame flush");
    }
}

// ==================== Response Fixtures ====================

pub fn atom(token: u64, value: Value) -> Response {
    success(ResponseType::SuccessAtom, token, &[value])
}

pub fn partial(token: u64, values: &[Value]) -> Response {
    success(ResponseType::SuccessPartial, token, values)
}

pub fn sequence(token: u64, values: &[Value]) -> Response {
    success(ResponseType::SuccessSequence, token, values)
}

pub fn server_error(kind: ResponseType, token: u64, message: &str) -> Response {
    Response {
        r#type: Some(kind as i32),
        token: Some(token),
        response: vec![value_to_datum(&Value::String(message.to_string()))],
        backtrace: None,
    }
}

fn success(kind: ResponseType, token: u64, values: &[Value]) -> Response {
    Response {
        r#type: Some(kind as i32),
        token: Some(token),
        response: values.iter().map(value_to_datum).collect(),
        backtrace: None,
    }
}
