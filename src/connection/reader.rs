//! The reader demultiplexer.
//!
//! A single task owns the read half for the life of the connection: it
//! reads frames, decodes each into a response, and routes it to the
//! pending slot keyed by its token. Responses whose token is no longer
//! registered (cancelled or timed-out requests) are dropped.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::DriverError;
use crate::protocol;

use super::transport::{self, StreamReader};
use super::ConnectionInner;

/// Runs until the stream closes, a frame fails to decode, or the shutdown
/// signal fires. On every exit path the connection is marked closed first
/// and every still-armed slot then completes with `ConnectionClosed`.
pub(crate) async fn read_loop(
    mut reader: StreamReader,
    inner: Arc<ConnectionInner>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let frame = tokio::select! {
            _ = &mut shutdown => break,
            frame = transport::read_frame(&mut reader) => frame,
        };

        let payload = match frame {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("reader stopping: {}", e);
                break;
            }
        };

        let response = match protocol::decode_response(&payload) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("reader stopping on undecodable frame: {}", e);
                break;
            }
        };

        let token = response.token();
        match inner.registry.take(token) {
            Some(slot) => {
                // A send failure means the submitter gave up waiting.
                let _ = slot.send(Ok(response));
            }
            None => tracing::debug!("dropping response for unknown token {}", token),
        }
    }

    inner.mark_closed();
    for slot in inner.registry.drain() {
        let _ = slot.send(Err(DriverError::ConnectionClosed));
    }
}
