//! Length-prefixed framing over the raw stream.
//!
//! The halves are boxed so TCP sockets and in-memory test streams share
//! one code path.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{DriverError, DriverResult};
use crate::protocol::MAX_MESSAGE_SIZE;

pub(crate) type StreamReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type StreamWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Read one `[u32 LE length][payload]` frame and return the payload.
/// Any EOF or read failure surfaces as `ConnectionClosed`.
pub(crate) async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> DriverResult<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|_| DriverError::ConnectionClosed)?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(DriverError::ProtocolViolation(format!(
            "frame of {} bytes exceeds the {} byte limit",
            len, MAX_MESSAGE_SIZE
        )));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|_| DriverError::ConnectionClosed)?;
    Ok(payload)
}

/// Write one already-framed message (length prefix included) and flush.
/// The caller must hold the connection's write permit so the frame is
/// never interleaved with another submitter's bytes.
pub(crate) async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &[u8],
) -> DriverResult<()> {
    writer
        .write_all(frame)
        .await
        .map_err(|_| DriverError::ConnectionClosed)?;
    writer
        .flush()
        .await
        .map_err(|_| DriverError::ConnectionClosed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let mut frame = (5u32).to_le_bytes().to_vec();
        frame.extend_from_slice(b"hello");
        write_frame(&mut client, &frame).await.unwrap();

        let payload = read_frame(&mut server).await.unwrap();
        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn test_eof_maps_to_connection_closed() {
        let (client, mut server) = tokio::io::duplex(1024);
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, DriverError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_mid_frame_eof_maps_to_connection_closed() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        // Announce 100 bytes but deliver only 3.
        client.write_all(&(100u32).to_le_bytes()).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, DriverError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_oversize_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        client
            .write_all(&(u32::MAX).to_le_bytes())
            .await
            .unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, DriverError::ProtocolViolation(_)));
    }
}
