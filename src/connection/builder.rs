//! Connection configuration.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::DriverResult;

use super::{Connection, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};

/// Builder for a [`Connection`].
///
/// ```rust,no_run
/// use reefdb_client::ConnectionBuilder;
///
/// #[tokio::main]
/// async fn main() -> Result<(), reefdb_client::DriverError> {
///     let conn = ConnectionBuilder::new("db1.example.com:28015")
///         .endpoint("db2.example.com:28015")
///         .db("blog")
///         .connect()
///         .await?;
///     conn.dispose().await;
///     Ok(())
/// }
/// ```
pub struct ConnectionBuilder {
    pub(super) endpoints: Vec<String>,
    pub(super) db: Option<String>,
    pub(super) connect_timeout: Duration,
    pub(super) request_timeout: Duration,
}

impl ConnectionBuilder {
    /// Start from a `host:port` endpoint.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoints: vec![endpoint.to_string()],
            db: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Add a fallback endpoint. Candidates are tried in the order given.
    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoints.push(endpoint.to_string());
        self
    }

    /// Default database for queries that reference a bare table.
    pub fn db(mut self, name: &str) -> Self {
        self.db = Some(name.to_string());
        self
    }

    /// Overall deadline for dialing and the version handshake.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Per-request deadline, measured from the start of each submission.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Dial the configured endpoints and perform the version handshake.
    pub async fn connect(self) -> DriverResult<Connection> {
        Connection::establish(self).await
    }

    /// Establish over an already-open stream (tunnels, tests). Skips
    /// dialing but still performs the version handshake.
    pub async fn connect_stream<S>(self, stream: S) -> DriverResult<Connection>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Connection::start(&self, stream).await
    }
}
