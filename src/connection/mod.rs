//! Connection lifecycle, the submission primitive, and the typed run
//! surfaces.
//!
//! A connection multiplexes any number of concurrent queries over one
//! stream socket. Each submission allocates a fresh token, arms a
//! completion slot in the pending registry, and writes its frame under the
//! connection's write permit; a single reader task demultiplexes responses
//! back to their slots by token.

mod builder;
mod cursor;
mod reader;
mod registry;
mod transport;

pub use builder::ConnectionBuilder;
pub use cursor::Cursor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::convert;
use crate::error::{DriverError, DriverResult};
use crate::proto::{Query, QueryPair, QueryType, Response, ResponseType, Term};
use crate::protocol::{self, PROTOCOL_VERSION};
use crate::query;

use registry::{PendingRegistry, TokenAllocator};
use transport::StreamWriter;

pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Acknowledgement returned by write operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub inserted: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub replaced: u64,
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub first_error: Option<String>,
    /// Primary keys the server generated for inserted documents that did
    /// not carry one.
    #[serde(default)]
    pub generated_keys: Vec<String>,
}

/// State shared between the facade, submitters, cursors, and the reader.
pub(crate) struct ConnectionInner {
    pub(crate) tokens: TokenAllocator,
    pub(crate) registry: PendingRegistry,
    /// Write permit: held only across the single buffered write of one
    /// frame, never across a read.
    writer: tokio::sync::Mutex<Option<StreamWriter>>,
    closed: AtomicBool,
    request_timeout: Duration,
    pub(crate) global_optargs: Vec<QueryPair>,
}

impl ConnectionInner {
    /// Submit one query and await its response. The token must already be
    /// set on `query`. Installs the completion slot, writes the frame under
    /// the write permit, then waits with the per-request deadline.
    pub(crate) async fn submit(&self, query: Query) -> DriverResult<Response> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::ConnectionClosed);
        }

        let token = query.token();
        let frame = protocol::encode_query(&query)?;

        let (slot, completion) = oneshot::channel();
        self.registry.install(token, slot)?;

        // The reader sets `closed` before draining, so a slot installed
        // after the drain must be reclaimed here.
        if self.closed.load(Ordering::Acquire) {
            self.registry.take(token);
            return Err(DriverError::ConnectionClosed);
        }

        {
            let mut writer = self.writer.lock().await;
            let Some(writer) = writer.as_mut() else {
                self.registry.take(token);
                return Err(DriverError::ConnectionClosed);
            };
            if let Err(e) = transport::write_frame(writer, &frame).await {
                self.registry.take(token);
                return Err(e);
            }
        }

        self.await_completion(token, completion).await
    }

    async fn await_completion(
        &self,
        token: u64,
        mut completion: oneshot::Receiver<DriverResult<Response>>,
    ) -> DriverResult<Response> {
        let deadline = tokio::time::sleep(self.request_timeout);
        tokio::pin!(deadline);

        tokio::select! {
            // When the response and the deadline are both ready, the
            // response wins.
            biased;
            delivered = &mut completion => match delivered {
                Ok(outcome) => outcome,
                Err(_) => Err(DriverError::ConnectionClosed),
            },
            _ = &mut deadline => {
                if self.registry.take(token).is_some() {
                    // The request is already on the wire; the server's
                    // eventual response will find no slot and be dropped.
                    Err(DriverError::RequestTimedOut)
                } else {
                    // The reader claimed the slot before the deadline
                    // fired; the response is already on its way.
                    match completion.await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(DriverError::ConnectionClosed),
                    }
                }
            }
        }
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct ReaderHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// A live connection to a server.
///
/// Cheap to share by reference: every method takes `&self`, so one
/// connection can serve many concurrent tasks. Dropping a connection
/// without [`dispose`](Connection::dispose) stops the reader as soon as it
/// observes the closed stream or the dropped shutdown handle.
pub struct Connection {
    inner: Arc<ConnectionInner>,
    reader: Mutex<Option<ReaderHandle>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect to a server with default options.
    ///
    /// See [`ConnectionBuilder`] for endpoints lists, a default database,
    /// and timeouts.
    pub async fn connect(endpoint: &str) -> DriverResult<Connection> {
        ConnectionBuilder::new(endpoint).connect().await
    }

    async fn establish(config: ConnectionBuilder) -> DriverResult<Connection> {
        let last_error = Mutex::new(None);
        let attempt = async {
            let stream = Self::dial(&config, &last_error).await?;
            Self::start(&config, stream).await
        };

        match tokio::time::timeout(config.connect_timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let last = last_error.lock().unwrap_or_else(|e| e.into_inner()).take();
                Err(last.unwrap_or(DriverError::ConnectTimeout))
            }
        }
    }

    /// Try every endpoint in order, resolving names as they come up.
    /// Failures are recorded so a deadline expiry can surface the most
    /// recent one.
    async fn dial(
        config: &ConnectionBuilder,
        last_error: &Mutex<Option<DriverError>>,
    ) -> DriverResult<TcpStream> {
        let record = |e: DriverError| {
            tracing::debug!("connect candidate failed: {}", e);
            *last_error.lock().unwrap_or_else(|p| p.into_inner()) = Some(e);
        };

        for endpoint in &config.endpoints {
            let addrs = match lookup_host(endpoint.as_str()).await {
                Ok(addrs) => addrs,
                Err(e) => {
                    record(DriverError::DnsResolution(format!("{}: {}", endpoint, e)));
                    continue;
                }
            };

            for addr in addrs {
                match TcpStream::connect(addr).await {
                    Ok(stream) => match stream.set_nodelay(true) {
                        Ok(()) => return Ok(stream),
                        Err(e) => record(DriverError::ConnectFailed(format!(
                            "TCP_NODELAY on {}: {}",
                            addr, e
                        ))),
                    },
                    Err(e) => record(DriverError::ConnectFailed(format!("{}: {}", addr, e))),
                }
            }
        }

        Err(DriverError::NoConnectableAddress)
    }

    /// Version handshake plus reader spawn over any established stream.
    async fn start<S>(config: &ConnectionBuilder, stream: S) -> DriverResult<Connection>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read_half, mut write_half) = tokio::io::split(stream);

        write_half
            .write_all(&PROTOCOL_VERSION.to_le_bytes())
            .await
            .map_err(|e| DriverError::ConnectFailed(format!("version handshake: {}", e)))?;
        write_half
            .flush()
            .await
            .map_err(|e| DriverError::ConnectFailed(format!("version handshake: {}", e)))?;

        let global_optargs = config
            .db
            .as_deref()
            .map(|name| QueryPair {
                key: Some("db".to_string()),
                val: Some(query::db(name).into_term()),
            })
            .into_iter()
            .collect();

        let inner = Arc::new(ConnectionInner {
            tokens: TokenAllocator::new(),
            registry: PendingRegistry::new(),
            writer: tokio::sync::Mutex::new(Some(Box::new(write_half))),
            closed: AtomicBool::new(false),
            request_timeout: config.request_timeout,
            global_optargs,
        });

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(reader::read_loop(
            Box::new(read_half),
            inner.clone(),
            stop_rx,
        ));

        tracing::debug!("connection established");
        Ok(Connection {
            inner,
            reader: Mutex::new(Some(ReaderHandle { stop, task })),
        })
    }

    /// Execute a query expected to produce a single value.
    pub async fn run<T: DeserializeOwned>(&self, query: impl Into<Term>) -> DriverResult<T> {
        let response = self.start_query(query.into()).await?;
        match response_kind(&response)? {
            ResponseType::SuccessAtom | ResponseType::SuccessSequence => {
                if response.response.len() != 1 {
                    return Err(DriverError::UnexpectedResponseShape(format!(
                        "expected exactly one result datum, got {}",
                        response.response.len()
                    )));
                }
                convert::from_datum(&response.response[0])
            }
            ResponseType::SuccessPartial => Err(DriverError::ProtocolViolation(
                "partial response to a single-value query; use run_cursor".to_string(),
            )),
            _ => Err(response_error(&response)),
        }
    }

    /// Execute a write query and decode its acknowledgement.
    pub async fn run_write(&self, query: impl Into<Term>) -> DriverResult<WriteResponse> {
        self.run(query).await
    }

    /// Begin streaming a sequence. No I/O happens until the first advance.
    pub fn run_cursor<T: DeserializeOwned>(&self, query: impl Into<Term>) -> Cursor<T> {
        Cursor::new(self.inner.clone(), query.into())
    }

    /// Number of requests currently awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.registry.len()
    }

    /// False once the connection has been disposed or the server went away.
    pub fn is_open(&self) -> bool {
        !self.inner.is_closed()
    }

    /// Close the connection. Every pending request completes with
    /// `ConnectionClosed`. Safe to call more than once.
    pub async fn dispose(&self) {
        self.inner.mark_closed();

        let handle = {
            let mut reader = self.reader.lock().unwrap_or_else(|e| e.into_inner());
            reader.take()
        };

        let writer = self.inner.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let _ = writer.shutdown().await;
        }

        if let Some(ReaderHandle { stop, task }) = handle {
            let _ = stop.send(());
            // The reader drains the registry before returning.
            let _ = task.await;
        }

        tracing::debug!("connection disposed");
    }

    async fn start_query(&self, term: Term) -> DriverResult<Response> {
        let query = Query {
            r#type: Some(QueryType::Start as i32),
            query: Some(term),
            token: Some(self.inner.tokens.next()),
            global_optargs: self.inner.global_optargs.clone(),
        };
        self.inner.submit(query).await
    }
}

/// Strictly parse the response type; anything unknown is a protocol
/// violation, not a silent default.
pub(crate) fn response_kind(response: &Response) -> DriverResult<ResponseType> {
    response
        .r#type
        .and_then(|t| ResponseType::try_from(t).ok())
        .ok_or_else(|| {
            DriverError::ProtocolViolation(format!(
                "unknown response type {:?}",
                response.r#type
            ))
        })
}

/// Map a server error response onto the error taxonomy; the message is the
/// first datum's string field.
pub(crate) fn response_error(response: &Response) -> DriverError {
    let message = response
        .response
        .first()
        .and_then(|d| d.r_str.clone())
        .unwrap_or_else(|| "server reported an error without a message".to_string());
    let backtrace = response.backtrace.clone();

    match response.r#type.and_then(|t| ResponseType::try_from(t).ok()) {
        Some(ResponseType::ClientError) => DriverError::ClientError { message, backtrace },
        Some(ResponseType::CompileError) => DriverError::CompileError { message, backtrace },
        Some(ResponseType::RuntimeError) => DriverError::RuntimeError { message, backtrace },
        _ => DriverError::ProtocolViolation(format!(
            "response type {:?} was not expected here",
            response.r#type
        )),
    }
}
