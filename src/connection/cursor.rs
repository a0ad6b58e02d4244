//! Streaming cursor over a server-side sequence.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::convert;
use crate::error::{DriverError, DriverResult};
use crate::proto::{Datum, Query, QueryType, Response, ResponseType, Term};

use super::{response_error, response_kind, ConnectionInner};

/// Lazy, forward-only iterator over a sequence, fetching batches from the
/// server on demand.
///
/// Nothing touches the wire until the first [`advance`](Cursor::advance)
/// (or [`next`](Cursor::next)); from then on the cursor drives server-side
/// batching with continuation requests under its original token.
///
/// A cursor is single-consumer: it takes `&mut self` to advance, so
/// concurrent advances cannot be expressed.
pub struct Cursor<T> {
    conn: Arc<ConnectionInner>,
    /// Consumed by the first advance; `None` once the query has started.
    term: Option<Term>,
    token: u64,
    /// Whether the server has announced more batches after the current one.
    more: bool,
    failed: Option<DriverError>,
    batch: Vec<Datum>,
    pos: usize,
    current: Option<T>,
}

impl<T: DeserializeOwned> Cursor<T> {
    pub(crate) fn new(conn: Arc<ConnectionInner>, term: Term) -> Self {
        Self {
            conn,
            term: Some(term),
            token: 0,
            more: false,
            failed: None,
            batch: Vec::new(),
            pos: 0,
            current: None,
        }
    }

    /// Move to the next element, fetching the next batch when the current
    /// one is used up. Returns `false` once the sequence is exhausted.
    pub async fn advance(&mut self) -> DriverResult<bool> {
        if let Some(e) = &self.failed {
            return Err(e.clone());
        }

        loop {
            if self.pos < self.batch.len() {
                let value = convert::from_datum(&self.batch[self.pos])?;
                self.pos += 1;
                self.current = Some(value);
                return Ok(true);
            }

            if let Some(term) = self.term.take() {
                self.token = self.conn.tokens.next();
                let query = Query {
                    r#type: Some(QueryType::Start as i32),
                    query: Some(term),
                    token: Some(self.token),
                    global_optargs: self.conn.global_optargs.clone(),
                };
                self.fetch(query).await?;
            } else if self.more {
                let query = Query {
                    r#type: Some(QueryType::Continue as i32),
                    query: None,
                    token: Some(self.token),
                    global_optargs: Vec::new(),
                };
                self.fetch(query).await?;
            } else {
                self.current = None;
                return Ok(false);
            }
        }
    }

    /// The element produced by the most recent successful [`advance`](Cursor::advance),
    /// if any.
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Advance and take the next element.
    pub async fn next(&mut self) -> DriverResult<Option<T>> {
        if self.advance().await? {
            Ok(self.current.take())
        } else {
            Ok(None)
        }
    }

    /// Tell the server to abandon the sequence early. The cursor is
    /// exhausted afterwards regardless of the server's reply.
    pub async fn stop(&mut self) -> DriverResult<()> {
        // Never started, already finished, or already failed: nothing is
        // open on the server side.
        if self.term.take().is_some() || !self.more || self.failed.is_some() {
            self.finish();
            return Ok(());
        }

        let query = Query {
            r#type: Some(QueryType::Stop as i32),
            query: None,
            token: Some(self.token),
            global_optargs: Vec::new(),
        };
        self.finish();
        // The stop acknowledgement carries no data worth surfacing.
        self.conn.submit(query).await.map(|_| ())
    }

    async fn fetch(&mut self, query: Query) -> DriverResult<()> {
        match self.conn.submit(query).await {
            Ok(response) => self.accept_batch(response),
            Err(e) => {
                self.fail(e.clone());
                Err(e)
            }
        }
    }

    fn accept_batch(&mut self, response: Response) -> DriverResult<()> {
        let kind = match response_kind(&response) {
            Ok(kind) => kind,
            Err(e) => {
                self.fail(e.clone());
                return Err(e);
            }
        };

        match kind {
            ResponseType::SuccessPartial => self.more = true,
            ResponseType::SuccessSequence | ResponseType::SuccessAtom => self.more = false,
            _ => {
                let e = response_error(&response);
                self.fail(e.clone());
                return Err(e);
            }
        }

        self.batch = response.response;
        self.pos = 0;
        Ok(())
    }

    fn fail(&mut self, e: DriverError) {
        self.failed = Some(e);
        self.finish();
    }

    fn finish(&mut self) {
        self.term = None;
        self.more = false;
        self.batch.clear();
        self.pos = 0;
        self.current = None;
    }
}
