//! Native async driver for ReefDB.
//!
//! Queries are built as expression trees with the [`query`] module and
//! submitted over a single multiplexed connection. Any number of tasks can
//! run queries on one [`Connection`] concurrently; requests are correlated
//! to responses by token, so replies may arrive in any order. Sequences
//! stream through a [`Cursor`] that fetches batches from the server on
//! demand.
//!
//! # Example
//!
//! ```rust,no_run
//! use reefdb_client::{query, ConnectionBuilder};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reefdb_client::DriverError> {
//!     let conn = ConnectionBuilder::new("localhost:28015")
//!         .db("blog")
//!         .connect()
//!         .await?;
//!
//!     // Insert a document.
//!     let ack = conn
//!         .run_write(query::table("posts").insert(json!({ "title": "Hello" })))
//!         .await?;
//!     println!("inserted {}, keys {:?}", ack.inserted, ack.generated_keys);
//!
//!     // Fetch a single value.
//!     let count: u64 = conn.run(query::table("posts").count()).await?;
//!     println!("{} posts", count);
//!
//!     // Stream a sequence.
//!     let mut posts = conn.run_cursor::<serde_json::Value>(query::table("posts"));
//!     while let Some(post) = posts.next().await? {
//!         println!("{}", post);
//!     }
//!
//!     conn.dispose().await;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod convert;
pub mod error;
pub mod proto;
pub mod protocol;
pub mod query;

pub use connection::{Connection, ConnectionBuilder, Cursor, WriteResponse};
pub use error::{DriverError, DriverResult};
