//! Async client for the Flare query service
//!
//! Submits queries built with [`flare`] and pages through their results.
//!
//! ```ignore
//! use flare::{select, shape, stream};
//! use flare_client::{Client, ClientConfig};
//!
//! let client = Client::new(ClientConfig::new("my-key"))?;
//! let s = stream("weather");
//! let mut query = client
//!     .query(&select().of([s.when(shape! { "sunny" => true })?])?, Some(100))
//!     .await?;
//!
//! for span in query.spans().await? {
//!     println!("{:?} .. {:?}", span.start, span.end);
//! }
//! ```

mod client;
mod config;
mod error;
mod query;
mod types;

pub use client::Client;
pub use config::{AUTH_KEY_VAR, ClientConfig, DEFAULT_HOST, HOST_VAR};
pub use error::{ClientError, Result};
pub use query::Query;
pub use types::{
    Event, EventPage, Field, FieldValue, RangeEvent, Slice, Span, SpanStats, StreamEvents,
    StreamInfo,
};
