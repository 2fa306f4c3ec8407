//! Wire types returned by the query service

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entry of `GET /streams`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl StreamInfo {
    /// Case-insensitive substring match on the name, exact match on each
    /// requested metadata key.
    pub fn matches(&self, name: &str, meta: &Map<String, Value>) -> bool {
        let name = name.to_lowercase();
        if !name.is_empty() && !self.name.to_lowercase().contains(&name) {
            return false;
        }
        meta.iter().all(|(k, v)| self.meta.get(k) == Some(v))
    }
}

/// A field path known to a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub path: Vec<String>,
    pub start: DateTime<Utc>,
}

impl Field {
    /// Dotted path under the event root, e.g. `event.humidity`.
    pub fn qualified(&self) -> String {
        let mut parts = Vec::with_capacity(self.path.len() + 1);
        parts.push(flare::EVENT_ROOT);
        parts.extend(self.path.iter().map(String::as_str));
        parts.join(".")
    }
}

/// Latest value seen for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub id: String,
    pub path: Vec<String>,
    pub value: Value,
    pub ts: DateTime<Utc>,
}

/// An event body with the id and timestamp taken from response headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: Option<String>,
    pub ts: Option<DateTime<Utc>>,
    pub event: Value,
}

/// Item of a stream time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeEvent {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One match of a query. Open-ended spans have no start or end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub cursor: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl Span {
    /// Span width in milliseconds, when both ends are known.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpanPage {
    pub spans: Vec<Span>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Duration statistics over a query's spans, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanStats {
    pub count: usize,
    pub mean: f64,
    pub min: i64,
    pub max: i64,
    pub median: i64,
}

impl SpanStats {
    /// `None` when no span has both ends.
    pub fn from_spans(spans: &[Span]) -> Option<Self> {
        let mut deltas: Vec<i64> = spans.iter().filter_map(Span::duration_ms).collect();
        if deltas.is_empty() {
            return None;
        }
        deltas.sort_unstable();
        let total: i64 = deltas.iter().sum();
        Some(SpanStats {
            count: spans.len(),
            mean: total as f64 / deltas.len() as f64,
            min: deltas[0],
            max: deltas[deltas.len() - 1],
            median: deltas[deltas.len() / 2],
        })
    }
}

/// One page of `GET /query/{cursor}/events`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventPage {
    /// Stream descriptors keyed by stream hash.
    #[serde(default)]
    pub streams: IndexMap<String, Value>,
    /// Events tagged with the hash of the stream they came from.
    #[serde(default)]
    pub events: Vec<Map<String, Value>>,
    /// Next page, from the `cursor` response header.
    #[serde(skip)]
    pub cursor: Option<String>,
}

/// Events of one stream within a slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvents {
    pub stream: Value,
    pub events: Vec<Value>,
}

/// All events inside one span, grouped by stream in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub streams: Vec<StreamEvents>,
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub(crate) fn iso(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
