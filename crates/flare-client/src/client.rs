//! Async client for the query service
//!
//! Every request carries the `auth-key` header. Queries are submitted as a
//! rendered AST (or raw text) and come back as a [`Query`] handle that pages
//! through results lazily.

use chrono::{DateTime, Utc};
use flare::{Stream, ToAst};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{check, message};
use crate::query::Query;
use crate::types::{Event, EventPage, Field, FieldValue, RangeEvent, SpanPage, StreamInfo, iso};
use crate::{ClientConfig, ClientError, Result};

const AUTH_KEY: &str = "auth-key";
const TIMESTAMP: &str = "timestamp";
const CURSOR: &str = "cursor";
const TEXT_QUERY: &str = "text/neoflare";

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
    base: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.host)
            .map_err(|e| ClientError::Config(format!("invalid host `{}`: {e}", config.host)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "host `{}` cannot be used as a base URL",
                config.host
            )));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.auth_key)
            .map_err(|_| ClientError::Config("auth key is not a valid header value".into()))?;
        headers.insert(AUTH_KEY, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { http, config, base })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a URL from path segments. Segments are percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("invalid host `{}`", self.config.host)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        log::debug!("{method} {}", url.path());
        Ok(self.http.request(method, url))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let resp = check(self.request(Method::GET, segments)?.send().await?).await?;
        Ok(resp.json().await?)
    }

    // ============ Queries ============

    /// Submit a built query.
    pub async fn query<T: ToAst + ?Sized>(&self, query: &T, limit: Option<usize>) -> Result<Query> {
        let body = flare::ast_with(query, 0, &self.config.ast)?;
        let req = self.request(Method::POST, &["query"])?.body(body);
        self.submit(req, limit).await
    }

    /// Submit a query written in the text syntax.
    pub async fn query_text(&self, text: &str, limit: Option<usize>) -> Result<Query> {
        let req = self
            .request(Method::POST, &["query"])?
            .header(CONTENT_TYPE, TEXT_QUERY)
            .body(text.to_string());
        self.submit(req, limit).await
    }

    async fn submit(&self, req: RequestBuilder, limit: Option<usize>) -> Result<Query> {
        let resp = check(req.send().await?).await?;
        let status = resp.status();
        if status != StatusCode::CREATED {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: message(resp).await,
            });
        }
        let id = header(&resp, LOCATION.as_str()).ok_or(ClientError::MissingHeader("location"))?;
        log::debug!("query accepted as `{id}`");
        Ok(Query::new(self.clone(), id, limit))
    }

    pub(crate) async fn span_page(&self, id: &str, limit: Option<usize>) -> Result<SpanPage> {
        let mut req = self.request(Method::GET, &["query", id, "spans"])?;
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit)]);
        }
        let resp = check(req.send().await?).await?;
        Ok(resp.json().await?)
    }

    /// One page of events for a span or slice cursor.
    pub async fn events(&self, cursor: &str) -> Result<EventPage> {
        let resp = check(
            self.request(Method::GET, &["query", cursor, "events"])?
                .send()
                .await?,
        )
        .await?;
        let next = header(&resp, CURSOR);
        let mut page: EventPage = resp.json().await?;
        page.cursor = next;
        Ok(page)
    }

    // ============ Streams ============

    /// `GET /`; succeeds when the service is reachable and the key is accepted.
    pub async fn ping(&self) -> Result<()> {
        check(self.request(Method::GET, &[])?.send().await?).await?;
        Ok(())
    }

    /// Streams whose name contains `name` (case-insensitive) and whose
    /// metadata has every key/value of `meta`.
    pub async fn streams(&self, name: &str, meta: &Map<String, Value>) -> Result<Vec<Stream>> {
        let all: Vec<StreamInfo> = self.get_json(&["streams"]).await?;
        let total = all.len();
        let found: Vec<Stream> = all
            .into_iter()
            .filter(|s| s.matches(name, meta))
            .map(|s| Stream::new(s.name))
            .collect();
        log::debug!("{} of {total} streams match", found.len());
        Ok(found)
    }

    pub async fn fields(&self, stream: &Stream) -> Result<Vec<Field>> {
        self.get_json(&["streams", stream.name(), "fields"]).await
    }

    pub async fn values(&self, stream: &Stream) -> Result<Vec<FieldValue>> {
        self.get_json(&["streams", stream.name(), "values"]).await
    }

    pub async fn newest(&self, stream: &Stream) -> Result<Event> {
        self.get_event_at(&["streams", stream.name(), "newest"]).await
    }

    pub async fn oldest(&self, stream: &Stream) -> Result<Event> {
        self.get_event_at(&["streams", stream.name(), "oldest"]).await
    }

    pub async fn get_event(&self, stream: &Stream, id: &str) -> Result<Event> {
        self.get_event_at(&["streams", stream.name(), "events", id]).await
    }

    /// Stream descriptor.
    pub async fn get_stream(&self, stream: &Stream) -> Result<Value> {
        self.get_json(&["streams", stream.name()]).await
    }

    async fn get_event_at(&self, segments: &[&str]) -> Result<Event> {
        let resp = check(self.request(Method::GET, segments)?.send().await?).await?;
        let id = header(&resp, LOCATION.as_str());
        let ts = header(&resp, TIMESTAMP).map(|t| parse_ts(&t)).transpose()?;
        let event = resp.json().await?;
        Ok(Event { id, ts, event })
    }

    /// Store an event. With an `id` the event is put at that id; without one
    /// the service assigns it. Returns the event id.
    pub async fn put_event(
        &self,
        stream: &Stream,
        event: &Value,
        id: Option<&str>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<String> {
        let body = serde_json::to_string(event)?;
        let mut req = match id {
            Some(id) => self.request(Method::PUT, &["streams", stream.name(), "events", id])?,
            None => self.request(Method::POST, &["streams", stream.name(), "events"])?,
        };
        if let Some(ts) = timestamp {
            req = req.header(TIMESTAMP, iso(&ts));
        }

        let resp = check(req.body(body).send().await?).await?;
        match id {
            Some(id) => Ok(id.to_string()),
            None => header(&resp, LOCATION.as_str()).ok_or(ClientError::MissingHeader("location")),
        }
    }

    pub async fn delete_event(&self, stream: &Stream, id: &str) -> Result<()> {
        let req = self.request(Method::DELETE, &["streams", stream.name(), "events", id])?;
        check(req.send().await?).await?;
        Ok(())
    }

    /// Delete a stream and all of its events.
    pub async fn destroy(&self, stream: &Stream) -> Result<()> {
        let req = self.request(Method::DELETE, &["streams", stream.name()])?;
        check(req.send().await?).await?;
        Ok(())
    }

    /// Summary statistics of a numeric field, e.g. `event.temp`.
    pub async fn stats(
        &self,
        stream: &Stream,
        field: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Value> {
        let mut params = Vec::new();
        if let Some(start) = start {
            params.push(("start", iso(&start)));
        }
        if let Some(end) = end {
            params.push(("end", iso(&end)));
        }

        let mut req = self.request(Method::GET, &["streams", stream.name(), "fields", field, "stats"])?;
        if !params.is_empty() {
            req = req.query(&params);
        }
        let resp = check(req.send().await?).await?;
        Ok(resp.json().await?)
    }

    pub async fn field_stats(
        &self,
        stream: &Stream,
        field: &Field,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Value> {
        self.stats(stream, &field.qualified(), start, end).await
    }

    /// Events of a stream between two instants.
    pub async fn range(
        &self,
        stream: &Stream,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RangeEvent>> {
        let (start, end) = (iso(&start), iso(&end));
        self.get_json(&["streams", stream.name(), "start", &start, "end", &end])
            .await
    }
}

fn header(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ClientError::InvalidTimestamp(format!("{s}: {e}")))
}
