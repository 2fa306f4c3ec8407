//! Handle to a submitted query and its paginated results

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::Result;
use crate::client::Client;
use crate::types::{EventPage, Slice, Span, SpanStats, StreamEvents, iso};

/// Results of a query accepted by the service.
///
/// Spans are fetched on first use and cached.
#[derive(Debug, Clone)]
pub struct Query {
    client: Client,
    id: String,
    limit: Option<usize>,
    spans: Option<Vec<Span>>,
}

impl Query {
    pub(crate) fn new(client: Client, id: String, limit: Option<usize>) -> Self {
        Self {
            client,
            id,
            limit,
            spans: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// All matching spans, following the page cursor until it runs out or
    /// `limit` spans have been collected.
    pub async fn spans(&mut self) -> Result<&[Span]> {
        if self.spans.is_none() {
            let spans = self.fetch_spans().await?;
            self.spans = Some(spans);
        }
        Ok(self.spans.as_deref().unwrap_or_default())
    }

    async fn fetch_spans(&self) -> Result<Vec<Span>> {
        let mut all = Vec::new();
        let mut next = Some(self.id.clone());
        let mut pages = 0usize;

        while let Some(cursor) = next {
            let page = self.client.span_page(&cursor, self.limit).await?;
            pages += 1;
            all.extend(page.spans);
            next = page.cursor.filter(|c| !c.is_empty());

            if let Some(limit) = self.limit
                && all.len() >= limit
            {
                all.truncate(limit);
                break;
            }
        }

        log::debug!("query `{}`: {} span(s) in {pages} page(s)", self.id, all.len());
        Ok(all)
    }

    /// Duration statistics over the spans, `None` when no span is closed.
    pub async fn stats(&mut self) -> Result<Option<SpanStats>> {
        Ok(SpanStats::from_spans(self.spans().await?))
    }

    /// Events inside every span, one slice per span.
    pub async fn slices(&mut self) -> Result<Vec<Slice>> {
        let spans = self.spans().await?.to_vec();
        let (min, max) = open_bounds()?;

        let mut slices = Vec::with_capacity(spans.len());
        for span in &spans {
            let start = span.start.unwrap_or(min);
            let end = span.end.unwrap_or(max);
            slices.push(self.slice(&span.cursor, start, end).await?);
        }
        Ok(slices)
    }

    /// Events between `start` and `end` for the query behind `cursor`.
    ///
    /// Events are grouped by the stream they came from, in the order the
    /// streams were first announced.
    pub async fn slice(&self, cursor: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Slice> {
        let mut next = Some(slice_cursor(cursor, &start, &end));
        let mut streams: IndexMap<String, StreamEvents> = IndexMap::new();

        while let Some(cursor) = next {
            let mut page = self.client.events(&cursor).await?;
            next = page.cursor.take().filter(|c| !c.is_empty());
            group_page(&mut streams, page);
        }

        Ok(Slice {
            start,
            end,
            streams: streams.into_values().collect(),
        })
    }

    /// All slices rendered as pretty JSON.
    pub async fn json(&mut self) -> Result<String> {
        let slices = self.slices().await?;
        Ok(serde_json::to_string_pretty(&slices)?)
    }
}

/// Fold one events page into per-stream groups. Streams keep the order they
/// were first announced in; events keep their own key order minus `stream`.
fn group_page(streams: &mut IndexMap<String, StreamEvents>, page: EventPage) {
    for (hash, stream) in page.streams {
        streams.entry(hash).or_insert_with(|| StreamEvents {
            stream,
            events: Vec::new(),
        });
    }
    for mut event in page.events {
        let hash = match event.shift_remove("stream") {
            Some(Value::String(hash)) => hash,
            _ => {
                log::warn!("event without a stream hash dropped");
                continue;
            }
        };
        match streams.get_mut(&hash) {
            Some(group) => group.events.push(Value::Object(event)),
            None => log::warn!("event for unannounced stream `{hash}` dropped"),
        }
    }
}

/// `{query-id}+{start}+{end}`; any bounds already on `cursor` are replaced.
fn slice_cursor(cursor: &str, start: &DateTime<Utc>, end: &DateTime<Utc>) -> String {
    let id = cursor.split_once('+').map_or(cursor, |(id, _)| id);
    format!("{id}+{}+{}", iso(start), iso(end))
}

/// Stand-ins for the missing ends of open spans.
fn open_bounds() -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((
        flare::utc(1, 1, 1, 0, 0, 0)?,
        flare::utc(9990, 12, 31, 23, 59, 59)?,
    ))
}
