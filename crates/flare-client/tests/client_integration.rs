//! Integration tests for the query service client
//!
//! These run the client against an in-process mock of the service:
//! - Query submission, span pagination and limits
//! - Event slices grouped by stream
//! - Stream endpoints and status code mapping

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{Path, Query as QueryParams};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use flare::{select, shape, stream};
use flare_client::{Client, ClientConfig, ClientError};
use serde_json::{Map, Value, json};

const KEY: &str = "test-key";

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("auth-key").and_then(|v| v.to_str().ok()) == Some(KEY)
}

async fn ping(headers: HeaderMap) -> StatusCode {
    if authorized(&headers) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn submit(headers: HeaderMap, body: String) -> Response {
    let text = headers
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v == "text/neoflare");
    if text {
        if body.contains("syntax error") {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "unexpected token"})))
                .into_response();
        }
        return (StatusCode::CREATED, [(header::LOCATION, "q1")]).into_response();
    }

    let Ok(ast) = serde_json::from_str::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if ast.get("select").is_none() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if ast["select"]["arg"]["type"] == "int" {
        return (StatusCode::CREATED, [(header::LOCATION, "q-int")]).into_response();
    }
    (StatusCode::CREATED, [(header::LOCATION, "q1")]).into_response()
}

async fn spans(Path(id): Path<String>) -> Response {
    let body = match id.as_str() {
        "q1" | "q-int" => json!({
            "spans": [
                {"cursor": "a+1+2", "start": "2017-06-01T00:00:00Z", "end": "2017-06-01T00:00:01Z"},
                {"cursor": "b", "start": "2017-06-02T00:00:00Z", "end": "2017-06-02T00:00:03Z"}
            ],
            "cursor": "q1-page2"
        }),
        "q1-page2" => json!({
            "spans": [
                {"cursor": "c", "start": null, "end": "2017-06-03T00:00:00Z"}
            ],
            "cursor": null
        }),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(body).into_response()
}

async fn events(Path(cursor): Path<String>) -> Response {
    let (id, rest) = cursor.split_once('+').unwrap_or((cursor.as_str(), ""));
    match (id, rest) {
        ("a", "2017-06-01T00:00:00.000Z+2017-06-01T00:00:01.000Z") => (
            [("cursor", "a-page2")],
            Json(json!({
                "streams": {"h1": {"name": "S"}},
                "events": [{"stream": "h1", "event": {"x": 1}}]
            })),
        )
            .into_response(),
        ("a-page2", _) => Json(json!({
            "streams": {"h2": {"name": "T"}, "h1": {"name": "S"}},
            "events": [
                {"stream": "h2", "event": {"y": 2}},
                {"stream": "h1", "event": {"x": 3}},
                {"stream": "h9", "event": {"z": 0}}
            ]
        }))
        .into_response(),
        ("b", _) => Json(json!({
            "streams": {"h1": {"name": "S"}},
            "events": []
        }))
        .into_response(),
        ("c", r) if r.starts_with("0001-01-01T00:00:00.000Z+") => Json(json!({
            "streams": {},
            "events": []
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_streams() -> Json<Value> {
    Json(json!([
        {"name": "weather-boston", "meta": {"city": "Boston"}},
        {"name": "weather-nyc", "meta": {"city": "NYC"}},
        {"name": "moose"}
    ]))
}

async fn fields(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "weather" => Json(json!([
            {"id": "GpWlKdKZoWBQd6WOthPHaJCt", "path": ["humidity"], "start": "2010-01-01T00:00:00Z"},
            {"id": "GpWlKdKZoWBQd6WOthPHaJCt", "path": ["moonPhase"], "start": "2010-01-01T00:00:00Z"}
        ]))
        .into_response(),
        "locked" => (StatusCode::FORBIDDEN, Json(json!({"message": "read only"}))).into_response(),
        "boom" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn newest() -> Response {
    (
        [("timestamp", "2017-06-01T00:00:00Z"), ("location", "evt-9")],
        Json(json!({"temp": 71.5})),
    )
        .into_response()
}

async fn create_event(headers: HeaderMap, Json(event): Json<Value>) -> Response {
    if event.get("temp").is_none() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let location = match headers.get("timestamp") {
        Some(ts) if ts == "2017-06-01T00:00:00.000Z" => "evt-ts",
        _ => "evt-new",
    };
    (StatusCode::CREATED, [(header::LOCATION, location)]).into_response()
}

async fn replace_event(Path((_name, _id)): Path<(String, String)>) -> StatusCode {
    StatusCode::OK
}

async fn delete_event(Path((_name, id)): Path<(String, String)>) -> StatusCode {
    if id == "gone" {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn field_stats(
    Path((_name, field)): Path<(String, String)>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Json<Value> {
    Json(json!({"field": field, "start": params.get("start"), "mean": 4.5}))
}

async fn range(Path((_name, start, end)): Path<(String, String, String)>) -> Json<Value> {
    Json(json!([
        {"ts": start, "id": "e1", "event": {"x": 1}},
        {"ts": end, "id": "e2", "event": {"x": 2}}
    ]))
}

async fn setup_mock_service() -> SocketAddr {
    let app = Router::new()
        .route("/", get(ping))
        .route("/query", post(submit))
        .route("/query/{id}/spans", get(spans))
        .route("/query/{cursor}/events", get(events))
        .route("/streams", get(list_streams))
        .route(
            "/streams/{name}",
            get(|| async { Json(json!({"name": "weather"})) }).delete(|| async { StatusCode::NO_CONTENT }),
        )
        .route("/streams/{name}/fields", get(fields))
        .route("/streams/{name}/newest", get(newest))
        .route("/streams/{name}/events", post(create_event))
        .route("/streams/{name}/events/{id}", put(replace_event).delete(delete_event))
        .route("/streams/{name}/fields/{field}/stats", get(field_stats))
        .route("/streams/{name}/start/{start}/end/{end}", get(range));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect() -> Client {
    let addr = setup_mock_service().await;
    Client::new(ClientConfig::new(KEY).with_host(format!("http://{addr}"))).unwrap()
}

// ============ Queries ============

#[tokio::test]
async fn query_spans_follow_the_cursor() {
    let client = connect().await;
    let s = stream("S");
    let q = select().of([s.when(shape! { "x" => true }).unwrap()]).unwrap();

    let mut query = client.query(&q, None).await.unwrap();
    assert_eq!(query.id(), "q1");

    let spans = query.spans().await.unwrap();
    let cursors: Vec<&str> = spans.iter().map(|s| s.cursor.as_str()).collect();
    assert_eq!(cursors, ["a+1+2", "b", "c"]);
    assert!(spans[2].start.is_none());
}

#[tokio::test]
async fn span_limit_stops_paging() {
    let client = connect().await;
    let mut query = client.query_text("S when x", Some(2)).await.unwrap();
    assert_eq!(query.spans().await.unwrap().len(), 2);

    let mut query = client.query_text("S when x", Some(1)).await.unwrap();
    assert_eq!(query.spans().await.unwrap().len(), 1);
}

#[tokio::test]
async fn span_stats_in_milliseconds() {
    let client = connect().await;
    let mut query = client.query_text("S when x", None).await.unwrap();
    let stats = query.stats().await.unwrap().unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.min, 1000);
    assert_eq!(stats.max, 3000);
    assert_eq!(stats.median, 3000);
    assert!((stats.mean - 2000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn slices_group_events_by_stream() {
    let client = connect().await;
    let mut query = client.query_text("S when x", None).await.unwrap();
    let slices = query.slices().await.unwrap();
    assert_eq!(slices.len(), 3);

    let first = &slices[0];
    assert_eq!(first.streams.len(), 2);
    assert_eq!(first.streams[0].stream, json!({"name": "S"}));
    assert_eq!(
        first.streams[0].events,
        vec![json!({"event": {"x": 1}}), json!({"event": {"x": 3}})]
    );
    assert_eq!(first.streams[1].stream, json!({"name": "T"}));
    assert_eq!(first.streams[1].events, vec![json!({"event": {"y": 2}})]);

    assert_eq!(slices[1].streams[0].events.len(), 0);
    assert!(slices[2].streams.is_empty());

    let rendered: Value = serde_json::from_str(&query.json().await.unwrap()).unwrap();
    assert_eq!(rendered[0]["start"], "2017-06-01T00:00:00Z");
    assert_eq!(rendered[0]["streams"][1]["events"][0]["event"]["y"], 2);
}

#[tokio::test]
async fn ast_options_apply_to_submitted_queries() {
    let addr = setup_mock_service().await;
    let config = ClientConfig::new(KEY)
        .with_host(format!("http://{addr}"))
        .with_ast(flare::AstOptions {
            numbers: flare::NumberTagging::IntegralAsInt,
        });
    let client = Client::new(config).unwrap();

    let q = select().of([stream("S").when(shape! { "x" => 3 }).unwrap()]).unwrap();
    let query = client.query(&q, None).await.unwrap();
    assert_eq!(query.id(), "q-int");
}

#[tokio::test]
async fn rejected_text_query_carries_the_message() {
    let client = connect().await;
    match client.query_text("syntax error here", None).await {
        Err(ClientError::BadQuery(message)) => assert_eq!(message, "unexpected token"),
        other => panic!("Expected BadQuery, got {:?}", other.map(|q| q.id().to_string())),
    }
}

// ============ Streams ============

#[tokio::test]
async fn ping_checks_the_key() {
    let client = connect().await;
    client.ping().await.unwrap();

    let addr = setup_mock_service().await;
    let wrong = Client::new(ClientConfig::new("nope").with_host(format!("http://{addr}"))).unwrap();
    assert!(matches!(wrong.ping().await, Err(ClientError::Authentication)));
}

#[tokio::test]
async fn streams_filter_by_name_and_meta() {
    let client = connect().await;

    let all = client.streams("", &Map::new()).await.unwrap();
    assert_eq!(all.len(), 3);

    let weather = client.streams("WEATHER", &Map::new()).await.unwrap();
    let names: Vec<&str> = weather.iter().map(|s| s.name()).collect();
    assert_eq!(names, ["weather-boston", "weather-nyc"]);

    let mut meta = Map::new();
    meta.insert("city".into(), json!("NYC"));
    let nyc = client.streams("", &meta).await.unwrap();
    assert_eq!(nyc.len(), 1);
    assert_eq!(nyc[0].name(), "weather-nyc");
}

#[tokio::test]
async fn stream_fields() {
    let client = connect().await;
    let fields = client.fields(&stream("weather")).await.unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].path, ["humidity"]);
    assert_eq!(fields[1].qualified(), "event.moonPhase");
}

#[tokio::test]
async fn status_codes_map_to_errors() {
    let client = connect().await;
    assert!(matches!(
        client.fields(&stream("missing")).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        client.fields(&stream("boom")).await,
        Err(ClientError::Server(500))
    ));
    match client.fields(&stream("locked")).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "read only");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn newest_reads_id_and_timestamp_headers() {
    let client = connect().await;
    let event = client.newest(&stream("weather")).await.unwrap();
    assert_eq!(event.id.as_deref(), Some("evt-9"));
    assert_eq!(event.ts, Some(flare::utc(2017, 6, 1, 0, 0, 0).unwrap()));
    assert_eq!(event.event, json!({"temp": 71.5}));
}

#[tokio::test]
async fn put_and_delete_events() {
    let client = connect().await;
    let s = stream("weather");
    let event = json!({"temp": 70});

    let id = client.put_event(&s, &event, None, None).await.unwrap();
    assert_eq!(id, "evt-new");

    let ts = flare::utc(2017, 6, 1, 0, 0, 0).unwrap();
    let id = client.put_event(&s, &event, None, Some(ts)).await.unwrap();
    assert_eq!(id, "evt-ts");

    let id = client.put_event(&s, &event, Some("mine"), None).await.unwrap();
    assert_eq!(id, "mine");

    client.delete_event(&s, "mine").await.unwrap();
    assert!(matches!(
        client.delete_event(&s, "gone").await,
        Err(ClientError::NotFound(_))
    ));
    client.destroy(&s).await.unwrap();
}

#[tokio::test]
async fn field_stats_and_ranges() {
    let client = connect().await;
    let s = stream("weather");
    let start = flare::utc(2017, 6, 1, 0, 0, 0).unwrap();
    let end = flare::utc(2017, 6, 2, 0, 0, 0).unwrap();

    let stats = client.stats(&s, "event.temp", Some(start), None).await.unwrap();
    assert_eq!(stats["field"], "event.temp");
    assert_eq!(stats["start"], "2017-06-01T00:00:00.000Z");

    let fields = client.fields(&s).await.unwrap();
    let stats = client.field_stats(&s, &fields[0], None, None).await.unwrap();
    assert_eq!(stats["field"], "event.humidity");
    assert!(stats["start"].is_null());

    let events = client.range(&s, start, end).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].ts, start);
    assert_eq!(events[1].ts, end);
    assert_eq!(events[0].fields["id"], "e1");
}

#[tokio::test]
async fn stream_descriptor() {
    let client = connect().await;
    let desc = client.get_stream(&stream("weather")).await.unwrap();
    assert_eq!(desc["name"], "weather");
}
