use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use serde_json::{json, Value as JsonValue};
use trino_drift::{
    ClientOptions, DriftEngine, DriftKind, Ident, MemorySnapshotStore, Statement, TrinoClient,
    TrinoDriftError,
};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: JsonValue,
    delay: Duration,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body,
            delay: Duration::from_millis(0),
        }
    }

    fn ok(body: JsonValue) -> Self {
        Self::json(StatusCode::OK, body)
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct Hit {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: String,
}

impl Hit {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    hits: Arc<Mutex<Vec<Hit>>>,
    base_url: String,
}

/// Serves queued fragments in order, rewriting `{base}` to the server's
/// own address so `nextUri` links point back here.
async fn engine_handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state
        .hits
        .lock()
        .expect("hits mutex must not be poisoned")
        .push(Hit {
            method,
            path: uri.path().to_owned(),
            headers,
            body,
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let rendered = response.body.to_string().replace("{base}", &state.base_url);
    (
        response.status,
        [(header::CONTENT_TYPE, "application/json")],
        rendered,
    )
}

struct TestServer {
    base_url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn hits(&self) -> Vec<Hit> {
        self.hits.lock().expect("hits mutex must not be poisoned").clone()
    }

    fn client(&self) -> TrinoClient {
        TrinoClient::new(&self.base_url, "tester").with_options(fast_options())
    }
}

fn fast_options() -> ClientOptions {
    ClientOptions {
        timeout_ms: 2_000,
        poll_interval_ms: 1,
        ..ClientOptions::default()
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let base_url = format!("http://{address}");

    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        hits: Arc::new(Mutex::new(Vec::new())),
        base_url: base_url.clone(),
    };
    let hits = state.hits.clone();

    let app = Router::new().fallback(engine_handler).with_state(state);
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url,
        hits,
        task,
    }
}

fn two_column_fragment(rows: JsonValue, next: Option<&str>) -> JsonValue {
    let mut body = json!({
        "id": "20261019_000001_00001_abcde",
        "columns": [
            { "name": "id", "type": "integer" },
            { "name": "name", "type": "varchar" }
        ],
        "data": rows,
        "stats": { "state": "RUNNING" }
    });
    if let Some(next) = next {
        body["nextUri"] = json!(next);
    }
    body
}

#[tokio::test]
async fn single_fragment_returns_rows_without_polling() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "id": "q1",
        "columns": [
            { "name": "id", "type": "integer" },
            { "name": "name", "type": "varchar" }
        ],
        "data": [[1, "Kit"], [2, "Ada"]],
        "stats": { "state": "FINISHED" }
    }))])
    .await;

    let result = server
        .client()
        .query("SELECT id, name FROM users", None, None)
        .await
        .expect("query must succeed");

    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows[0].get_i64("id"), Some(1));
    assert_eq!(result.rows[1].get_str("name"), Some("Ada"));
    assert_eq!(result.column_names().collect::<Vec<_>>(), vec!["id", "name"]);
    assert_eq!(result.query_id.as_deref(), Some("q1"));

    let hits = server.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method, Method::POST);
    assert_eq!(hits[0].path, "/v1/statement");
    assert_eq!(hits[0].body, "SELECT id, name FROM users");
    assert_eq!(hits[0].header("x-trino-user"), Some("tester"));
}

#[tokio::test]
async fn follows_continuation_links_and_keeps_arrival_order() {
    let server = spawn_server(vec![
        MockResponse::ok(json!({
            "id": "q2",
            "nextUri": "{base}/v1/statement/queued/q2/1",
            "stats": { "state": "QUEUED" }
        })),
        MockResponse::ok(json!({
            "id": "q2",
            "nextUri": "{base}/v1/statement/executing/q2/2",
            "stats": { "state": "RUNNING" }
        })),
        MockResponse::ok(two_column_fragment(
            json!([[1, "a"], [2, "b"]]),
            Some("{base}/v1/statement/executing/q2/3"),
        )),
        MockResponse::ok(two_column_fragment(
            json!([[3, "c"]]),
            Some("{base}/v1/statement/executing/q2/4"),
        )),
        MockResponse::ok(json!({
            "id": "q2",
            "stats": { "state": "FINISHED", "processedRows": 3 }
        })),
    ])
    .await;

    let result = server
        .client()
        .execute(&Statement::new("SELECT id, name FROM big"))
        .await
        .expect("query must succeed");

    assert_eq!(result.row_count, 3);
    let ids: Vec<i64> = result
        .rows
        .iter()
        .filter_map(|row| row.get_i64("id"))
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(result.stats["state"], json!("FINISHED"));

    let hits = server.hits();
    assert_eq!(hits.len(), 5);
    assert!(hits[1..].iter().all(|hit| hit.method == Method::GET));
    assert_eq!(hits[1].path, "/v1/statement/queued/q2/1");
    assert_eq!(hits[4].path, "/v1/statement/executing/q2/4");
}

#[tokio::test]
async fn statement_overrides_take_precedence_over_defaults() {
    let server = spawn_server(vec![MockResponse::ok(json!({ "data": [] }))]).await;
    let client = server.client().with_defaults("mysql", "default");

    client
        .execute(&Statement::new("SHOW TABLES").with_catalog("mongodb"))
        .await
        .expect("query must succeed");

    let hits = server.hits();
    assert_eq!(hits[0].header("x-trino-catalog"), Some("mongodb"));
    assert_eq!(hits[0].header("x-trino-schema"), Some("default"));
}

#[tokio::test]
async fn header_prefix_can_be_changed() {
    let server = spawn_server(vec![MockResponse::ok(json!({}))]).await;
    let client = TrinoClient::new(&server.base_url, "svc")
        .with_defaults("hive", "web")
        .with_options(ClientOptions {
            header_prefix: "X-".to_owned(),
            ..fast_options()
        });

    let result = client
        .query("SELECT 1", None, None)
        .await
        .expect("query must succeed");
    assert!(result.is_empty());

    let hits = server.hits();
    assert_eq!(hits[0].header("x-user"), Some("svc"));
    assert_eq!(hits[0].header("x-catalog"), Some("hive"));
    assert_eq!(hits[0].header("x-schema"), Some("web"));
}

#[tokio::test]
async fn http_failure_mid_chain_discards_partial_rows() {
    let server = spawn_server(vec![
        MockResponse::ok(two_column_fragment(
            json!([[1, "a"]]),
            Some("{base}/v1/statement/executing/q3/1"),
        )),
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
    ])
    .await;

    let err = server
        .client()
        .query("SELECT id, name FROM flaky", None, None)
        .await
        .expect_err("chain must fail");

    match err {
        TrinoDriftError::Http { status, sql, .. } => {
            assert_eq!(status, 500);
            assert_eq!(sql, "SELECT id, name FROM flaky");
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn engine_reported_failure_surfaces_as_query_failed() {
    let server = spawn_server(vec![
        MockResponse::ok(json!({
            "id": "q4",
            "nextUri": "{base}/v1/statement/queued/q4/1"
        })),
        MockResponse::ok(json!({
            "id": "q4",
            "stats": { "state": "FAILED" },
            "error": {
                "message": "line 1:15: Table 'mysql.shop.nope' does not exist",
                "errorName": "TABLE_NOT_FOUND"
            }
        })),
    ])
    .await;

    let err = server
        .client()
        .query("SELECT * FROM nope", None, None)
        .await
        .expect_err("query must fail");

    match err {
        TrinoDriftError::QueryFailed { error_name, .. } => {
            assert_eq!(error_name.as_deref(), Some("TABLE_NOT_FOUND"))
        }
        other => panic!("expected query failure, got {other:?}"),
    }
}

#[tokio::test]
async fn unexpected_response_shape_is_protocol_error() {
    let server = spawn_server(vec![MockResponse::ok(json!("not a fragment"))]).await;

    let err = server
        .client()
        .query("SELECT 1", None, None)
        .await
        .expect_err("must fail");

    assert!(matches!(err, TrinoDriftError::Protocol(_)));
}

#[tokio::test]
async fn request_timeout_surfaces_transport_error() {
    let server = spawn_server(vec![
        MockResponse::ok(json!({})).with_delay(Duration::from_millis(300))
    ])
    .await;

    let client = server.client().with_options(ClientOptions {
        timeout_ms: 20,
        ..fast_options()
    });

    let err = client
        .query("SELECT 1", None, None)
        .await
        .expect_err("request must timeout");

    match err {
        TrinoDriftError::Transport { source, .. } => assert!(source.is_timeout()),
        other => panic!("expected transport timeout error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_engine_is_transport_error() {
    let client = TrinoClient::new("http://127.0.0.1:1", "tester").with_options(fast_options());

    let err = client
        .query("SELECT 1", None, None)
        .await
        .expect_err("connection must fail");
    assert!(err.is_transport());

    let status = client.test_connection().await;
    assert!(!status.success);
    assert!(status.error.is_some());
}

#[tokio::test]
async fn retries_on_retryable_http_status() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::SERVICE_UNAVAILABLE, json!({"error": "busy"})),
        MockResponse::ok(json!({ "columns": [{ "name": "test", "type": "integer" }], "data": [[1]] })),
    ])
    .await;

    let client = server.client().with_options(ClientOptions {
        max_retries: 1,
        retry_backoff_ms: 1,
        ..fast_options()
    });

    let result = client
        .query("SELECT 1 AS test", None, None)
        .await
        .expect("request must succeed after retry");

    assert_eq!(result.rows[0].get_i64("test"), Some(1));
    assert_eq!(server.hits().len(), 2);
}

#[tokio::test]
async fn no_retry_by_default() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::SERVICE_UNAVAILABLE, json!({"error": "busy"})),
        MockResponse::ok(json!({})),
    ])
    .await;

    let err = server
        .client()
        .query("SELECT 1", None, None)
        .await
        .expect_err("must fail without retry");

    assert!(matches!(err, TrinoDriftError::Http { status: 503, .. }));
    assert_eq!(server.hits().len(), 1);
}

#[tokio::test]
async fn chain_deadline_stops_following_links() {
    let server = spawn_server(vec![
        MockResponse::ok(json!({ "nextUri": "{base}/v1/statement/queued/q5/1" })),
        MockResponse::ok(json!({})).with_delay(Duration::from_millis(500)),
    ])
    .await;

    let client = server.client().with_options(ClientOptions {
        chain_deadline_ms: Some(50),
        ..fast_options()
    });

    let err = client
        .query("SELECT sleep_forever()", None, None)
        .await
        .expect_err("deadline must fire");

    assert!(matches!(
        err,
        TrinoDriftError::DeadlineExceeded { deadline_ms: 50, .. }
    ));
}

#[tokio::test]
async fn cache_serves_repeated_statement() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "columns": [{ "name": "_col0", "type": "bigint" }],
        "data": [[42]]
    }))])
    .await;

    let client = server
        .client()
        .with_defaults("mysql", "shop")
        .with_cache(Duration::from_secs(60));

    let first = client
        .query("SELECT COUNT(*) FROM orders", None, None)
        .await
        .expect("first query must succeed");
    let second = client
        .query("SELECT COUNT(*) FROM orders", None, None)
        .await
        .expect("cached query must succeed");

    assert_eq!(first, second);
    assert_eq!(server.hits().len(), 1);
}

#[tokio::test]
async fn metadata_helpers_use_defaults() {
    let server = spawn_server(vec![
        MockResponse::ok(json!({
            "columns": [{ "name": "Table", "type": "varchar" }],
            "data": [["users"], ["products"]]
        })),
        MockResponse::ok(json!({
            "columns": [
                { "name": "Column", "type": "varchar" },
                { "name": "Type", "type": "varchar" }
            ],
            "data": [["id", "integer"]]
        })),
    ])
    .await;
    let client = server.client().with_defaults("mysql", "test_db");

    let tables = client
        .list_tables(None, None)
        .await
        .expect("list must succeed");
    assert_eq!(tables.row_count, 2);

    let users = Ident::new("users").unwrap();
    let described = client
        .describe_table(&users, None, None)
        .await
        .expect("describe must succeed");
    assert_eq!(described.rows[0].get_str("Type"), Some("integer"));

    let hits = server.hits();
    assert_eq!(hits[0].body, "SHOW TABLES FROM mysql.test_db");
    assert_eq!(hits[1].body, "DESCRIBE mysql.test_db.users");
}

#[tokio::test]
async fn snapshot_round_trip_over_http() {
    let listing = json!({
        "columns": [
            { "name": "table_name", "type": "varchar" },
            { "name": "column_name", "type": "varchar" },
            { "name": "data_type", "type": "varchar" },
            { "name": "is_nullable", "type": "varchar" },
            { "name": "column_default", "type": "varchar" }
        ],
        "data": [
            ["users", "id", "integer", "NO"],
            ["users", "email", "varchar(255)", "YES", null]
        ]
    });
    let changed = json!({
        "columns": [
            { "name": "table_name", "type": "varchar" },
            { "name": "column_name", "type": "varchar" },
            { "name": "data_type", "type": "varchar" },
            { "name": "is_nullable", "type": "varchar" },
            { "name": "column_default", "type": "varchar" }
        ],
        "data": [
            ["users", "id", "bigint", "NO", null]
        ]
    });
    let server = spawn_server(vec![
        MockResponse::ok(listing.clone()),
        MockResponse::ok(listing),
        MockResponse::ok(changed),
    ])
    .await;

    let engine = DriftEngine::new(server.client(), MemorySnapshotStore::new());
    let database = Ident::new("mysql").unwrap();
    let schema = Ident::new("test_db").unwrap();

    let snapshot_id = engine
        .capture_snapshot(&database, &schema)
        .await
        .expect("capture must succeed");
    assert!(snapshot_id.starts_with("SNAP_"));

    let unchanged = engine
        .compare_with_snapshot(&snapshot_id, &database, &schema)
        .await
        .expect("compare must succeed");
    assert!(unchanged.is_empty());

    let drifted = engine
        .compare_with_snapshot(&snapshot_id, &database, &schema)
        .await
        .expect("compare must succeed");
    let kinds: Vec<DriftKind> = drifted.iter().map(|record| record.kind()).collect();
    assert_eq!(kinds, vec![DriftKind::TypeChanged, DriftKind::ColumnRemoved]);
}

#[tokio::test]
async fn submission_timeout_is_not_resubmitted() {
    let server = spawn_server(vec![
        MockResponse::ok(json!({})).with_delay(Duration::from_millis(300)),
        MockResponse::ok(json!({})),
    ])
    .await;

    let client = server.client().with_options(ClientOptions {
        timeout_ms: 50,
        max_retries: 1,
        retry_backoff_ms: 1,
        ..fast_options()
    });

    let err = client
        .query("INSERT INTO audit_log VALUES (1)", None, None)
        .await
        .expect_err("timed out submission must fail");

    match err {
        TrinoDriftError::Transport { source, .. } => assert!(source.is_timeout()),
        other => panic!("expected transport timeout error, got {other:?}"),
    }
    let posts = server
        .hits()
        .iter()
        .filter(|hit| hit.method == Method::POST)
        .count();
    assert_eq!(posts, 1);
}

#[tokio::test]
async fn poll_timeout_is_retried() {
    let server = spawn_server(vec![
        MockResponse::ok(json!({ "nextUri": "{base}/v1/statement/executing/q6/1" })),
        MockResponse::ok(json!({})).with_delay(Duration::from_millis(300)),
        MockResponse::ok(json!({
            "columns": [{ "name": "n", "type": "integer" }],
            "data": [[7]]
        })),
    ])
    .await;

    let client = server.client().with_options(ClientOptions {
        timeout_ms: 100,
        max_retries: 1,
        retry_backoff_ms: 1,
        ..fast_options()
    });

    let result = client
        .query("SELECT 7 AS n", None, None)
        .await
        .expect("poll must succeed after retry");

    assert_eq!(result.rows[0].get_i64("n"), Some(7));
    let hits = server.hits();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[1].path, hits[2].path);
}

#[tokio::test]
async fn cached_client_still_sees_current_listing() {
    let columns = json!([
        { "name": "table_name", "type": "varchar" },
        { "name": "column_name", "type": "varchar" },
        { "name": "data_type", "type": "varchar" },
        { "name": "is_nullable", "type": "varchar" },
        { "name": "column_default", "type": "varchar" }
    ]);
    let server = spawn_server(vec![
        MockResponse::ok(json!({
            "columns": columns.clone(),
            "data": [["users", "id", "integer", "NO", null]]
        })),
        MockResponse::ok(json!({
            "columns": columns,
            "data": [["users", "id", "bigint", "NO", null]]
        })),
    ])
    .await;

    let client = server.client().with_cache(Duration::from_secs(300));
    let engine = DriftEngine::new(client, MemorySnapshotStore::new());
    let database = Ident::new("mysql").unwrap();
    let schema = Ident::new("test_db").unwrap();

    let snapshot_id = engine
        .capture_snapshot(&database, &schema)
        .await
        .expect("capture must succeed");
    let drifts = engine
        .compare_with_snapshot(&snapshot_id, &database, &schema)
        .await
        .expect("compare must succeed");

    assert_eq!(server.hits().len(), 2);
    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].kind(), DriftKind::TypeChanged);
}
