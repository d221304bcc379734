//! End-to-end tests for the query tool and pipeline node
//!
//! A mock coordinator stands in for Presto; the only thing swapped out is
//! TLS, so requests go over plain HTTP to the mock server.
//!
//! The test against a live cluster is ignored by default:
//!
//! ```bash
//! PRESTO_TEST_CONFIG='{"host": ..., "ssl_verify": "/path/chain.pem"}' \
//!     cargo test --test end_to_end -- --ignored
//! ```

use async_trait::async_trait;
use presto_mcp::presto::client::STATEMENT_PATH;
use presto_mcp::presto::{Auth, ClientResult, ClientSession, Driver, PrestoConnection};
use presto_mcp::{
    ConfigSource, ConnectionConfig, PrestoError, PrestoMcpServer, PrestoPipelineQuery,
    PrestoQueryTool, ToolSettings,
};
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Driver that connects to the mock coordinator over plain HTTP
struct MockCoordinatorDriver {
    base_url: Url,
}

impl MockCoordinatorDriver {
    fn new(server: &MockServer) -> Self {
        Self {
            base_url: Url::parse(&server.uri()).unwrap(),
        }
    }
}

#[async_trait]
impl Driver for MockCoordinatorDriver {
    type Connection = PrestoConnection;

    async fn connect(&self, config: &ConnectionConfig) -> ClientResult<PrestoConnection> {
        let http = reqwest::Client::builder().no_proxy().build()?;
        Ok(PrestoConnection::new(
            http,
            self.base_url.clone(),
            Auth::from_config(config),
            ClientSession::from_config(config),
        ))
    }
}

fn descriptor(password: Option<&str>) -> ConfigSource {
    let mut config = json!({
        "host": "coordinator.internal",
        "port": 8443,
        "user": "analyst",
        "catalog": "hive_data",
        "schema": "gosalesdw",
        "ssl_verify": "/etc/presto/chain.pem"
    });
    if let Some(password) = password {
        config["password"] = json!(password);
    }
    ConfigSource::from(config.to_string())
}

/// Answer every statement with a single finished page of `columns` and `data`
async fn mount_single_page(server: &MockServer, columns: Value, data: Value) {
    Mock::given(method("POST"))
        .and(path(STATEMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "q1",
            "columns": columns,
            "data": data,
            "stats": { "state": "FINISHED" }
        })))
        .mount(server)
        .await;
}

async fn mount_failure(server: &MockServer, message: &str) {
    Mock::given(method("POST"))
        .and(path(STATEMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "q1",
            "stats": { "state": "FAILED" },
            "error": {
                "message": message,
                "errorName": "SYNTAX_ERROR",
                "errorType": "USER_ERROR"
            }
        })))
        .mount(server)
        .await;
}

fn tables_columns() -> Value {
    json!([{ "name": "Table", "type": "varchar" }])
}

fn received_statements(requests: &[Request]) -> Vec<&Request> {
    requests
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .collect()
}

#[tokio::test]
async fn tool_returns_records_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STATEMENT_PATH))
        .and(header("X-Presto-User", "analyst"))
        .and(header("X-Presto-Catalog", "hive_data"))
        .and(header("X-Presto-Schema", "gosalesdw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "q1",
            "columns": [
                { "name": "id", "type": "integer" },
                { "name": "name", "type": "varchar" }
            ],
            "data": [[1, "a"], [2, "b"]],
            "stats": { "state": "FINISHED" }
        })))
        .mount(&server)
        .await;

    let tool = PrestoQueryTool::with_driver(
        descriptor(Some("secret")),
        ToolSettings::default(),
        MockCoordinatorDriver::new(&server),
    )
    .unwrap();

    let text = tool.run("SELECT id, name FROM t").await.unwrap();
    assert_eq!(text, r#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#);

    let requests = server.received_requests().await.unwrap();
    let statements = received_statements(&requests);
    assert_eq!(statements.len(), 1);
    assert!(statements[0]
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("Basic "));
}

#[tokio::test]
async fn tool_without_password_is_anonymous() {
    let server = MockServer::start().await;
    mount_single_page(&server, tables_columns(), json!([["sales"]])).await;

    let tool = PrestoQueryTool::with_driver(
        descriptor(None),
        ToolSettings::default(),
        MockCoordinatorDriver::new(&server),
    )
    .unwrap();

    assert_eq!(tool.run("SHOW TABLES").await.unwrap(), r#"[{"Table":"sales"}]"#);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn tool_reports_query_failure_as_text() {
    let server = MockServer::start().await;
    mount_failure(&server, "line 1:1: mismatched input 'SELEC'").await;

    let tool = PrestoQueryTool::with_driver(
        descriptor(None),
        ToolSettings::default(),
        MockCoordinatorDriver::new(&server),
    )
    .unwrap();

    let text = tool.run("SELEC 1").await.unwrap();
    assert!(text.starts_with("Error: Query failed with exception: "));
    assert!(text.contains("mismatched input 'SELEC'"));
}

#[tokio::test]
async fn tool_reuses_connection_session_between_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STATEMENT_PATH))
        .and(header("X-Presto-Schema", "gosalesdw"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Presto-Set-Schema", "staging")
                .set_body_json(json!({ "id": "q1", "stats": { "state": "FINISHED" } })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STATEMENT_PATH))
        .and(header("X-Presto-Schema", "staging"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "q2",
            "columns": [{ "name": "n", "type": "bigint" }],
            "data": [[0]],
            "stats": { "state": "FINISHED" }
        })))
        .mount(&server)
        .await;

    let tool = PrestoQueryTool::with_driver(
        descriptor(None),
        ToolSettings::default(),
        MockCoordinatorDriver::new(&server),
    )
    .unwrap();

    assert_eq!(tool.run("USE staging").await.unwrap(), "[]");
    assert_eq!(tool.run("SELECT count(*) AS n FROM t").await.unwrap(), r#"[{"n":0}]"#);
}

#[tokio::test]
async fn server_dispatch_over_mock_coordinator() {
    let server = MockServer::start().await;
    mount_single_page(&server, tables_columns(), json!([["sales"], ["returns"]])).await;

    let settings = ToolSettings {
        name: "warehouse_sql".to_string(),
        ..ToolSettings::default()
    };
    let tool = PrestoQueryTool::with_driver(
        descriptor(None),
        settings,
        MockCoordinatorDriver::new(&server),
    )
    .unwrap();
    let mcp = PrestoMcpServer::new(tool);

    let args = json!({ "sql_query": "SHOW TABLES" }).as_object().cloned();
    let result = mcp.dispatch("warehouse_sql", args).await.unwrap();
    let text = &result.content[0].as_text().unwrap().text;
    assert_eq!(text, r#"[{"Table":"sales"},{"Table":"returns"}]"#);
}

#[tokio::test]
async fn pipeline_returns_tabular_value() {
    let server = MockServer::start().await;
    mount_single_page(&server, tables_columns(), json!([["sales"], ["returns"]])).await;

    let mut node =
        PrestoPipelineQuery::with_driver(descriptor(Some("secret")), MockCoordinatorDriver::new(&server));
    let value = node.run_query("SHOW TABLES").await.unwrap();

    assert_eq!(value.columns, vec!["Table"]);
    assert_eq!(value.row_count, 2);
    assert_eq!(value.records()[1]["Table"], json!("returns"));
    assert!(!node.executor().is_connected());
}

#[tokio::test]
async fn pipeline_propagates_query_failure() {
    let server = MockServer::start().await;
    mount_failure(&server, "Table hive_data.gosalesdw.nope does not exist").await;

    let mut node =
        PrestoPipelineQuery::with_driver(descriptor(None), MockCoordinatorDriver::new(&server));
    let err = node.run_query("SELECT * FROM nope").await.unwrap_err();

    assert!(matches!(err, PrestoError::Query(_)));
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn missing_certificate_is_a_connection_error() {
    // Real driver: the bundle path does not exist.
    let tool = PrestoQueryTool::new(descriptor(None), ToolSettings::default()).unwrap();
    let err = tool.run("SELECT 1").await.unwrap_err();

    assert!(matches!(err, PrestoError::Connection(_)));
    assert!(tool.status().starts_with("Connection failed:"));
}

#[tokio::test]
#[ignore = "integration test - requires a Presto cluster and PRESTO_TEST_CONFIG"]
async fn live_cluster_show_tables() {
    let Ok(config) = std::env::var("PRESTO_TEST_CONFIG") else {
        eprintln!("PRESTO_TEST_CONFIG not set, skipping");
        return;
    };

    let mut node = PrestoPipelineQuery::new(ConfigSource::from(config));
    let value = node.run_query("SHOW TABLES").await.unwrap();
    assert_eq!(value.columns.len(), 1);
}
