//! In-memory driver for unit tests
//!
//! Counts connects and cursor open/close calls and can be told to fail at
//! a given phase.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{ConfigSource, ConnectionConfig};
use crate::presto::{ClientError, ClientResult, Connection, Cursor, Driver};

/// Descriptor `{host:"h",port:1,user:"u",catalog:"c",schema:"s",ssl_verify:"/p"}`
pub fn descriptor(password: Option<&str>) -> ConfigSource {
    let mut value = json!({
        "host": "h",
        "port": 1,
        "user": "u",
        "catalog": "c",
        "schema": "s",
        "ssl_verify": "/p"
    });
    if let Some(password) = password {
        value["password"] = json!(password);
    }
    ConfigSource::JsonText(value.to_string())
}

#[derive(Debug, Default)]
struct FakeState {
    connects: AtomicUsize,
    cursors_opened: AtomicUsize,
    cursor_closes: AtomicUsize,
    closed_connections: AtomicUsize,
    fail_connect: AtomicBool,
    execute_failures: AtomicUsize,
    fetch_failures: AtomicUsize,
    columns: Mutex<Vec<String>>,
    rows: Mutex<Vec<Vec<Value>>>,
    configs: Mutex<Vec<ConnectionConfig>>,
    statements: Mutex<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDriver {
    state: Arc<FakeState>,
}

impl FakeDriver {
    /// Driver answering every statement with `[(1,"a"),(2,"b")]` over `["id","name"]`
    pub fn new() -> Self {
        Self::default().with_result(
            &["id", "name"],
            vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
        )
    }

    pub fn with_result(self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        *self.state.columns.lock().unwrap() = columns.iter().map(|c| c.to_string()).collect();
        *self.state.rows.lock().unwrap() = rows;
        self
    }

    pub fn fail_connect(self) -> Self {
        self.state.fail_connect.store(true, Ordering::SeqCst);
        self
    }

    /// Fail the next `times` fetches
    pub fn fail_fetch(self, times: usize) -> Self {
        self.state.fetch_failures.store(times, Ordering::SeqCst);
        self
    }

    /// Fail the next `times` submissions
    pub fn fail_execute(self, times: usize) -> Self {
        self.state.execute_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn cursors_opened(&self) -> usize {
        self.state.cursors_opened.load(Ordering::SeqCst)
    }

    /// Total `close` calls across all cursors
    pub fn cursor_closes(&self) -> usize {
        self.state.cursor_closes.load(Ordering::SeqCst)
    }

    pub fn closed_connections(&self) -> usize {
        self.state.closed_connections.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<ConnectionConfig> {
        self.state.configs.lock().unwrap().last().cloned()
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.statements.lock().unwrap().clone()
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Driver for FakeDriver {
    type Connection = FakeConnection;

    async fn connect(&self, config: &ConnectionConfig) -> ClientResult<FakeConnection> {
        self.state.configs.lock().unwrap().push(config.clone());
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(ClientError::Protocol("simulated connect failure".to_string()));
        }
        let id = self.state.connects.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeConnection {
            id,
            closed: AtomicBool::new(false),
            state: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    id: usize,
    closed: AtomicBool,
    state: Arc<FakeState>,
}

impl FakeConnection {
    /// Sequence number of this connection, starting at 1
    pub fn id(&self) -> usize {
        self.id
    }
}

#[async_trait]
impl Connection for FakeConnection {
    type Cursor = FakeCursor;

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn cursor(&self) -> FakeCursor {
        self.state.cursors_opened.fetch_add(1, Ordering::SeqCst);
        FakeCursor {
            state: Arc::clone(&self.state),
            executed: false,
        }
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.closed_connections.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
pub struct FakeCursor {
    state: Arc<FakeState>,
    executed: bool,
}

#[async_trait]
impl Cursor for FakeCursor {
    async fn execute(&mut self, sql: &str) -> ClientResult<()> {
        self.state.statements.lock().unwrap().push(sql.to_string());
        if take_failure(&self.state.execute_failures) {
            return Err(ClientError::Server {
                error_name: "SYNTAX_ERROR".to_string(),
                error_type: "USER_ERROR".to_string(),
                message: "simulated submission failure".to_string(),
            });
        }
        self.executed = true;
        Ok(())
    }

    async fn fetch_all(&mut self) -> ClientResult<Vec<Vec<Value>>> {
        if !self.executed {
            return Err(ClientError::Protocol("no statement has been executed".to_string()));
        }
        if take_failure(&self.state.fetch_failures) {
            return Err(ClientError::Protocol("simulated fetch failure".to_string()));
        }
        Ok(self.state.rows.lock().unwrap().clone())
    }

    fn column_names(&self) -> Vec<String> {
        self.state.columns.lock().unwrap().clone()
    }

    async fn close(&mut self) {
        self.state.cursor_closes.fetch_add(1, Ordering::SeqCst);
    }
}
