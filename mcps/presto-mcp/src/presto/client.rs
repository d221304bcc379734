//! HTTP implementation of the Presto client protocol
//!
//! A statement is submitted with `POST /v1/statement`; the coordinator answers
//! with a page of [`QueryResults`] and, while the statement is still running,
//! a `nextUri` to poll. Rows arrive spread over those pages.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Certificate, Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::driver::{Connection, Cursor, Driver};
use super::error::{ClientError, ClientResult};
use super::types::{Column, QueryResults};
use crate::config::ConnectionConfig;

/// Statement endpoint, relative to the coordinator base URL
pub const STATEMENT_PATH: &str = "/v1/statement";

/// Value of the `X-Presto-Source` header
pub const SOURCE_NAME: &str = "presto-mcp";

const USER_AGENT: &str = concat!("presto-mcp/", env!("CARGO_PKG_VERSION"));

/// Polls answered with 503 before giving up
const MAX_BUSY_POLLS: u32 = 10;
const BUSY_POLL_DELAY: Duration = Duration::from_millis(100);

/// Protocol header names
pub mod headers {
    pub const USER: &str = "X-Presto-User";
    pub const SOURCE: &str = "X-Presto-Source";
    pub const CATALOG: &str = "X-Presto-Catalog";
    pub const SCHEMA: &str = "X-Presto-Schema";
    pub const SESSION: &str = "X-Presto-Session";
    pub const SET_CATALOG: &str = "X-Presto-Set-Catalog";
    pub const SET_SCHEMA: &str = "X-Presto-Set-Schema";
    pub const SET_SESSION: &str = "X-Presto-Set-Session";
    pub const CLEAR_SESSION: &str = "X-Presto-Clear-Session";
}

/// How requests authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// No credentials; the user is only sent as `X-Presto-User`
    Anonymous,
    /// HTTP basic authentication
    Basic { user: String, password: String },
}

impl Auth {
    /// Basic auth when the config carries a password, anonymous otherwise
    pub fn from_config(config: &ConnectionConfig) -> Self {
        match &config.password {
            Some(password) => Auth::Basic {
                user: config.user.clone(),
                password: password.clone(),
            },
            None => Auth::Anonymous,
        }
    }
}

/// Per-connection session state sent with every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    pub user: String,
    pub catalog: String,
    pub schema: String,
    /// Session properties, values kept in their URL-encoded wire form
    pub properties: BTreeMap<String, String>,
}

impl ClientSession {
    pub fn new(
        user: impl Into<String>,
        catalog: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            catalog: catalog.into(),
            schema: schema.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(&config.user, &config.catalog, &config.schema)
    }

    fn properties_header(&self) -> Option<String> {
        if self.properties.is_empty() {
            return None;
        }
        let joined = self
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        Some(joined)
    }

    fn apply_headers(&mut self, response_headers: &HeaderMap) {
        if let Some(catalog) = header_text(response_headers, headers::SET_CATALOG) {
            self.catalog = catalog;
        }
        if let Some(schema) = header_text(response_headers, headers::SET_SCHEMA) {
            self.schema = schema;
        }
        for value in response_headers.get_all(headers::SET_SESSION) {
            let Ok(text) = value.to_str() else { continue };
            if let Some((key, value)) = text.split_once('=') {
                self.properties
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        for value in response_headers.get_all(headers::CLEAR_SESSION) {
            if let Ok(key) = value.to_str() {
                self.properties.remove(key.trim());
            }
        }
    }
}

fn header_text(map: &HeaderMap, name: &str) -> Option<String> {
    map.get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// Driver
// ============================================================================

/// Driver speaking the Presto REST protocol over HTTPS
#[derive(Debug, Clone, Default)]
pub struct PrestoDriver;

impl PrestoDriver {
    pub fn new() -> Self {
        Self
    }

    /// Build an HTTPS client that trusts only the configured PEM bundle and
    /// ignores proxy environment variables
    pub async fn build_http_client(config: &ConnectionConfig) -> ClientResult<Client> {
        let path = config.ssl_verify_path.display().to_string();

        let pem = tokio::fs::read(&config.ssl_verify_path)
            .await
            .map_err(|source| ClientError::CertificateRead {
                path: path.clone(),
                source,
            })?;

        let certificates =
            Certificate::from_pem_bundle(&pem).map_err(|e| ClientError::InvalidCertificate {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if certificates.is_empty() {
            return Err(ClientError::InvalidCertificate {
                path,
                reason: "no PEM certificates found".to_string(),
            });
        }

        let mut builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .no_proxy()
            .user_agent(USER_AGENT);

        for certificate in certificates {
            builder = builder.add_root_certificate(certificate);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl Driver for PrestoDriver {
    type Connection = PrestoConnection;

    #[instrument(skip(self, config), fields(host = %config.host, port = config.port))]
    async fn connect(&self, config: &ConnectionConfig) -> ClientResult<PrestoConnection> {
        let http = Self::build_http_client(config).await?;
        let base_url = Url::parse(&config.base_url())
            .map_err(|e| ClientError::Protocol(format!("invalid coordinator address: {}", e)))?;

        debug!(catalog = %config.catalog, schema = %config.schema, "connection ready");

        Ok(PrestoConnection::new(
            http,
            base_url,
            Auth::from_config(config),
            ClientSession::from_config(config),
        ))
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Connection to a coordinator: an HTTP client plus session state
#[derive(Debug, Clone)]
pub struct PrestoConnection {
    inner: Arc<ConnectionInner>,
}

#[derive(Debug)]
struct ConnectionInner {
    http: Client,
    base_url: Url,
    auth: Auth,
    session: Mutex<ClientSession>,
    closed: AtomicBool,
}

impl ConnectionInner {
    fn session(&self) -> ClientSession {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update_session(&self, response_headers: &HeaderMap) {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .apply_headers(response_headers);
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let session = self.session();

        let mut builder = self
            .http
            .request(method, url)
            .header(headers::USER, &session.user)
            .header(headers::SOURCE, SOURCE_NAME)
            .header(headers::CATALOG, &session.catalog)
            .header(headers::SCHEMA, &session.schema);

        if let Some(properties) = session.properties_header() {
            builder = builder.header(headers::SESSION, properties);
        }

        if let Auth::Basic { user, password } = &self.auth {
            builder = builder.basic_auth(user, Some(password));
        }

        builder
    }
}

impl PrestoConnection {
    /// Wrap an existing HTTP client; `base_url` is the coordinator root
    pub fn new(http: Client, base_url: Url, auth: Auth, session: ClientSession) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                http,
                base_url,
                auth,
                session: Mutex::new(session),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn auth(&self) -> &Auth {
        &self.inner.auth
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Snapshot of the current session state
    pub fn session(&self) -> ClientSession {
        self.inner.session()
    }
}

#[async_trait]
impl Connection for PrestoConnection {
    type Cursor = PrestoCursor;

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn cursor(&self) -> PrestoCursor {
        PrestoCursor::new(Arc::clone(&self.inner))
    }

    async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Cursor over a single statement
#[derive(Debug)]
pub struct PrestoCursor {
    conn: Arc<ConnectionInner>,
    query_id: Option<String>,
    columns: Option<Vec<Column>>,
    rows: Vec<Vec<Value>>,
    next_uri: Option<String>,
    state: Option<String>,
    closed: bool,
}

impl PrestoCursor {
    fn new(conn: Arc<ConnectionInner>) -> Self {
        Self {
            conn,
            query_id: None,
            columns: None,
            rows: Vec::new(),
            next_uri: None,
            state: None,
            closed: false,
        }
    }

    fn ensure_usable(&self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::Closed("cursor"));
        }
        if self.conn.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed("connection"));
        }
        Ok(())
    }

    async fn read_page(&self, response: Response) -> ClientResult<QueryResults> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        self.conn.update_session(response.headers());
        Ok(response.json::<QueryResults>().await?)
    }

    async fn poll(&self, uri: &str) -> ClientResult<QueryResults> {
        let mut attempt = 0;
        loop {
            let response = self.conn.request(Method::GET, uri).send().await?;
            if response.status() == StatusCode::SERVICE_UNAVAILABLE && attempt < MAX_BUSY_POLLS {
                attempt += 1;
                debug!(attempt, "coordinator busy, polling again");
                tokio::time::sleep(BUSY_POLL_DELAY * attempt).await;
                continue;
            }
            return self.read_page(response).await;
        }
    }

    fn absorb(&mut self, page: QueryResults) -> ClientResult<()> {
        if self.query_id.is_none() {
            self.query_id = Some(page.id.clone());
        }
        if let Some(stats) = &page.stats {
            self.state = Some(stats.state.clone());
        }

        if let Some(failure) = page.error {
            self.next_uri = None;
            return Err(ClientError::Server {
                error_name: failure.error_name.unwrap_or_else(|| "UNKNOWN".to_string()),
                error_type: failure.error_type.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: failure.message,
            });
        }

        if self.columns.is_none() {
            self.columns = page.columns;
        }
        if let Some(data) = page.data {
            self.rows.extend(data);
        }
        self.next_uri = page.next_uri;
        Ok(())
    }
}

#[async_trait]
impl Cursor for PrestoCursor {
    #[instrument(skip(self, sql))]
    async fn execute(&mut self, sql: &str) -> ClientResult<()> {
        self.ensure_usable()?;
        if self.query_id.is_some() {
            return Err(ClientError::Protocol(
                "cursor already holds a statement".to_string(),
            ));
        }

        let url = self
            .conn
            .base_url
            .join(STATEMENT_PATH)
            .map_err(|e| ClientError::Protocol(format!("invalid statement URL: {}", e)))?;

        let response = self
            .conn
            .request(Method::POST, url.as_str())
            .body(sql.to_string())
            .send()
            .await?;

        let page = self.read_page(response).await?;
        debug!(query_id = %page.id, "statement submitted");
        self.absorb(page)
    }

    #[instrument(skip(self))]
    async fn fetch_all(&mut self) -> ClientResult<Vec<Vec<Value>>> {
        self.ensure_usable()?;
        if self.query_id.is_none() {
            return Err(ClientError::Protocol(
                "no statement has been executed".to_string(),
            ));
        }

        while let Some(uri) = self.next_uri.clone() {
            let page = self.poll(&uri).await?;
            self.absorb(page)?;
        }

        debug!(rows = self.rows.len(), state = ?self.state, "statement drained");
        Ok(std::mem::take(&mut self.rows))
    }

    fn column_names(&self) -> Vec<String> {
        self.columns
            .as_ref()
            .map(|cols| cols.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rows.clear();

        // An unfinished statement keeps running on the cluster until cancelled.
        if let Some(uri) = self.next_uri.take() {
            match self.conn.request(Method::DELETE, &uri).send().await {
                Ok(response) => debug!(status = %response.status(), "released unfinished statement"),
                Err(e) => warn!("failed to release unfinished statement: {}", e),
            }
        }
    }
}
