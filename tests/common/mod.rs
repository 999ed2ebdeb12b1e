#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::{
    collections::HashSet,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::{Url, form_urlencoded};

use dough::config::PlaidConfig;
use dough::db::AccessTokenStorage;
use dough::middleware::IdentityResolver;
use dough::plaid::{LinkSettings, PlaidClient, ProviderGateway};
use dough::router::{DoughState, dough_router};
use dough::service::LinkOrchestrator;
use dough::types::User;
use dough::types::intent::IntentForm;

pub const TEST_USER_HEADER: &str = "x-test-user";
pub const CLIENT_ID: &str = "client-test";
pub const SANDBOX_SECRET: &str = "sandbox-secret";

/// Trusts a plain header; stands in for the session subsystem.
pub struct HeaderIdentity;

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, parts: &Parts) -> Option<User> {
        parts
            .headers
            .get(TEST_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(User::new)
    }
}

/// In-process Plaid sandbox lookalike.
#[derive(Default)]
pub struct FakePlaid {
    pub fail_link: AtomicBool,
    pub link_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub accounts_calls: AtomicUsize,
    used_public_tokens: Mutex<HashSet<String>>,
}

impl FakePlaid {
    pub fn calls(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
            + self.exchange_calls.load(Ordering::SeqCst)
            + self.accounts_calls.load(Ordering::SeqCst)
    }
}

fn plaid_error(status: StatusCode, error_type: &str, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error_type": error_type,
            "error_code": code,
            "error_message": message,
            "display_message": null,
            "request_id": "req-error",
        })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("plaid-client-id").and_then(|v| v.to_str().ok()) == Some(CLIENT_ID)
        && headers.get("plaid-secret").and_then(|v| v.to_str().ok()) == Some(SANDBOX_SECRET)
}

async fn link_token_create(
    State(plaid): State<Arc<FakePlaid>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    plaid.link_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return plaid_error(
            StatusCode::BAD_REQUEST,
            "INVALID_INPUT",
            "INVALID_API_KEYS",
            "invalid client_id or secret provided",
        );
    }
    if plaid.fail_link.load(Ordering::SeqCst) {
        return plaid_error(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMIT_EXCEEDED",
            "RATE_LIMIT",
            "rate limit exceeded",
        );
    }
    let user = body["user"]["client_user_id"].as_str().unwrap_or_default();
    Json(json!({
        "link_token": format!("link-sandbox-{user}"),
        "expiration": (Utc::now() + Duration::hours(4)).to_rfc3339(),
        "request_id": "req-link",
    }))
    .into_response()
}

async fn public_token_exchange(
    State(plaid): State<Arc<FakePlaid>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    plaid.exchange_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return plaid_error(
            StatusCode::BAD_REQUEST,
            "INVALID_INPUT",
            "INVALID_API_KEYS",
            "invalid client_id or secret provided",
        );
    }
    let public_token = body["public_token"].as_str().unwrap_or_default().to_string();
    if !plaid.used_public_tokens.lock().unwrap().insert(public_token.clone()) {
        return plaid_error(
            StatusCode::BAD_REQUEST,
            "INVALID_INPUT",
            "INVALID_PUBLIC_TOKEN",
            "provided public token is expired or has already been used",
        );
    }
    Json(json!({
        "access_token": format!("access-sandbox-{public_token}"),
        "item_id": format!("item-{public_token}"),
        "request_id": "req-exchange",
    }))
    .into_response()
}

async fn accounts_get(
    State(plaid): State<Arc<FakePlaid>>,
    Json(body): Json<Value>,
) -> Response {
    plaid.accounts_calls.fetch_add(1, Ordering::SeqCst);
    let access_token = body["access_token"].as_str().unwrap_or_default();
    if !access_token.starts_with("access-sandbox-") {
        return plaid_error(
            StatusCode::BAD_REQUEST,
            "INVALID_INPUT",
            "INVALID_ACCESS_TOKEN",
            "provided access token is in an invalid format",
        );
    }
    Json(json!({
        "accounts": [{
            "account_id": "acc-checking",
            "balances": {"available": 100, "current": 110, "iso_currency_code": "USD", "limit": null},
            "mask": "0000",
            "name": "Plaid Checking",
            "official_name": "Plaid Gold Standard 0% Interest Checking",
            "subtype": "checking",
            "type": "depository"
        }],
        "item": {"item_id": access_token.trim_start_matches("access-sandbox-")},
        "request_id": "req-accounts",
    }))
    .into_response()
}

pub async fn spawn_fake_plaid() -> (SocketAddr, Arc<FakePlaid>) {
    let plaid = Arc::new(FakePlaid::default());
    let app = Router::new()
        .route("/link/token/create", post(link_token_create))
        .route("/item/public_token/exchange", post(public_token_exchange))
        .route("/accounts/get", post(accounts_get))
        .with_state(plaid.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind fake Plaid");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, plaid)
}

/// Removes the backing SQLite file when dropped.
pub struct TempDb(PathBuf);

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.0.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(p);
        }
    }
}

pub async fn temp_storage(tag: &str) -> (AccessTokenStorage, TempDb) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("dough-it-{tag}-{}-{nanos}.sqlite", std::process::id()));

    let storage = AccessTokenStorage::connect(&format!("sqlite:{}", path.display()))
        .await
        .expect("failed to open test database");
    (storage, TempDb(path))
}

pub fn plaid_config(base_url: &str) -> PlaidConfig {
    PlaidConfig {
        client_id: CLIENT_ID.to_string(),
        sandbox_secret: Some(SANDBOX_SECRET.to_string()),
        base_url: Some(Url::parse(base_url).expect("bad base url")),
        connect_timeout_secs: 1,
        timeout_secs: 2,
        ..PlaidConfig::default()
    }
}

pub struct Harness {
    pub app: Router,
    pub storage: AccessTokenStorage,
    pub plaid: Arc<FakePlaid>,
    _db: TempDb,
}

impl Harness {
    pub async fn new(tag: &str) -> Self {
        let (addr, plaid) = spawn_fake_plaid().await;
        Self::with_base_url(tag, &format!("http://{addr}"), plaid).await
    }

    pub async fn with_base_url(tag: &str, base_url: &str, plaid: Arc<FakePlaid>) -> Self {
        let (storage, db) = temp_storage(tag).await;
        let cfg = plaid_config(base_url);
        let client = PlaidClient::new(&cfg).expect("plaid client");
        let gateway =
            ProviderGateway::new(Arc::new(client), storage.clone(), LinkSettings::from(&cfg));
        let state = DoughState::new(LinkOrchestrator::new(gateway), Arc::new(HeaderIdentity));
        Self {
            app: dough_router(state),
            storage,
            plaid,
            _db: db,
        }
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(u) = user {
            builder = builder.header(TEST_USER_HEADER, u);
        }
        self.send(builder.body(Body::empty()).expect("failed to build request"))
            .await
    }

    pub async fn post_form(&self, form: &IntentForm, user: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(u) = user {
            builder = builder.header(TEST_USER_HEADER, u);
        }
        self.send(
            builder
                .body(Body::from(encode_form(form)))
                .expect("failed to build request"),
        )
        .await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.expect("request failed");
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("response body was not JSON")
        };
        (status, value)
    }
}

pub fn encode_form(form: &IntentForm) -> String {
    let mut s = form_urlencoded::Serializer::new(String::new());
    if let Some(intent) = &form.intent {
        s.append_pair("intent", intent);
    }
    if let Some(public_token) = &form.public_token {
        s.append_pair("public_token", public_token);
    }
    s.finish()
}
