// tests/api_client.rs
//
// ApiClient against a local HTTP stand-in for the receipts service.
//
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use receipt_harvest::api::{ApiClient, ReceiptApi};
use receipt_harvest::browser::{Browser, Cookie, Element, Point, Selector};
use receipt_harvest::config::consts::TOKEN_EXPR;
use receipt_harvest::config::options::ApiOptions;
use receipt_harvest::errors::{ApiError, BrowserError};

/// Browser that only knows its token and cookie jar.
struct SessionOnly {
    token: Mutex<Option<String>>,
    cookies: Vec<Cookie>,
}

#[async_trait]
impl Browser for SessionOnly {
    async fn go_to(&self, _url: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn execute_script(&self, expr: &str) -> Result<Value, BrowserError> {
        assert_eq!(expr, TOKEN_EXPR);
        Ok(self.token.lock().unwrap().clone().map(Value::String).unwrap_or(Value::Null))
    }

    async fn find_element(&self, selector: &Selector, _: Option<Duration>) -> Result<Box<dyn Element>, BrowserError> {
        Err(BrowserError::ElementNotFound(selector.clone()))
    }

    async fn get_cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        Ok(self.cookies.clone())
    }

    async fn pointer_move(&self, _to: Point) -> Result<(), BrowserError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Seen {
    route: String,
    authorization: Option<String>,
    cookie: Option<String>,
    body: Value,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn record(log: &Log, route: &str, headers: &HeaderMap, body: Value) {
    let h = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    log.lock().unwrap().push(Seen {
        route: route.to_string(),
        authorization: h("authorization"),
        cookie: h("cookie"),
        body,
    });
}

async fn listing(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    record(&log, "listing", &headers, body.clone());
    let offset = body["offset"].as_u64().unwrap_or(0);
    Json(json!({
        "receipts": [{"key": 1000 + offset, "brandId": 7, "createdDate": "2025-01-02", "totalSum": 12.5}],
        "brands": [{"id": 7, "name": "Shop"}],
        "hasMore": offset == 0,
    }))
}

async fn fiscal(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    record(&log, "fiscal", &headers, body.clone());
    if body["key"] == "bad" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "down"})));
    }
    (StatusCode::OK, Json(json!({"fiscalSign": "42", "key": "provider-key"})))
}

async fn search(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    record(&log, "search", &headers, body);
    Json(json!({"receipts": []}))
}

async fn details(State(log): State<Log>, headers: HeaderMap, Path(id): Path<String>) -> Json<Value> {
    record(&log, "details", &headers, Value::Null);
    Json(json!({"id": id, "items": []}))
}

async fn serve() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/api/v1/receipt", post(listing))
        .route("/api/v1/receipt/fiscal_data", post(fiscal))
        .route("/api/v1/receipt/search", post(search))
        .route("/api/v1/receipt/{id}", get(details))
        .with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), log)
}

fn client(base_url: String, token: Option<&str>, cookies: &[(&str, &str)]) -> (ApiClient, Arc<SessionOnly>) {
    let browser = Arc::new(SessionOnly {
        token: Mutex::new(token.map(str::to_string)),
        cookies: cookies
            .iter()
            .map(|(n, v)| Cookie { name: n.to_string(), value: v.to_string() })
            .collect(),
    });
    let options = ApiOptions { base_url, page_size: 5, ..Default::default() };
    (ApiClient::new(browser.clone(), options).unwrap(), browser)
}

#[tokio::test]
async fn listing_request_carries_session_and_paging() {
    let (base, log) = serve().await;
    let (api, _) = client(base, Some("tok"), &[("sid", "abc"), ("lang", "ru")]);

    let page = api.fetch_receipts_page(0).await.unwrap();
    assert!(page.has_more());
    // stored as sent: the numeric key stays a number
    assert_eq!(page.receipts()[0]["key"], json!(1000));
    assert_eq!(page.receipts()[0]["totalSum"], json!(12.5));
    let view = page.view().unwrap();
    assert_eq!(view.receipts[0].key, "1000");
    assert_eq!(view.brands[0].name, "Shop");

    let page = api.fetch_receipts_page(2).await.unwrap();
    assert!(!page.has_more());
    assert_eq!(page.receipts()[0]["key"], json!(1010));

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok"));
    assert_eq!(seen[0].cookie.as_deref(), Some("lang=ru; sid=abc"));
    assert_eq!(seen[0].body["limit"], json!(5));
    assert_eq!(seen[0].body["offset"], json!(0));
    assert_eq!(seen[0].body["orderBy"], json!("CREATED_DATE:DESC"));
    assert_eq!(seen[1].body["offset"], json!(10));
}

#[tokio::test]
async fn credential_is_reread_for_every_request() {
    let (base, log) = serve().await;
    let (api, browser) = client(base, None, &[]);

    api.fetch_fiscal_data("k1").await.unwrap();
    *browser.token.lock().unwrap() = Some("fresh".into());
    api.fetch_fiscal_data("k2").await.unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen[0].authorization, None);
    assert_eq!(seen[0].cookie, None);
    assert_eq!(seen[1].authorization.as_deref(), Some("Bearer fresh"));
    assert_eq!(seen[1].body, json!({"key": "k2"}));
}

#[tokio::test]
async fn fiscal_record_is_passed_through_as_sent() {
    let (base, _log) = serve().await;
    let (api, _) = client(base, Some("tok"), &[]);

    let record = api.fetch_fiscal_data("k1").await.unwrap();
    assert_eq!(record.0["fiscalSign"], json!("42"));
    assert_eq!(record.key(), Some("provider-key"));
    assert_eq!(record.with_key("k1").key(), Some("k1"));
}

#[tokio::test]
async fn server_error_is_an_http_error() {
    let (base, _log) = serve().await;
    let (api, _) = client(base, Some("tok"), &[]);

    let err = api.fetch_fiscal_data("bad").await.unwrap_err();
    match err {
        ApiError::Http { status, url, body } => {
            assert_eq!(status, 500);
            assert!(url.ends_with("/api/v1/receipt/fiscal_data"));
            assert!(body.contains("down"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn search_and_details_use_their_endpoints() {
    let (base, log) = serve().await;
    let (api, _) = client(base, Some("tok"), &[]);

    let found = api.search_receipts("milk", 20, 40).await.unwrap();
    assert_eq!(found, json!({"receipts": []}));
    let detail = api.fetch_receipt_details("r-77").await.unwrap();
    assert_eq!(detail["id"], json!("r-77"));

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen[0].route, "search");
    assert_eq!(seen[0].body, json!({"query": "milk", "limit": 20, "offset": 40}));
    assert_eq!(seen[1].route, "details");
    assert_eq!(seen[1].authorization.as_deref(), Some("Bearer tok"));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let (api, _) = client("http://127.0.0.1:9".into(), Some("tok"), &[]);
    let err = api.fetch_receipts_page(0).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "{err}");
}
