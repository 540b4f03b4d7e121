// src/api/client.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, COOKIE, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::model::{FiscalRecord, KeyQuery, ReceiptsPage, ReceiptsQuery, SearchQuery, SessionCredential};
use super::ReceiptApi;
use crate::browser::Browser;
use crate::config::consts::{FISCAL_PATH, RECEIPTS_PATH, SEARCH_PATH};
use crate::config::options::ApiOptions;
use crate::errors::ApiError;
use crate::session;

/// Authenticated client for the receipts service.
///
/// Holds no credential of its own: every request reads the token and cookie
/// jar off the live browser session first.
pub struct ApiClient {
    http: reqwest::Client,
    browser: Arc<dyn Browser>,
    options: ApiOptions,
}

impl ApiClient {
    pub fn new(browser: Arc<dyn Browser>, options: ApiOptions) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { http, browser, options })
    }

    /// Free-text search over receipts.
    pub async fn search_receipts(&self, query: &str, limit: u32, offset: u64) -> Result<Value, ApiError> {
        let body = SearchQuery { query, limit, offset };
        self.call(Method::POST, SEARCH_PATH, Some(&body)).await
    }

    /// Full detail of one receipt by id.
    pub async fn fetch_receipt_details(&self, receipt_id: &str) -> Result<Value, ApiError> {
        let path = format!("{RECEIPTS_PATH}/{receipt_id}");
        self.call::<(), _>(Method::GET, &path, None).await
    }

    fn headers(&self, cred: &SessionCredential) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        if let Ok(v) = HeaderValue::from_str(&self.options.user_agent) {
            h.insert(USER_AGENT, v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.options.accept_language) {
            h.insert(ACCEPT_LANGUAGE, v);
        }
        if let Some(token) = &cred.bearer_token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(v) => { h.insert(AUTHORIZATION, v); }
                Err(_) => logw!("session token is not a valid header value; sending without it"),
            }
        }
        if let Some(jar) = cred.cookie_header() {
            if let Ok(v) = HeaderValue::from_str(&jar) {
                h.insert(COOKIE, v);
            }
        }
        h
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ApiError> {
        let cred = session::read_credential(self.browser.as_ref()).await?;
        Ok(self.http.request(method, url).headers(self.headers(&cred)))
    }

    async fn call<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.options.url(path);
        let mut req = self.request(method, &url).await?;
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req
            .send()
            .await
            .map_err(|source| ApiError::Transport { url: url.clone(), source })?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { url: url.clone(), source })?;

        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&bytes).chars().take(512).collect();
            return Err(ApiError::Http { status: status.as_u16(), url, body });
        }
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { url, source })
    }
}

#[async_trait]
impl ReceiptApi for ApiClient {
    async fn fetch_receipts_page(&self, page_index: u32) -> Result<ReceiptsPage, ApiError> {
        let o = &self.options;
        let body = ReceiptsQuery {
            limit: o.page_size,
            offset: u64::from(page_index) * u64::from(o.page_size),
            date_from: o.date_from.as_deref(),
            date_to: o.date_to.as_deref(),
            order_by: &o.order_by,
            inn: o.inn.as_deref(),
            kkt_owner: &o.kkt_owner,
        };
        self.call(Method::POST, RECEIPTS_PATH, Some(&body)).await
    }

    async fn fetch_fiscal_data(&self, key: &str) -> Result<FiscalRecord, ApiError> {
        self.call(Method::POST, FISCAL_PATH, Some(&KeyQuery { key })).await
    }
}
