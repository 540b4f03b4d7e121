// src/browser/webdriver.rs
// W3C WebDriver client, just enough for the login flow and credential reads.
// Talks JSON over HTTP to a running chromedriver (or any compliant driver).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use super::{Browser, Cookie, Element, Point, Rect, Selector};
use crate::config::consts::{FIND_POLL_MS, WEBDRIVER_TIMEOUT_SECS};
use crate::config::options::BrowserOptions;
use crate::errors::BrowserError;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

struct Channel {
    http: reqwest::Client,
    /// `<endpoint>/session/<id>`
    base: String,
}

impl Channel {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, BrowserError> {
        let url = format!("{}{}", self.base, path);
        send(&self.http, method, &url, body).await
    }
}

async fn send(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, BrowserError> {
    let mut req = http.request(method, url);
    if let Some(b) = body {
        req = req.json(&b);
    }
    let resp = req.send().await?;
    let status = resp.status();
    let mut payload: Value = resp.json().await?;
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .ok_or_else(|| BrowserError::Protocol(format!("missing `value` in reply from {url}")))?;

    if !status.is_success() {
        let error = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        let message = value.get("message").and_then(Value::as_str).unwrap_or_default();
        return Err(BrowserError::WebDriver { error: error.to_string(), message: message.to_string() });
    }
    Ok(value)
}

/// One browser window driven through WebDriver.
pub struct WebDriverSession {
    channel: Arc<Channel>,
    session_id: String,
}

impl WebDriverSession {
    /// Open a new browser session with the configured profile directory.
    pub async fn start(opts: &BrowserOptions) -> Result<Self, BrowserError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBDRIVER_TIMEOUT_SECS))
            .build()?;

        let mut args = vec![
            format!("--user-data-dir={}", opts.user_data_dir.display()),
            format!("--user-agent={}", opts.user_agent),
        ];
        if opts.headless {
            args.push("--headless=new".to_string());
        }
        let caps = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let endpoint = opts.webdriver_url.trim_end_matches('/');
        let value = send(&http, Method::POST, &format!("{endpoint}/session"), Some(caps)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("new session reply without sessionId".into()))?
            .to_string();

        logd!("webdriver session {session_id} opened at {endpoint}");
        Ok(Self {
            channel: Arc::new(Channel { http, base: format!("{endpoint}/session/{session_id}") }),
            session_id,
        })
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// End the session and close the window.
    pub async fn close(&self) -> Result<(), BrowserError> {
        self.channel.command(Method::DELETE, "", None).await?;
        logd!("webdriver session {} closed", self.session_id);
        Ok(())
    }

    async fn find_once(&self, selector: &Selector) -> Result<Box<dyn Element>, BrowserError> {
        let (using, value) = match selector {
            Selector::Css(s) => ("css selector", s),
            Selector::XPath(s) => ("xpath", s),
        };
        let found = self
            .channel
            .command(Method::POST, "/element", Some(json!({ "using": using, "value": value })))
            .await?;
        let id = found
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("element reply without reference".into()))?;
        Ok(Box::new(WebDriverElement { channel: Arc::clone(&self.channel), id: id.to_string() }))
    }
}

fn is_no_such_element(err: &BrowserError) -> bool {
    matches!(err, BrowserError::WebDriver { error, .. } if error == "no such element")
}

#[async_trait]
impl Browser for WebDriverSession {
    async fn go_to(&self, url: &str) -> Result<(), BrowserError> {
        self.channel.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    async fn execute_script(&self, expr: &str) -> Result<Value, BrowserError> {
        let script = format!("return ({expr});");
        self.channel
            .command(Method::POST, "/execute/sync", Some(json!({ "script": script, "args": [] })))
            .await
    }

    async fn find_element(
        &self,
        selector: &Selector,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Element>, BrowserError> {
        let Some(waited) = timeout else {
            return self.find_once(selector).await.map_err(|e| {
                if is_no_such_element(&e) { BrowserError::ElementNotFound(selector.clone()) } else { e }
            });
        };

        let started = Instant::now();
        loop {
            match self.find_once(selector).await {
                Ok(el) => return Ok(el),
                Err(e) if is_no_such_element(&e) => {
                    if started.elapsed() >= waited {
                        return Err(BrowserError::Timeout { selector: selector.clone(), waited });
                    }
                    tokio::time::sleep(Duration::from_millis(FIND_POLL_MS)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        let value = self.channel.command(Method::GET, "/cookie", None).await?;
        let list = value
            .as_array()
            .ok_or_else(|| BrowserError::Protocol("cookie reply is not a list".into()))?;
        Ok(list
            .iter()
            .filter_map(|c| {
                let name = c.get("name")?.as_str()?;
                let value = c.get("value")?.as_str()?;
                Some(Cookie { name: name.to_string(), value: value.to_string() })
            })
            .collect())
    }

    async fn pointer_move(&self, to: Point) -> Result<(), BrowserError> {
        let actions = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [{ "type": "pointerMove", "duration": 0, "origin": "viewport", "x": to.x, "y": to.y }]
            }]
        });
        self.channel.command(Method::POST, "/actions", Some(actions)).await?;
        Ok(())
    }
}

struct WebDriverElement {
    channel: Arc<Channel>,
    id: String,
}

#[async_trait]
impl Element for WebDriverElement {
    async fn click(&self) -> Result<(), BrowserError> {
        let path = format!("/element/{}/click", self.id);
        self.channel.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        let path = format!("/element/{}/value", self.id);
        self.channel.command(Method::POST, &path, Some(json!({ "text": text }))).await?;
        Ok(())
    }

    async fn bounds(&self) -> Result<Rect, BrowserError> {
        let path = format!("/element/{}/rect", self.id);
        let v = self.channel.command(Method::GET, &path, None).await?;
        let num = |k: &str| {
            v.get(k)
                .and_then(Value::as_f64)
                .ok_or_else(|| BrowserError::Protocol(format!("rect reply without `{k}`")))
        };
        Ok(Rect { x: num("x")?, y: num("y")?, width: num("width")?, height: num("height")? })
    }
}
