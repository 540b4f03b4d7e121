// src/session.rs
// Credentials live in the browser; nothing here is cached between calls.

use serde_json::Value;

use crate::api::model::SessionCredential;
use crate::browser::Browser;
use crate::config::consts::TOKEN_EXPR;
use crate::errors::BrowserError;

/// Current auth token from the page's local storage; `None` when absent or empty.
pub async fn read_token(browser: &dyn Browser) -> Result<Option<String>, BrowserError> {
    let value = browser.execute_script(TOKEN_EXPR).await?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Token and cookies as they are right now.
pub async fn read_credential(browser: &dyn Browser) -> Result<SessionCredential, BrowserError> {
    let bearer_token = read_token(browser).await?;
    let cookies = browser
        .get_cookies()
        .await?
        .into_iter()
        .map(|c| (c.name, c.value))
        .collect();
    Ok(SessionCredential { bearer_token, cookies })
}
