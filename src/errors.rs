// src/errors.rs
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::browser::Selector;

/// Failures of the browser control channel.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("element not found: {0}")]
    ElementNotFound(Selector),
    #[error("element {selector} did not appear within {waited:?}")]
    Timeout { selector: Selector, waited: Duration },
    #[error("webdriver error '{error}': {message}")]
    WebDriver { error: String, message: String },
    #[error("unexpected webdriver reply: {0}")]
    Protocol(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Login flow failures. All of them are terminal for a run.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{step} control did not appear within {waited:?}")]
    Timeout { step: &'static str, waited: Duration },
    #[error("{step} control not found ({selector})")]
    ElementNotFound { step: &'static str, selector: Selector },
    #[error("no session token after {0:?}")]
    TokenTimeout(Duration),
    #[error("login required but no phone number configured")]
    MissingPhone,
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Remote API failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} from {url}: {body}")]
    Http { status: u16, url: String, body: String },
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },
    #[error("could not decode response from {url}: {source}")]
    Decode { url: String, source: serde_json::Error },
    #[error("could not read session credential: {0}")]
    Session(#[from] BrowserError),
    #[error("could not build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// Append-log failures.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("{path}:{line}: malformed record: {source}")]
    Decode { path: PathBuf, line: usize, source: serde_json::Error },
    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Anything that can end a harvest run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("harvest cancelled")]
    Cancelled,
}
