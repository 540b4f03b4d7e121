// src/browser/mod.rs
//! The browser control channel the harvester drives.
//!
//! Only the handful of commands the login flow and the API client need are
//! modelled here. [`webdriver::WebDriverSession`] implements them over the
//! W3C WebDriver protocol; tests substitute their own fakes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::BrowserError;

pub mod webdriver;

pub use webdriver::WebDriverSession;

/// How to locate an element on the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(s: impl Into<String>) -> Self {
        Selector::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Selector::XPath(s.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css `{s}`"),
            Selector::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

/// Integer viewport coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Element bounding box in viewport pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// A live page in a controlled browser.
///
/// Implementations must tolerate interleaved calls from several tasks; the
/// harvesters query token and cookies concurrently.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn go_to(&self, url: &str) -> Result<(), BrowserError>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn execute_script(&self, expr: &str) -> Result<Value, BrowserError>;

    /// Locate an element. With a timeout, keep looking until it appears or
    /// the window closes ([`BrowserError::Timeout`]); without one, a single
    /// miss is [`BrowserError::ElementNotFound`].
    async fn find_element(
        &self,
        selector: &Selector,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Element>, BrowserError>;

    async fn get_cookies(&self) -> Result<Vec<Cookie>, BrowserError>;

    /// Move the pointer to a viewport coordinate.
    async fn pointer_move(&self, to: Point) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait Element: Send + Sync {
    async fn click(&self) -> Result<(), BrowserError>;
    async fn type_text(&self, text: &str) -> Result<(), BrowserError>;
    async fn bounds(&self) -> Result<Rect, BrowserError>;
}
