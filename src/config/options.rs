// src/config/options.rs
use std::path::PathBuf;
use std::time::Duration;

use super::consts::*;
use crate::browser::Selector;
use crate::human::WindMouse;

#[derive(Clone, Debug, Default)]
pub struct AppOptions {
    pub api: ApiOptions,
    pub harvest: HarvestOptions,
    pub auth: AuthOptions,
    pub browser: BrowserOptions,
}

/// Remote API endpoint, request shape and pacing-independent HTTP settings.
#[derive(Clone, Debug)]
pub struct ApiOptions {
    pub base_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub order_by: String,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub inn: Option<String>,
    pub kkt_owner: String,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            page_size: PAGE_SIZE,
            order_by: ORDER_BY.to_string(),
            date_from: None,
            date_to: None,
            inn: None,
            kkt_owner: String::new(),
        }
    }
}

impl ApiOptions {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// What to do with a receipts log left over from an earlier run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReceiptLogMode {
    /// Keep it and append; pages may repeat across runs.
    #[default]
    Append,
    /// Truncate it before the first page.
    Fresh,
}

#[derive(Clone, Debug)]
pub struct HarvestOptions {
    pub storage_dir: PathBuf,
    pub receipts_file: String,
    pub fiscal_file: String,
    /// Pause between consecutive API requests of one harvester.
    pub request_interval: Duration,
    /// Wait used while the receipts log is missing or nothing is pending.
    pub poll_interval: Duration,
    pub receipt_log_mode: ReceiptLogMode,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(STORAGE_DIR),
            receipts_file: RECEIPTS_FILE.to_string(),
            fiscal_file: FISCAL_FILE.to_string(),
            request_interval: Duration::from_millis(REQUEST_PAUSE_MS),
            poll_interval: Duration::from_millis(LOG_POLL_MS),
            receipt_log_mode: ReceiptLogMode::Append,
        }
    }
}

impl HarvestOptions {
    pub fn receipts_path(&self) -> PathBuf {
        self.storage_dir.join(&self.receipts_file)
    }

    pub fn fiscal_path(&self) -> PathBuf {
        self.storage_dir.join(&self.fiscal_file)
    }
}

/// Pointer motion used for every interactive login step.
#[derive(Clone, Debug)]
pub struct MotionOptions {
    /// Max jitter (px, each axis) added to the target's center.
    pub spread: f64,
    pub wind_mouse: WindMouse,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Fixed seed for reproducible paths; random when `None`.
    pub seed: Option<u64>,
}

impl Default for MotionOptions {
    fn default() -> Self {
        Self {
            spread: MOTION_SPREAD,
            wind_mouse: WindMouse::default(),
            min_delay: Duration::from_millis(MOTION_MIN_DELAY_MS),
            max_delay: Duration::from_millis(MOTION_MAX_DELAY_MS),
            seed: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthOptions {
    pub phone: String,
    pub login_path: String,
    pub phone_selector: Selector,
    pub captcha_selector: Selector,
    pub consent_selector: Selector,
    pub submit_selector: Selector,
    pub captcha_wait: Duration,
    pub captcha_settle: Duration,
    pub token_poll_interval: Duration,
    pub token_timeout: Duration,
    pub motion: MotionOptions,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            phone: String::new(),
            login_path: LOGIN_PATH.to_string(),
            phone_selector: Selector::css(PHONE_SELECTOR),
            captcha_selector: Selector::css(CAPTCHA_SELECTOR),
            consent_selector: Selector::xpath(CONSENT_XPATH),
            submit_selector: Selector::xpath(SUBMIT_XPATH),
            captcha_wait: Duration::from_secs(CAPTCHA_WAIT_SECS),
            captcha_settle: Duration::from_millis(CAPTCHA_SETTLE_MS),
            token_poll_interval: Duration::from_millis(TOKEN_POLL_MS),
            token_timeout: Duration::from_secs(TOKEN_TIMEOUT_SECS),
            motion: MotionOptions::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BrowserOptions {
    pub webdriver_url: String,
    pub user_data_dir: PathBuf,
    pub user_agent: String,
    pub headless: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            webdriver_url: WEBDRIVER_URL.to_string(),
            user_data_dir: PathBuf::from(USER_DATA_DIR),
            user_agent: USER_AGENT.to_string(),
            headless: false,
        }
    }
}
