// src/config/consts.rs

// Remote service
pub const BASE_URL: &str = "https://lkdr.nalog.ru";
pub const LOGIN_PATH: &str = "/login";
pub const RECEIPTS_PATH: &str = "/api/v1/receipt";
pub const FISCAL_PATH: &str = "/api/v1/receipt/fiscal_data";
pub const SEARCH_PATH: &str = "/api/v1/receipt/search";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
pub const PAGE_SIZE: u32 = 10;
pub const ORDER_BY: &str = "CREATED_DATE:DESC";
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// Session
pub const TOKEN_EXPR: &str = r#"localStorage["auth.token"]"#;
pub const VIEWPORT_EXPR: &str = "({width: window.innerWidth, height: window.innerHeight})";

// Login controls
pub const PHONE_SELECTOR: &str = r#"input[type="tel"]"#;
pub const CAPTCHA_SELECTOR: &str = "#captcha-container";
pub const CONSENT_XPATH: &str = "//span[contains(text(), 'Я согласен')]";
pub const SUBMIT_XPATH: &str = "//div[contains(text(), 'Отправить код')]";
pub const CAPTCHA_WAIT_SECS: u64 = 30;
pub const CAPTCHA_SETTLE_MS: u64 = 100;
pub const TOKEN_POLL_MS: u64 = 1_000;
pub const TOKEN_TIMEOUT_SECS: u64 = 600; // time for a human to type the SMS code

// Pointer motion (WindMouse)
pub const MOTION_SPREAD: f64 = 20.0;
pub const MOTION_GRAVITY: f64 = 9.0;
pub const MOTION_WIND: f64 = 3.0;
pub const MOTION_MAX_VELOCITY: f64 = 15.0;
pub const MOTION_TRANSITION_DIST: f64 = 12.0;
pub const MOTION_MIN_DELAY_MS: u64 = 10;
pub const MOTION_MAX_DELAY_MS: u64 = 30;
pub const MOTION_MAX_STEPS: usize = 10_000;

// Browser
pub const WEBDRIVER_URL: &str = "http://localhost:9515";
pub const USER_DATA_DIR: &str = "chrome-profile";
pub const WEBDRIVER_TIMEOUT_SECS: u64 = 30;
pub const FIND_POLL_MS: u64 = 250;

// Local storage
pub const STORAGE_DIR: &str = "storage";
pub const RECEIPTS_FILE: &str = "receipt.jsonl.gz";
pub const FISCAL_FILE: &str = "fiscal_data.jsonl.gz";

// Pacing
pub const REQUEST_PAUSE_MS: u64 = 3_000; // be polite
pub const LOG_POLL_MS: u64 = 1_000;
