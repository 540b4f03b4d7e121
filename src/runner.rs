// src/runner.rs
use std::sync::Arc;

use crate::{
    api::{model::PageKeys, ApiClient},
    auth::{AuthFlow, AuthOutcome},
    browser::{Browser, WebDriverSession},
    config::options::{AppOptions, HarvestOptions},
    errors::{HarvestError, LogError},
    harvest::{self, HarvestCoordinator, HarvestSummary},
    progress::Progress,
    store::AppendLog,
};

/// Open the login page and make sure the session is authenticated.
pub async fn login(browser: Arc<dyn Browser>, options: &AppOptions) -> Result<AuthOutcome, HarvestError> {
    let url = options.api.url(&options.auth.login_path);
    browser.go_to(&url).await?;
    logf!("Browser at {url}");
    let outcome = AuthFlow::new(browser, options.auth.clone()).run().await?;
    Ok(outcome)
}

/// Log in on an existing browser session, then harvest both logs.
pub async fn harvest_with(
    browser: Arc<dyn Browser>,
    options: &AppOptions,
    progress: Arc<dyn Progress>,
) -> Result<HarvestSummary, HarvestError> {
    let outcome = login(Arc::clone(&browser), options).await?;
    progress.log(match outcome {
        AuthOutcome::AlreadyAuthenticated => "Reusing authenticated session",
        AuthOutcome::LoggedIn => "Logged in",
    });
    let api = ApiClient::new(browser, options.api.clone())?;
    HarvestCoordinator::new(Arc::new(api), options.harvest.clone())
        .with_progress(progress)
        .run()
        .await
}

/// Start a WebDriver browser and run a complete harvest in it.
///
/// Ctrl-C cancels the harvest between records. The browser session is
/// closed either way.
pub async fn run_harvest(options: &AppOptions, progress: Arc<dyn Progress>) -> Result<HarvestSummary, HarvestError> {
    let browser = Arc::new(WebDriverSession::start(&options.browser).await?);
    logf!("Setting up browser session {}", browser.id());

    let result = tokio::select! {
        r = harvest_with(browser.clone(), options, progress) => r,
        _ = tokio::signal::ctrl_c() => Err(HarvestError::Cancelled),
    };

    if let Err(e) = browser.close().await {
        logw!("Could not close browser session: {e}");
    }
    result
}

/// Offline view of the two logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogStatus {
    pub pages: usize,
    pub receipts: usize,
    pub unique_receipts: usize,
    pub fiscal_records: usize,
    pub pending: usize,
}

pub fn status(options: &HarvestOptions) -> Result<LogStatus, LogError> {
    let receipts_log = AppendLog::new(options.receipts_path());
    let fiscal_log = AppendLog::new(options.fiscal_path());

    let mut st = LogStatus::default();
    for page in receipts_log.read_all::<PageKeys>()? {
        st.pages += 1;
        st.receipts += page?.receipts.len();
    }
    st.unique_receipts = harvest::receipt_keys(&receipts_log)?.len();
    st.fiscal_records = fiscal_log.count()?;
    st.pending = harvest::pending_keys(&receipts_log, &fiscal_log)?.len();
    Ok(st)
}
