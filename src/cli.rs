// src/cli.rs
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};

use crate::{
    api::ApiClient,
    browser::WebDriverSession,
    config::options::{AppOptions, ReceiptLogMode},
    errors::HarvestError,
    progress::Progress,
    runner,
};

#[derive(Debug, Parser)]
#[command(name = "receipt_harvest", version, about = "Harvest receipts and fiscal data into gzip NDJSON logs")]
struct Cli {
    /// Directory holding the two logs
    #[arg(long, global = true, default_value = crate::config::consts::STORAGE_DIR)]
    storage: PathBuf,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// More output (-v debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and dump receipts plus fiscal data
    Harvest(SessionArgs),
    /// Summarize the logs on disk (no network)
    Status,
    /// Free-text receipt search, printed as JSON
    Search {
        #[command(flatten)]
        session: SessionArgs,
        query: String,
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Full detail of one receipt, printed as JSON
    Details {
        #[command(flatten)]
        session: SessionArgs,
        receipt_id: String,
    },
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Phone number used for login
    #[arg(long, env = "PHONE_NUM", default_value = "")]
    phone: String,

    #[arg(long, default_value = crate::config::consts::WEBDRIVER_URL)]
    webdriver: String,

    /// Browser profile directory (keeps the session between runs)
    #[arg(long, default_value = crate::config::consts::USER_DATA_DIR)]
    profile: PathBuf,

    #[arg(long)]
    headless: bool,

    /// Seconds between API requests
    #[arg(long, default_value_t = crate::config::consts::REQUEST_PAUSE_MS as f64 / 1000.0)]
    interval: f64,

    /// Seconds to wait for the session token after submitting the login form
    #[arg(long, default_value_t = crate::config::consts::TOKEN_TIMEOUT_SECS)]
    token_timeout: u64,

    /// Start the receipts log from scratch instead of appending
    #[arg(long)]
    fresh: bool,
}

impl SessionArgs {
    fn apply(&self, opts: &mut AppOptions) -> Result<()> {
        opts.auth.phone = self.phone.chars().filter(|c| !c.is_whitespace()).collect();
        opts.auth.token_timeout = Duration::from_secs(self.token_timeout);
        opts.browser.webdriver_url = self.webdriver.clone();
        opts.browser.user_data_dir = self.profile.clone();
        opts.browser.headless = self.headless;
        opts.harvest.request_interval =
            Duration::try_from_secs_f64(self.interval).wrap_err("invalid --interval")?;
        if self.fresh {
            opts.harvest.receipt_log_mode = ReceiptLogMode::Fresh;
        }
        Ok(())
    }
}

/// Prints progress lines for a terminal.
struct ConsoleProgress {
    counts: Mutex<(usize, usize)>,
}

impl Progress for ConsoleProgress {
    fn log(&self, msg: &str) {
        eprintln!("{msg}");
    }
    fn page_done(&self, page_index: u32, receipts: usize) {
        eprintln!("page {page_index}: {receipts} receipts");
    }
    fn pass_begin(&self, pass: usize, pending: usize) {
        if pending > 0 {
            eprintln!("fiscal pass {pass}: {pending} pending");
        }
    }
    fn fiscal_done(&self, _key: &str) {
        if let Ok(mut c) = self.counts.lock() {
            c.0 += 1;
            if c.0 % 25 == 0 {
                eprintln!("fiscal: {} fetched, {} failed", c.0, c.1);
            }
        }
    }
    fn fiscal_failed(&self, key: &str, reason: &str) {
        if let Ok(mut c) = self.counts.lock() {
            c.1 += 1;
        }
        eprintln!("fiscal {key} failed: {reason}");
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "receipt_harvest=info",
        1 => "receipt_harvest=debug",
        _ => "debug",
    };
    crate::log::init(filter, cli.log_file.as_deref()).wrap_err("could not open log file")?;

    let mut opts = AppOptions::default();
    opts.harvest.storage_dir = cli.storage.clone();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("could not start async runtime")?;
    rt.block_on(dispatch(cli.cmd, opts))
}

async fn dispatch(cmd: Command, mut opts: AppOptions) -> Result<()> {
    match cmd {
        Command::Status => {
            let st = runner::status(&opts.harvest)?;
            println!("pages            {}", st.pages);
            println!("receipts         {}", st.receipts);
            println!("unique receipts  {}", st.unique_receipts);
            println!("fiscal records   {}", st.fiscal_records);
            println!("pending          {}", st.pending);
        }
        Command::Harvest(args) => {
            args.apply(&mut opts)?;
            let progress = Arc::new(ConsoleProgress { counts: Mutex::new((0, 0)) });
            let s = runner::run_harvest(&opts, progress).await?;
            println!(
                "{} pages, {} receipts; fiscal: {} fetched, {} failed in {} passes",
                s.receipts.pages, s.receipts.receipts, s.fiscal.fetched, s.fiscal.failed, s.fiscal.passes
            );
        }
        Command::Search { session, query, limit, offset } => {
            session.apply(&mut opts)?;
            let v = with_api(&opts, |api| async move { api.search_receipts(&query, limit, offset).await }).await?;
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        Command::Details { session, receipt_id } => {
            session.apply(&mut opts)?;
            let v = with_api(&opts, |api| async move { api.fetch_receipt_details(&receipt_id).await }).await?;
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
    }
    Ok(())
}

/// Start a browser, log in, run one API call, close the browser.
async fn with_api<F, Fut>(opts: &AppOptions, call: F) -> Result<serde_json::Value>
where
    F: FnOnce(Arc<ApiClient>) -> Fut,
    Fut: std::future::Future<Output = Result<serde_json::Value, crate::errors::ApiError>>,
{
    let browser = Arc::new(WebDriverSession::start(&opts.browser).await.map_err(HarvestError::from)?);
    let result = async {
        runner::login(browser.clone(), opts).await?;
        let api = Arc::new(ApiClient::new(browser.clone(), opts.api.clone())?);
        Ok::<_, HarvestError>(call(api).await?)
    }
    .await;
    if let Err(e) = browser.close().await {
        logw!("Could not close browser session: {e}");
    }
    Ok(result?)
}
