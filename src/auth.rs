// src/auth.rs
//! Phone + captcha login, driven through the page like a person would.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{Browser, Element, Selector};
use crate::config::options::AuthOptions;
use crate::errors::{AuthError, BrowserError};
use crate::human::HumanDriver;
use crate::session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    PhoneEntry,
    Captcha,
    Consent,
    Submit,
    PollingToken,
    Authenticated,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::PhoneEntry => "phone entry",
            AuthState::Captcha => "captcha",
            AuthState::Consent => "consent",
            AuthState::Submit => "submit",
            AuthState::PollingToken => "token poll",
            AuthState::Authenticated => "authenticated",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A token was already in the profile; nothing was clicked.
    AlreadyAuthenticated,
    LoggedIn,
}

pub struct AuthFlow {
    browser: Arc<dyn Browser>,
    driver: HumanDriver,
    options: AuthOptions,
    state: AuthState,
}

impl AuthFlow {
    pub fn new(browser: Arc<dyn Browser>, options: AuthOptions) -> Self {
        let driver = HumanDriver::new(Arc::clone(&browser), options.motion.clone());
        Self { browser, driver, options, state: AuthState::Unauthenticated }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Walk the login states until a session token shows up.
    /// The page must already show the login form.
    pub async fn run(&mut self) -> Result<AuthOutcome, AuthError> {
        if session::read_token(self.browser.as_ref()).await?.is_some() {
            self.state = AuthState::Authenticated;
            logf!("Already authenticated");
            return Ok(AuthOutcome::AlreadyAuthenticated);
        }
        if self.options.phone.is_empty() {
            return Err(AuthError::MissingPhone);
        }

        logf!("Authenticating user");
        while self.state != AuthState::Authenticated {
            let next = self.advance().await?;
            logd!("auth: {} -> {}", self.state, next);
            self.state = next;
        }
        logf!("Authentication completed");
        Ok(AuthOutcome::LoggedIn)
    }

    async fn advance(&mut self) -> Result<AuthState, AuthError> {
        use AuthState::*;
        Ok(match self.state {
            Unauthenticated => PhoneEntry,
            PhoneEntry => {
                let sel = self.options.phone_selector.clone();
                let el = self.locate("phone", &sel, None).await?;
                let mut phone = self.driver.element(el);
                phone.human_move().await?;
                phone.click().await?;
                phone.type_text(&self.options.phone).await?;
                Captcha
            }
            Captcha => {
                let sel = self.options.captcha_selector.clone();
                let el = self.locate("captcha", &sel, Some(self.options.captcha_wait)).await?;
                let mut captcha = self.driver.element(el);
                captcha.human_move().await?;
                tokio::time::sleep(self.options.captcha_settle).await;
                captcha.click().await?;
                Consent
            }
            Consent => {
                let sel = self.options.consent_selector.clone();
                self.reach_and_click("consent", &sel).await?;
                Submit
            }
            Submit => {
                let sel = self.options.submit_selector.clone();
                self.reach_and_click("submit", &sel).await?;
                PollingToken
            }
            PollingToken => {
                self.poll_token().await?;
                Authenticated
            }
            Authenticated => Authenticated,
        })
    }

    async fn reach_and_click(&mut self, step: &'static str, sel: &Selector) -> Result<(), AuthError> {
        let el = self.locate(step, sel, None).await?;
        let mut target = self.driver.element(el);
        target.human_move().await?;
        target.click().await?;
        Ok(())
    }

    async fn locate(
        &self,
        step: &'static str,
        sel: &Selector,
        wait: Option<Duration>,
    ) -> Result<Box<dyn Element>, AuthError> {
        self.browser.find_element(sel, wait).await.map_err(|e| match e {
            BrowserError::ElementNotFound(selector) => AuthError::ElementNotFound { step, selector },
            BrowserError::Timeout { waited, .. } => AuthError::Timeout { step, waited },
            other => AuthError::Browser(other),
        })
    }

    // The user types the SMS code in the browser window; the token appears
    // in local storage once the portal accepts it.
    async fn poll_token(&self) -> Result<(), AuthError> {
        let limit = self.options.token_timeout;
        let every = self.options.token_poll_interval;
        let browser = self.browser.as_ref();
        let wait = async {
            loop {
                if session::read_token(browser).await?.is_some() {
                    return Ok::<(), AuthError>(());
                }
                tokio::time::sleep(every).await;
            }
        };
        tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| AuthError::TokenTimeout(limit))?
    }
}
