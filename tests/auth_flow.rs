// tests/auth_flow.rs
//
// Login state machine against an in-memory page.
//
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use receipt_harvest::auth::{AuthFlow, AuthOutcome, AuthState};
use receipt_harvest::browser::{Browser, Cookie, Element, Point, Rect, Selector};
use receipt_harvest::config::consts::{TOKEN_EXPR, VIEWPORT_EXPR};
use receipt_harvest::config::options::{AuthOptions, MotionOptions};
use receipt_harvest::errors::{AuthError, BrowserError};

#[derive(Default)]
struct PageState {
    token: Option<String>,
    events: Vec<String>,
    moves: Vec<Point>,
}

/// A login page with the named controls. Clicking `submit` issues a token
/// when `grant_token` is set.
struct FakePage {
    controls: Vec<&'static str>,
    grant_token: bool,
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    fn new(controls: &[&'static str]) -> Self {
        Self { controls: controls.to_vec(), grant_token: true, state: Arc::default() }
    }

    fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    fn moves(&self) -> usize {
        self.state.lock().unwrap().moves.len()
    }
}

fn name_of(sel: &Selector) -> &str {
    match sel {
        Selector::Css(s) | Selector::XPath(s) => s,
    }
}

#[async_trait]
impl Browser for FakePage {
    async fn go_to(&self, _url: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn execute_script(&self, expr: &str) -> Result<Value, BrowserError> {
        if expr == TOKEN_EXPR {
            let token = self.state.lock().unwrap().token.clone();
            return Ok(token.map(Value::String).unwrap_or(Value::Null));
        }
        if expr == VIEWPORT_EXPR {
            return Ok(json!({"width": 1280, "height": 800}));
        }
        Err(BrowserError::Protocol(format!("unexpected script {expr}")))
    }

    async fn find_element(
        &self,
        selector: &Selector,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Element>, BrowserError> {
        let name = name_of(selector);
        let Some(&name) = self.controls.iter().find(|c| **c == name) else {
            return Err(match timeout {
                Some(waited) => BrowserError::Timeout { selector: selector.clone(), waited },
                None => BrowserError::ElementNotFound(selector.clone()),
            });
        };
        let top = 100.0 * self.controls.iter().position(|c| *c == name).unwrap_or(0) as f64;
        Ok(Box::new(FakeControl {
            name,
            rect: Rect { x: 400.0, y: top, width: 120.0, height: 30.0 },
            grant_token: self.grant_token,
            state: Arc::clone(&self.state),
        }))
    }

    async fn get_cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        Ok(Vec::new())
    }

    async fn pointer_move(&self, to: Point) -> Result<(), BrowserError> {
        self.state.lock().unwrap().moves.push(to);
        Ok(())
    }
}

struct FakeControl {
    name: &'static str,
    rect: Rect,
    grant_token: bool,
    state: Arc<Mutex<PageState>>,
}

#[async_trait]
impl Element for FakeControl {
    async fn click(&self) -> Result<(), BrowserError> {
        let mut st = self.state.lock().unwrap();
        st.events.push(format!("click {}", self.name));
        if self.name == "submit" && self.grant_token {
            st.token = Some("tok-123".into());
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        self.state.lock().unwrap().events.push(format!("type {} {text}", self.name));
        Ok(())
    }

    async fn bounds(&self) -> Result<Rect, BrowserError> {
        Ok(self.rect)
    }
}

fn options() -> AuthOptions {
    AuthOptions {
        phone: "+79990001122".into(),
        phone_selector: Selector::css("phone"),
        captcha_selector: Selector::css("captcha"),
        consent_selector: Selector::xpath("consent"),
        submit_selector: Selector::xpath("submit"),
        captcha_wait: Duration::from_millis(20),
        captcha_settle: Duration::ZERO,
        token_poll_interval: Duration::from_millis(5),
        token_timeout: Duration::from_millis(200),
        motion: MotionOptions {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            seed: Some(11),
            ..Default::default()
        },
        ..Default::default()
    }
}

const ALL: &[&str] = &["phone", "captcha", "consent", "submit"];

#[tokio::test]
async fn walks_every_step_in_order() {
    let page = Arc::new(FakePage::new(ALL));
    let mut flow = AuthFlow::new(page.clone(), options());

    let outcome = flow.run().await.unwrap();

    assert_eq!(outcome, AuthOutcome::LoggedIn);
    assert_eq!(flow.state(), AuthState::Authenticated);
    assert_eq!(
        page.events(),
        vec![
            "click phone".to_string(),
            "type phone +79990001122".to_string(),
            "click captcha".to_string(),
            "click consent".to_string(),
            "click submit".to_string(),
        ]
    );
    // every control was reached by pointer motion first
    assert!(page.moves() >= 4);
}

#[tokio::test]
async fn existing_token_skips_the_form() {
    let page = Arc::new(FakePage::new(ALL));
    page.state.lock().unwrap().token = Some("already".into());
    let mut flow = AuthFlow::new(page.clone(), options());

    assert_eq!(flow.run().await.unwrap(), AuthOutcome::AlreadyAuthenticated);
    assert_eq!(flow.state(), AuthState::Authenticated);
    assert!(page.events().is_empty());
    assert_eq!(page.moves(), 0);
}

#[tokio::test]
async fn empty_token_is_not_a_session() {
    let page = Arc::new(FakePage::new(ALL));
    page.state.lock().unwrap().token = Some(String::new());
    let mut flow = AuthFlow::new(page.clone(), options());

    assert_eq!(flow.run().await.unwrap(), AuthOutcome::LoggedIn);
    assert_eq!(page.events().len(), 5);
}

#[tokio::test]
async fn missing_captcha_times_out() {
    let page = Arc::new(FakePage::new(&["phone", "consent", "submit"]));
    let mut flow = AuthFlow::new(page.clone(), options());

    let err = flow.run().await.unwrap_err();
    assert!(matches!(err, AuthError::Timeout { step: "captcha", .. }), "{err}");
    assert_eq!(flow.state(), AuthState::Captcha);
    assert_eq!(page.events().len(), 2);
}

#[tokio::test]
async fn missing_consent_is_not_found() {
    let page = Arc::new(FakePage::new(&["phone", "captcha", "submit"]));
    let mut flow = AuthFlow::new(page.clone(), options());

    let err = flow.run().await.unwrap_err();
    assert!(matches!(err, AuthError::ElementNotFound { step: "consent", .. }), "{err}");
    assert_eq!(flow.state(), AuthState::Consent);
}

#[tokio::test]
async fn token_that_never_arrives_times_out() {
    let mut page = FakePage::new(ALL);
    page.grant_token = false;
    let page = Arc::new(page);
    let mut flow = AuthFlow::new(page.clone(), options());

    let err = flow.run().await.unwrap_err();
    assert!(matches!(err, AuthError::TokenTimeout(d) if d == Duration::from_millis(200)));
    assert_eq!(flow.state(), AuthState::PollingToken);
}

#[tokio::test]
async fn login_without_phone_is_refused() {
    let page = Arc::new(FakePage::new(ALL));
    let mut opts = options();
    opts.phone.clear();
    let mut flow = AuthFlow::new(page.clone(), opts);

    assert!(matches!(flow.run().await.unwrap_err(), AuthError::MissingPhone));
    assert!(page.events().is_empty());
}
