// src/human/driver.rs
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::browser::{Browser, Element, Point, Rect};
use crate::config::consts::VIEWPORT_EXPR;
use crate::config::options::MotionOptions;
use crate::errors::BrowserError;

/// Moves the pointer the way a person would and remembers where it left it.
pub struct HumanDriver {
    browser: Arc<dyn Browser>,
    motion: MotionOptions,
    rng: StdRng,
    cursor: Option<Point>,
}

impl HumanDriver {
    pub fn new(browser: Arc<dyn Browser>, motion: MotionOptions) -> Self {
        let seed = motion.seed.unwrap_or_else(rand::random);
        Self { browser, motion, rng: StdRng::seed_from_u64(seed), cursor: None }
    }

    /// Wrap a located element so it can be reached with a human move.
    pub fn element(&mut self, element: Box<dyn Element>) -> HumanElement<'_> {
        HumanElement { element, driver: self }
    }

    /// Glide to a jittered point around the center of `target`.
    /// Returns where the pointer ended up.
    pub async fn move_to(&mut self, target: Rect) -> Result<Point, BrowserError> {
        let start = match self.cursor {
            Some(p) => (p.x as f64, p.y as f64),
            None => self.viewport_center().await?,
        };

        let (cx, cy) = target.center();
        let spread = self.motion.spread.abs();
        let dest = if spread > 0.0 {
            (cx + self.rng.random_range(-spread..spread), cy + self.rng.random_range(-spread..spread))
        } else {
            (cx, cy)
        };

        let path = self.motion.wind_mouse.path(start, dest, self.rng.random());
        let mut steps = 0usize;
        for p in path {
            self.browser.pointer_move(p).await?;
            self.cursor = Some(p);
            steps += 1;
            tokio::time::sleep(self.step_delay()).await;
        }

        logd!("pointer moved in {steps} steps to {:?}", self.cursor);
        self.cursor.ok_or_else(|| BrowserError::Protocol("empty pointer path".into()))
    }

    fn step_delay(&mut self) -> Duration {
        let lo = self.motion.min_delay.as_secs_f64();
        let hi = self.motion.max_delay.as_secs_f64().max(lo);
        Duration::from_secs_f64(self.rng.random_range(lo..=hi))
    }

    async fn viewport_center(&self) -> Result<(f64, f64), BrowserError> {
        let v = self.browser.execute_script(VIEWPORT_EXPR).await?;
        let dim = |k: &str| v.get(k).and_then(Value::as_f64);
        match (dim("width"), dim("height")) {
            (Some(w), Some(h)) => Ok((w / 2.0, h / 2.0)),
            _ => Err(BrowserError::Protocol(format!("viewport size not understood: {v}"))),
        }
    }
}

/// An element paired with the driver that reaches it.
///
/// Exposes only what the login flow does with controls: move there, click,
/// type, measure.
pub struct HumanElement<'d> {
    element: Box<dyn Element>,
    driver: &'d mut HumanDriver,
}

impl HumanElement<'_> {
    pub async fn human_move(&mut self) -> Result<Point, BrowserError> {
        let bounds = self.element.bounds().await?;
        self.driver.move_to(bounds).await
    }

    pub async fn click(&self) -> Result<(), BrowserError> {
        self.element.click().await
    }

    pub async fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        self.element.type_text(text).await
    }

    pub async fn bounds(&self) -> Result<Rect, BrowserError> {
        self.element.bounds().await
    }
}
