// src/human/trajectory.rs
//! WindMouse pointer trajectories.
//!
//! The pointer is modelled as a particle pulled toward the destination by a
//! constant gravity while a wind term random-walks around it. Far from the
//! target the wind keeps picking up fresh randomness; inside the transition
//! distance it only decays and the speed limit shrinks, so the pointer slows
//! down and settles. The observable output is the sequence of distinct integer
//! pixels the particle passes through.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::browser::Point;
use crate::config::consts::{
    MOTION_GRAVITY, MOTION_MAX_STEPS, MOTION_MAX_VELOCITY, MOTION_TRANSITION_DIST, MOTION_WIND,
};

const SQRT_3: f64 = 1.732_050_807_568_877_2;
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Physical parameters of the motion model.
#[derive(Clone, Debug, PartialEq)]
pub struct WindMouse {
    pub gravity: f64,
    pub wind: f64,
    pub max_velocity: f64,
    pub transition_distance: f64,
    /// Hard bound on integration steps.
    pub max_steps: usize,
}

impl Default for WindMouse {
    fn default() -> Self {
        Self {
            gravity: MOTION_GRAVITY,
            wind: MOTION_WIND,
            max_velocity: MOTION_MAX_VELOCITY,
            transition_distance: MOTION_TRANSITION_DIST,
            max_steps: MOTION_MAX_STEPS,
        }
    }
}

impl WindMouse {
    /// Lazy path from `start` to `dest`. The same seed replays the same path.
    pub fn path(&self, start: (f64, f64), dest: (f64, f64), seed: u64) -> Trajectory {
        Trajectory {
            params: self.clone(),
            rng: StdRng::seed_from_u64(seed),
            pos: start,
            dest,
            velocity: (0.0, 0.0),
            wind: (0.0, 0.0),
            max_velocity: self.max_velocity,
            steps: 0,
            last: None,
            settled: false,
        }
    }
}

pub fn round_point((x, y): (f64, f64)) -> Point {
    Point::new(x.round() as i64, y.round() as i64)
}

/// Iterator over the waypoints of one movement.
#[derive(Clone, Debug)]
pub struct Trajectory {
    params: WindMouse,
    rng: StdRng,
    pos: (f64, f64),
    dest: (f64, f64),
    velocity: (f64, f64),
    wind: (f64, f64),
    max_velocity: f64,
    steps: usize,
    last: Option<Point>,
    settled: bool,
}

impl Trajectory {
    /// Current continuous position of the particle.
    pub fn position(&self) -> (f64, f64) {
        self.pos
    }

    fn emit(&mut self, p: Point) -> Option<Point> {
        if self.last == Some(p) {
            return None;
        }
        self.last = Some(p);
        Some(p)
    }

    /// One unit-time integration step. `dist` is the remaining distance.
    fn step(&mut self, dx: f64, dy: f64, dist: f64) {
        let wind_mag = self.params.wind.min(dist);

        if dist >= self.params.transition_distance {
            let rx = self.rng.random::<f64>() * 2.0 - 1.0;
            let ry = self.rng.random::<f64>() * 2.0 - 1.0;
            self.wind.0 = self.wind.0 / SQRT_3 + rx * wind_mag / SQRT_5;
            self.wind.1 = self.wind.1 / SQRT_3 + ry * wind_mag / SQRT_5;
        } else {
            self.wind.0 /= SQRT_3;
            self.wind.1 /= SQRT_3;
            if self.max_velocity < 3.0 {
                self.max_velocity = self.rng.random::<f64>() * 3.0 + 3.0;
            } else {
                self.max_velocity /= SQRT_5;
            }
        }

        self.velocity.0 += self.wind.0 + self.params.gravity * dx / dist;
        self.velocity.1 += self.wind.1 + self.params.gravity * dy / dist;

        let speed = self.velocity.0.hypot(self.velocity.1);
        if speed > self.max_velocity {
            let clip = self.max_velocity / 2.0 + self.rng.random::<f64>() * self.max_velocity / 2.0;
            self.velocity.0 = self.velocity.0 / speed * clip;
            self.velocity.1 = self.velocity.1 / speed * clip;
        }

        self.pos.0 += self.velocity.0;
        self.pos.1 += self.velocity.1;
    }
}

impl Iterator for Trajectory {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.settled {
            return None;
        }
        if self.last.is_none() {
            return self.emit(round_point(self.pos));
        }

        while self.steps < self.params.max_steps {
            let dx = self.dest.0 - self.pos.0;
            let dy = self.dest.1 - self.pos.1;
            let dist = dx.hypot(dy);
            if dist < 1.0 {
                break;
            }
            self.steps += 1;
            self.step(dx, dy, dist);
            if let Some(p) = self.emit(round_point(self.pos)) {
                return Some(p);
            }
        }

        self.settled = true;
        self.emit(round_point(self.pos))
    }
}
