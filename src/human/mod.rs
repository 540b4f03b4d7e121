// src/human/mod.rs
pub mod driver;
pub mod trajectory;

pub use driver::{HumanDriver, HumanElement};
pub use trajectory::{Trajectory, WindMouse};
