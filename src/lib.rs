// src/lib.rs

#[macro_use]
pub mod log;

pub mod api;
pub mod auth;
pub mod browser;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod harvest;
pub mod human;
pub mod progress;
pub mod runner;
pub mod session;
pub mod store;

pub use errors::HarvestError;
