//! # State Module
//!
//! Read-only state shared by the checkout commands.

pub mod config;

pub use config::{CheckoutConfig, ConfigError};
