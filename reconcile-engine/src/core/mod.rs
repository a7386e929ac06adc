//! Core module - engine configuration
//!
//! - [`Config`] - engine configuration loaded from the environment

pub mod config;

pub use config::Config;
