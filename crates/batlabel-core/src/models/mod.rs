//! Data models and configuration.

pub mod battery;
pub mod config;
