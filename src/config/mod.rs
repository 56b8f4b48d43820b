//! Configuration module for the expense ledger
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - Settings persistence (import rules, store deadlines, listing defaults)

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::{ImportSettings, Settings, StoreTimeouts};
