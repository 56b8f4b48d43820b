//! Expense Ledger - per-user expense tracking with CSV import and export
//!
//! This library provides the core functionality for the `ledger` binary:
//! recording expenses per owner, paged and monthly listings, rolling totals
//! over the most recent active days, and spreadsheet round trips via CSV.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (expenses, categories, tags)
//! - `storage`: Record store traits and the JSON file storage layer
//! - `services`: Business logic layer
//! - `export`: CSV export
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use expense_ledger::config::{LedgerPaths, Settings};
//! use expense_ledger::models::OwnerId;
//! use expense_ledger::services::ExpenseQueryService;
//! use expense_ledger::storage::Storage;
//!
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::new(paths)?;
//!
//! let owner = OwnerId::new("u1")?;
//! let last = ExpenseQueryService::new(&storage, &settings).last(&owner)?;
//! ```

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
