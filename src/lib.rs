//! End-to-end verification harness for the wallet HTTP API.
//!
//! Drives a fixed sequence of scenario cases (wallet creation, activation,
//! balance, top-up, cashout, transfer) against a deployed wallet service and
//! reports which cases passed, failed an assertion, or errored.

pub mod checks;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod net;
pub mod runner;
pub mod scenarios;
pub mod settle;
pub mod transactions;
pub mod wallet;

pub use client::{ApiResponse, WalletApiClient};
pub use config::{Args, HarnessConfig};
pub use error::{HarnessError, Result};
pub use runner::{CaseOutcome, CaseReport, RunReport, Runner};
pub use scenarios::{Case, Harness};
pub use wallet::{Currency, WalletHandle};
