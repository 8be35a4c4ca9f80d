//! Earnings guarantee and metrics engine for gig-worker shifts.
//!
//! The [`engine`] module holds the pure calculations (estimation, top-ups, eligibility,
//! volatility and accuracy statistics). [`ledger`] tracks committed shifts and settles
//! their guarantees against a storage abstraction; [`import`] hydrates shift history from
//! CSV exports.

pub mod config;
pub mod engine;
pub mod error;
pub mod import;
pub mod ledger;
pub mod telemetry;
