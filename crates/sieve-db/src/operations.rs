//! Database operations.

pub mod ledger;
