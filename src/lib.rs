pub mod api;
pub mod config;
pub mod humanize;
pub mod ledger;
pub mod observability;
pub mod queue;
pub mod worker;
