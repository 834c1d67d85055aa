//! The `herald` command-line front end.
//!
//! Reads recipients and messages from a CSV file, pushes them through a
//! [`Dispatcher`](herald_dispatch::Dispatcher) backed by the WhatsApp Cloud
//! API (or a dry-run transport), and reports the outcome of every row.

pub mod config;
pub mod dry_run;
pub mod report;
pub mod rows;
pub mod sample;
pub mod send;
