//! Environmental station poller.
//!
//! Polls a fixed map of Modbus RTU sensors over one RS-485 link, converts
//! raw holding registers into physical values and uploads one reading set
//! per cycle to the configured sink.
//!
//! # Modules
//!
//! - [`registers`] - Which slave holds which quantity, and built-in profiles
//! - [`convert`] - Linear scaling and air-quality breakpoint tables
//! - [`transport`] - RTU master over a serial port
//! - [`classify`] - Diagnostic categories for failed reads
//! - [`poller`] - Cycle timing and orchestration
//! - [`config`] - Station configuration (JSON5)

pub mod classify;
pub mod config;
pub mod convert;
pub mod poller;
pub mod registers;
pub mod transport;
