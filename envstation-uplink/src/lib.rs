//! envstation uplink
//!
//! Interchangeable sinks for assembled reading sets.
//!
//! # Overview
//!
//! - [`Uploader`] is the single publish capability every sink implements
//! - [`UploadConfig`] selects and configures one sink from the station config
//! - [`HttpUploader`], [`SupabaseUploader`], [`FirebaseUploader`] POST the
//!   reading set as a JSON object
//! - [`SheetsUploader`] appends a column-major row to a Google Sheets range
//!
//! # Example
//!
//! ```ignore
//! use envstation_uplink::UploadConfig;
//!
//! let mut uploader = config.upload.build()?;
//! uploader.publish(readings).await?;
//! ```

mod config;
mod error;
mod firebase;
mod http;
mod sheets;
mod supabase;
mod uploader;

pub use config::{BackendConfig, UploadConfig};
pub use error::{Result, UploadError};
pub use firebase::FirebaseUploader;
pub use http::HttpUploader;
pub use sheets::{SHEETS_SCOPE, ServiceAccount, SheetsUploader, TOKEN_PREREFRESH, ValueRange};
pub use supabase::SupabaseUploader;
pub use uploader::{UploadStats, Uploader};
