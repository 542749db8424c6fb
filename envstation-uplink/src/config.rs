//! Upload sink configuration.

use std::collections::HashMap;
use std::time::Duration;

use envstation_common::Quantity;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UploadError};
use crate::firebase::FirebaseUploader;
use crate::http::HttpUploader;
use crate::sheets::{ServiceAccount, SheetsUploader};
use crate::supabase::SupabaseUploader;
use crate::uploader::{Uploader, validate_url};

/// Upload settings: a backend plus options shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Which sink receives the readings.
    #[serde(flatten)]
    pub backend: BackendConfig,
}

fn default_timeout_secs() -> u64 {
    10
}

/// The sink to publish to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Plain JSON POST to an HTTP API.
    Http {
        /// Target URL.
        endpoint: String,
        /// Sent as `Authorization: Bearer <api_key>` when present.
        #[serde(default)]
        api_key: Option<String>,
        /// Status code that signals acceptance (default: 200).
        #[serde(default = "default_http_status")]
        success_status: u16,
        /// Additional request headers.
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Supabase REST insert.
    Supabase {
        /// Project URL (e.g., "https://<ref>.supabase.co").
        endpoint: String,
        /// Project API key.
        api_key: String,
        /// Table to insert into (default: "sensor_data").
        #[serde(default = "default_table")]
        table: String,
    },
    /// Firebase Realtime Database push.
    Firebase {
        /// Database URL (e.g., "https://<project>-default-rtdb.firebaseio.com").
        endpoint: String,
        /// Node to push under (default: "sensor_data").
        #[serde(default = "default_table")]
        path: String,
        /// Database secret or ID token, sent as `?auth=`.
        #[serde(default)]
        api_key: Option<String>,
    },
    /// Google Sheets append via a service account.
    Sheets {
        spreadsheet_id: String,
        /// A1 range to append to (default: "Sheet1!A1").
        #[serde(default = "default_range")]
        range: String,
        client_email: String,
        /// PEM private key of the service account.
        private_key: String,
        #[serde(default = "default_token_uri")]
        token_uri: String,
        #[serde(default = "default_sheets_api")]
        api_base: String,
        /// Columns written after the timestamp.
        #[serde(default = "default_sheet_columns")]
        columns: Vec<Quantity>,
    },
}

fn default_http_status() -> u16 {
    200
}

fn default_table() -> String {
    "sensor_data".to_string()
}

fn default_range() -> String {
    "Sheet1!A1".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_sheets_api() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_sheet_columns() -> Vec<Quantity> {
    vec![
        Quantity::WindSpeed,
        Quantity::WindDirection,
        Quantity::SolarRadiation,
        Quantity::Temperature,
        Quantity::Humidity,
        Quantity::Pressure,
    ]
}

impl BackendConfig {
    /// Backend name as used in config files and logs.
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Http { .. } => "http",
            BackendConfig::Supabase { .. } => "supabase",
            BackendConfig::Firebase { .. } => "firebase",
            BackendConfig::Sheets { .. } => "sheets",
        }
    }

    /// The URL readings are sent to (or the API base for Sheets).
    pub fn endpoint(&self) -> &str {
        match self {
            BackendConfig::Http { endpoint, .. }
            | BackendConfig::Supabase { endpoint, .. }
            | BackendConfig::Firebase { endpoint, .. } => endpoint,
            BackendConfig::Sheets { api_base, .. } => api_base,
        }
    }
}

impl UploadConfig {
    /// Validate the configuration without building any client.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(UploadError::config("timeout_secs must be at least 1"));
        }

        match &self.backend {
            BackendConfig::Http { endpoint, .. } | BackendConfig::Firebase { endpoint, .. } => {
                validate_url("endpoint", endpoint)
            }
            BackendConfig::Supabase {
                endpoint,
                api_key,
                table,
            } => {
                validate_url("endpoint", endpoint)?;
                if api_key.is_empty() {
                    return Err(UploadError::config("Supabase api_key cannot be empty"));
                }
                if table.is_empty() {
                    return Err(UploadError::config("Supabase table cannot be empty"));
                }
                Ok(())
            }
            BackendConfig::Sheets {
                spreadsheet_id,
                client_email,
                token_uri,
                api_base,
                columns,
                ..
            } => {
                if spreadsheet_id.is_empty() || client_email.is_empty() {
                    return Err(UploadError::config(
                        "Sheets spreadsheet_id and client_email are required",
                    ));
                }
                if columns.is_empty() {
                    return Err(UploadError::config("Sheets columns cannot be empty"));
                }
                validate_url("token_uri", token_uri)?;
                validate_url("api_base", api_base)
            }
        }
    }

    /// Build the configured uploader.
    pub fn build(&self) -> Result<Box<dyn Uploader>> {
        self.validate()?;
        let timeout = Duration::from_secs(self.timeout_secs);

        let uploader: Box<dyn Uploader> = match &self.backend {
            BackendConfig::Http {
                endpoint,
                api_key,
                success_status,
                headers,
            } => Box::new(HttpUploader::new(
                endpoint.clone(),
                api_key.as_deref(),
                headers,
                *success_status,
                timeout,
            )?),
            BackendConfig::Supabase {
                endpoint,
                api_key,
                table,
            } => Box::new(SupabaseUploader::new(
                endpoint,
                api_key.clone(),
                table,
                timeout,
            )?),
            BackendConfig::Firebase {
                endpoint,
                path,
                api_key,
            } => Box::new(FirebaseUploader::new(
                endpoint,
                path,
                api_key.clone(),
                timeout,
            )?),
            BackendConfig::Sheets {
                spreadsheet_id,
                range,
                client_email,
                private_key,
                token_uri,
                api_base,
                columns,
            } => {
                let account =
                    ServiceAccount::new(client_email.clone(), private_key, token_uri.clone())?;
                Box::new(SheetsUploader::new(
                    account,
                    api_base,
                    spreadsheet_id,
                    range,
                    columns.clone(),
                    timeout,
                )?)
            }
        };

        Ok(uploader)
    }
}
