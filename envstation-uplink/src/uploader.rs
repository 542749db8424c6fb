//! The upload capability shared by every sink.

use std::time::Duration;

use async_trait::async_trait;
use envstation_common::ReadingSet;

use crate::error::{Result, UploadError};

/// A destination for assembled reading sets.
///
/// Each poll cycle hands exactly one snapshot to the configured uploader.
/// Implementations report failure through [`UploadError`]; they never retry.
#[async_trait]
pub trait Uploader: Send {
    /// Short backend name for logs ("http", "supabase", ...).
    fn name(&self) -> &'static str;

    /// Publish one reading set.
    async fn publish(&mut self, readings: ReadingSet) -> Result<()>;
}

/// Build the HTTP client used by all sinks.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("envstation/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| UploadError::config(format!("Failed to build HTTP client: {}", e)))
}

/// Accept a response only if it carries exactly `expected`.
pub(crate) async fn expect_status(response: reqwest::Response, expected: u16) -> Result<()> {
    let status = response.status().as_u16();
    if status == expected {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Rejected { status, body })
}

/// Reject anything that is not an absolute http(s) URL.
pub(crate) fn validate_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(UploadError::config(format!(
            "{} '{}' must start with http:// or https://",
            field, url
        )))
    }
}

/// Running totals of upload outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UploadStats {
    /// Number of accepted uploads.
    pub success: usize,
    /// Number of failed uploads.
    pub failed: usize,
}

impl UploadStats {
    /// Record one outcome.
    pub fn record<T>(&mut self, outcome: &Result<T>) {
        match outcome {
            Ok(_) => self.success += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// Total number of attempted uploads.
    pub fn total(&self) -> usize {
        self.success + self.failed
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            100.0
        } else {
            (self.success as f64 / self.total() as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_stats() {
        let mut stats = UploadStats::default();
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.success_rate(), 100.0);

        for _ in 0..3 {
            stats.record(&Ok(()));
        }
        stats.record::<()>(&Err(UploadError::Transport("reset".to_string())));

        assert_eq!(stats.total(), 4);
        assert_eq!(stats.success_rate(), 75.0);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("endpoint", "https://example.supabase.co").is_ok());
        assert!(validate_url("endpoint", "http://10.0.0.2:8080/api").is_ok());
        assert!(matches!(
            validate_url("endpoint", "example.com/api"),
            Err(UploadError::Config(_))
        ));
    }
}
