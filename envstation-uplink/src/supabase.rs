//! Supabase REST sink.

use std::time::Duration;

use async_trait::async_trait;
use envstation_common::ReadingSet;

use crate::error::Result;
use crate::uploader::{Uploader, expect_status, http_client, validate_url};

/// PostgREST answers an insert with `201 Created`.
const CREATED: u16 = 201;

/// Inserts one row per reading set into a Supabase table.
#[derive(Debug)]
pub struct SupabaseUploader {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl SupabaseUploader {
    /// `endpoint` is the project URL, e.g. `https://<ref>.supabase.co`.
    pub fn new(endpoint: &str, api_key: impl Into<String>, table: &str, timeout: Duration) -> Result<Self> {
        validate_url("endpoint", endpoint)?;

        Ok(Self {
            client: http_client(timeout)?,
            url: format!("{}/rest/v1/{}", endpoint.trim_end_matches('/'), table),
            api_key: api_key.into(),
        })
    }

    /// Full insert URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Uploader for SupabaseUploader {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn publish(&mut self, readings: ReadingSet) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&readings)
            .send()
            .await?;

        expect_status(response, CREATED).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_url() {
        let uploader = SupabaseUploader::new(
            "https://abc.supabase.co/",
            "anon",
            "sensor_data",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(uploader.url(), "https://abc.supabase.co/rest/v1/sensor_data");
    }
}
