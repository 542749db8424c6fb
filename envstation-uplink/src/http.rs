//! Generic JSON-over-HTTP sink.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use envstation_common::ReadingSet;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use crate::error::{Result, UploadError};
use crate::uploader::{Uploader, expect_status, http_client, validate_url};

/// POSTs the reading set as a JSON object to a fixed endpoint.
#[derive(Debug)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
    success_status: u16,
}

impl HttpUploader {
    /// Create a sink for `endpoint`, optionally sending `api_key` as a bearer token.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<&str>,
        extra_headers: &HashMap<String, String>,
        success_status: u16,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        validate_url("endpoint", &endpoint)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", key))?);
        }
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| UploadError::config(format!("Invalid header name '{}': {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }

        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
            headers,
            success_status,
        })
    }
}

pub(crate) fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| UploadError::config(format!("Invalid header value: {}", e)))
}

#[async_trait]
impl Uploader for HttpUploader {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn publish(&mut self, readings: ReadingSet) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&readings)
            .send()
            .await?;

        expect_status(response, self.success_status).await
    }
}
