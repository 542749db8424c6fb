//! Firebase Realtime Database sink.

use std::time::Duration;

use async_trait::async_trait;
use envstation_common::ReadingSet;

use crate::error::Result;
use crate::uploader::{Uploader, expect_status, http_client, validate_url};

/// Pushes each reading set as a new child under a database path.
#[derive(Debug)]
pub struct FirebaseUploader {
    client: reqwest::Client,
    url: String,
    auth: Option<String>,
}

impl FirebaseUploader {
    /// `endpoint` is the database URL, `path` the node to push under.
    pub fn new(endpoint: &str, path: &str, auth: Option<String>, timeout: Duration) -> Result<Self> {
        validate_url("endpoint", endpoint)?;

        Ok(Self {
            client: http_client(timeout)?,
            url: format!(
                "{}/{}.json",
                endpoint.trim_end_matches('/'),
                path.trim_matches('/')
            ),
            auth,
        })
    }

    /// REST URL of the push target.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Uploader for FirebaseUploader {
    fn name(&self) -> &'static str {
        "firebase"
    }

    async fn publish(&mut self, readings: ReadingSet) -> Result<()> {
        let mut request = self.client.post(&self.url).json(&readings);
        if let Some(auth) = &self.auth {
            request = request.query(&[("auth", auth)]);
        }

        let response = request.send().await?;
        expect_status(response, 200).await
    }
}
