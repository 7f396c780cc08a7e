use std::future::Future;

use livetrack::source::TripLiveDetails;
use reqwest::{StatusCode, header::ACCEPT_ENCODING};
use serde::Deserialize;
use thiserror::Error;

use crate::config::FLEET_PLACEHOLDER;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Upstream answered {0}")]
    Status(StatusCode),
    #[error("Invalid trip data: {0}")]
    Invalid(#[from] livetrack::source::Error),
}

/// Source of live stop lists for a fleet number.
pub trait StopFeed: Send + Sync + 'static {
    fn fetch(
        &self,
        fleet_id: &str,
    ) -> impl Future<Output = Result<TripLiveDetails, FeedError>> + Send;
}

#[derive(Deserialize)]
struct Envelope {
    data: TripLiveDetails,
}

/// Fetches `{ "data": TripLiveDetails }` from the scraper service.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    url_template: String,
}

impl HttpFeed {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url_template: url_template.into(),
        }
    }

    fn url(&self, fleet_id: &str) -> String {
        self.url_template.replace(FLEET_PLACEHOLDER, fleet_id)
    }
}

impl StopFeed for HttpFeed {
    async fn fetch(&self, fleet_id: &str) -> Result<TripLiveDetails, FeedError> {
        let response = self
            .client
            .get(self.url(fleet_id))
            .header(ACCEPT_ENCODING, "gzip, deflate")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }

        let envelope: Envelope = response.json().await?;
        envelope.data.validate()?;
        Ok(envelope.data)
    }
}
