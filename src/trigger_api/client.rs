use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::info;
use url::Url;

use super::model::{TriggerApiParams, TriggerApiResponse, TriggerRequest};
use crate::config;

const USER_AGENT: &str = concat!("hook-trigger/", env!("CARGO_PKG_VERSION"));

pub struct TriggerClient {
    http: reqwest::Client,

    base_url: Url,

    // Overrides every computed endpoint when set
    send_request_to: Option<Url>,
}

impl TriggerClient {
    pub fn build(cfg: &config::TriggerApiConfig) -> anyhow::Result<Self> {
        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(
            "User-Agent",
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );
        default_headers.insert(
            "Accept",
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
            send_request_to: cfg.send_request_to.clone(),
        })
    }

    pub fn endpoint(&self, app_slug: &str) -> anyhow::Result<Url> {
        if let Some(url) = &self.send_request_to {
            return Ok(url.clone());
        }

        let url = format!(
            "{}/app/{app_slug}/build/start.json",
            self.base_url.as_str().trim_end_matches('/')
        );

        Url::parse(&url).with_context(|| format!("Invalid trigger endpoint for app {app_slug}"))
    }

    /// Start a build. Fails if the request can't be sent or the API answers
    /// with a non-success status.
    #[tracing::instrument(skip(self, api_token, params))]
    pub async fn trigger_build(
        &self,
        service_id: &str,
        app_slug: &str,
        api_token: &str,
        params: &TriggerApiParams,
    ) -> anyhow::Result<TriggerApiResponse> {
        let url = self.endpoint(app_slug)?;
        let request = TriggerRequest::new(service_id, api_token, params);

        info!("Triggering build for branch {}", params.branch);

        let res = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .context("Sending trigger request")?;

        let status = res.status();
        let body: TriggerApiResponse = res
            .json()
            .await
            .with_context(|| format!("Decoding trigger API response ({status})"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Trigger API responded with {status}: {}",
                body.message
            ));
        }

        info!("Triggered build {}", body.build_url);

        Ok(body)
    }
}
