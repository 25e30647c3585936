// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use claimdesk_app::{
    DataSource, EntityKind, FetchError, QueryDescriptor, RelatedColumnSpec, ResultPage,
    SchemaService, ServerParam,
};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Blocking REST client for the claims server.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        if timeout.is_zero() {
            bail!("server.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Page URL for `entity` with `query` encoded as query parameters.
    pub fn page_url<P: ServerParam>(
        &self,
        entity: EntityKind,
        query: &QueryDescriptor<P>,
    ) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, entity.api_path()))
            .with_context(|| format!("build URL for {}", entity.as_str()))?;
        url.query_pairs_mut().extend_pairs(query.to_query_pairs());
        Ok(url)
    }

    pub fn fetch_page<P: ServerParam>(
        &self,
        entity: EntityKind,
        query: &QueryDescriptor<P>,
    ) -> Result<ResultPage, FetchError> {
        let url = self
            .page_url(entity, query)
            .map_err(|error| FetchError::failed(format!("{error:#}")))?;
        debug!(%url, "fetching page");

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| FetchError::failed(self.request_error(error)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::failed(clean_error_response(status, &body)));
        }

        response.json::<ResultPage>().map_err(|error| {
            FetchError::failed(format!("decode {} page: {error}", entity.as_str()))
        })
    }

    pub fn list_related_columns(&self, entity: &str) -> Result<Vec<RelatedColumnSpec>> {
        let url = format!("{}/schema/{entity}/related-columns", self.base_url);
        debug!(%url, "fetching related columns");
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|error| anyhow!(self.request_error(error)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!(clean_error_response(status, &body)));
        }

        response
            .json()
            .with_context(|| format!("decode related columns for {entity}"))
    }

    /// Checks the server answers at all. Used by `--check`.
    pub fn ping(&self) -> Result<()> {
        self.list_related_columns(EntityKind::Claims.as_str())
            .map(|_| ())
    }

    fn request_error(&self, error: reqwest::Error) -> String {
        if error.is_timeout() {
            return format!(
                "request to {} timed out after {}s -- raise [server].timeout",
                self.base_url,
                self.timeout.as_secs_f64()
            );
        }
        format!(
            "cannot reach {} -- check [server].base_url and that the server is running ({error})",
            self.base_url
        )
    }
}

impl SchemaService for Client {
    fn list_related_columns(&self, entity: &str) -> Result<Vec<RelatedColumnSpec>> {
        Client::list_related_columns(self, entity)
    }
}

/// Normalizes `base_url` (trimmed, no trailing slash) and checks it is an
/// http(s) URL.
pub fn validate_base_url(base_url: &str) -> Result<String> {
    let base_url = base_url.trim().trim_end_matches('/').to_owned();
    if base_url.is_empty() {
        bail!("server.base_url must not be empty");
    }
    let parsed = Url::parse(&base_url)
        .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "server.base_url must use http or https, got {:?}",
            parsed.scheme()
        );
    }
    Ok(base_url)
}

/// [`DataSource`] for one entity's endpoint.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: Client,
    entity: EntityKind,
}

impl HttpDataSource {
    pub fn new(client: Client, entity: EntityKind) -> Self {
        Self { client, entity }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub const fn entity(&self) -> EntityKind {
        self.entity
    }
}

impl<P: ServerParam> DataSource<P> for HttpDataSource {
    fn fetch_page(&self, query: &QueryDescriptor<P>) -> Result<ResultPage, FetchError> {
        self.client.fetch_page(self.entity, query)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { message: String },
    Plain(String),
}

fn clean_error_response(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body) {
        let message = match parsed.error {
            Some(ErrorBody::Detailed { message } | ErrorBody::Plain(message)) => Some(message),
            None => parsed.message,
        };
        if let Some(message) = message
            && !message.trim().is_empty()
        {
            return format!("server error ({}): {}", status.as_u16(), message.trim());
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return format!("server error ({}): {trimmed}", status.as_u16());
    }

    format!("server returned {}", status.as_u16())
}
