use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Placeholders, Provider, Uploadable, fill};
use crate::config::{HttpConfig, LinkProviderConfig, TemplateProviderConfig, UploadProviderConfig};

/// The content types a provider response is allowed to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFamily {
    /// `image/*`
    Image,
    /// `video/*`
    Video,
    /// GIF, WebP or any `video/*`
    Animated,
    /// Anything, as long as the status is 2xx
    Any,
}

impl MediaFamily {
    pub fn matches(&self, content_type: &str) -> bool {
        let ct = content_type.trim().to_ascii_lowercase();
        match self {
            Self::Image => ct.starts_with("image/"),
            Self::Video => ct.starts_with("video/"),
            Self::Animated => ct.contains("gif") || ct.contains("webp") || ct.starts_with("video/"),
            Self::Any => true,
        }
    }
}

/// Build the shared HTTP client from configuration.
pub fn build_client(http: &HttpConfig) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .user_agent(http.user_agent.clone())
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Failed to build configured HTTP client ({e}), using defaults");
            Client::new()
        })
}

/// Send `request` and return the body if the status is 2xx, the content
/// type belongs to `accept` and the body is non-empty.
pub async fn fetch_checked(request: RequestBuilder, accept: MediaFamily) -> Result<Vec<u8>> {
    let resp = request.send().await.context("Request failed")?;

    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {status}");
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !accept.matches(&content_type) {
        anyhow::bail!("Unexpected content type {content_type:?}");
    }

    let body = resp.bytes().await.context("Failed to read response body")?;
    if body.is_empty() {
        anyhow::bail!("Empty response");
    }
    Ok(body.to_vec())
}

/// Fetch a JSON document and follow the media URL found at `pointer`.
async fn follow_link(client: &Client, request: RequestBuilder, pointer: &str, accept: MediaFamily) -> Result<Vec<u8>> {
    let resp = request.send().await.context("Request failed")?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {status}");
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains("json") {
        anyhow::bail!("Unexpected content type {content_type:?}");
    }

    let text = resp.text().await.context("Failed to read response")?;
    let json: serde_json::Value =
        serde_json::from_str(&text).context("Failed to parse response JSON")?;
    let link = json
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .with_context(|| format!("No media URL at {pointer}"))?;

    log::debug!("Following result link {link}");
    fetch_checked(client.get(link), accept).await
}

/// Substitute placeholders into a URL template and append encoded query pairs.
fn build_url(template: &str, query: &[(String, String)], vars: &[(&'static str, String)]) -> Result<Url> {
    let filled = fill(template, vars);
    let mut url = Url::parse(&filled).with_context(|| format!("Invalid URL {filled:?}"))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, &fill(value, vars));
        }
    }
    Ok(url)
}

/// Multipart upload to a conversion service.
///
/// The input is sent as a file part; extra form fields may use the input's
/// placeholders. If `result_pointer` is set, the response is JSON holding a
/// link to the converted media.
pub struct UploadProvider {
    name: String,
    url: String,
    file_field: String,
    fields: Vec<(String, String)>,
    result_pointer: Option<String>,
    accept: MediaFamily,
    client: Client,
}

impl UploadProvider {
    pub fn new(config: &UploadProviderConfig, client: Client) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            file_field: config.file_field.clone(),
            fields: config.fields.clone(),
            result_pointer: config.result_pointer.clone(),
            accept: config.accept,
            client,
        }
    }

    fn form<I: Uploadable>(&self, input: &I) -> Result<Form> {
        let vars = input.placeholders();
        let part = Part::bytes(input.bytes().to_vec())
            .file_name(input.file_name())
            .mime_str(input.mime_type())
            .context("Invalid MIME type")?;

        let mut form = Form::new().part(self.file_field.clone(), part);
        for (key, value) in &self.fields {
            form = form.text(key.clone(), fill(value, &vars));
        }
        Ok(form)
    }
}

#[async_trait::async_trait]
impl<I: Uploadable + Sync> Provider<I> for UploadProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self, input: &I) -> Result<Vec<u8>> {
        let url = fill(&self.url, &input.placeholders());
        let request = self.client.post(&url).multipart(self.form(input)?);

        match &self.result_pointer {
            Some(pointer) => follow_link(&self.client, request, pointer, self.accept).await,
            None => fetch_checked(request, self.accept).await,
        }
    }
}

/// GET of a templated URL returning media directly.
pub struct TemplateProvider {
    name: String,
    url: String,
    query: Vec<(String, String)>,
    accept: MediaFamily,
    client: Client,
}

impl TemplateProvider {
    pub fn new(config: &TemplateProviderConfig, client: Client) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            query: config.query.clone(),
            accept: config.accept,
            client,
        }
    }
}

#[async_trait::async_trait]
impl<I: Placeholders + Sync> Provider<I> for TemplateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self, input: &I) -> Result<Vec<u8>> {
        let url = build_url(&self.url, &self.query, &input.placeholders())?;
        fetch_checked(self.client.get(url), self.accept).await
    }
}

/// GET of a templated URL returning JSON that links to the media.
pub struct JsonLinkProvider {
    name: String,
    url: String,
    query: Vec<(String, String)>,
    pointer: String,
    accept: MediaFamily,
    client: Client,
}

impl JsonLinkProvider {
    pub fn new(config: &LinkProviderConfig, client: Client) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            query: config.query.clone(),
            pointer: config.pointer.clone(),
            accept: config.accept,
            client,
        }
    }
}

#[async_trait::async_trait]
impl<I: Placeholders + Sync> Provider<I> for JsonLinkProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self, input: &I) -> Result<Vec<u8>> {
        let url = build_url(&self.url, &self.query, &input.placeholders())?;
        follow_link(&self.client, self.client.get(url), &self.pointer, self.accept).await
    }
}
