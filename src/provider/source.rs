use anyhow::{Context, Result};
use reqwest::Client;
use std::path::PathBuf;

use super::{MediaFamily, fetch_checked};

/// Downloads media by URL.
#[async_trait::async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Media attached to an incoming message.
#[async_trait::async_trait]
pub trait Attachment: Send + Sync {
    async fn download(&self) -> Result<Vec<u8>>;
}

/// [`MediaSource`] backed by a reqwest client.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MediaSource for HttpSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        log::debug!("Fetching {url}");
        fetch_checked(self.client.get(url), MediaFamily::Any)
            .await
            .with_context(|| format!("Failed to fetch {url}"))
    }
}

/// [`Attachment`] stored on the local file system.
#[derive(Debug, Clone)]
pub struct FileAttachment {
    pub path: PathBuf,
}

impl FileAttachment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Attachment for FileAttachment {
    async fn download(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn http_source_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photo.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xFF\xD8\xFF\xE0".as_ref()))
            .mount(&server)
            .await;

        let source = HttpSource::new(Client::new());
        let bytes = source
            .fetch_bytes(&format!("{}/photo.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, b"\xFF\xD8\xFF\xE0");
    }

    #[tokio::test]
    async fn http_source_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpSource::new(Client::new());
        let err = source.fetch_bytes(&server.uri()).await.unwrap_err();
        assert!(format!("{err:#}").contains("404"));
    }

    #[tokio::test]
    async fn file_attachment_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sticker.webp");
        std::fs::write(&path, b"RIFF").unwrap();

        assert_eq!(FileAttachment::new(&path).download().await.unwrap(), b"RIFF");
        assert!(FileAttachment::new(dir.path().join("missing")).download().await.is_err());
    }
}
