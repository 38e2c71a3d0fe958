use std::future::Future;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::model::FlowDocument;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed flow document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Document source closed before version {0} resolved")]
    Closed(u32),
}

/// Supplies the flow document for a given version.
pub trait DocumentSource: Send + Sync + 'static {
    fn fetch(
        &self,
        version: u32,
    ) -> impl Future<Output = Result<FlowDocument, SourceError>> + Send + 'static;
}

/// Serves `<base>/static/<version>/data.json` over HTTP.
#[derive(Clone, Debug)]
pub struct HttpDocumentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn document_url(&self, version: u32) -> String {
        format!("{}/static/{}/data.json", self.base_url, version)
    }
}

impl DocumentSource for HttpDocumentSource {
    fn fetch(
        &self,
        version: u32,
    ) -> impl Future<Output = Result<FlowDocument, SourceError>> + Send + 'static {
        let client = self.client.clone();
        let url = self.document_url(version);
        async move {
            debug!(%url, "fetching flow document");
            let document = client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<FlowDocument>()
                .await?;
            Ok(document)
        }
    }
}

/// Reads `<root>/<version>/data.json` from disk.
#[derive(Clone, Debug)]
pub struct FileDocumentSource {
    root: PathBuf,
}

impl FileDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn document_path(&self, version: u32) -> PathBuf {
        self.root.join(version.to_string()).join("data.json")
    }
}

impl DocumentSource for FileDocumentSource {
    fn fetch(
        &self,
        version: u32,
    ) -> impl Future<Output = Result<FlowDocument, SourceError>> + Send + 'static {
        let path = self.document_path(version);
        async move {
            debug!(path = %path.display(), "reading flow document");
            let raw = tokio::fs::read(&path).await?;
            Ok(serde_json::from_slice(&raw)?)
        }
    }
}
