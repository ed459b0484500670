//! Stores downloaded activity files under per-format output folders.

use crate::http_client::http_client_builder;
use crate::{ExportFormat, FileSink, IgpsportError, OutputLayout};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// File sink that fetches signed URLs with an anonymous client.
///
/// Signed URLs already carry their authorization, so the session token is
/// never sent to the file host.
#[derive(Clone, Debug)]
pub struct HttpFileSink {
    layout: OutputLayout,
    client: reqwest::Client,
}

impl HttpFileSink {
    pub fn new(layout: OutputLayout) -> Result<Self, IgpsportError> {
        Ok(Self {
            layout,
            client: http_client_builder().build()?,
        })
    }

    /// Path a file with this stem and format would be written to.
    pub fn target_path(&self, stem: &str, format: &str) -> PathBuf {
        ExportFormat::from_name(format)
            .folder(&self.layout)
            .join(format!("{stem}.{format}"))
    }
}

#[async_trait]
impl FileSink for HttpFileSink {
    async fn save(&self, url: &str, stem: &str, format: &str) -> Result<PathBuf, IgpsportError> {
        if url.is_empty() || stem.is_empty() {
            return Err(IgpsportError::Validation("url or fileName is empty".into()));
        }
        info!("downloading igpsport {} {}", stem, format);

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), stem, "file download rejected");
            return Err(IgpsportError::from_status(status));
        }

        let path = self.target_path(stem, format);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        // File::create truncates, so a previous download is fully replaced.
        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = resp.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            file.write_all(&bytes).await?;
            written = written.saturating_add(bytes.len() as u64);
        }
        file.flush().await?;
        debug!(path = %path.display(), bytes = written, "activity file written");
        Ok(path)
    }
}
