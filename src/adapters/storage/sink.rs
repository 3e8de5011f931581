//! Durable destinations for streamed bulk output
//!
//! An [`OutputSink`] receives one file at a time as a stream of byte chunks
//! plus a suggested name, and returns the identifier it actually used.

use crate::domain::{FhirLinkError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Chunks of a downloaded file
pub type ByteStream<'a> = BoxStream<'a, Result<Bytes>>;

/// Destination for downloaded output files
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Consumes `stream` completely and returns the stored identifier
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by the stream or by the storage
    /// backend. Whatever was written before the error is left in place.
    async fn store(&self, name: &str, stream: ByteStream<'_>) -> Result<String>;
}

/// Writes each file to `{dir}/{name}`
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl OutputSink for DirectorySink {
    async fn store(&self, name: &str, mut stream: ByteStream<'_>) -> Result<String> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(FhirLinkError::Validation(format!(
                "Output name '{name}' is not a plain file name"
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(name);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(path = %path.display(), bytes = written, "Output file stored");

        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    fn chunks(parts: &[&'static str]) -> ByteStream<'static> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
        .boxed()
    }

    #[tokio::test]
    async fn test_directory_sink_writes_all_chunks() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));

        let id = sink
            .store("p1.ndjson", chunks(&["{\"id\":\"1\"}\n", "{\"id\":\"2\"}\n"]))
            .await
            .unwrap();

        assert_eq!(id, "p1.ndjson");
        let content = std::fs::read_to_string(dir.path().join("out/p1.ndjson")).unwrap();
        assert_eq!(content, "{\"id\":\"1\"}\n{\"id\":\"2\"}\n");
    }

    #[tokio::test]
    async fn test_directory_sink_rejects_path_names() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());

        for name in ["", "..", "../escape.ndjson", "a/b.ndjson"] {
            let result = sink.store(name, chunks(&["x"])).await;
            assert!(matches!(result, Err(FhirLinkError::Validation(_))), "{name}");
        }
    }

    #[tokio::test]
    async fn test_directory_sink_propagates_stream_error() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());
        let failing: ByteStream<'static> = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(FhirLinkError::Transport("connection reset".to_string())),
        ])
        .boxed();

        let result = sink.store("broken.ndjson", failing).await;
        assert!(matches!(result, Err(FhirLinkError::Transport(_))));
        assert!(dir.path().join("broken.ndjson").exists());
    }
}
