//! Output download
//!
//! Streams each file listed in a completion manifest into an
//! [`OutputSink`], in manifest order. The first failure aborts the run;
//! files already stored, and any partial file, stay where they are.

use super::coordinator::BulkCoordinator;
use crate::adapters::fhir::client::ensure_success;
use crate::adapters::storage::{ByteStream, OutputSink};
use crate::domain::{FhirLinkError, JobManifest, OutputEntry, Result};
use futures::{StreamExt, TryStreamExt};
use reqwest::Method;
use tracing::Instrument;

/// Local name for a manifest entry downloaded from `url`
///
/// `url` is the entry's download URL after resolution against the server
/// base. The name is its last path segment, or `{type}.ndjson` when the
/// URL has none.
///
/// # Example
///
/// ```rust
/// use fhirlink::core::bulk::output_file_name;
/// use fhirlink::domain::OutputEntry;
///
/// let entry = OutputEntry::new("Patient", "files/p1.ndjson");
/// let url = url::Url::parse("https://host/fhir/files/p1.ndjson").unwrap();
/// assert_eq!(output_file_name(&entry, &url), "p1.ndjson");
/// ```
pub fn output_file_name(entry: &OutputEntry, url: &url::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.ndjson", entry.resource_type))
}

impl BulkCoordinator<'_> {
    /// Downloads every output file of a manifest into `sink`
    ///
    /// Returns the identifiers reported by the sink, in manifest order.
    pub async fn materialize(
        &self,
        manifest: &JobManifest,
        sink: &dyn OutputSink,
    ) -> Result<Vec<String>> {
        let span = tracing::info_span!(
            parent: self.client.span(),
            "bulk_materialize",
            files = manifest.output.len()
        );
        self.download_all(manifest, sink).instrument(span).await
    }

    async fn download_all(
        &self,
        manifest: &JobManifest,
        sink: &dyn OutputSink,
    ) -> Result<Vec<String>> {
        let mut guard = self.cancel_guard();
        let mut written = Vec::with_capacity(manifest.output.len());

        for entry in &manifest.output {
            guard.check()?;

            let url = self.resolve_url(&entry.url)?;
            tracing::info!(
                resource_type = %entry.resource_type,
                url = %url,
                "Downloading output file"
            );

            let response = guard
                .run(self.client.send(Method::GET, url.as_str(), &[], None, false))
                .await??;
            let response = ensure_success(&Method::GET, url.as_str(), response).await?;

            let stream: ByteStream<'_> = response
                .bytes_stream()
                .map_err(|e| FhirLinkError::Transport(format!("Download interrupted: {e}")))
                .boxed();

            let name = output_file_name(entry, &url);
            let id = guard.run(sink.store(&name, stream)).await??;

            crate::log_output_written!(entry.resource_type, url, id);
            written.push(id);
        }

        tracing::info!(files = written.len(), "Bulk output materialized");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://host/files/p1.ndjson", "p1.ndjson"; "last segment")]
    #[test_case("https://host/files/p1.ndjson?token=abc", "p1.ndjson"; "query ignored")]
    #[test_case("https://host/", "Patient.ndjson"; "empty path")]
    #[test_case("https://host", "Patient.ndjson"; "no path")]
    fn test_output_file_name(url: &str, expected: &str) {
        let entry = OutputEntry::new("Patient", url);
        let url = url::Url::parse(url).unwrap();
        assert_eq!(output_file_name(&entry, &url), expected);
    }

    #[test]
    fn test_relative_entry_named_after_resolved_url() {
        let entry = OutputEntry::new("Patient", "files/p1.ndjson");
        let base = url::Url::parse("https://host/fhir/").unwrap();
        let url = base.join(&entry.url).unwrap();
        assert_eq!(output_file_name(&entry, &url), "p1.ndjson");
    }
}
