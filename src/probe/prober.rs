//! HTTP-backed prober

use super::types::{ProbeResult, Prober};
use crate::decode::{Decoded, PageDecoder};
use crate::error::Result;
use crate::http::HttpClient;
use crate::template::UrlTemplate;
use async_trait::async_trait;
use tracing::debug;

/// Prober that fetches the rendered URL and decodes the page
#[derive(Debug)]
pub struct HttpProber {
    template: UrlTemplate,
    client: HttpClient,
    decoder: Box<dyn PageDecoder>,
    end_markers: Vec<String>,
}

impl HttpProber {
    /// Create a new prober without end-of-data markers
    pub fn new(template: UrlTemplate, client: HttpClient, decoder: Box<dyn PageDecoder>) -> Self {
        Self {
            template,
            client,
            decoder,
            end_markers: Vec::new(),
        }
    }

    /// Set the body substrings that signal end of data
    #[must_use]
    pub fn with_end_markers(mut self, markers: Vec<String>) -> Self {
        self.end_markers = markers.into_iter().filter(|m| !m.is_empty()).collect();
        self
    }

    /// The URL template in use
    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    fn is_end_of_data(&self, body: &str) -> bool {
        self.end_markers.iter().any(|marker| body.contains(marker.as_str()))
    }

    /// Fetch and classify, surfacing failures
    ///
    /// Error responses whose body carries an end-of-data marker still
    /// classify as [`ProbeResult::EndOfData`].
    pub async fn try_probe(&self, id: u64) -> Result<ProbeResult> {
        let url = self.template.url_for(id)?;

        let body = match self.client.get_text(&url).await {
            Ok(body) => body,
            Err(e) => {
                if e.body().is_some_and(|body| self.is_end_of_data(body)) {
                    return Ok(ProbeResult::EndOfData);
                }
                return Err(e);
            }
        };

        if self.is_end_of_data(&body) {
            return Ok(ProbeResult::EndOfData);
        }

        Ok(match self.decoder.decode(id, &body)? {
            Decoded::Record(mut record) => {
                record.url = Some(url);
                ProbeResult::Match(record)
            }
            Decoded::Empty => ProbeResult::NoMatch,
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, id: u64) -> ProbeResult {
        match self.try_probe(id).await {
            Ok(result) => result,
            Err(e) => {
                debug!("Probe {id} failed: {e}");
                ProbeResult::NoMatch
            }
        }
    }
}
