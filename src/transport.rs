//! Transports that carry an extraction request to a page's adapter

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use crate::models::ProblemDraft;
use crate::scrape::{PageContext, ScraperRegistry};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The page has no adapter listening; a normal, recoverable outcome
    #[error("no responder for {0}")]
    NoResponder(String),
    #[error("transport failed: {0}")]
    Failed(String),
}

/// Request/response channel to the adapter living in a page
pub trait PageTransport: Send + Sync {
    fn request_extraction(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<ProblemDraft, TransportError>> + Send;
}

/// Adapters run against pages registered with [`InProcessTransport::open`]
///
/// A page counts as having an injected adapter when it is open and a
/// scraper serves its host.
pub struct InProcessTransport {
    registry: ScraperRegistry,
    pages: Mutex<HashMap<String, PageContext>>,
}

impl Default for InProcessTransport {
    fn default() -> Self {
        Self::new(ScraperRegistry::default())
    }
}

impl InProcessTransport {
    pub fn new(registry: ScraperRegistry) -> Self {
        Self {
            registry,
            pages: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(&self, page: PageContext) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(page.url.clone(), page);
        }
    }

    pub fn close(&self, url: &str) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.remove(url);
        }
    }

    fn extract(&self, url: &str) -> Result<ProblemDraft, TransportError> {
        let page = self
            .pages
            .lock()
            .map_err(|_| TransportError::Failed("page table poisoned".into()))?
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::NoResponder(url.to_string()))?;

        self.registry
            .extract(&page)
            .ok_or_else(|| TransportError::NoResponder(url.to_string()))
    }
}

impl PageTransport for InProcessTransport {
    async fn request_extraction(&self, url: &str) -> Result<ProblemDraft, TransportError> {
        self.extract(url)
    }
}

/// Downloads the page and runs its adapter locally
pub struct FetchTransport {
    client: reqwest::Client,
    registry: ScraperRegistry,
}

impl FetchTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Failed(e.to_string()))?;
        Ok(Self {
            client,
            registry: ScraperRegistry::default(),
        })
    }
}

impl PageTransport for FetchTransport {
    async fn request_extraction(&self, url: &str) -> Result<ProblemDraft, TransportError> {
        let Some(scraper) = self.registry.for_url(url) else {
            return Err(TransportError::NoResponder(url.to_string()));
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TransportError::Failed(e.to_string()))?;
        let html = response
            .text()
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))?;

        tracing::debug!(url, bytes = html.len(), "Fetched page");
        Ok(scraper.extract(&PageContext::from_html(url, html)))
    }
}
