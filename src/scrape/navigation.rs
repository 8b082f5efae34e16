//! Re-extraction after client-side navigation

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{PageContext, Scraper};
use crate::models::ProblemDraft;

/// Remembers the last seen address and re-extracts when it changes
#[derive(Debug, Default)]
pub struct NavigationObserver {
    last_url: Option<String>,
}

impl NavigationObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh draft when `page` is a problem page at a new address
    pub fn observe(&mut self, scraper: &dyn Scraper, page: &PageContext) -> Option<ProblemDraft> {
        if self.last_url.as_deref() == Some(page.url.as_str()) {
            return None;
        }
        self.last_url = Some(page.url.clone());

        if !scraper.is_problem_page(&page.url) {
            tracing::debug!(url = %page.url, "Navigated away from problem pages");
            return None;
        }

        tracing::debug!(judge = %scraper.judge(), url = %page.url, "Address changed, re-extracting");
        Some(scraper.extract(page))
    }
}

/// Poll the current page every `period` and send a draft per navigation
///
/// Stops when `current_page` yields `None` (page closed) or the receiver
/// is dropped.
pub async fn poll_navigation<F, Fut>(
    scraper: Arc<dyn Scraper>,
    mut current_page: F,
    period: Duration,
    drafts: mpsc::Sender<ProblemDraft>,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<PageContext>>,
{
    let mut observer = NavigationObserver::new();
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        let Some(page) = current_page().await else {
            break;
        };
        let Some(draft) = observer.observe(scraper.as_ref(), &page) else {
            continue;
        };
        if drafts.send(draft).await.is_err() {
            break;
        }
    }
}
