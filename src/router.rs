//! Extraction router: asks the active page's adapter for a draft

use std::time::Duration;

use crate::models::{Judge, ProblemDraft};
use crate::transport::{PageTransport, TransportError};

/// Used when the caller does not pick a timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Judge hosts; subdomains (`www.`, `m.`) match too
const HOSTS: &[(&str, Judge)] = &[
    ("codeforces.com", Judge::Codeforces),
    ("leetcode.com", Judge::LeetCode),
    ("atcoder.jp", Judge::AtCoder),
    ("codechef.com", Judge::CodeChef),
    ("cses.fi", Judge::Cses),
];

/// Judge hosting `url`, by hostname
pub fn judge_for_url(url: &str) -> Option<Judge> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    HOSTS
        .iter()
        .find(|(domain, _)| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|rest| rest.ends_with('.'))
        })
        .map(|(_, judge)| *judge)
}

/// Outcome of routing an extraction request
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The page adapter answered
    Extracted(ProblemDraft),
    /// Nobody answered in time; only judge and address are known
    Fallback(ProblemDraft),
}

impl Extraction {
    pub fn draft(&self) -> &ProblemDraft {
        match self {
            Extraction::Extracted(draft) | Extraction::Fallback(draft) => draft,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback(_))
    }
}

pub struct ExtractionRouter<T> {
    transport: T,
    timeout: Duration,
}

impl<T: PageTransport> ExtractionRouter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Draft for the page at `url`; never fails
    pub async fn extract(&self, url: &str) -> Extraction {
        let judge = judge_for_url(url);
        let request = self.transport.request_extraction(url);

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(mut draft)) => {
                if draft.judge.is_none() {
                    draft.judge = judge;
                }
                Extraction::Extracted(draft)
            }
            Ok(Err(TransportError::NoResponder(_))) => {
                tracing::debug!(url, "No adapter on page, using address only");
                Extraction::Fallback(ProblemDraft::degraded(url, judge))
            }
            Ok(Err(err)) => {
                tracing::warn!(url, error = %err, "Extraction request failed");
                Extraction::Fallback(ProblemDraft::degraded(url, judge))
            }
            Err(_) => {
                tracing::warn!(url, timeout_ms = self.timeout.as_millis() as u64, "Extraction timed out");
                Extraction::Fallback(ProblemDraft::degraded(url, judge))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::PageContext;
    use crate::transport::InProcessTransport;
    use std::future::Future;

    #[test]
    fn hostname_table() {
        assert_eq!(
            judge_for_url("https://codeforces.com/problemset/problem/1/A"),
            Some(Judge::Codeforces)
        );
        assert_eq!(
            judge_for_url("https://www.codechef.com/problems/FLOW001"),
            Some(Judge::CodeChef)
        );
        assert_eq!(judge_for_url("https://leetcode.com/problems/two-sum/"), Some(Judge::LeetCode));
        assert_eq!(judge_for_url("https://atcoder.jp/contests/abc300"), Some(Judge::AtCoder));
        assert_eq!(judge_for_url("https://cses.fi/problemset/"), Some(Judge::Cses));
        assert_eq!(judge_for_url("https://notcodeforces.com/"), None);
        assert_eq!(judge_for_url("https://example.com/?q=codeforces.com"), None);
        assert_eq!(judge_for_url("not a url"), None);
    }

    #[tokio::test]
    async fn responding_page_yields_extracted_draft() {
        let url = "https://leetcode.com/problems/two-sum/";
        let transport = InProcessTransport::default();
        transport.open(PageContext::from_html(
            url,
            r#"<div data-cy="question-title">1. Two Sum</div><div diff>Medium</div>"#,
        ));

        let extraction = ExtractionRouter::new(transport).extract(url).await;
        assert!(!extraction.is_fallback());
        assert_eq!(extraction.draft().name, "1. Two Sum");
        assert_eq!(extraction.draft().rating, "1600");
    }

    #[tokio::test]
    async fn missing_responder_falls_back_to_address_and_judge() {
        let url = "https://codeforces.com/problemset/problem/4/A";
        let extraction = ExtractionRouter::new(InProcessTransport::default())
            .extract(url)
            .await;

        assert_eq!(
            extraction,
            Extraction::Fallback(ProblemDraft::degraded(url, Some(Judge::Codeforces)))
        );
    }

    struct SilentTransport;

    impl PageTransport for SilentTransport {
        fn request_extraction(
            &self,
            _url: &str,
        ) -> impl Future<Output = Result<ProblemDraft, TransportError>> + Send {
            std::future::pending()
        }
    }

    #[tokio::test]
    async fn silent_page_times_out_into_fallback() {
        let url = "https://atcoder.jp/contests/abc300/tasks/abc300_a";
        let extraction = ExtractionRouter::new(SilentTransport)
            .with_timeout(Duration::from_millis(50))
            .extract(url)
            .await;

        assert!(extraction.is_fallback());
        assert_eq!(extraction.draft().judge, Some(Judge::AtCoder));
        assert_eq!(extraction.draft().url, url);
        assert!(extraction.draft().name.is_empty());
    }
}
