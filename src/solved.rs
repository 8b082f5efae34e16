//! Solved-status lookup against judges' public APIs
//!
//! Only Codeforces and LeetCode expose something usable without
//! authentication; other judges always report "not solved".

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::models::Judge;

static CODEFORCES_PROBLEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"problemset/problem/(\d+)/([A-Z]\d?)|contest/(\d+)/problem/([A-Z]\d?)")
        .expect("valid regex")
});
static LEETCODE_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"problems/([^/?#]+)").expect("valid regex"));

const CODEFORCES_API: &str = "https://codeforces.com";
const LEETCODE_API: &str = "https://leetcode.com";

const LEETCODE_QUERY: &str = r#"
query getUserProfile($username: String!) {
  matchedUser(username: $username) {
    username
  }
  recentSubmissionList(username: $username, limit: 100) {
    titleSlug
    statusDisplay
  }
}"#;

#[derive(Debug, thiserror::Error)]
pub enum SolvedCheckError {
    #[error("no {0} handle configured")]
    MissingHandle(Judge),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{judge} API error: {message}")]
    Api { judge: Judge, message: String },
}

#[derive(Debug, Deserialize)]
pub struct CodeforcesStatus {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub result: Vec<CodeforcesSubmission>,
}

#[derive(Debug, Deserialize)]
pub struct CodeforcesSubmission {
    pub problem: CodeforcesProblem,
    #[serde(default)]
    pub verdict: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesProblem {
    #[serde(default)]
    pub contest_id: Option<u32>,
    pub index: String,
}

#[derive(Debug, Deserialize)]
pub struct LeetCodeResponse {
    #[serde(default)]
    pub data: Option<LeetCodeData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeData {
    #[serde(default)]
    pub matched_user: Option<serde_json::Value>,
    #[serde(default)]
    pub recent_submission_list: Vec<LeetCodeSubmission>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeSubmission {
    pub title_slug: String,
    pub status_display: String,
}

/// Contest id and problem index from a Codeforces problem address
pub fn codeforces_problem(url: &str) -> Option<(u32, String)> {
    let caps = CODEFORCES_PROBLEM.captures(url)?;
    let contest = caps.get(1).or_else(|| caps.get(3))?.as_str().parse().ok()?;
    let index = caps.get(2).or_else(|| caps.get(4))?.as_str().to_string();
    Some((contest, index))
}

pub fn leetcode_slug(url: &str) -> Option<String> {
    LEETCODE_SLUG
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Whether any submission is an accepted one for the given problem
pub fn codeforces_accepted(submissions: &[CodeforcesSubmission], contest: u32, index: &str) -> bool {
    submissions.iter().any(|s| {
        s.problem.contest_id == Some(contest)
            && s.problem.index == index
            && s.verdict.as_deref() == Some("OK")
    })
}

pub fn leetcode_accepted(submissions: &[LeetCodeSubmission], slug: &str) -> bool {
    submissions
        .iter()
        .any(|s| s.title_slug == slug && s.status_display == "Accepted")
}

pub struct SolvedChecker {
    client: reqwest::Client,
    codeforces_api: String,
    leetcode_api: String,
}

impl SolvedChecker {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            codeforces_api: CODEFORCES_API.to_string(),
            leetcode_api: LEETCODE_API.to_string(),
        }
    }

    /// Point the checker at other API hosts
    pub fn with_endpoints(mut self, codeforces: impl Into<String>, leetcode: impl Into<String>) -> Self {
        self.codeforces_api = codeforces.into();
        self.leetcode_api = leetcode.into();
        self
    }

    pub async fn is_solved(
        &self,
        judge: Judge,
        problem_url: &str,
        handle: Option<&str>,
    ) -> Result<bool, SolvedCheckError> {
        let handle = handle
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SolvedCheckError::MissingHandle(judge))?;

        match judge {
            Judge::Codeforces => self.codeforces(problem_url, handle).await,
            Judge::LeetCode => self.leetcode(problem_url, handle).await,
            other => {
                tracing::debug!(judge = %other, "No public solved-status API");
                Ok(false)
            }
        }
    }

    async fn codeforces(&self, url: &str, handle: &str) -> Result<bool, SolvedCheckError> {
        let Some((contest, index)) = codeforces_problem(url) else {
            tracing::debug!(url, "Not a Codeforces problem address");
            return Ok(false);
        };

        let status: CodeforcesStatus = self
            .client
            .get(format!("{}/api/user.status", self.codeforces_api))
            .query(&[("handle", handle), ("from", "1"), ("count", "1000")])
            .send()
            .await?
            .json()
            .await?;

        if status.status != "OK" {
            return Err(SolvedCheckError::Api {
                judge: Judge::Codeforces,
                message: status.comment.unwrap_or(status.status),
            });
        }

        Ok(codeforces_accepted(&status.result, contest, &index))
    }

    async fn leetcode(&self, url: &str, handle: &str) -> Result<bool, SolvedCheckError> {
        let Some(slug) = leetcode_slug(url) else {
            tracing::debug!(url, "Not a LeetCode problem address");
            return Ok(false);
        };

        let body = serde_json::json!({
            "query": LEETCODE_QUERY,
            "variables": { "username": handle },
        });
        let response: LeetCodeResponse = self
            .client
            .post(format!("{}/graphql", self.leetcode_api))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(data) = response.data.filter(|d| d.matched_user.is_some()) else {
            return Err(SolvedCheckError::Api {
                judge: Judge::LeetCode,
                message: format!("unknown user {handle}"),
            });
        };

        Ok(leetcode_accepted(&data.recent_submission_list, &slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codeforces_addresses() {
        assert_eq!(
            codeforces_problem("https://codeforces.com/problemset/problem/1559/D1"),
            Some((1559, "D1".to_string()))
        );
        assert_eq!(
            codeforces_problem("https://codeforces.com/contest/4/problem/A"),
            Some((4, "A".to_string()))
        );
        assert_eq!(codeforces_problem("https://codeforces.com/blog/entry/1"), None);
    }

    #[test]
    fn codeforces_needs_matching_accepted_submission() {
        let status: CodeforcesStatus = serde_json::from_str(
            r#"{"status":"OK","result":[
                {"problem":{"contestId":4,"index":"A"},"verdict":"WRONG_ANSWER"},
                {"problem":{"contestId":4,"index":"B"},"verdict":"OK"},
                {"problem":{"index":"A"},"verdict":"OK"}
            ]}"#,
        )
        .unwrap();

        assert!(!codeforces_accepted(&status.result, 4, "A"));
        assert!(codeforces_accepted(&status.result, 4, "B"));
    }

    #[test]
    fn leetcode_matches_slug_and_status() {
        let response: LeetCodeResponse = serde_json::from_str(
            r#"{"data":{"matchedUser":{"username":"u"},"recentSubmissionList":[
                {"titleSlug":"two-sum","statusDisplay":"Wrong Answer"},
                {"titleSlug":"3sum","statusDisplay":"Accepted"}
            ]}}"#,
        )
        .unwrap();
        let submissions = response.data.unwrap().recent_submission_list;

        assert!(!leetcode_accepted(&submissions, "two-sum"));
        assert!(leetcode_accepted(&submissions, "3sum"));
        assert_eq!(
            leetcode_slug("https://leetcode.com/problems/3sum/description/").as_deref(),
            Some("3sum")
        );
    }

    /// Answer a single HTTP request on localhost with `body`
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8192];
            let _ = socket.read(&mut request).await.unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn local_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn codeforces_status_is_fetched_from_configured_host() {
        let base = serve_once(
            r#"{"status":"OK","result":[{"problem":{"contestId":4,"index":"A"},"verdict":"OK"}]}"#,
        )
        .await;
        let checker = SolvedChecker::new(local_client()).with_endpoints(base, "http://127.0.0.1:9");

        let solved = checker
            .is_solved(Judge::Codeforces, "https://codeforces.com/contest/4/problem/A", Some("tourist"))
            .await
            .unwrap();
        assert!(solved);
    }

    #[tokio::test]
    async fn codeforces_failure_status_is_an_api_error() {
        let base = serve_once(r#"{"status":"FAILED","comment":"handle: User not found"}"#).await;
        let checker = SolvedChecker::new(local_client()).with_endpoints(base, "http://127.0.0.1:9");

        let err = checker
            .is_solved(Judge::Codeforces, "https://codeforces.com/contest/4/problem/A", Some("nobody"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SolvedCheckError::Api { judge: Judge::Codeforces, ref message } if message.contains("not found")
        ));
    }

    #[tokio::test]
    async fn missing_handle_is_reported_before_any_request() {
        let checker = SolvedChecker::new(reqwest::Client::new());
        let err = checker
            .is_solved(Judge::Codeforces, "https://codeforces.com/contest/4/problem/A", Some(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, SolvedCheckError::MissingHandle(Judge::Codeforces)));
    }

    #[tokio::test]
    async fn judges_without_api_report_unsolved() {
        let checker = SolvedChecker::new(reqwest::Client::new());
        let solved = checker
            .is_solved(Judge::AtCoder, "https://atcoder.jp/contests/abc300/tasks/abc300_a", Some("u"))
            .await
            .unwrap();
        assert!(!solved);
    }
}
