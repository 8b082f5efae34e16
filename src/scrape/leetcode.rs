use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

use super::{PageContext, Scraper, difficulty_rating, first_tags, first_text};
use crate::models::{Judge, ProblemDraft};

static PROBLEM_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/problems/[^/?#]+").expect("valid regex"));

/// LeetCode problem pages
///
/// Difficulty words map to fixed ratings. The site routes on the client, so
/// the address is watched and extraction re-runs after navigation.
pub struct LeetCode;

impl Scraper for LeetCode {
    fn judge(&self) -> Judge {
        Judge::LeetCode
    }

    fn is_problem_page(&self, url: &str) -> bool {
        PROBLEM_PAGE.is_match(url)
    }

    fn follows_navigation(&self) -> bool {
        true
    }

    fn scrape(&self, page: &PageContext, doc: &Html) -> Result<ProblemDraft> {
        let name = first_text(
            doc,
            &[
                r#"[data-cy="question-title"]"#,
                r#"div[class*="text-title"]"#,
                ".css-v3d350",
            ],
        )?
        .ok_or_else(|| anyhow!("question title not found"))?;

        let rating = first_text(doc, &["div[diff]", r#"[class*="difficulty"]"#])?
            .as_deref()
            .and_then(difficulty_rating)
            .unwrap_or_default()
            .to_string();

        let tags = first_tags(
            doc,
            &[r#"a[class*="topic-tag"]"#, ".tag", r#"a[href*="/tag/"]"#],
            |_| true,
        )?;

        Ok(ProblemDraft {
            name,
            url: page.url.clone(),
            judge: Some(Judge::LeetCode),
            rating,
            tags,
            ..ProblemDraft::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://leetcode.com/problems/two-sum/";

    #[test]
    fn extracts_title_difficulty_and_topics() {
        let page = r#"
            <html><head><title>Two Sum - LeetCode</title></head><body>
              <div data-cy="question-title">1. Two Sum</div>
              <div diff="easy">Easy</div>
              <a class="topic-tag__1jni">Array</a>
              <a class="topic-tag__1jni">Hash Table</a>
            </body></html>"#;
        let draft = LeetCode.extract(&PageContext::from_html(URL, page));
        assert_eq!(draft.name, "1. Two Sum");
        assert_eq!(draft.rating, "1200");
        assert_eq!(draft.tags, vec!["array", "hash table"]);
        assert_eq!(draft.judge, Some(Judge::LeetCode));
    }

    #[test]
    fn falls_through_to_looser_selectors() {
        let page = r#"
            <div class="text-title-large">42. Trapping Rain Water</div>
            <div class="text-difficulty-hard">Hard</div>
            <a href="/tag/two-pointers/">Two Pointers</a>
            <a href="/tag/stack/">Stack</a>"#;
        let draft = LeetCode.extract(&PageContext::from_html(URL, page));
        assert_eq!(draft.name, "42. Trapping Rain Water");
        assert_eq!(draft.rating, "2000");
        assert_eq!(draft.tags, vec!["two pointers", "stack"]);
    }

    #[test]
    fn unrendered_page_degrades() {
        let page = "<html><head><title>Two Sum - LeetCode</title></head><body></body></html>";
        let draft = LeetCode.extract(&PageContext::from_html(URL, page));
        assert_eq!(draft.name, "Two Sum");
        assert_eq!(draft.url, URL);
        assert!(draft.rating.is_empty());
    }

    #[test]
    fn follows_client_side_navigation() {
        assert!(LeetCode.follows_navigation());
        assert!(LeetCode.is_problem_page(URL));
        assert!(!LeetCode.is_problem_page("https://leetcode.com/contest/"));
    }
}
