use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

use super::{PageContext, Scraper, first_text};
use crate::models::{Judge, ProblemDraft};

static TASK_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"contests/([^/]+)/tasks/([^/?#]+)").expect("valid regex"));

/// Contest prefix to synthetic rating; AtCoder publishes no per-task rating
const CONTEST_RATINGS: &[(&str, &str)] = &[("abc", "1200"), ("arc", "1800"), ("agc", "2400")];

/// Title keyword to tag; structured tags are not available on task pages
const TITLE_TAGS: &[(&str, &str)] = &[("graph", "graph"), ("tree", "trees"), ("dp", "dp")];

/// AtCoder task pages
pub struct AtCoder;

impl Scraper for AtCoder {
    fn judge(&self) -> Judge {
        Judge::AtCoder
    }

    fn is_problem_page(&self, url: &str) -> bool {
        TASK_URL.is_match(url)
    }

    fn clean_title(&self, title: &str) -> String {
        title.trim().to_string()
    }

    fn scrape(&self, page: &PageContext, doc: &Html) -> Result<ProblemDraft> {
        let title = first_text(doc, &["span.h2", ".h2"])?
            .ok_or_else(|| anyhow!("task title not found"))?;
        // The heading also holds the editorial link text
        let title = title.trim_end_matches("Editorial").trim().to_string();

        let task = TASK_URL
            .captures(&page.url)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()));

        let rating = task
            .as_ref()
            .and_then(|(contest, _)| {
                CONTEST_RATINGS
                    .iter()
                    .find(|(prefix, _)| contest.contains(prefix))
                    .map(|(_, rating)| rating.to_string())
            })
            .unwrap_or_default();

        let lowered = title.to_lowercase();
        let tags = TITLE_TAGS
            .iter()
            .filter(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, tag)| tag.to_string())
            .collect();

        let name = match &task {
            Some((contest, task_id)) => {
                let label = task_id.rsplit('_').next().unwrap_or(task_id);
                format!("{} {} - {}", contest.to_uppercase(), label.to_uppercase(), title)
            }
            None => title,
        };

        Ok(ProblemDraft {
            name,
            url: page.url.clone(),
            judge: Some(Judge::AtCoder),
            rating,
            tags,
            ..ProblemDraft::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_label_rating_and_title_tags() {
        let url = "https://atcoder.jp/contests/abc300/tasks/abc300_d";
        let page = r#"
            <html><head><title>D - AABCC</title></head><body>
              <span class="h2">D - Tree DP on Graph <a class="btn">Editorial</a></span>
            </body></html>"#;
        let draft = AtCoder.extract(&PageContext::from_html(url, page));
        assert_eq!(draft.name, "ABC300 D - D - Tree DP on Graph");
        assert_eq!(draft.rating, "1200");
        assert_eq!(draft.tags, vec!["graph", "trees", "dp"]);
        assert_eq!(draft.judge, Some(Judge::AtCoder));
    }

    #[test]
    fn unknown_contest_kind_has_no_rating() {
        let url = "https://atcoder.jp/contests/typical90/tasks/typical90_a";
        let page = r#"<span class="h2">A - Yokan Party</span>"#;
        let draft = AtCoder.extract(&PageContext::from_html(url, page));
        assert_eq!(draft.name, "TYPICAL90 A - A - Yokan Party");
        assert!(draft.rating.is_empty());
        assert!(draft.tags.is_empty());
    }

    #[test]
    fn agc_and_arc_prefixes() {
        let page = r#"<span class="h2">B - Sum</span>"#;
        let arc = AtCoder.extract(&PageContext::from_html(
            "https://atcoder.jp/contests/arc150/tasks/arc150_b",
            page,
        ));
        assert_eq!(arc.rating, "1800");
        let agc = AtCoder.extract(&PageContext::from_html(
            "https://atcoder.jp/contests/agc060/tasks/agc060_b",
            page,
        ));
        assert_eq!(agc.rating, "2400");
    }

    #[test]
    fn missing_heading_degrades_to_full_title() {
        let url = "https://atcoder.jp/contests/abc300/tasks/abc300_d";
        let page = "<html><head><title>D - AABCC</title></head><body></body></html>";
        let draft = AtCoder.extract(&PageContext::from_html(url, page));
        assert_eq!(draft.name, "D - AABCC");
        assert!(draft.rating.is_empty());
    }
}
