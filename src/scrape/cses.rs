use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

use super::{PageContext, Scraper, first_tags, first_text};
use crate::models::{Judge, ProblemDraft};

static TASK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"task/(\d+)").expect("valid regex"));

/// CSES publishes no ratings
const DEFAULT_RATING: &str = "1500";

/// Navigation entries that are not problem categories
const NON_TOPIC_LINKS: &[&str] = &["cses", "problem set"];

/// CSES problem set tasks
pub struct Cses;

impl Scraper for Cses {
    fn judge(&self) -> Judge {
        Judge::Cses
    }

    fn is_problem_page(&self, url: &str) -> bool {
        url.contains("problemset/task/") && TASK_ID.is_match(url)
    }

    fn clean_title(&self, title: &str) -> String {
        let title = title.trim();
        title
            .strip_prefix("CSES - ")
            .or_else(|| title.strip_suffix(" - CSES"))
            .unwrap_or(title)
            .trim()
            .to_string()
    }

    fn scrape(&self, page: &PageContext, doc: &Html) -> Result<ProblemDraft> {
        let title = first_text(doc, &[".title-block h1", "h1"])?
            .ok_or_else(|| anyhow!("task title not found"))?;

        let tags = first_tags(doc, &[".nav-link"], |t| !NON_TOPIC_LINKS.contains(&t))?;

        let name = match TASK_ID.captures(&page.url) {
            Some(caps) => format!("CSES {} - {}", &caps[1], title),
            None => title,
        };

        Ok(ProblemDraft {
            name,
            url: page.url.clone(),
            judge: Some(Judge::Cses),
            rating: DEFAULT_RATING.to_string(),
            tags,
            ..ProblemDraft::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://cses.fi/problemset/task/1068";

    #[test]
    fn uses_default_rating_and_breadcrumb_topics() {
        let page = r#"
            <div class="nav"><a class="nav-link">CSES</a><a class="nav-link">Problem Set</a>
              <a class="nav-link">Introductory Problems</a></div>
            <div class="title-block"><h1>Weird Algorithm</h1></div>"#;
        let draft = Cses.extract(&PageContext::from_html(URL, page));
        assert_eq!(draft.name, "CSES 1068 - Weird Algorithm");
        assert_eq!(draft.rating, "1500");
        assert_eq!(draft.tags, vec!["introductory problems"]);
        assert_eq!(draft.judge, Some(Judge::Cses));
    }

    #[test]
    fn degraded_draft_has_no_rating() {
        let page = "<html><head><title>CSES - Weird Algorithm</title></head></html>";
        let draft = Cses.extract(&PageContext::from_html(URL, page));
        assert_eq!(draft.name, "Weird Algorithm");
        assert!(draft.rating.is_empty());
    }
}
