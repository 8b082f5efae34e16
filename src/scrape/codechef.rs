use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

use super::{PageContext, Scraper, difficulty_rating, first_tags, first_text};
use crate::models::{Judge, ProblemDraft};

static PROBLEM_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"problems/([A-Z0-9_]+)").expect("valid regex"));

/// CodeChef problem pages
pub struct CodeChef;

impl Scraper for CodeChef {
    fn judge(&self) -> Judge {
        Judge::CodeChef
    }

    fn is_problem_page(&self, url: &str) -> bool {
        PROBLEM_CODE.is_match(url)
    }

    fn scrape(&self, page: &PageContext, doc: &Html) -> Result<ProblemDraft> {
        let title = first_text(doc, &[".problem-title", "h1", ".title"])?
            .ok_or_else(|| anyhow!("problem title not found"))?;

        let rating = first_text(doc, &[".difficulty-label", r#"[class*="difficulty"]"#])?
            .as_deref()
            .and_then(difficulty_rating)
            .unwrap_or_default()
            .to_string();

        let tags = first_tags(doc, &[".tags a", r#"[class*="tag"]"#], |_| true)?;

        let name = match PROBLEM_CODE.captures(&page.url) {
            Some(caps) => format!("{} - {}", &caps[1], title),
            None => title,
        };

        Ok(ProblemDraft {
            name,
            url: page.url.clone(),
            judge: Some(Judge::CodeChef),
            rating,
            tags,
            ..ProblemDraft::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.codechef.com/problems/FLOW001";

    #[test]
    fn extracts_code_difficulty_and_tags() {
        let page = r#"
            <h1 class="problem-title">Add Two Numbers</h1>
            <span class="difficulty-label">Easy</span>
            <div class="tags"><a>Math</a><a>Basic</a></div>"#;
        let draft = CodeChef.extract(&PageContext::from_html(URL, page));
        assert_eq!(draft.name, "FLOW001 - Add Two Numbers");
        assert_eq!(draft.rating, "1200");
        assert_eq!(draft.tags, vec!["math", "basic"]);
    }

    #[test]
    fn loose_tag_selector_is_used_when_tag_block_missing() {
        let page = r#"
            <h1>Chef and Strings</h1>
            <div class="_difficulty_box">Medium</div>
            <span class="_tag_chip">Strings</span>"#;
        let draft = CodeChef.extract(&PageContext::from_html(URL, page));
        assert_eq!(draft.name, "FLOW001 - Chef and Strings");
        assert_eq!(draft.rating, "1600");
        assert_eq!(draft.tags, vec!["strings"]);
    }

    #[test]
    fn missing_title_degrades() {
        let page = "<html><head><title>Add Two Numbers - CodeChef</title></head></html>";
        let draft = CodeChef.extract(&PageContext::from_html(URL, page));
        assert_eq!(draft.name, "Add Two Numbers");
        assert_eq!(draft.judge, Some(Judge::CodeChef));
        assert!(draft.tags.is_empty());
    }
}
