use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

use super::{PageContext, Scraper, first_capture, first_tags, first_text, texts};
use crate::models::{Judge, ProblemDraft};

static INDEX_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d*\.\s*").expect("valid regex"));
static STAR_RATING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(\d+)").expect("valid regex"));
static LOOSE_STAR_RATING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(\d{3,4})\b").expect("valid regex"));
static PROBLEM_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"problemset/problem/|contest/\d+/problem/|gym/\d+/problem/").expect("valid regex")
});

/// Codeforces problem pages
///
/// The difficulty shows up as a `*1600` tag box, tags are the remaining tag
/// boxes, and the title carries an index label (`B1. `) that is dropped.
pub struct Codeforces;

impl Scraper for Codeforces {
    fn judge(&self) -> Judge {
        Judge::Codeforces
    }

    fn is_problem_page(&self, url: &str) -> bool {
        PROBLEM_PAGE.is_match(url)
    }

    fn scrape(&self, page: &PageContext, doc: &Html) -> Result<ProblemDraft> {
        let title = first_text(doc, &[".problem-statement .title", ".problem-statement .header div"])?
            .ok_or_else(|| anyhow!("problem statement title not found"))?;
        let name = INDEX_LABEL.replace(&title, "").trim().to_string();

        let rating = match first_capture(texts(doc, ".sidebar .roundbox")?, &STAR_RATING) {
            Some(rating) => Some(rating),
            None => match first_capture(texts(doc, ".header .title")?, &STAR_RATING) {
                Some(rating) => Some(rating),
                None => {
                    let body: String = doc.root_element().text().collect();
                    first_capture([body], &LOOSE_STAR_RATING)
                }
            },
        };

        let tags = first_tags(doc, &[".tag-box"], |t| !t.contains('*') && !t.contains("click"))?;

        Ok(ProblemDraft {
            name,
            url: page.url.clone(),
            judge: Some(Judge::Codeforces),
            rating: rating.unwrap_or_default(),
            tags,
            ..ProblemDraft::default()
        })
    }
}
