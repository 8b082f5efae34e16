//! Per-judge problem page scrapers
//!
//! Every adapter reads one judge's problem page and returns a best-effort
//! [`ProblemDraft`]. Each field is looked up through a cascade of
//! candidates, most specific selector first; the first candidate that
//! yields something wins and later ones are not consulted. Adapters never
//! fail: when the page cannot be read they fall back to a degraded draft
//! built from the document title and address only.

use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::{Judge, ProblemDraft};
use crate::router::judge_for_url;

mod atcoder;
mod codechef;
mod codeforces;
mod cses;
mod leetcode;
mod navigation;

pub use atcoder::AtCoder;
pub use codechef::CodeChef;
pub use codeforces::Codeforces;
pub use cses::Cses;
pub use leetcode::LeetCode;
pub use navigation::{NavigationObserver, poll_navigation};

/// What an adapter gets to see of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub url: String,
    pub title: String,
    pub html: String,
}

impl PageContext {
    pub fn new(url: impl Into<String>, title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            html: html.into(),
        }
    }

    /// Build a context from raw markup, reading the title from `<title>`
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| {
                Html::parse_document(&html)
                    .select(&sel)
                    .next()
                    .map(element_text)
            })
            .unwrap_or_default();
        Self {
            url: url.into(),
            title,
            html,
        }
    }
}

/// A judge-specific extractor
pub trait Scraper: Send + Sync {
    fn judge(&self) -> Judge;

    /// Whether `url` points at a single problem
    fn is_problem_page(&self, url: &str) -> bool;

    /// Client-side routed sites change address without a page load
    fn follows_navigation(&self) -> bool {
        false
    }

    /// Page title with the site decoration removed
    fn clean_title(&self, title: &str) -> String {
        let suffix = format!(" - {}", self.judge());
        title.trim().trim_end_matches(&suffix).trim().to_string()
    }

    /// Structured extraction; an error means the page could not be read
    fn scrape(&self, page: &PageContext, doc: &Html) -> Result<ProblemDraft>;

    /// Never fails: degrades to title and address on any scrape error
    fn extract(&self, page: &PageContext) -> ProblemDraft {
        let doc = Html::parse_document(&page.html);
        match self.scrape(page, &doc) {
            Ok(draft) => draft,
            Err(err) => {
                tracing::warn!(
                    judge = %self.judge(),
                    url = %page.url,
                    error = %err,
                    "Extraction failed, using degraded draft"
                );
                self.degraded(page)
            }
        }
    }

    fn degraded(&self, page: &PageContext) -> ProblemDraft {
        ProblemDraft {
            name: self.clean_title(&page.title),
            ..ProblemDraft::degraded(page.url.clone(), Some(self.judge()))
        }
    }
}

/// Judge to adapter lookup table
pub struct ScraperRegistry {
    scrapers: Vec<Box<dyn Scraper>>,
}

impl Default for ScraperRegistry {
    fn default() -> Self {
        Self {
            scrapers: vec![
                Box::new(Codeforces),
                Box::new(LeetCode),
                Box::new(AtCoder),
                Box::new(CodeChef),
                Box::new(Cses),
            ],
        }
    }
}

impl ScraperRegistry {
    pub fn get(&self, judge: Judge) -> Option<&dyn Scraper> {
        self.scrapers
            .iter()
            .find(|s| s.judge() == judge)
            .map(|s| s.as_ref())
    }

    /// Adapter responsible for the page at `url`
    pub fn for_url(&self, url: &str) -> Option<&dyn Scraper> {
        judge_for_url(url).and_then(|judge| self.get(judge))
    }

    /// Run the matching adapter; `None` when no adapter serves the page
    pub fn extract(&self, page: &PageContext) -> Option<ProblemDraft> {
        self.for_url(&page.url).map(|scraper| scraper.extract(page))
    }
}

// ---- cascade helpers shared by the adapters ----

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {}", css, e))
}

/// Element text with whitespace runs collapsed
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Texts of every element matching `css`, empty ones dropped
pub(crate) fn texts(doc: &Html, css: &str) -> Result<Vec<String>> {
    let sel = selector(css)?;
    Ok(doc
        .select(&sel)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect())
}

/// Text of the first element of the first candidate that has one
pub(crate) fn first_text(doc: &Html, candidates: &[&str]) -> Result<Option<String>> {
    for css in candidates {
        let sel = selector(css)?;
        if let Some(text) = doc.select(&sel).next().map(element_text)
            && !text.is_empty()
        {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// Lowercased texts from the first candidate that yields any accepted entry
pub(crate) fn first_tags(
    doc: &Html,
    candidates: &[&str],
    accept: impl Fn(&str) -> bool,
) -> Result<Vec<String>> {
    for css in candidates {
        let tags: Vec<String> = texts(doc, css)?
            .into_iter()
            .map(|t| t.to_lowercase())
            .filter(|t| accept(t))
            .collect();
        if !tags.is_empty() {
            return Ok(tags);
        }
    }
    Ok(Vec::new())
}

/// First capture group of `re` in the first text that matches
pub(crate) fn first_capture<I>(texts: I, re: &Regex) -> Option<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    texts.into_iter().find_map(|text| {
        re.captures(text.as_ref())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Synthetic rating for an easy/medium/hard label
pub(crate) fn difficulty_rating(label: &str) -> Option<&'static str> {
    let label = label.to_lowercase();
    if label.contains("easy") {
        Some("1200")
    } else if label.contains("medium") {
        Some("1600")
    } else if label.contains("hard") {
        Some("2000")
    } else {
        None
    }
}
