//! Filter engine: selects the visible subset of the problem collection

use std::str::FromStr;

use crate::models::{Judge, Problem};

/// Which partition of the collection a view starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Problems of the active list
    #[default]
    ByList,
    /// Problems in the todo set, whatever their list
    Todo,
}

/// The ambient view a query runs against
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    pub mode: ViewMode,
    pub active_list: &'a str,
    pub todo: &'a [u64],
}

impl View<'_> {
    fn contains(&self, problem: &Problem) -> bool {
        match self.mode {
            ViewMode::ByList => problem.list == self.active_list,
            ViewMode::Todo => self.todo.contains(&problem.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolvedFilter {
    #[default]
    Any,
    Solved,
    Unsolved,
}

impl FromStr for SolvedFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(SolvedFilter::Any),
            "solved" => Ok(SolvedFilter::Solved),
            "unsolved" => Ok(SolvedFilter::Unsolved),
            other => Err(format!("unknown solved filter: {other}")),
        }
    }
}

/// User-selected filters; empty fields impose no constraint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterQuery {
    pub search: String,
    pub tags: Vec<String>,
    /// Compared as a literal string, not as a number or range
    pub rating: String,
    pub judge: Option<Judge>,
    pub solved: SolvedFilter,
}

impl FilterQuery {
    /// Select `tag` if unselected, unselect it otherwise
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Every clause except the view partition
    pub fn matches(&self, problem: &Problem) -> bool {
        if !self.search.is_empty()
            && !problem
                .name
                .to_lowercase()
                .contains(&self.search.to_lowercase())
        {
            return false;
        }

        if let Some(judge) = self.judge
            && problem.judge != Some(judge)
        {
            return false;
        }

        if !self.rating.is_empty() && problem.rating != self.rating {
            return false;
        }

        match self.solved {
            SolvedFilter::Solved if !problem.solved => return false,
            SolvedFilter::Unsolved if problem.solved => return false,
            _ => {}
        }

        // Any selected tag is enough
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| problem.has_tag(tag)) {
            return false;
        }

        true
    }
}

/// Problems visible in `view` under `query`, in collection order
pub fn filter_problems<'a>(
    problems: &'a [Problem],
    view: &View<'_>,
    query: &FilterQuery,
) -> Vec<&'a Problem> {
    problems
        .iter()
        .filter(|p| view.contains(p) && query.matches(p))
        .collect()
}
