//! Tracker data models
//!
//! JSON field names follow the export file format (`todoList`, `addedDate`)
//! so that snapshots, storage values and export files share one shape.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the list that always exists and can never be removed
pub const DEFAULT_LIST: &str = "Default";

/// Tags offered for quick filtering regardless of what is in use
pub const COMMON_TAGS: &[&str] = &[
    "greedy",
    "dp",
    "graph",
    "binary search",
    "trees",
    "math",
    "implementation",
    "sorting",
    "strings",
    "dfs",
    "bfs",
    "two pointers",
];

/// Online judge a problem is hosted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Judge {
    Codeforces,
    LeetCode,
    AtCoder,
    CodeChef,
    #[serde(rename = "CSES")]
    Cses,
    Other,
}

impl Judge {
    pub const ALL: [Judge; 6] = [
        Judge::Codeforces,
        Judge::LeetCode,
        Judge::AtCoder,
        Judge::CodeChef,
        Judge::Cses,
        Judge::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Judge::Codeforces => "Codeforces",
            Judge::LeetCode => "LeetCode",
            Judge::AtCoder => "AtCoder",
            Judge::CodeChef => "CodeChef",
            Judge::Cses => "CSES",
            Judge::Other => "Other",
        }
    }
}

impl fmt::Display for Judge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown judge: {0}")]
pub struct UnknownJudge(pub String);

impl FromStr for Judge {
    type Err = UnknownJudge;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Judge::ALL
            .into_iter()
            .find(|judge| judge.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownJudge(trimmed.to_string()))
    }
}

/// An absent judge is stored as `""`; unrecognised names load as `Other`
mod optional_judge {
    use super::*;

    pub fn serialize<S: Serializer>(judge: &Option<Judge>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(judge.map(Judge::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Judge>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(name.parse().unwrap_or(Judge::Other)),
        })
    }
}

fn default_list() -> String {
    DEFAULT_LIST.to_string()
}

/// A tracked competitive-programming problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: u64,
    pub name: String,
    pub url: String,
    #[serde(default, with = "optional_judge")]
    pub judge: Option<Judge>,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_list")]
    pub list: String,
    #[serde(default)]
    pub solved: bool,
    #[serde(default)]
    pub added_date: String,
}

impl Problem {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A problem under construction, usually pre-filled by a scraper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, with = "optional_judge")]
    pub judge: Option<Judge>,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_list")]
    pub list: String,
    #[serde(default)]
    pub solved: bool,
}

impl Default for ProblemDraft {
    fn default() -> Self {
        Self::for_list(DEFAULT_LIST)
    }
}

impl ProblemDraft {
    /// Empty draft targeting `list`
    pub fn for_list(list: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            judge: None,
            rating: String::new(),
            tags: Vec::new(),
            notes: String::new(),
            list: list.into(),
            solved: false,
        }
    }

    /// Draft carrying only the address and judge of a page
    pub fn degraded(url: impl Into<String>, judge: Option<Judge>) -> Self {
        Self {
            url: url.into(),
            judge,
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.url.trim().is_empty()
    }
}

/// Partial update for an existing problem; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub judge: Option<Option<Judge>>,
    pub rating: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub list: Option<String>,
    pub solved: Option<bool>,
}

impl ProblemPatch {
    pub fn solved(solved: bool) -> Self {
        Self {
            solved: Some(solved),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply_to(&self, problem: &mut Problem) {
        if let Some(name) = &self.name {
            problem.name = name.clone();
        }
        if let Some(url) = &self.url {
            problem.url = url.clone();
        }
        if let Some(judge) = self.judge {
            problem.judge = judge;
        }
        if let Some(rating) = &self.rating {
            problem.rating = rating.clone();
        }
        if let Some(tags) = &self.tags {
            problem.tags = tags.clone();
        }
        if let Some(notes) = &self.notes {
            problem.notes = notes.clone();
        }
        if let Some(list) = &self.list {
            problem.list = list.clone();
        }
        if let Some(solved) = self.solved {
            problem.solved = solved;
        }
    }
}

/// Keys of the persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageKey {
    Problems,
    Lists,
    TodoList,
    Profiles,
}

impl StorageKey {
    pub const ALL: [StorageKey; 4] = [
        StorageKey::Problems,
        StorageKey::Lists,
        StorageKey::TodoList,
        StorageKey::Profiles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::Problems => "problems",
            StorageKey::Lists => "lists",
            StorageKey::TodoList => "todoList",
            StorageKey::Profiles => "profiles",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Judge name to user handle
pub type Profiles = BTreeMap<String, String>;

/// All four persisted collections; the export file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub problems: Vec<Problem>,
    pub lists: Vec<String>,
    pub todo_list: Vec<u64>,
    pub profiles: Profiles,
}

/// Any subset of the persisted collections
///
/// Used for storage reads/writes and for import payloads, where absent
/// keys mean "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problems: Option<Vec<Problem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lists: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_list: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Profiles>,
}

impl PartialState {
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Keys present in this partial state
    pub fn keys(&self) -> Vec<StorageKey> {
        let mut keys = Vec::new();
        if self.problems.is_some() {
            keys.push(StorageKey::Problems);
        }
        if self.lists.is_some() {
            keys.push(StorageKey::Lists);
        }
        if self.todo_list.is_some() {
            keys.push(StorageKey::TodoList);
        }
        if self.profiles.is_some() {
            keys.push(StorageKey::Profiles);
        }
        keys
    }
}

impl From<Snapshot> for PartialState {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            problems: Some(snapshot.problems),
            lists: Some(snapshot.lists),
            todo_list: Some(snapshot.todo_list),
            profiles: Some(snapshot.profiles),
        }
    }
}

/// Split a comma-separated tag input into normalized tags
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_json_uses_export_field_names() {
        let problem = Problem {
            id: 7,
            name: "Two Sum".into(),
            url: "https://leetcode.com/problems/two-sum/".into(),
            judge: Some(Judge::LeetCode),
            rating: "1200".into(),
            tags: vec!["dp".into()],
            notes: String::new(),
            list: DEFAULT_LIST.into(),
            solved: false,
            added_date: "2024-01-01T00:00:00Z".into(),
        };

        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["addedDate"], "2024-01-01T00:00:00Z");
        assert_eq!(json["judge"], "LeetCode");
    }

    #[test]
    fn empty_judge_loads_as_none_and_unknown_as_other() {
        let json = r#"{"id":1,"name":"A","url":"u","judge":""}"#;
        let problem: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(problem.judge, None);
        assert_eq!(problem.list, DEFAULT_LIST);

        let json = r#"{"id":1,"name":"A","url":"u","judge":"SPOJ"}"#;
        let problem: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(problem.judge, Some(Judge::Other));

        let json = r#"{"id":1,"name":"A","url":"u","judge":"CSES"}"#;
        let problem: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(problem.judge, Some(Judge::Cses));
    }

    #[test]
    fn absent_judge_serializes_as_empty_string() {
        let draft = ProblemDraft::default();
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["judge"], "");
    }

    #[test]
    fn judge_parses_case_insensitively() {
        assert_eq!("leetcode".parse::<Judge>(), Ok(Judge::LeetCode));
        assert_eq!("cses".parse::<Judge>(), Ok(Judge::Cses));
        assert!("spoj".parse::<Judge>().is_err());
    }

    #[test]
    fn partial_state_omits_absent_keys() {
        let partial = PartialState {
            lists: Some(vec![DEFAULT_LIST.into()]),
            ..Default::default()
        };
        let json = serde_json::to_string(&partial).unwrap();
        assert_eq!(json, r#"{"lists":["Default"]}"#);
        assert_eq!(partial.keys(), vec![StorageKey::Lists]);
    }

    #[test]
    fn parse_tags_trims_and_drops_empty_entries() {
        assert_eq!(
            parse_tags(" Greedy, dp,,Binary Search ,"),
            vec!["greedy", "dp", "binary search"]
        );
        assert!(parse_tags("").is_empty());
    }
}
