//! Problem store: the single owner of tracker state
//!
//! Every mutation is applied in memory first and then mirrored to the
//! storage backend, writing exactly the collections it touched. Rejected
//! mutations (validation failures, unknown ids or names) change nothing,
//! write nothing and report `Ok(false)`.
//!
//! Observers subscribe to [`StoreEvent`]s instead of being called from the
//! mutation path.

use chrono::Utc;
use std::collections::BTreeSet;
use tokio::sync::broadcast;

use crate::db::Storage;
use crate::filter::{FilterQuery, View, ViewMode, filter_problems};
use crate::models::{
    COMMON_TAGS, DEFAULT_LIST, Judge, PartialState, Problem, ProblemDraft, ProblemPatch, Profiles,
    Snapshot, StorageKey,
};
use crate::router::Extraction;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The only failure surfaced to the user; state is left untouched
    #[error("invalid file format: {0}")]
    InvalidImport(#[from] serde_json::Error),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Storage(err.into())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Change notification for whoever renders the state
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Persisted collections that changed
    StateChanged(Vec<StorageKey>),
    ActiveListChanged(String),
    DraftChanged,
}

/// Collection totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub solved: usize,
    pub todo: usize,
    /// Problem count per list, in list order
    pub per_list: Vec<(String, usize)>,
}

pub struct ProblemStore<S> {
    storage: S,
    problems: Vec<Problem>,
    lists: Vec<String>,
    todo_list: Vec<u64>,
    profiles: Profiles,
    active_list: String,
    draft: ProblemDraft,
    last_id: u64,
    events: broadcast::Sender<StoreEvent>,
}

impl<S: Storage> ProblemStore<S> {
    /// Load persisted state; missing keys start empty
    pub fn load(storage: S) -> Result<Self> {
        let persisted = storage.get(&StorageKey::ALL)?;
        let (events, _) = broadcast::channel(64);

        let mut store = Self {
            storage,
            problems: persisted.problems.unwrap_or_default(),
            lists: persisted.lists.unwrap_or_default(),
            todo_list: persisted.todo_list.unwrap_or_default(),
            profiles: persisted.profiles.unwrap_or_default(),
            active_list: DEFAULT_LIST.to_string(),
            draft: ProblemDraft::default(),
            last_id: 0,
            events,
        };
        store.reconcile(&StorageKey::ALL);

        tracing::info!(
            problems = store.problems.len(),
            lists = store.lists.len(),
            todo = store.todo_list.len(),
            "Store loaded"
        );
        Ok(store)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn problem(&self, id: u64) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    pub fn lists(&self) -> &[String] {
        &self.lists
    }

    pub fn todo_list(&self) -> &[u64] {
        &self.todo_list
    }

    pub fn is_todo(&self, id: u64) -> bool {
        self.todo_list.contains(&id)
    }

    pub fn profiles(&self) -> &Profiles {
        &self.profiles
    }

    pub fn profile(&self, judge: Judge) -> Option<&str> {
        self.profiles
            .get(judge.as_str())
            .map(String::as_str)
            .filter(|h| !h.trim().is_empty())
    }

    pub fn active_list(&self) -> &str {
        &self.active_list
    }

    pub fn draft(&self) -> &ProblemDraft {
        &self.draft
    }

    fn has_list(&self, name: &str) -> bool {
        self.lists.iter().any(|l| l == name)
    }

    // ---- draft ----

    pub fn set_draft(&mut self, draft: ProblemDraft) {
        self.draft = draft;
        self.notify(StoreEvent::DraftChanged);
    }

    /// Merge an extraction result into the draft
    ///
    /// A real extraction replaces the scraped fields and targets the active
    /// list; a fallback only carries over address and judge.
    pub fn seed_draft(&mut self, extraction: Extraction) {
        match extraction {
            Extraction::Extracted(found) => {
                self.draft.name = found.name;
                self.draft.url = found.url;
                self.draft.judge = found.judge;
                self.draft.rating = found.rating;
                self.draft.tags = found.tags;
                self.draft.list = self.active_list.clone();
            }
            Extraction::Fallback(found) => {
                self.draft.url = found.url;
                self.draft.judge = found.judge;
            }
        }
        self.notify(StoreEvent::DraftChanged);
    }

    // ---- problems ----

    /// Add a problem; `None` when name or url is empty
    pub fn add_problem(&mut self, draft: ProblemDraft) -> Result<Option<u64>> {
        if !draft.is_complete() {
            tracing::debug!("Rejected problem with empty name or url");
            return Ok(None);
        }

        let list = if self.has_list(&draft.list) {
            draft.list
        } else {
            tracing::debug!(list = %draft.list, "Unknown list, adding to default list");
            DEFAULT_LIST.to_string()
        };

        let id = self.next_id();
        self.problems.push(Problem {
            id,
            name: draft.name,
            url: draft.url,
            judge: draft.judge,
            rating: draft.rating,
            tags: draft.tags,
            notes: draft.notes,
            list,
            solved: draft.solved,
            added_date: Utc::now().to_rfc3339(),
        });
        self.draft = ProblemDraft::for_list(self.active_list.clone());

        self.persist(&[StorageKey::Problems])?;
        self.notify(StoreEvent::DraftChanged);
        Ok(Some(id))
    }

    /// Add the current draft
    pub fn submit_draft(&mut self) -> Result<Option<u64>> {
        let draft = self.draft.clone();
        self.add_problem(draft)
    }

    /// Merge `patch` into problem `id`
    ///
    /// Unknown ids are ignored. Blank names or urls and unknown lists are
    /// rejected as a whole.
    pub fn update_problem(&mut self, id: u64, patch: ProblemPatch) -> Result<bool> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&patch.name) || blank(&patch.url) {
            tracing::debug!(id, "Rejected update blanking name or url");
            return Ok(false);
        }
        if let Some(list) = &patch.list
            && !self.has_list(list)
        {
            tracing::debug!(id, list = %list, "Rejected update to unknown list");
            return Ok(false);
        }

        let Some(problem) = self.problems.iter_mut().find(|p| p.id == id) else {
            tracing::debug!(id, "Update for unknown problem ignored");
            return Ok(false);
        };
        patch.apply_to(problem);

        self.persist(&[StorageKey::Problems])?;
        Ok(true)
    }

    pub fn toggle_solved(&mut self, id: u64) -> Result<bool> {
        let Some(solved) = self.problem(id).map(|p| !p.solved) else {
            return Ok(false);
        };
        self.update_problem(id, ProblemPatch::solved(solved))
    }

    /// Remove a problem together with its todo membership
    pub fn delete_problem(&mut self, id: u64) -> Result<bool> {
        let before = (self.problems.len(), self.todo_list.len());
        self.problems.retain(|p| p.id != id);
        self.todo_list.retain(|t| *t != id);

        if before == (self.problems.len(), self.todo_list.len()) {
            tracing::debug!(id, "Delete for unknown problem ignored");
            return Ok(false);
        }

        self.persist(&[StorageKey::Problems, StorageKey::TodoList])?;
        Ok(true)
    }

    // ---- todo ----

    pub fn add_to_todo(&mut self, id: u64) -> Result<bool> {
        if self.is_todo(id) || self.problem(id).is_none() {
            return Ok(false);
        }
        self.todo_list.push(id);
        self.persist(&[StorageKey::TodoList])?;
        Ok(true)
    }

    pub fn remove_from_todo(&mut self, id: u64) -> Result<bool> {
        if !self.is_todo(id) {
            return Ok(false);
        }
        self.todo_list.retain(|t| *t != id);
        self.persist(&[StorageKey::TodoList])?;
        Ok(true)
    }

    // ---- lists ----

    pub fn create_list(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() || self.has_list(name) {
            tracing::debug!(list = %name, "Rejected list name");
            return Ok(false);
        }
        self.lists.push(name.to_string());
        self.persist(&[StorageKey::Lists])?;
        Ok(true)
    }

    /// Delete a list, moving its problems to the default list
    pub fn delete_list(&mut self, name: &str) -> Result<bool> {
        if name == DEFAULT_LIST || !self.has_list(name) {
            tracing::debug!(list = %name, "List deletion refused");
            return Ok(false);
        }

        self.lists.retain(|l| l != name);
        for problem in self.problems.iter_mut().filter(|p| p.list == name) {
            problem.list = DEFAULT_LIST.to_string();
        }
        if self.draft.list == name {
            self.draft.list = DEFAULT_LIST.to_string();
        }
        let switched = self.active_list == name;
        if switched {
            self.active_list = DEFAULT_LIST.to_string();
        }

        self.persist(&[StorageKey::Lists, StorageKey::Problems])?;
        if switched {
            self.notify(StoreEvent::ActiveListChanged(self.active_list.clone()));
        }
        Ok(true)
    }

    pub fn set_active_list(&mut self, name: &str) -> bool {
        if !self.has_list(name) || self.active_list == name {
            return false;
        }
        self.active_list = name.to_string();
        self.notify(StoreEvent::ActiveListChanged(self.active_list.clone()));
        true
    }

    // ---- profiles ----

    pub fn set_profile(&mut self, judge: Judge, handle: &str) -> Result<()> {
        self.profiles
            .insert(judge.as_str().to_string(), handle.to_string());
        self.persist(&[StorageKey::Profiles])
    }

    // ---- snapshots ----

    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot {
            problems: self.problems.clone(),
            lists: self.lists.clone(),
            todo_list: self.todo_list.clone(),
            profiles: self.profiles.clone(),
        }
    }

    /// Pretty-printed export document
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_snapshot())?)
    }

    /// Replace the collections present in `data`, keep the rest
    pub fn import_snapshot(&mut self, data: PartialState) -> Result<Vec<StorageKey>> {
        if data.is_empty() {
            tracing::info!("Import file has no known collections, nothing to do");
            return Ok(Vec::new());
        }
        let imported = data.keys();
        if let Some(problems) = data.problems {
            self.problems = problems;
        }
        if let Some(lists) = data.lists {
            self.lists = lists;
        }
        if let Some(todo) = data.todo_list {
            self.todo_list = todo;
        }
        if let Some(profiles) = data.profiles {
            self.profiles = profiles;
        }
        self.reconcile(&imported);
        if !self.has_list(&self.active_list) {
            self.active_list = DEFAULT_LIST.to_string();
        }

        self.persist(&StorageKey::ALL)?;
        tracing::info!(keys = ?imported, problems = self.problems.len(), "Import applied");
        Ok(imported)
    }

    /// Parse and import an export document; malformed input changes nothing
    pub fn import_json(&mut self, json: &str) -> Result<Vec<StorageKey>> {
        let data: PartialState = serde_json::from_str(json)?;
        self.import_snapshot(data)
    }

    // ---- queries ----

    /// Problems visible under `query`, from the active list or the todo set
    pub fn visible(&self, mode: ViewMode, query: &FilterQuery) -> Vec<&Problem> {
        let view = View {
            mode,
            active_list: &self.active_list,
            todo: &self.todo_list,
        };
        filter_problems(&self.problems, &view, query)
    }

    pub fn stats(&self) -> Stats {
        let per_list = self
            .lists
            .iter()
            .map(|list| {
                let count = self.problems.iter().filter(|p| &p.list == list).count();
                (list.clone(), count)
            })
            .collect();

        Stats {
            total: self.problems.len(),
            solved: self.problems.iter().filter(|p| p.solved).count(),
            todo: self.todo_list.len(),
            per_list,
        }
    }

    /// Common tags followed by any other tag in use, alphabetically
    pub fn tag_vocabulary(&self) -> Vec<String> {
        let mut tags: Vec<String> = COMMON_TAGS.iter().map(|t| t.to_string()).collect();
        let extra: BTreeSet<&str> = self
            .problems
            .iter()
            .flat_map(|p| p.tags.iter().map(String::as_str))
            .filter(|t| !COMMON_TAGS.contains(t))
            .collect();
        tags.extend(extra.into_iter().map(str::to_string));
        tags
    }

    // ---- internals ----

    /// Restore cross-collection invariants for the collections in `keys`
    ///
    /// Collections outside `keys` are left as they are, except that the
    /// default list always exists.
    fn reconcile(&mut self, keys: &[StorageKey]) {
        if !self.has_list(DEFAULT_LIST) {
            self.lists.insert(0, DEFAULT_LIST.to_string());
        }

        if keys.contains(&StorageKey::Problems) {
            let lists = &self.lists;
            let mut moved = 0usize;
            for problem in self.problems.iter_mut() {
                if !lists.contains(&problem.list) {
                    problem.list = DEFAULT_LIST.to_string();
                    moved += 1;
                }
            }
            if moved > 0 {
                tracing::info!(moved, "Moved problems from unknown lists to the default list");
            }
        }

        if keys.contains(&StorageKey::TodoList) {
            let problems = &self.problems;
            let mut seen = BTreeSet::new();
            self.todo_list
                .retain(|id| problems.iter().any(|p| p.id == *id) && seen.insert(*id));
        }

        self.last_id = self.last_id.max(self.problems.iter().map(|p| p.id).max().unwrap_or(0));
    }

    /// Millisecond timestamp, bumped past the newest id on collision
    ///
    /// Once the newest id is `u64::MAX` the lowest unused id is taken.
    fn next_id(&mut self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        match self.last_id.checked_add(1) {
            Some(next) => {
                let id = now.max(next);
                self.last_id = id;
                id
            }
            None => {
                let used: BTreeSet<u64> = self.problems.iter().map(|p| p.id).collect();
                (1..).find(|id| !used.contains(id)).unwrap_or_default()
            }
        }
    }

    fn persist(&self, keys: &[StorageKey]) -> Result<()> {
        let mut partial = PartialState::default();
        for key in keys {
            match key {
                StorageKey::Problems => partial.problems = Some(self.problems.clone()),
                StorageKey::Lists => partial.lists = Some(self.lists.clone()),
                StorageKey::TodoList => partial.todo_list = Some(self.todo_list.clone()),
                StorageKey::Profiles => partial.profiles = Some(self.profiles.clone()),
            }
        }
        self.storage.set(&partial)?;
        self.notify(StoreEvent::StateChanged(keys.to_vec()));
        Ok(())
    }

    fn notify(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
