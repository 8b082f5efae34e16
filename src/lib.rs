//! kipit - Competitive programming problem tracker
//!
//! Keeps a collection of judge problems organized into named lists, a
//! todo queue and per-judge handles, persisted as four JSON collections.
//! Problem pages on supported judges can be scraped into a draft.

pub mod config;
pub mod db;
pub mod filter;
pub mod models;
pub mod router;
pub mod scrape;
pub mod solved;
pub mod store;
pub mod transport;

pub use db::{MemoryStorage, SqliteStorage, Storage};
pub use filter::{FilterQuery, SolvedFilter, ViewMode};
pub use models::{Judge, Problem, ProblemDraft, ProblemPatch, StorageKey};
pub use router::{Extraction, ExtractionRouter};
pub use store::{ProblemStore, StoreError, StoreEvent};
