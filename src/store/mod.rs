//! Persistence boundary: a repository-style trait over the durable storage
//! for templates, the problem bank, seen-records, and generated stories.
//!
//! The engine only ever talks to `dyn Store`. The in-process implementation
//! lives in `memory`; a relational implementation would slot in behind the
//! same trait.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::{
  NewProblem, NewStory, NewTemplate, ProblemEntry, ProblemKey, StoryBundle, StorySummary,
  TemplateKey, TemplateWithStages,
};
use crate::error::StoreError;

pub mod memory;

pub use memory::MemoryStore;

#[async_trait]
pub trait Store: Send + Sync {
  /// Exact-fingerprint template lookup, stages loaded in stage order.
  async fn fetch_template(&self, key: &TemplateKey) -> Result<Option<TemplateWithStages>, StoreError>;

  /// Insert a template plus its stages. Fails with `StoreError::Conflict`
  /// when a template with the same fingerprint already exists; callers are
  /// expected to re-fetch the winning row.
  async fn insert_template(&self, tpl: NewTemplate) -> Result<TemplateWithStages, StoreError>;

  /// Problem-bank entries matching the fingerprint, minus the exclusion set.
  async fn fetch_available_problems(
    &self,
    key: &ProblemKey,
    exclude: &HashSet<String>,
  ) -> Result<Vec<ProblemEntry>, StoreError>;

  /// Append entries to the bank directly (seeding, migrations). During a
  /// generation request, new entries ride along in `insert_story` instead.
  async fn insert_problems(&self, batch: Vec<NewProblem>) -> Result<Vec<ProblemEntry>, StoreError>;

  /// Ids of every problem this consumer has already been served.
  async fn fetch_seen_ids(&self, consumer_id: &str) -> Result<HashSet<String>, StoreError>;

  /// Persist a story with its kid snapshots, rendered assignments, the
  /// request's newly generated bank entries, and the seen-records derived
  /// from the assignments, all as one atomic unit. A seen-record can never
  /// outlive a failed commit.
  async fn insert_story(&self, story: NewStory) -> Result<StoryBundle, StoreError>;

  /// Consumer-scoped story fetch. `None` when absent or owned by another
  /// consumer.
  async fn fetch_story(&self, consumer_id: &str, story_id: &str) -> Result<Option<StoryBundle>, StoreError>;

  /// The consumer's story history, newest first.
  async fn list_stories(&self, consumer_id: &str) -> Result<Vec<StorySummary>, StoreError>;

  /// Delete a story and everything it owns. Returns false when absent or
  /// owned by another consumer. Seen-records survive: deleting a story must
  /// not resurface its problems for this consumer.
  async fn delete_story(&self, consumer_id: &str, story_id: &str) -> Result<bool, StoreError>;
}
