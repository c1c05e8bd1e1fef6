//! In-memory store implementation.
//!
//! This module owns:
//!   - template maps (by fingerprint and by id)
//!   - the problem bank (by id)
//!   - per-consumer seen-records
//!   - stored stories with their owned snapshots and assignments
//!
//! Writes that must be atomic (story + snapshots + assignments + seen) take
//! all the locks they need before mutating anything.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{
  NewProblem, NewStory, NewTemplate, ProblemEntry, ProblemKey, StageRecord, StoryBundle,
  StoryKidRecord, StoryProblemRecord, StoryRecord, StorySummary, TemplateKey, TemplateRecord,
  TemplateWithStages,
};
use crate::error::StoreError;
use crate::store::Store;

#[derive(Clone, Debug)]
struct StoredStory {
  story: StoryRecord,
  kids: Vec<StoryKidRecord>,
  problems: Vec<StoryProblemRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  template_ids: Arc<RwLock<HashMap<TemplateKey, String>>>,
  templates: Arc<RwLock<HashMap<String, TemplateWithStages>>>,
  problems: Arc<RwLock<HashMap<String, ProblemEntry>>>,
  seen: Arc<RwLock<HashMap<String, HashSet<String>>>>,
  stories: Arc<RwLock<HashMap<String, StoredStory>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn fetch_template(&self, key: &TemplateKey) -> Result<Option<TemplateWithStages>, StoreError> {
    let ids = self.template_ids.read().await;
    let Some(id) = ids.get(key) else { return Ok(None) };
    let templates = self.templates.read().await;
    Ok(templates.get(id).cloned())
  }

  #[instrument(level = "debug", skip(self, tpl), fields(theme = %tpl.key.theme, stages = tpl.stage_contents.len()))]
  async fn insert_template(&self, tpl: NewTemplate) -> Result<TemplateWithStages, StoreError> {
    let mut ids = self.template_ids.write().await;
    if ids.contains_key(&tpl.key) {
      return Err(StoreError::Conflict(format!(
        "template already exists for theme '{}', role '{}'",
        tpl.key.theme, tpl.key.role
      )));
    }

    let id = Uuid::new_v4().to_string();
    let record = TemplateRecord {
      id: id.clone(),
      theme: tpl.key.theme.clone(),
      role: tpl.key.role.clone(),
      mode: tpl.key.mode,
      stage_count: tpl.key.stage_count,
      raw_narrative: tpl.raw_narrative,
      created_at: Utc::now(),
    };
    let stages = tpl
      .stage_contents
      .into_iter()
      .enumerate()
      .map(|(i, content)| StageRecord { stage_number: i as u32 + 1, content })
      .collect();
    let with_stages = TemplateWithStages { template: record, stages };

    ids.insert(tpl.key, id.clone());
    self.templates.write().await.insert(id, with_stages.clone());
    Ok(with_stages)
  }

  async fn fetch_available_problems(
    &self,
    key: &ProblemKey,
    exclude: &HashSet<String>,
  ) -> Result<Vec<ProblemEntry>, StoreError> {
    let problems = self.problems.read().await;
    let mut out: Vec<ProblemEntry> = problems
      .values()
      .filter(|p| {
        p.subject == key.subject
          && p.grade == key.grade
          && p.difficulty_level == key.difficulty_level
          && !exclude.contains(&p.id)
      })
      .cloned()
      .collect();
    // HashMap iteration order is arbitrary; keep query results stable.
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
  }

  #[instrument(level = "debug", skip(self, batch), fields(count = batch.len()))]
  async fn insert_problems(&self, batch: Vec<NewProblem>) -> Result<Vec<ProblemEntry>, StoreError> {
    let mut problems = self.problems.write().await;
    let mut inserted = Vec::with_capacity(batch.len());
    for p in batch {
      let entry = ProblemEntry {
        id: Uuid::new_v4().to_string(),
        subject: p.key.subject,
        grade: p.key.grade,
        difficulty_level: p.key.difficulty_level,
        problem_text: p.problem_text,
        solution: p.solution,
        created_at: Utc::now(),
      };
      problems.insert(entry.id.clone(), entry.clone());
      inserted.push(entry);
    }
    Ok(inserted)
  }

  async fn fetch_seen_ids(&self, consumer_id: &str) -> Result<HashSet<String>, StoreError> {
    let seen = self.seen.read().await;
    Ok(seen.get(consumer_id).cloned().unwrap_or_default())
  }

  #[instrument(level = "debug", skip(self, story), fields(consumer = %story.consumer_id, assignments = story.problems.len(), new_problems = story.new_problems.len()))]
  async fn insert_story(&self, story: NewStory) -> Result<StoryBundle, StoreError> {
    // Take every write lock up front so the story, its new bank entries,
    // and its seen-records land together or not at all.
    let mut stories = self.stories.write().await;
    let mut seen = self.seen.write().await;
    let mut problems = self.problems.write().await;

    let template = {
      let templates = self.templates.read().await;
      templates
        .get(&story.template_id)
        .cloned()
        .ok_or_else(|| StoreError::Internal(format!("unknown template id {}", story.template_id)))?
    };

    let record = StoryRecord {
      id: Uuid::new_v4().to_string(),
      consumer_id: story.consumer_id.clone(),
      template_id: story.template_id,
      title: story.title,
      subject: story.subject,
      created_at: Utc::now(),
    };
    let kids: Vec<StoryKidRecord> = story
      .kids
      .into_iter()
      .map(|k| StoryKidRecord {
        id: Uuid::new_v4().to_string(),
        name: k.name,
        grade: k.grade,
        difficulty_level: k.difficulty_level,
        alias: k.alias,
      })
      .collect();

    for entry in &story.new_problems {
      problems.insert(entry.id.clone(), entry.clone());
    }

    let consumer_seen = seen.entry(record.consumer_id.clone()).or_default();
    for p in &story.problems {
      consumer_seen.insert(p.problem_id.clone());
    }

    let stored = StoredStory { story: record.clone(), kids: kids.clone(), problems: story.problems.clone() };
    stories.insert(record.id.clone(), stored);
    info!(target: "story", id = %record.id, consumer = %record.consumer_id, "Story persisted");

    Ok(StoryBundle { story: record, template, kids, problems: story.problems })
  }

  async fn fetch_story(&self, consumer_id: &str, story_id: &str) -> Result<Option<StoryBundle>, StoreError> {
    let stories = self.stories.read().await;
    let Some(stored) = stories.get(story_id) else { return Ok(None) };
    if stored.story.consumer_id != consumer_id {
      return Ok(None);
    }
    let templates = self.templates.read().await;
    let template = templates
      .get(&stored.story.template_id)
      .cloned()
      .ok_or_else(|| StoreError::Internal(format!("unknown template id {}", stored.story.template_id)))?;
    Ok(Some(StoryBundle {
      story: stored.story.clone(),
      template,
      kids: stored.kids.clone(),
      problems: stored.problems.clone(),
    }))
  }

  async fn list_stories(&self, consumer_id: &str) -> Result<Vec<StorySummary>, StoreError> {
    let stories = self.stories.read().await;
    let templates = self.templates.read().await;
    let mut out: Vec<StorySummary> = stories
      .values()
      .filter(|s| s.story.consumer_id == consumer_id)
      .map(|s| {
        let (mode, stage_count) = templates
          .get(&s.story.template_id)
          .map(|t| (t.template.mode, t.template.stage_count))
          .unwrap_or((crate::domain::StoryMode::Story, 0));
        StorySummary {
          id: s.story.id.clone(),
          title: s.story.title.clone(),
          subject: s.story.subject,
          mode,
          stage_count,
          kid_names: s.kids.iter().map(|k| k.name.clone()).collect(),
          created_at: s.story.created_at,
        }
      })
      .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(out)
  }

  async fn delete_story(&self, consumer_id: &str, story_id: &str) -> Result<bool, StoreError> {
    let mut stories = self.stories.write().await;
    match stories.get(story_id) {
      Some(stored) if stored.story.consumer_id == consumer_id => {
        stories.remove(story_id);
        Ok(true)
      }
      _ => Ok(false),
    }
  }
}
