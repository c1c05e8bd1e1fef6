//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{KidProfile, StoryMode, StorySummary, Subject};

/// Story generation request. Kid profiles travel inline; identity and
/// profile management live outside this service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoryIn {
  pub consumer_id: String,
  pub subject: Subject,
  pub mode: StoryMode,
  pub role: String,
  pub theme: String,
  pub questions_per_kid: u32,
  pub kids: Vec<KidProfile>,
  #[serde(default)]
  pub country: Option<String>,
  #[serde(default)]
  pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemOut {
  pub kid_alias: String,
  pub kid_name: String,
  pub text: String,
  pub solution: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOut {
  pub stage_number: u32,
  pub content: String,
  pub problems: Vec<ProblemOut>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryKidOut {
  pub id: String,
  pub name: String,
  pub grade: String,
  pub difficulty_level: u8,
  pub alias: String,
}

/// Full delivered story: rendered stages in order plus the kid snapshots
/// captured at generation time.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryOut {
  pub id: String,
  pub title: String,
  pub subject: Subject,
  pub mode: StoryMode,
  pub role: String,
  pub theme: String,
  pub kids: Vec<StoryKidOut>,
  pub stages: Vec<StageOut>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryListItemOut {
  pub id: String,
  pub title: String,
  pub subject: Subject,
  pub mode: StoryMode,
  pub num_stages: u32,
  pub num_kids: usize,
  pub kid_names: Vec<String>,
  pub created_at: DateTime<Utc>,
}

impl From<StorySummary> for StoryListItemOut {
  fn from(s: StorySummary) -> Self {
    Self {
      id: s.id,
      title: s.title,
      subject: s.subject,
      mode: s.mode,
      num_stages: s.stage_count,
      num_kids: s.kid_names.len(),
      kid_names: s.kid_names,
      created_at: s.created_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct StoryListOut {
  pub stories: Vec<StoryListItemOut>,
  pub total: usize,
}

/// Consumer scoping for reads/deletes, pending a real identity layer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerQuery {
  pub consumer_id: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}
