//! Domain models: kid profiles, reuse fingerprints, and the persisted
//! records for templates, the problem bank, and generated stories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of practice problems a story carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
  Math,
  Reading,
}

impl Subject {
  pub fn as_str(&self) -> &'static str {
    match self {
      Subject::Math => "math",
      Subject::Reading => "reading",
    }
  }
}

/// How the narrative skeleton is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryMode {
  /// Terse bulleted outline per stage, for parents who narrate themselves.
  Plot,
  /// Full prose per stage, each ending in a puzzle setup.
  Story,
}

impl StoryMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      StoryMode::Plot => "plot",
      StoryMode::Story => "story",
    }
  }
}

/// A kid as the request sees them. Doubles as the snapshot captured into a
/// story at generation time, so later profile edits never rewrite history.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KidProfile {
  pub name: String,
  /// Neutral placeholder name embedded in template text instead of `name`.
  pub alias: String,
  /// "K", "1" .. "12".
  pub grade: String,
  /// 1..=5.
  pub difficulty_level: u8,
}

/// Reuse fingerprint for narrative templates. At most one template exists
/// per key; the store enforces it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TemplateKey {
  pub theme: String,
  pub role: String,
  pub mode: StoryMode,
  pub stage_count: u32,
}

/// Reuse fingerprint for problem-bank entries. Non-unique: many entries
/// share one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProblemKey {
  pub subject: Subject,
  pub grade: String,
  pub difficulty_level: u8,
}

#[derive(Clone, Debug)]
pub struct TemplateRecord {
  pub id: String,
  pub theme: String,
  pub role: String,
  pub mode: StoryMode,
  pub stage_count: u32,
  pub raw_narrative: String,
  pub created_at: DateTime<Utc>,
}

impl TemplateRecord {
  pub fn key(&self) -> TemplateKey {
    TemplateKey {
      theme: self.theme.clone(),
      role: self.role.clone(),
      mode: self.mode,
      stage_count: self.stage_count,
    }
  }
}

/// One stage of a template. Content still holds alias placeholders.
#[derive(Clone, Debug)]
pub struct StageRecord {
  pub stage_number: u32,
  pub content: String,
}

/// A template with its stages loaded, ordered by stage number.
#[derive(Clone, Debug)]
pub struct TemplateWithStages {
  pub template: TemplateRecord,
  pub stages: Vec<StageRecord>,
}

/// Input row for a template insert; the store assigns id and timestamp.
#[derive(Clone, Debug)]
pub struct NewTemplate {
  pub key: TemplateKey,
  pub raw_narrative: String,
  pub stage_contents: Vec<String>,
}

/// A reusable problem-bank entry. `problem_text` and `solution` carry the
/// `{name}` placeholder until they are rendered into a story.
#[derive(Clone, Debug)]
pub struct ProblemEntry {
  pub id: String,
  pub subject: Subject,
  pub grade: String,
  pub difficulty_level: u8,
  pub problem_text: String,
  pub solution: String,
  pub created_at: DateTime<Utc>,
}

/// Input row for a problem insert.
#[derive(Clone, Debug)]
pub struct NewProblem {
  pub key: ProblemKey,
  pub problem_text: String,
  pub solution: String,
}

/// A generated story owned by one consumer.
#[derive(Clone, Debug)]
pub struct StoryRecord {
  pub id: String,
  pub consumer_id: String,
  pub template_id: String,
  pub title: String,
  pub subject: Subject,
  pub created_at: DateTime<Utc>,
}

/// Kid snapshot owned by a story.
#[derive(Clone, Debug)]
pub struct StoryKidRecord {
  pub id: String,
  pub name: String,
  pub grade: String,
  pub difficulty_level: u8,
  pub alias: String,
}

/// One rendered problem assignment: stage, kid, and the text with the real
/// name already substituted. Rendered once at generation time, never again.
#[derive(Clone, Debug)]
pub struct StoryProblemRecord {
  pub stage_number: u32,
  pub kid_alias: String,
  pub problem_id: String,
  pub problem_text: String,
  pub solution: String,
}

/// Everything a story commit makes durable, as one atomic unit: the story
/// row, kid snapshots, rendered assignments, the bank entries generated for
/// this request, and the seen-records derived from the assignment problem
/// ids. A failed request therefore leaves nothing behind.
#[derive(Clone, Debug)]
pub struct NewStory {
  pub consumer_id: String,
  pub template_id: String,
  pub title: String,
  pub subject: Subject,
  pub kids: Vec<KidProfile>,
  pub problems: Vec<StoryProblemRecord>,
  /// Entries generated during this request, not yet in the bank.
  pub new_problems: Vec<ProblemEntry>,
}

/// A story with everything needed to render it back out.
#[derive(Clone, Debug)]
pub struct StoryBundle {
  pub story: StoryRecord,
  pub template: TemplateWithStages,
  pub kids: Vec<StoryKidRecord>,
  pub problems: Vec<StoryProblemRecord>,
}

/// Listing row for a consumer's story history.
#[derive(Clone, Debug)]
pub struct StorySummary {
  pub id: String,
  pub title: String,
  pub subject: Subject,
  pub mode: StoryMode,
  pub stage_count: u32,
  pub kid_names: Vec<String>,
  pub created_at: DateTime<Utc>,
}
