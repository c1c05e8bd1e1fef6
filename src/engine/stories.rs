//! Story generation requests, end to end.
//!
//! One request: resolve the narrative template, resolve every kid's problem
//! set concurrently, render, and persist the whole story as one atomic
//! unit. Any per-kid failure aborts the request before anything it owns is
//! written; in-flight sibling work is drained and discarded.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{
  KidProfile, NewStory, ProblemKey, StoryMode, StoryProblemRecord, StorySummary, Subject,
  TemplateKey,
};
use crate::engine::assemble::{build_story_response, render_problem, story_title};
use crate::engine::generation::ProblemGenerator;
use crate::engine::problems::{ProblemPool, ResolvedProblems, Sampler};
use crate::engine::templates::TemplateResolver;
use crate::error::{EngineError, GeneratorError};
use crate::openai::TextGenerator;
use crate::protocol::StoryOut;
use crate::store::Store;

/// Bounds carried over from the profile management rules: one problem per
/// kid per stage, at most five stages.
const MAX_STAGES: u32 = 5;

/// Engine-level request, already decoupled from the wire shape.
#[derive(Clone, Debug)]
pub struct StoryRequest {
  pub consumer_id: String,
  pub subject: Subject,
  pub mode: StoryMode,
  pub role: String,
  pub theme: String,
  pub questions_per_kid: u32,
  pub kids: Vec<KidProfile>,
  pub country: Option<String>,
  pub model: Option<String>,
}

pub struct StoryService {
  store: Arc<dyn Store>,
  templates: TemplateResolver,
  pool: Arc<ProblemPool>,
  default_model: String,
}

impl StoryService {
  /// Wire up the engine from its collaborators. Components receive their
  /// dependencies here; nothing reaches for hidden globals later.
  pub fn new(
    store: Arc<dyn Store>,
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    sampler: Sampler,
    default_model: String,
  ) -> Self {
    let templates = TemplateResolver::new(Arc::clone(&store), Arc::clone(&generator), prompts.clone());
    let problem_generator = Arc::new(ProblemGenerator::new(generator, prompts));
    let pool = Arc::new(ProblemPool::new(Arc::clone(&store), problem_generator, sampler));
    Self { store, templates, pool, default_model }
  }

  #[instrument(level = "info", skip(self, req), fields(consumer = %req.consumer_id, theme = %req.theme, role = %req.role, mode = %req.mode.as_str(), kids = req.kids.len(), questions = req.questions_per_kid))]
  pub async fn generate(&self, req: StoryRequest) -> Result<StoryOut, EngineError> {
    validate_request(&req)?;
    let model = req.model.clone().unwrap_or_else(|| self.default_model.clone());

    let key = TemplateKey {
      theme: req.theme.clone(),
      role: req.role.clone(),
      mode: req.mode,
      stage_count: req.questions_per_kid,
    };
    let template = self.templates.resolve(&key, &req.kids, &model).await?;
    // The parsed stage count is authoritative from here on.
    let stage_count = template.stages.len();

    let by_alias = self.resolve_problem_sets(&req, stage_count, &model).await?;

    let mut assignments: Vec<StoryProblemRecord> = Vec::new();
    let mut new_problems = Vec::new();
    for kid in &req.kids {
      let resolved = by_alias.get(&kid.alias).cloned().unwrap_or_default();
      if resolved.entries.len() < stage_count {
        warn!(target: "story", alias = %kid.alias, got = resolved.entries.len(), stage_count, "Short problem set; later stages will lack this kid's problem");
      }
      for (i, entry) in resolved.entries.iter().take(stage_count).enumerate() {
        assignments.push(StoryProblemRecord {
          stage_number: i as u32 + 1,
          kid_alias: kid.alias.clone(),
          problem_id: entry.id.clone(),
          problem_text: render_problem(&entry.problem_text, &kid.name),
          solution: render_problem(&entry.solution, &kid.name),
        });
      }
      new_problems.extend(resolved.new_entries);
    }

    let bundle = self
      .store
      .insert_story(NewStory {
        consumer_id: req.consumer_id.clone(),
        template_id: template.template.id.clone(),
        title: story_title(&req.role, &req.theme),
        subject: req.subject,
        kids: req.kids.clone(),
        problems: assignments,
        new_problems,
      })
      .await?;

    info!(target: "story", id = %bundle.story.id, stages = bundle.template.stages.len(), "Story generated");
    Ok(build_story_response(&bundle))
  }

  /// One concurrent unit of work per kid; all are joined before returning.
  /// The first failure wins, but siblings still in flight run to completion
  /// and their results are discarded with the rest of the request.
  async fn resolve_problem_sets(
    &self,
    req: &StoryRequest,
    stage_count: usize,
    model: &str,
  ) -> Result<HashMap<String, ResolvedProblems>, EngineError> {
    let mut tasks = JoinSet::new();
    for kid in req.kids.clone() {
      let pool = Arc::clone(&self.pool);
      let all_kids = req.kids.clone();
      let consumer_id = req.consumer_id.clone();
      let country = req.country.clone();
      let model = model.to_string();
      let key = ProblemKey {
        subject: req.subject,
        grade: kid.grade.clone(),
        difficulty_level: kid.difficulty_level,
      };
      tasks.spawn(async move {
        let result = pool
          .resolve(&consumer_id, &key, &kid, &all_kids, stage_count, country.as_deref(), &model)
          .await;
        (kid.alias, result)
      });
    }

    let mut by_alias = HashMap::new();
    let mut first_err: Option<EngineError> = None;
    while let Some(joined) = tasks.join_next().await {
      match joined {
        Ok((alias, Ok(entries))) => {
          by_alias.insert(alias, entries);
        }
        Ok((alias, Err(e))) => {
          error!(target: "story", %alias, error = %e, "Problem resolution failed for kid");
          if first_err.is_none() {
            first_err = Some(e);
          }
        }
        Err(join_err) => {
          error!(target: "story", error = %join_err, "Problem resolution task aborted");
          if first_err.is_none() {
            first_err =
              Some(GeneratorError::Failed(format!("generation task aborted: {join_err}")).into());
          }
        }
      }
    }

    match first_err {
      Some(e) => Err(e),
      None => Ok(by_alias),
    }
  }

  #[instrument(level = "info", skip(self), fields(consumer = %consumer_id))]
  pub async fn list(&self, consumer_id: &str) -> Result<Vec<StorySummary>, EngineError> {
    Ok(self.store.list_stories(consumer_id).await?)
  }

  #[instrument(level = "info", skip(self), fields(consumer = %consumer_id, %story_id))]
  pub async fn get(&self, consumer_id: &str, story_id: &str) -> Result<StoryOut, EngineError> {
    match self.store.fetch_story(consumer_id, story_id).await? {
      Some(bundle) => Ok(build_story_response(&bundle)),
      None => Err(EngineError::NotFound(format!("story {} not found", story_id))),
    }
  }

  #[instrument(level = "info", skip(self), fields(consumer = %consumer_id, %story_id))]
  pub async fn delete(&self, consumer_id: &str, story_id: &str) -> Result<(), EngineError> {
    if self.store.delete_story(consumer_id, story_id).await? {
      info!(target: "story", %story_id, "Story deleted");
      Ok(())
    } else {
      Err(EngineError::NotFound(format!("story {} not found", story_id)))
    }
  }
}

fn validate_request(req: &StoryRequest) -> Result<(), EngineError> {
  if req.kids.is_empty() {
    return Err(EngineError::Invalid("at least one kid is required".into()));
  }
  if req.questions_per_kid == 0 || req.questions_per_kid > MAX_STAGES {
    return Err(EngineError::Invalid(format!(
      "questionsPerKid must be between 1 and {}",
      MAX_STAGES
    )));
  }
  if req.role.trim().is_empty() || req.theme.trim().is_empty() {
    return Err(EngineError::Invalid("role and theme must be non-empty".into()));
  }
  let mut aliases = std::collections::HashSet::new();
  for kid in &req.kids {
    if !aliases.insert(kid.alias.as_str()) {
      return Err(EngineError::Invalid(format!("duplicate alias '{}'", kid.alias)));
    }
    if !(1..=5).contains(&kid.difficulty_level) {
      return Err(EngineError::Invalid(format!(
        "difficultyLevel must be between 1 and 5 for '{}'",
        kid.alias
      )));
    }
  }
  Ok(())
}
