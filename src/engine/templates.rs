//! Narrative template resolution.
//!
//! Templates are shared across all consumers and keyed by
//! (theme, role, mode, stage count). A lookup miss triggers one external
//! generation call; the raw narrative is split on stage markers and
//! persisted. A concurrent insert losing to the store's uniqueness
//! constraint re-fetches the winning row instead of failing.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::config::Prompts;
use crate::curriculum::grade_to_number;
use crate::domain::{KidProfile, NewTemplate, StoryMode, TemplateKey, TemplateWithStages};
use crate::error::{EngineError, StoreError};
use crate::openai::{GenerateTextRequest, TextGenerator};
use crate::store::Store;
use crate::util::fill_template;

/// Token caps per prompt variant; outlines are much terser than prose.
const OUTLINE_MAX_TOKENS: u32 = 2500;
const NARRATIVE_MAX_TOKENS: u32 = 5000;

/// Case-insensitive stage boundary emitted by the generator.
static STAGE_MARKER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)===\s*STAGE\s*\d+\s*===").expect("stage marker pattern"));

/// Split a raw narrative into stage contents. Whitespace-only segments are
/// dropped; whatever remains becomes stages 1..n in emission order.
pub fn split_stages(narrative: &str) -> Vec<String> {
  STAGE_MARKER
    .split(narrative)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

pub struct TemplateResolver {
  store: Arc<dyn Store>,
  generator: Arc<dyn TextGenerator>,
  prompts: Prompts,
}

impl TemplateResolver {
  pub fn new(store: Arc<dyn Store>, generator: Arc<dyn TextGenerator>, prompts: Prompts) -> Self {
    Self { store, generator, prompts }
  }

  /// Return the template for this fingerprint, generating and persisting it
  /// on first miss. The parsed stage count may differ from the requested
  /// one when the generator under- or over-produces markers; we persist
  /// exactly what was parsed.
  #[instrument(level = "info", skip(self, kids), fields(theme = %key.theme, role = %key.role, mode = %key.mode.as_str(), requested_stages = key.stage_count))]
  pub async fn resolve(
    &self,
    key: &TemplateKey,
    kids: &[KidProfile],
    model: &str,
  ) -> Result<TemplateWithStages, EngineError> {
    if let Some(found) = self.store.fetch_template(key).await? {
      debug!(target: "story", id = %found.template.id, "Template reused");
      return Ok(found);
    }

    let narrative = self.generator.generate_text(self.build_request(key, kids, model)).await?;
    let stage_contents = split_stages(&narrative);
    if stage_contents.len() as u32 != key.stage_count {
      warn!(target: "story", parsed = stage_contents.len(), requested = key.stage_count, "Generator produced a different stage count");
    }

    let new_template = NewTemplate { key: key.clone(), raw_narrative: narrative, stage_contents };
    match self.store.insert_template(new_template).await {
      Ok(created) => {
        info!(target: "story", id = %created.template.id, stages = created.stages.len(), "Template generated and persisted");
        Ok(created)
      }
      Err(StoreError::Conflict(_)) => {
        // Lost the insert race; the first writer's generation is kept.
        debug!(target: "story", "Template insert conflicted; re-fetching winner");
        self
          .store
          .fetch_template(key)
          .await?
          .ok_or_else(|| StoreError::Internal("template missing after insert conflict".into()).into())
      }
      Err(e) => Err(e.into()),
    }
  }

  fn build_request(&self, key: &TemplateKey, kids: &[KidProfile], model: &str) -> GenerateTextRequest {
    // Prompts only ever see aliases, never real names.
    let aliases = kids.iter().map(|k| k.alias.as_str()).collect::<Vec<_>>().join(", ");
    let stage_count = key.stage_count.to_string();

    match key.mode {
      StoryMode::Plot => GenerateTextRequest {
        system: self.prompts.outline_system.clone(),
        prompt: fill_template(
          &self.prompts.outline_user_template,
          &[
            ("stage_count", stage_count.as_str()),
            ("aliases", aliases.as_str()),
            ("theme", key.theme.as_str()),
            ("role", key.role.as_str()),
          ],
        ),
        model: model.to_string(),
        max_tokens: OUTLINE_MAX_TOKENS,
        json_mode: false,
      },
      StoryMode::Story => {
        let youngest_grade = kids
          .iter()
          .min_by_key(|k| grade_to_number(&k.grade))
          .map(|k| k.grade.clone())
          .unwrap_or_else(|| "K".into());
        let kid_count = kids.len().to_string();
        GenerateTextRequest {
          system: self.prompts.narrative_system.clone(),
          prompt: fill_template(
            &self.prompts.narrative_user_template,
            &[
              ("stage_count", stage_count.as_str()),
              ("aliases", aliases.as_str()),
              ("kid_count", kid_count.as_str()),
              ("theme", key.theme.as_str()),
              ("role", key.role.as_str()),
              ("youngest_grade", youngest_grade.as_str()),
            ],
          ),
          model: model.to_string(),
          max_tokens: NARRATIVE_MAX_TOKENS,
          json_mode: false,
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split_stages_handles_mixed_case_and_spacing() {
    let narrative = "=== STAGE 1 ===\nfirst\n===stage 2===\nsecond\n=== Stage  3 ===\nthird";
    assert_eq!(split_stages(narrative), vec!["first", "second", "third"]);
  }

  #[test]
  fn split_stages_drops_blank_segments() {
    let narrative = "=== STAGE 1 ===\n\n   \n=== STAGE 2 ===\nonly real content";
    assert_eq!(split_stages(narrative), vec!["only real content"]);
  }

  #[test]
  fn split_stages_keeps_trailing_conclusion_with_last_stage() {
    let narrative = "=== STAGE 1 ===\nthe bridge\n\nAnd they all went home happy.";
    let stages = split_stages(narrative);
    assert_eq!(stages.len(), 1);
    assert!(stages[0].contains("the bridge"));
    assert!(stages[0].contains("went home happy"));
  }

  #[test]
  fn split_stages_without_markers_is_one_stage() {
    assert_eq!(split_stages("no markers at all"), vec!["no markers at all"]);
  }
}
