//! Single-profile practice-problem generation.
//!
//! Builds the per-kid prompt (grade-band concepts, difficulty tier, country
//! grade-system note, placeholder instruction, sibling aliases for social
//! framing) and parses the generator's structured JSON reply. A reply that
//! does not parse is a malformed-response failure, distinct from transport
//! errors.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use crate::config::Prompts;
use crate::curriculum::{difficulty_description, grade_system_note, math_concepts_for_grade};
use crate::domain::{KidProfile, Subject};
use crate::error::GeneratorError;
use crate::openai::{GenerateTextRequest, TextGenerator};
use crate::util::fill_template;

const PROBLEMS_MAX_TOKENS: u32 = 2000;

/// One generated problem, still carrying the `{name}` placeholder.
#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedProblem {
  pub problem: String,
  pub solution: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedBatch {
  problems: Vec<GeneratedProblem>,
}

pub struct ProblemGenerator {
  generator: Arc<dyn TextGenerator>,
  prompts: Prompts,
}

impl ProblemGenerator {
  pub fn new(generator: Arc<dyn TextGenerator>, prompts: Prompts) -> Self {
    Self { generator, prompts }
  }

  /// Generate up to `count` problems personalized to `kid`. The returned
  /// list may be shorter when the remote under-produces; callers decide how
  /// to treat the shortfall.
  #[instrument(level = "info", skip(self, kid, all_kids), fields(subject = %subject.as_str(), grade = %kid.grade, difficulty = kid.difficulty_level, count))]
  pub async fn generate(
    &self,
    subject: Subject,
    kid: &KidProfile,
    all_kids: &[KidProfile],
    count: usize,
    country: Option<&str>,
    model: &str,
  ) -> Result<Vec<GeneratedProblem>, GeneratorError> {
    let prompt = self.build_prompt(subject, kid, all_kids, count, country);
    let text = self
      .generator
      .generate_text(GenerateTextRequest {
        system: self.prompts.problems_system.clone(),
        prompt,
        model: model.to_string(),
        max_tokens: PROBLEMS_MAX_TOKENS,
        json_mode: true,
      })
      .await?;

    let batch: GeneratedBatch = serde_json::from_str(&text)
      .map_err(|e| GeneratorError::Malformed(format!("problem payload did not parse: {e}")))?;
    info!(target: "problem_bank", generated = batch.problems.len(), "Problems generated");
    Ok(batch.problems)
  }

  fn build_prompt(
    &self,
    subject: Subject,
    kid: &KidProfile,
    all_kids: &[KidProfile],
    count: usize,
    country: Option<&str>,
  ) -> String {
    let subject_type = match subject {
      Subject::Math => "math word problems",
      Subject::Reading => "reading/language problems",
    };
    let concepts = match subject {
      Subject::Math => math_concepts_for_grade(&kid.grade),
      Subject::Reading => "",
    };
    let country_note = country
      .map(|c| {
        format!(
          "\nNOTE: This child is in the {}. Adjust problem context appropriately.",
          grade_system_note(c)
        )
      })
      .unwrap_or_default();

    // Siblings show up by alias only, so generated problems can be social
    // without ever baking a real name into a shared bank entry.
    let others: Vec<&KidProfile> = all_kids.iter().filter(|k| k.alias != kid.alias).collect();
    let name_instruction = if others.is_empty() {
      "- IMPORTANT: Use \"{name}\" as a placeholder for the child's name in the problems to make them personal (e.g., \"{name} has 5 apples...\")".to_string()
    } else {
      let other_names = others.iter().map(|k| k.alias.as_str()).collect::<Vec<_>>().join(", ");
      format!(
        "- IMPORTANT: Use \"{{name}}\" as a placeholder for the main character in the problems. You may also include other children: {} to make problems more social/interactive (e.g., \"{{name}} and {} are sharing cookies...\")",
        other_names, others[0].alias
      )
    };

    let count_s = count.to_string();
    let difficulty_s = kid.difficulty_level.to_string();
    fill_template(
      &self.prompts.problems_user_template,
      &[
        ("count", count_s.as_str()),
        ("subject_type", subject_type),
        ("grade", kid.grade.as_str()),
        ("difficulty", difficulty_s.as_str()),
        ("country_note", country_note.as_str()),
        ("difficulty_note", difficulty_description(kid.difficulty_level)),
        ("concepts", concepts),
        ("name_instruction", name_instruction.as_str()),
      ],
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kid(name: &str, alias: &str, grade: &str, difficulty: u8) -> KidProfile {
    KidProfile {
      name: name.into(),
      alias: alias.into(),
      grade: grade.into(),
      difficulty_level: difficulty,
    }
  }

  fn generator() -> ProblemGenerator {
    struct Never;
    #[async_trait::async_trait]
    impl TextGenerator for Never {
      async fn generate_text(&self, _req: GenerateTextRequest) -> Result<String, GeneratorError> {
        Err(GeneratorError::Failed("not used".into()))
      }
    }
    ProblemGenerator::new(Arc::new(Never), crate::config::Prompts::default())
  }

  #[test]
  fn solo_kid_prompt_keeps_placeholder_and_concepts() {
    let g = generator();
    let k = kid("Maya", "Alice", "3", 4);
    let prompt = g.build_prompt(Subject::Math, &k, std::slice::from_ref(&k), 3, None);
    assert!(prompt.contains("Generate 3 math word problems"));
    assert!(prompt.contains("{name} has 5 apples"));
    assert!(prompt.contains("Multiplication facts"));
    assert!(prompt.contains("Difficulty 4/5"));
    assert!(!prompt.contains("Maya"));
    assert!(!prompt.contains("NOTE: This child"));
  }

  #[test]
  fn sibling_prompt_mentions_other_aliases_only() {
    let g = generator();
    let a = kid("Maya", "Alice", "3", 2);
    let b = kid("Theo", "Ben", "5", 3);
    let all = vec![a.clone(), b.clone()];
    let prompt = g.build_prompt(Subject::Math, &a, &all, 2, Some("SG"));
    assert!(prompt.contains("other children: Ben"));
    assert!(prompt.contains("Primary 1-6"));
    assert!(!prompt.contains("Theo"));
  }

  #[test]
  fn reading_prompt_skips_math_concepts() {
    let g = generator();
    let k = kid("Maya", "Alice", "6", 1);
    let prompt = g.build_prompt(Subject::Reading, &k, std::slice::from_ref(&k), 1, None);
    assert!(prompt.contains("reading/language problems"));
    assert!(!prompt.contains("MATH CONCEPTS"));
  }
}
