//! Rendering and final story assembly.
//!
//! Two distinct substitutions happen here:
//! - problem text: the single `{name}` placeholder becomes the kid's real
//!   name, once, at assignment time; the rendered text is what gets stored.
//! - stage text: every kid's alias becomes their real name at delivery
//!   time, in one forward pass over the source text so replaced output is
//!   never rescanned (an alias that is a substring of another alias or of a
//!   substituted name cannot corrupt the result).

use crate::domain::StoryBundle;
use crate::protocol::{ProblemOut, StageOut, StoryKidOut, StoryOut};

/// Deterministic story title.
pub fn story_title(role: &str, theme: &str) -> String {
  format!("{} in {}", role, theme)
}

/// Substitute the `{name}` personalization placeholder.
pub fn render_problem(text: &str, kid_name: &str) -> String {
  text.replace("{name}", kid_name)
}

/// Replace alias tokens with real names in a single pass.
///
/// Matches only on whole-word boundaries and prefers the longest alias at
/// each position, then copies the replacement without rescanning it.
pub fn render_aliases(content: &str, names_by_alias: &[(String, String)]) -> String {
  let mut pairs: Vec<&(String, String)> =
    names_by_alias.iter().filter(|(alias, _)| !alias.is_empty()).collect();
  pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

  let mut out = String::with_capacity(content.len());
  let mut i = 0;
  while i < content.len() {
    let rest = &content[i..];
    let prev_is_word = content[..i].chars().next_back().map_or(false, |c| c.is_alphanumeric());

    if !prev_is_word {
      if let Some((alias, name)) = pairs.iter().find(|(alias, _)| {
        rest.starts_with(alias.as_str())
          && rest[alias.len()..].chars().next().map_or(true, |c| !c.is_alphanumeric())
      }) {
        out.push_str(name);
        i += alias.len();
        continue;
      }
    }

    match rest.chars().next() {
      Some(ch) => {
        out.push(ch);
        i += ch.len_utf8();
      }
      None => break,
    }
  }
  out
}

/// Build the outward story shape: stages in ascending order, each with its
/// rendered content and the rendered problems assigned to it, then kid
/// snapshots in stored (request) order.
pub fn build_story_response(bundle: &StoryBundle) -> StoryOut {
  let names_by_alias: Vec<(String, String)> = bundle
    .kids
    .iter()
    .map(|k| (k.alias.clone(), k.name.clone()))
    .collect();
  let kid_names_by_alias: std::collections::HashMap<&str, &str> = bundle
    .kids
    .iter()
    .map(|k| (k.alias.as_str(), k.name.as_str()))
    .collect();

  let mut stages: Vec<StageOut> = bundle
    .template
    .stages
    .iter()
    .map(|stage| {
      let problems = bundle
        .problems
        .iter()
        .filter(|p| p.stage_number == stage.stage_number)
        .map(|p| ProblemOut {
          kid_alias: p.kid_alias.clone(),
          kid_name: kid_names_by_alias.get(p.kid_alias.as_str()).unwrap_or(&"").to_string(),
          text: p.problem_text.clone(),
          solution: p.solution.clone(),
        })
        .collect();
      StageOut {
        stage_number: stage.stage_number,
        content: render_aliases(&stage.content, &names_by_alias),
        problems,
      }
    })
    .collect();
  stages.sort_by_key(|s| s.stage_number);

  StoryOut {
    id: bundle.story.id.clone(),
    title: bundle.story.title.clone(),
    subject: bundle.story.subject,
    mode: bundle.template.template.mode,
    role: bundle.template.template.role.clone(),
    theme: bundle.template.template.theme.clone(),
    kids: bundle
      .kids
      .iter()
      .map(|k| StoryKidOut {
        id: k.id.clone(),
        name: k.name.clone(),
        grade: k.grade.clone(),
        difficulty_level: k.difficulty_level,
        alias: k.alias.clone(),
      })
      .collect(),
    stages,
    created_at: bundle.story.created_at,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter().map(|(a, n)| (a.to_string(), n.to_string())).collect()
  }

  #[test]
  fn problem_placeholder_renders_to_real_name() {
    assert_eq!(render_problem("{name} has 5 apples", "Maya"), "Maya has 5 apples");
    assert_eq!(
      render_problem("{name} gives {name} a hint", "Maya"),
      "Maya gives Maya a hint"
    );
  }

  #[test]
  fn aliases_render_to_names() {
    let out = render_aliases("Alex and Bella meet a fox", &pairs(&[("Alex", "Sam"), ("Bella", "Noor")]));
    assert_eq!(out, "Sam and Noor meet a fox");
  }

  #[test]
  fn alias_inside_substituted_name_is_not_rescanned() {
    // "Ben" -> "Bennett": the replacement contains the alias itself.
    let out = render_aliases("Ben waved. Ben laughed.", &pairs(&[("Ben", "Bennett")]));
    assert_eq!(out, "Bennett waved. Bennett laughed.");
  }

  #[test]
  fn alias_prefixing_another_alias_takes_longest_match() {
    let out = render_aliases("Ben and Benny raced", &pairs(&[("Ben", "Ada"), ("Benny", "Lou")]));
    assert_eq!(out, "Ada and Lou raced");
  }

  #[test]
  fn alias_substring_of_word_is_left_alone() {
    let out = render_aliases("Benny bent the branch", &pairs(&[("Ben", "Ada")]));
    assert_eq!(out, "Benny bent the branch");
  }

  #[test]
  fn title_is_role_in_theme() {
    assert_eq!(story_title("explorers", "Enchanted Forest"), "explorers in Enchanted Forest");
  }
}
