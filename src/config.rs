//! Runtime settings and prompt configuration.
//!
//! `Settings` is built once in `main` from environment variables and handed
//! to components by constructor; nothing reads the environment after boot.
//! `Prompts` ships working defaults and can be overridden from a TOML file
//! (`STORY_CONFIG_PATH`) to tune tone or structure without rebuilding.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub openai_api_key: String,
  pub openai_base_url: String,
  /// Model used when a request does not name one.
  pub default_model: String,
  /// Per-call bound on external generation, in seconds.
  pub request_timeout_secs: u64,
  pub prompts: Prompts,
}

impl Settings {
  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(3000);
    let openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let openai_base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let default_model =
      std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let request_timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(120);

    let prompts = load_prompts_from_env().unwrap_or_default();

    Self { port, openai_api_key, openai_base_url, default_model, request_timeout_secs, prompts }
  }
}

/// Top-level TOML schema for prompt overrides.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct StoryConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates used by the generation engine. Placeholders in `{...}`
/// are filled with `util::fill_template`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Narrative skeleton generation (two variants)
  pub outline_system: String,
  pub outline_user_template: String,
  pub narrative_system: String,
  pub narrative_user_template: String,
  // Practice problem generation (structured JSON output)
  pub problems_system: String,
  pub problems_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      outline_system: "You create brief story outlines for parents. Follow formatting exactly.".into(),
      outline_user_template: "\
You are helping a parent tell a bedtime story.

Create EXACTLY {stage_count} stage outlines. Each stage should lead naturally to the next.

CHARACTERS: {aliases}
SETTING: {theme}
ROLE: The children are {role}

For each stage, provide a BRIEF plot outline with these elements:
- Setting/Location for this stage
- What the children encounter (magical character, obstacle, discovery)
- The challenge setup (what blocks their progress)

FORMAT:
=== STAGE X ===
\u{2022} Setting: [where they are]
\u{2022} Encounter: [who/what they meet]
\u{2022} Challenge: [what blocks their progress]

After stage {stage_count}, add a brief conclusion.".into(),
      narrative_system: "You write children's adventure stories. Follow formatting exactly.".into(),
      narrative_user_template: "\
You are a children's bedtime story writer.

Create a story with EXACTLY {stage_count} stages.

CHARACTERS: {aliases} ({kid_count} children who are the heroes)

STORY:
- The children are {role} exploring {theme}
- Each stage they encounter a magical character (wizard, fairy, talking animal, etc.)
- The magical character blocks their path and says each child must solve a puzzle to pass
- Make it exciting and adventurous

FORMAT:
- Start each stage with: === STAGE X ===
- Write 2-3 paragraphs describing the adventure and encounter
- End each stage with the magical character announcing that each child must solve their own puzzle
- Do NOT write the actual puzzles - just set up that puzzles are needed
- After stage {stage_count}, write a brief happy conclusion

EXAMPLE STAGE ENDING:
\"The wise owl hooted softly. 'To cross this bridge, each of you must answer my riddle,' she said, looking at {aliases} in turn.\"

Keep language appropriate for Grade {youngest_grade}.".into(),
      problems_system: "Generate educational puzzles for children. Respond only with valid JSON. Make problems appropriately challenging - do not make them too easy.".into(),
      problems_user_template: "\
Generate {count} {subject_type} for a child.

CHILD INFO:
- Grade: {grade}
- Difficulty: {difficulty}/5
{country_note}

{difficulty_note}

GRADE LEVELS (Reference):
- Grade K = Kindergarten (age 5-6)
- Grade 1-2 = Early elementary (age 6-8)
- Grade 3-4 = Upper elementary (age 8-10)
- Grade 5-6 = Middle school prep (age 10-12)
- Grade 7-8 = Middle school (age 12-14)
- Grade 9-12 = High school (age 14-18)
{concepts}

CRITICAL REQUIREMENTS:
- All problems must be WORD PROBLEMS with a fun, engaging story context
{name_instruction}
- Do NOT use raw arithmetic like \"5+3=\" or \"342+89\"
- Problems should feel like mini-adventures or puzzles within a story
- Each problem should be different and creative
- The difficulty should GENUINELY match the specified level - do NOT make problems too easy
- For difficulty 3+ include problems that require multiple steps or careful reasoning
- Challenge the child appropriately - easy problems waste their potential

Respond with JSON:
{\"problems\": [{ \"problem\": \"...\", \"solution\": \"...\" }]}".into(),
    }
  }
}

/// Attempt to load prompt overrides from STORY_CONFIG_PATH. On any
/// parsing/IO error, returns None and the defaults stay in effect.
pub fn load_prompts_from_env() -> Option<Prompts> {
  let path = std::env::var("STORY_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<StoryConfig>(&s) {
      Ok(cfg) => {
        info!(target: "cluestory_backend", %path, "Loaded story config (TOML)");
        Some(cfg.prompts)
      }
      Err(e) => {
        error!(target: "cluestory_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "cluestory_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
