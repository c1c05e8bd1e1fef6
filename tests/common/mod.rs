//! Shared test fixtures: a scripted external generator and request builders.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cluestory_backend::config::Prompts;
use cluestory_backend::domain::{KidProfile, StoryMode, Subject};
use cluestory_backend::engine::problems::Sampler;
use cluestory_backend::engine::{StoryRequest, StoryService};
use cluestory_backend::error::GeneratorError;
use cluestory_backend::openai::{GenerateTextRequest, TextGenerator};
use cluestory_backend::store::Store;

pub type Reply = Result<String, GeneratorError>;

/// Scripted stand-in for the external generator. Canned replies are served
/// first, in call order; with `auto`, remaining calls are answered by
/// honoring the counts requested in the prompt. Every request is recorded.
pub struct ScriptedGenerator {
  canned: Mutex<VecDeque<Reply>>,
  auto: bool,
  serial: AtomicUsize,
  calls: Mutex<Vec<GenerateTextRequest>>,
}

impl ScriptedGenerator {
  pub fn canned(replies: Vec<Reply>) -> Arc<Self> {
    Arc::new(Self {
      canned: Mutex::new(replies.into()),
      auto: false,
      serial: AtomicUsize::new(0),
      calls: Mutex::new(Vec::new()),
    })
  }

  /// Narrative calls get a marker-formatted story; JSON calls get exactly
  /// the requested number of problems, each unique across the run.
  pub fn auto() -> Arc<Self> {
    Arc::new(Self {
      canned: Mutex::new(VecDeque::new()),
      auto: true,
      serial: AtomicUsize::new(0),
      calls: Mutex::new(Vec::new()),
    })
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }

  pub fn narrative_calls(&self) -> usize {
    self.calls.lock().unwrap().iter().filter(|c| !c.json_mode).count()
  }

  pub fn problem_calls(&self) -> usize {
    self.calls.lock().unwrap().iter().filter(|c| c.json_mode).count()
  }

  pub fn recorded_calls(&self) -> Vec<GenerateTextRequest> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
  async fn generate_text(&self, req: GenerateTextRequest) -> Result<String, GeneratorError> {
    self.calls.lock().unwrap().push(req.clone());
    if let Some(reply) = self.canned.lock().unwrap().pop_front() {
      return reply;
    }
    if !self.auto {
      return Err(GeneratorError::Failed("script exhausted".into()));
    }
    if req.json_mode {
      let count = first_uint_after(&req.prompt, "Generate ").unwrap_or(1);
      let serial = self.serial.fetch_add(1, Ordering::SeqCst);
      Ok(problems_json_tagged(count, serial))
    } else {
      let stages = first_uint_after(&req.prompt, "EXACTLY ").unwrap_or(3);
      Ok(narrative_with_stages(stages))
    }
  }
}

/// Parse the unsigned integer immediately following `prefix`.
pub fn first_uint_after(text: &str, prefix: &str) -> Option<usize> {
  let start = text.find(prefix)? + prefix.len();
  let digits: String = text[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
  digits.parse().ok()
}

/// A narrative with `n` stage markers; stage bodies mention the fixture
/// aliases so alias rendering is observable end to end.
pub fn narrative_with_stages(n: usize) -> String {
  let mut out = String::new();
  for i in 1..=n {
    out.push_str(&format!(
      "=== STAGE {i} ===\nAlex and Bella reach waypoint {i}. A gatekeeper demands one puzzle from each child.\n\n"
    ));
  }
  out.push_str("And they all went home happy.");
  out
}

/// `{"problems": [...]}` payload with `count` unique problems.
pub fn problems_json_tagged(count: usize, serial: usize) -> String {
  let problems: Vec<serde_json::Value> = (0..count)
    .map(|i| {
      serde_json::json!({
        "problem": format!("{{name}} counts {serial}-{i} acorns"),
        "solution": format!("answer {serial}-{i}"),
      })
    })
    .collect();
  serde_json::json!({ "problems": problems }).to_string()
}

pub fn problems_json(count: usize) -> String {
  problems_json_tagged(count, 0)
}

pub fn kid(name: &str, alias: &str, grade: &str, difficulty_level: u8) -> KidProfile {
  KidProfile {
    name: name.into(),
    alias: alias.into(),
    grade: grade.into(),
    difficulty_level,
  }
}

pub fn service(store: Arc<dyn Store>, generator: Arc<ScriptedGenerator>) -> StoryService {
  StoryService::new(store, generator, Prompts::default(), Sampler::seeded(42), "test-model".into())
}

pub fn request(consumer_id: &str, mode: StoryMode, questions_per_kid: u32, kids: Vec<KidProfile>) -> StoryRequest {
  StoryRequest {
    consumer_id: consumer_id.into(),
    subject: Subject::Math,
    mode,
    role: "explorers".into(),
    theme: "Enchanted Forest".into(),
    questions_per_kid,
    kids,
    country: None,
    model: None,
  }
}
