//! Per-kid problem pool resolution.
//!
//! A kid's request is served from the shared bank wherever possible: fetch
//! the consumer's seen-set, query matching unseen entries, and sample the
//! requested amount. Only the deficit goes to the external generator, and
//! newly generated entries are banked so the next consumer reuses them.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{KidProfile, ProblemEntry, ProblemKey};
use crate::engine::generation::ProblemGenerator;
use crate::error::EngineError;
use crate::store::Store;

/// Random sampling without replacement behind an injectable seed, so tests
/// can pin the choice.
pub struct Sampler {
  rng: Mutex<StdRng>,
}

impl Sampler {
  pub fn from_entropy() -> Self {
    Self { rng: Mutex::new(StdRng::from_entropy()) }
  }

  pub fn seeded(seed: u64) -> Self {
    Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
  }

  /// Pick `n` distinct items uniformly. Returns all items when `n` covers
  /// the slice.
  pub fn pick<T: Clone>(&self, items: &[T], n: usize) -> Vec<T> {
    let mut rng = match self.rng.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    items.choose_multiple(&mut *rng, n).cloned().collect()
  }
}

/// One kid's resolved problem set. `new_entries` are the generated entries
/// not yet in the bank; they become durable with the story commit, so a
/// request that fails later leaves no trace of them.
#[derive(Clone, Debug, Default)]
pub struct ResolvedProblems {
  pub entries: Vec<ProblemEntry>,
  pub new_entries: Vec<ProblemEntry>,
}

pub struct ProblemPool {
  store: Arc<dyn Store>,
  generator: Arc<ProblemGenerator>,
  sampler: Sampler,
}

impl ProblemPool {
  pub fn new(store: Arc<dyn Store>, generator: Arc<ProblemGenerator>, sampler: Sampler) -> Self {
    Self { store, generator, sampler }
  }

  /// Resolve `needed` problems for one kid: bank first, generation for the
  /// deficit. The result is shorter than `needed` only when the generator
  /// under-produces; it is never padded with repeats. Generated entries are
  /// returned in `new_entries` for the caller to commit with the story.
  #[instrument(level = "info", skip(self, kid, all_kids), fields(consumer = %consumer_id, subject = %key.subject.as_str(), grade = %key.grade, difficulty = key.difficulty_level, needed))]
  pub async fn resolve(
    &self,
    consumer_id: &str,
    key: &ProblemKey,
    kid: &KidProfile,
    all_kids: &[KidProfile],
    needed: usize,
    country: Option<&str>,
    model: &str,
  ) -> Result<ResolvedProblems, EngineError> {
    let seen = self.store.fetch_seen_ids(consumer_id).await?;
    let available = self.store.fetch_available_problems(key, &seen).await?;

    if available.len() >= needed {
      debug!(target: "problem_bank", available = available.len(), "Bank covers the request");
      return Ok(ResolvedProblems {
        entries: self.sampler.pick(&available, needed),
        new_entries: Vec::new(),
      });
    }

    let deficit = needed - available.len();
    info!(target: "problem_bank", available = available.len(), deficit, "Bank short; generating the deficit");
    let generated = self
      .generator
      .generate(key.subject, kid, all_kids, deficit, country, model)
      .await?;
    if generated.len() < deficit {
      warn!(target: "problem_bank", got = generated.len(), deficit, "Generator under-produced; returning fewer problems than requested");
    }

    let new_entries: Vec<ProblemEntry> = generated
      .into_iter()
      .map(|g| ProblemEntry {
        id: Uuid::new_v4().to_string(),
        subject: key.subject,
        grade: key.grade.clone(),
        difficulty_level: key.difficulty_level,
        problem_text: g.problem,
        solution: g.solution,
        created_at: Utc::now(),
      })
      .collect();

    let mut entries = available;
    entries.extend(new_entries.iter().cloned());
    // Over-production stays banked as inventory but is not handed out.
    entries.truncate(needed);
    Ok(ResolvedProblems { entries, new_entries })
  }
}
