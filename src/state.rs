//! Application state: the wired story engine.
//!
//! All dependency injection happens here, once, at boot: the store, the
//! OpenAI client, prompts, and the sampler are constructed from `Settings`
//! and handed to the service by constructor.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::Settings;
use crate::engine::problems::Sampler;
use crate::engine::StoryService;
use crate::error::GeneratorError;
use crate::openai::{OpenAi, TextGenerator};
use crate::store::{MemoryStore, Store};

pub struct AppState {
  pub stories: StoryService,
}

impl AppState {
  #[instrument(level = "info", skip_all)]
  pub fn new(settings: &Settings) -> Result<Self, GeneratorError> {
    if settings.openai_api_key.is_empty() {
      warn!(target: "cluestory_backend", "OPENAI_API_KEY not set; generation requests will fail");
    } else {
      info!(target: "cluestory_backend", base_url = %settings.openai_base_url, model = %settings.default_model, "OpenAI enabled");
    }

    let generator: Arc<dyn TextGenerator> = Arc::new(OpenAi::new(settings)?);
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let stories = StoryService::new(
      store,
      generator,
      settings.prompts.clone(),
      Sampler::from_entropy(),
      settings.default_model.clone(),
    );

    Ok(Self { stories })
  }
}
