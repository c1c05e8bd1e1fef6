//! Cluestory · Personalized Bedtime Story Backend
//!
//! - Axum HTTP API
//! - OpenAI-backed story/problem generation with template and problem-bank
//!   reuse
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : required for generation to succeed
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-4o-mini"
//!   OPENAI_TIMEOUT_SECS : per-call bound, default 120
//!   STORY_CONFIG_PATH   : path to TOML config (prompt overrides)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{info, instrument};

use cluestory_backend::config::Settings;
use cluestory_backend::routes::build_router;
use cluestory_backend::state::AppState;
use cluestory_backend::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build runtime settings and the wired engine (store, OpenAI client,
  // prompts, sampler).
  let settings = Settings::from_env();
  let state = Arc::new(AppState::new(&settings)?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "cluestory_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
