//! HTTP endpoint handlers. These are thin wrappers that forward to the
//! story engine and translate engine errors into status codes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, instrument};

use crate::error::EngineError;
use crate::protocol::*;
use crate::state::AppState;

fn error_response(e: EngineError) -> (StatusCode, Json<ErrorOut>) {
  let status = match &e {
    EngineError::NotFound(_) => StatusCode::NOT_FOUND,
    EngineError::Invalid(_) => StatusCode::BAD_REQUEST,
    EngineError::Generation(_) => StatusCode::BAD_GATEWAY,
    EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
  };
  (status, Json(ErrorOut { message: e.to_string() }))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body), fields(consumer = %body.consumer_id, theme = %body.theme, kids = body.kids.len()))]
pub async fn http_generate_story(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateStoryIn>,
) -> Result<Json<StoryOut>, (StatusCode, Json<ErrorOut>)> {
  let req = crate::engine::StoryRequest {
    consumer_id: body.consumer_id,
    subject: body.subject,
    mode: body.mode,
    role: body.role,
    theme: body.theme,
    questions_per_kid: body.questions_per_kid,
    kids: body.kids,
    country: body.country,
    model: body.model,
  };
  let story = state.stories.generate(req).await.map_err(error_response)?;
  info!(target: "story", id = %story.id, stages = story.stages.len(), "HTTP story generated");
  Ok(Json(story))
}

#[instrument(level = "info", skip(state), fields(consumer = %q.consumer_id))]
pub async fn http_list_stories(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ConsumerQuery>,
) -> Result<Json<StoryListOut>, (StatusCode, Json<ErrorOut>)> {
  let summaries = state.stories.list(&q.consumer_id).await.map_err(error_response)?;
  let stories: Vec<StoryListItemOut> = summaries.into_iter().map(Into::into).collect();
  let total = stories.len();
  Ok(Json(StoryListOut { stories, total }))
}

#[instrument(level = "info", skip(state), fields(consumer = %q.consumer_id, %story_id))]
pub async fn http_get_story(
  State(state): State<Arc<AppState>>,
  Path(story_id): Path<String>,
  Query(q): Query<ConsumerQuery>,
) -> Result<Json<StoryOut>, (StatusCode, Json<ErrorOut>)> {
  let story = state.stories.get(&q.consumer_id, &story_id).await.map_err(error_response)?;
  Ok(Json(story))
}

#[instrument(level = "info", skip(state), fields(consumer = %q.consumer_id, %story_id))]
pub async fn http_delete_story(
  State(state): State<Arc<AppState>>,
  Path(story_id): Path<String>,
  Query(q): Query<ConsumerQuery>,
) -> Result<StatusCode, (StatusCode, Json<ErrorOut>)> {
  state.stories.delete(&q.consumer_id, &story_id).await.map_err(error_response)?;
  Ok(StatusCode::NO_CONTENT)
}
