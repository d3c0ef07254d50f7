//! JSON API over a single quiz service.

pub mod filters;
pub mod quiz;
pub mod settings;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::sync::Arc;

use crate::quiz::QuizService;
use crate::source::QuestionSource;

/// Application state passed to all handlers
pub struct AppState<S: QuestionSource> {
  pub quiz: Arc<QuizService<S>>,
}

impl<S: QuestionSource> AppState<S> {
  pub fn new(quiz: QuizService<S>) -> Self {
    Self { quiz: Arc::new(quiz) }
  }
}

impl<S: QuestionSource> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      quiz: Arc::clone(&self.quiz),
    }
  }
}

/// Request-level failure rendered as `{"error", "code"}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error("Not found: {0}")]
  NotFound(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code, message) = match self {
      ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
      ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
    };

    let body = json!({
      "error": message,
      "code": code,
    });

    (status, axum::Json(body)).into_response()
  }
}

pub fn router<S: QuestionSource + 'static>(state: AppState<S>) -> Router {
  Router::new()
    .route("/api/quiz", get(quiz::current::<S>))
    .route("/api/quiz/start", post(quiz::start::<S>))
    .route("/api/quiz/answer", post(quiz::select_answer::<S>))
    .route("/api/quiz/submit", post(quiz::submit_answer::<S>))
    .route("/api/quiz/next", post(quiz::next_question::<S>))
    .route("/api/filters", get(filters::overview::<S>))
    .route("/api/filters/categories/{action}", post(filters::change_category::<S>))
    .route("/api/filters/difficulties/{action}", post(filters::change_difficulty::<S>))
    .route("/api/filters/clear", post(filters::clear::<S>))
    .route("/api/settings", get(settings::current::<S>).post(settings::update::<S>))
    .route("/api/seen/clear", post(settings::clear_seen::<S>))
    .with_state(state)
}
