use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};
use crate::quiz::QuizSnapshot;
use crate::source::QuestionSource;

#[derive(Deserialize)]
pub struct AnswerRequest {
  pub answer: String,
}

/// Whether an action took effect, with the resulting session
#[derive(Serialize)]
pub struct QuizAction {
  pub applied: bool,
  pub quiz: QuizSnapshot,
}

pub async fn current<S: QuestionSource>(State(state): State<AppState<S>>) -> Json<QuizSnapshot> {
  Json(state.quiz.snapshot().await)
}

pub async fn start<S: QuestionSource>(State(state): State<AppState<S>>) -> Json<QuizSnapshot> {
  Json(state.quiz.initialize_quiz().await)
}

pub async fn select_answer<S: QuestionSource>(
  State(state): State<AppState<S>>,
  Json(request): Json<AnswerRequest>,
) -> ApiResult<Json<QuizAction>> {
  if request.answer.trim().is_empty() {
    return Err(ApiError::BadRequest("Answer must not be empty".into()));
  }
  let applied = state.quiz.select_answer(&request.answer).await;
  Ok(Json(QuizAction {
    applied,
    quiz: state.quiz.snapshot().await,
  }))
}

pub async fn submit_answer<S: QuestionSource>(State(state): State<AppState<S>>) -> Json<QuizAction> {
  let applied = state.quiz.submit_answer().await.is_some();
  Json(QuizAction {
    applied,
    quiz: state.quiz.snapshot().await,
  })
}

pub async fn next_question<S: QuestionSource>(State(state): State<AppState<S>>) -> Json<QuizSnapshot> {
  Json(state.quiz.next_question().await)
}
