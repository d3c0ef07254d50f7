use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};
use crate::quiz::FilterOverview;
use crate::source::QuestionSource;

#[derive(Deserialize)]
pub struct CategoryRequest {
  pub name: String,
}

#[derive(Deserialize)]
pub struct DifficultyRequest {
  pub code: String,
}

#[derive(Serialize)]
pub struct FilterChange {
  pub changed: bool,
  pub filters: FilterOverview,
}

#[derive(Clone, Copy)]
enum Action {
  Add,
  Remove,
  Toggle,
}

fn parse_action(action: &str) -> ApiResult<Action> {
  match action {
    "add" => Ok(Action::Add),
    "remove" => Ok(Action::Remove),
    "toggle" => Ok(Action::Toggle),
    other => Err(ApiError::NotFound(format!("Unknown filter action '{}'", other))),
  }
}

pub async fn overview<S: QuestionSource>(State(state): State<AppState<S>>) -> Json<FilterOverview> {
  Json(state.quiz.filter_overview().await)
}

pub async fn change_category<S: QuestionSource>(
  State(state): State<AppState<S>>,
  Path(action): Path<String>,
  Json(request): Json<CategoryRequest>,
) -> ApiResult<Json<FilterChange>> {
  let quiz = &state.quiz;
  let changed = match parse_action(&action)? {
    Action::Add => quiz.add_filter_category(&request.name).await,
    Action::Remove => quiz.remove_filter_category(&request.name).await,
    Action::Toggle => quiz.toggle_filter_category(&request.name).await,
  };
  Ok(Json(FilterChange {
    changed,
    filters: quiz.filter_overview().await,
  }))
}

pub async fn change_difficulty<S: QuestionSource>(
  State(state): State<AppState<S>>,
  Path(action): Path<String>,
  Json(request): Json<DifficultyRequest>,
) -> ApiResult<Json<FilterChange>> {
  let quiz = &state.quiz;
  let changed = match parse_action(&action)? {
    Action::Add => quiz.add_difficulty_filter(&request.code).await,
    Action::Remove => quiz.remove_difficulty_filter(&request.code).await,
    Action::Toggle => quiz.toggle_difficulty_filter(&request.code).await,
  };
  Ok(Json(FilterChange {
    changed,
    filters: quiz.filter_overview().await,
  }))
}

pub async fn clear<S: QuestionSource>(State(state): State<AppState<S>>) -> Json<FilterChange> {
  let changed = state.quiz.clear_all_filters().await;
  Json(FilterChange {
    changed,
    filters: state.quiz.filter_overview().await,
  })
}
