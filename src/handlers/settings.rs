use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::domain::SubjectPreference;
use crate::quiz::SettingsView;
use crate::source::QuestionSource;

/// Partial update; omitted fields are left unchanged
#[derive(Deserialize)]
pub struct SettingsUpdate {
  pub subject_preference: Option<SubjectPreference>,
  pub exclude_active_questions: Option<bool>,
}

pub async fn current<S: QuestionSource>(State(state): State<AppState<S>>) -> Json<SettingsView> {
  Json(state.quiz.settings().await)
}

pub async fn update<S: QuestionSource>(
  State(state): State<AppState<S>>,
  Json(update): Json<SettingsUpdate>,
) -> Json<SettingsView> {
  if let Some(preference) = update.subject_preference {
    state.quiz.set_subject_preference(preference).await;
  }
  if let Some(enabled) = update.exclude_active_questions {
    state.quiz.set_exclude_active_questions(enabled).await;
  }
  tracing::debug!("Settings updated");
  Json(state.quiz.settings().await)
}

pub async fn clear_seen<S: QuestionSource>(State(state): State<AppState<S>>) -> Json<SettingsView> {
  state.quiz.clear_seen_questions().await;
  Json(state.quiz.settings().await)
}
