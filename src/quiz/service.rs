//! Async orchestration of a quiz: fetching, filtering, drawing and recording
//! seen questions.
//!
//! Locks are never held across a fetch. When both are needed the session
//! lock is taken before the filter lock.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use super::filter::{FilterEngine, FilterOverview, FilterSnapshot};
use super::selector::{AnswerOutcome, PoolUpdate, QuizSession, QuizSnapshot, QuizState};
use super::store::{PreferenceStore, SeenStore};
use crate::db::LogOnError;
use crate::domain::categories::domain_codes;
use crate::domain::{QuestionIdentifier, SubjectPreference, SubjectType};
use crate::source::{LiveIdentifiers, QuestionSource, SourceError};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load questions. Check your connection and try again.";
pub const CONTENT_FAILED_MESSAGE: &str = "Failed to load the question. Check your connection and try again.";

/// User preferences as shown on a settings screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsView {
  pub subject_preference: SubjectPreference,
  pub exclude_active_questions: bool,
  pub seen_question_count: usize,
}

pub struct QuizService<S: QuestionSource> {
  source: Arc<S>,
  session: Mutex<QuizSession>,
  filters: Mutex<FilterEngine>,
  seen: Arc<dyn SeenStore>,
  preferences: Arc<dyn PreferenceStore>,
  events: watch::Sender<QuizSnapshot>,
}

impl<S: QuestionSource> QuizService<S> {
  pub fn new(
    source: Arc<S>,
    filters: FilterEngine,
    seen: Arc<dyn SeenStore>,
    preferences: Arc<dyn PreferenceStore>,
  ) -> Self {
    Self::with_session(source, QuizSession::new(), filters, seen, preferences)
  }

  pub fn with_session(
    source: Arc<S>,
    session: QuizSession,
    mut filters: FilterEngine,
    seen: Arc<dyn SeenStore>,
    preferences: Arc<dyn PreferenceStore>,
  ) -> Self {
    // Restore saved selections before any mutation can write over them
    filters.initialize();
    let (events, _) = watch::channel(session.snapshot());
    Self {
      source,
      session: Mutex::new(session),
      filters: Mutex::new(filters),
      seen,
      preferences,
      events,
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<QuizSnapshot> {
    self.events.subscribe()
  }

  pub async fn subscribe_filters(&self) -> watch::Receiver<FilterSnapshot> {
    self.filters.lock().await.subscribe()
  }

  pub async fn snapshot(&self) -> QuizSnapshot {
    self.session.lock().await.snapshot()
  }

  pub async fn filter_overview(&self) -> FilterOverview {
    self.filters.lock().await.overview()
  }

  async fn publish(&self) -> QuizSnapshot {
    let snapshot = self.session.lock().await.snapshot();
    self.events.send_replace(snapshot.clone());
    snapshot
  }

  // ==================== Session Lifecycle ====================

  /// Fetch everything, rebuild the filtered universe and draw the first question
  pub async fn initialize_quiz(&self) -> QuizSnapshot {
    let generation = self.session.lock().await.begin();
    self.publish().await;
    tracing::info!("Starting quiz session (generation {})", generation);

    let (identifiers, live) = match self.load_universe().await {
      Ok(loaded) => loaded,
      Err(e) => {
        tracing::warn!("Failed to load question identifiers: {}", e);
        self.session.lock().await.fail(generation, LOAD_FAILED_MESSAGE);
        return self.publish().await;
      }
    };

    let seen = self
      .seen
      .seen_ids()
      .log_warn_default("Failed to read seen questions");
    let subject_preference = self
      .preferences
      .subject_preference()
      .log_warn_default("Failed to read subject preference");
    let exclude_active = self
      .preferences
      .exclude_active()
      .log_warn_default("Failed to read exclude-active preference");

    let next = {
      let mut session = self.session.lock().await;
      if !session.is_current(generation) {
        tracing::debug!("Discarding identifiers from superseded session {}", generation);
        return session.snapshot();
      }

      let mut filters = self.filters.lock().await;
      filters.set_universe(
        identifiers,
        live.all_ids(),
        seen.clone(),
        subject_preference,
        exclude_active,
      );
      tracing::info!(
        "Question pool: {} eligible, {} after filters",
        filters.total_question_count(),
        filters.filtered_question_count()
      );
      session.populate(
        generation,
        filters.filtered_identifiers(),
        &seen,
        filters.has_active_filters(),
      )
    };
    self.publish().await;

    match next {
      Some(identifier) => self.load_content(generation, identifier).await,
      None => self.snapshot().await,
    }
  }

  async fn load_universe(&self) -> Result<(Vec<QuestionIdentifier>, LiveIdentifiers), SourceError> {
    let english_domains = domain_codes(SubjectType::English);
    let math_domains = domain_codes(SubjectType::Math);

    let (mut english, math, live) = tokio::try_join!(
      self.source.fetch_identifiers(SubjectType::English, &english_domains),
      self.source.fetch_identifiers(SubjectType::Math, &math_domains),
      self.source.fetch_live_identifiers(),
    )?;

    english.extend(math);
    Ok((english, live))
  }

  async fn load_content(&self, generation: u64, identifier: QuestionIdentifier) -> QuizSnapshot {
    let result = self.source.fetch_question_content(&identifier).await;
    {
      let mut session = self.session.lock().await;
      match result {
        Ok(detail) => {
          session.show(generation, &identifier, detail);
        }
        Err(e) => {
          tracing::warn!("Failed to load question {}: {}", identifier.id, e);
          session.fail(generation, CONTENT_FAILED_MESSAGE);
        }
      }
    }
    self.publish().await
  }

  /// Move on from an answered question, or retry after an error
  pub async fn next_question(&self) -> QuizSnapshot {
    enum Step {
      Advance(String, Option<QuestionIdentifier>, u64),
      Retry(QuestionIdentifier, u64),
      Restart,
      Stay,
    }

    let step = {
      let mut session = self.session.lock().await;
      match session.state() {
        QuizState::Answered => match session.advance() {
          Some((seen_id, next)) => Step::Advance(seen_id, next, session.generation()),
          None => Step::Stay,
        },
        QuizState::Error if session.current().is_none() && session.pool().is_empty() => Step::Restart,
        QuizState::Error => match session.retry() {
          Some(next) => Step::Retry(next, session.generation()),
          None => Step::Stay,
        },
        _ => Step::Stay,
      }
    };

    match step {
      Step::Advance(seen_id, next, generation) => {
        self
          .seen
          .add_seen_id(&seen_id)
          .log_warn("Failed to record seen question");
        self.filters.lock().await.mark_seen(&seen_id);
        self.publish().await;
        match next {
          Some(identifier) => self.load_content(generation, identifier).await,
          None => self.snapshot().await,
        }
      }
      Step::Retry(identifier, generation) => {
        self.publish().await;
        self.load_content(generation, identifier).await
      }
      Step::Restart => self.initialize_quiz().await,
      Step::Stay => self.snapshot().await,
    }
  }

  pub async fn select_answer(&self, answer: &str) -> bool {
    let accepted = self.session.lock().await.select_answer(answer);
    if accepted {
      self.publish().await;
    }
    accepted
  }

  pub async fn submit_answer(&self) -> Option<AnswerOutcome> {
    let outcome = self.session.lock().await.submit_answer();
    if outcome.is_some() {
      self.publish().await;
    }
    outcome
  }

  // ==================== Filters ====================

  /// Rebuild the session pool from the current filtered subset
  pub async fn update_question_pool(&self) -> QuizSnapshot {
    let (update, generation) = {
      let mut session = self.session.lock().await;
      let filters = self.filters.lock().await;
      let update = session.update_pool(filters.filtered_identifiers(), filters.seen_ids());
      (update, session.generation())
    };
    self.publish().await;

    match update {
      PoolUpdate::Redraw(identifier) => self.load_content(generation, identifier).await,
      PoolUpdate::Ignored | PoolUpdate::Kept | PoolUpdate::Complete => self.snapshot().await,
    }
  }

  async fn apply_filter_change<F>(&self, change: F) -> bool
  where
    F: FnOnce(&mut FilterEngine) -> bool,
  {
    let changed = change(&mut *self.filters.lock().await);
    if changed {
      self.update_question_pool().await;
    }
    changed
  }

  pub async fn add_filter_category(&self, name: &str) -> bool {
    self.apply_filter_change(|f| f.add_filter_category(name)).await
  }

  pub async fn remove_filter_category(&self, name: &str) -> bool {
    self.apply_filter_change(|f| f.remove_filter_category(name)).await
  }

  pub async fn toggle_filter_category(&self, name: &str) -> bool {
    self.apply_filter_change(|f| f.toggle_filter_category(name)).await
  }

  pub async fn add_difficulty_filter(&self, code: &str) -> bool {
    self.apply_filter_change(|f| f.add_difficulty_filter(code)).await
  }

  pub async fn remove_difficulty_filter(&self, code: &str) -> bool {
    self.apply_filter_change(|f| f.remove_difficulty_filter(code)).await
  }

  pub async fn toggle_difficulty_filter(&self, code: &str) -> bool {
    self.apply_filter_change(|f| f.toggle_difficulty_filter(code)).await
  }

  pub async fn clear_all_filters(&self) -> bool {
    self.apply_filter_change(|f| f.clear_all_filters()).await
  }

  // ==================== Preferences ====================

  pub async fn settings(&self) -> SettingsView {
    let (engine_subject, engine_exclude) = {
      let filters = self.filters.lock().await;
      (filters.subject_preference(), filters.exclude_active())
    };
    SettingsView {
      subject_preference: self
        .preferences
        .subject_preference()
        .log_warn("Failed to read subject preference")
        .unwrap_or(engine_subject),
      exclude_active_questions: self
        .preferences
        .exclude_active()
        .log_warn("Failed to read exclude-active preference")
        .unwrap_or(engine_exclude),
      seen_question_count: self
        .seen
        .seen_count()
        .log_warn_default("Failed to count seen questions"),
    }
  }

  pub async fn set_subject_preference(&self, preference: SubjectPreference) -> bool {
    self
      .preferences
      .set_subject_preference(preference)
      .log_warn("Failed to save subject preference");
    self
      .apply_filter_change(|f| {
        let exclude = f.exclude_active();
        f.update_preferences(preference, exclude)
      })
      .await
  }

  pub async fn set_exclude_active_questions(&self, enabled: bool) -> bool {
    self
      .preferences
      .set_exclude_active(enabled)
      .log_warn("Failed to save exclude-active preference");
    self
      .apply_filter_change(|f| {
        let subject = f.subject_preference();
        f.update_preferences(subject, enabled)
      })
      .await
  }

  /// Forget every seen question. Takes effect for the next session.
  pub async fn clear_seen_questions(&self) {
    self
      .seen
      .clear_all()
      .log_warn("Failed to clear seen questions");
    self.filters.lock().await.set_seen_ids(HashSet::new());
  }
}
