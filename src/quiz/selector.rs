//! Quiz session state and balanced question selection.
//!
//! The session owns the pending pool for one quiz. Draws alternate between
//! subjects by coin flip when both are present, and never return a question
//! twice within a session. Results of async work are tagged with the
//! generation that started it; anything from an older generation is dropped.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashSet;

use crate::domain::{QuestionDetail, QuestionIdentifier, SubjectType};

pub const NO_MATCH_MESSAGE: &str = "No questions match the selected filters.";
pub const ALL_SEEN_MESSAGE: &str = "You've seen every question that matches your settings.";
pub const NO_QUESTIONS_MESSAGE: &str = "No questions are available. Check your connection and try again.";
pub const EXHAUSTED_MESSAGE: &str = "You've completed all available questions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizState {
  Uninitialized,
  Loading,
  Ready,
  Answered,
  Complete,
  Error,
}

/// Result of submitting an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
  pub selected: String,
  pub correct: bool,
  pub correct_answers: Vec<String>,
}

/// What a pool refresh did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolUpdate {
  /// Session was idle or mid-draw
  Ignored,
  /// Current question still matches; later draws use the new pool
  Kept,
  /// A new question was drawn and needs its content fetched
  Redraw(QuestionIdentifier),
  Complete,
}

/// Serializable view of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSnapshot {
  pub state: QuizState,
  pub generation: u64,
  pub identifier: Option<QuestionIdentifier>,
  pub question: Option<QuestionDetail>,
  pub selected_answer: Option<String>,
  pub outcome: Option<AnswerOutcome>,
  pub message: Option<String>,
  pub remaining: usize,
  pub answered_count: u32,
  pub correct_count: u32,
}

/// Pick an index from the pool, balancing subjects by coin flip
pub fn balanced_pick<R: Rng + ?Sized>(pool: &[QuestionIdentifier], rng: &mut R) -> Option<usize> {
  match pool.len() {
    0 => return None,
    1 => return Some(0),
    _ => {}
  }

  let (english, math): (Vec<usize>, Vec<usize>) =
    (0..pool.len()).partition(|&i| pool[i].subject_type == SubjectType::English);

  let bucket = match (english.is_empty(), math.is_empty()) {
    (false, true) => &english,
    (true, false) => &math,
    _ => {
      if rng.random_bool(0.5) {
        &english
      } else {
        &math
      }
    }
  };

  Some(bucket[rng.random_range(0..bucket.len())])
}

pub struct QuizSession {
  state: QuizState,
  generation: u64,
  pool: Vec<QuestionIdentifier>,
  /// Everything drawn this session, including the current question
  drawn: HashSet<QuestionIdentifier>,
  current: Option<QuestionIdentifier>,
  question: Option<QuestionDetail>,
  selected_answer: Option<String>,
  outcome: Option<AnswerOutcome>,
  message: Option<String>,
  answered_count: u32,
  correct_count: u32,
  rng: StdRng,
}

impl Default for QuizSession {
  fn default() -> Self {
    Self::with_rng(StdRng::from_os_rng())
  }
}

impl QuizSession {
  pub fn new() -> Self {
    Self::default()
  }

  /// Deterministic session for reproducible draws
  pub fn seeded(seed: u64) -> Self {
    Self::with_rng(StdRng::seed_from_u64(seed))
  }

  fn with_rng(rng: StdRng) -> Self {
    Self {
      state: QuizState::Uninitialized,
      generation: 0,
      pool: Vec::new(),
      drawn: HashSet::new(),
      current: None,
      question: None,
      selected_answer: None,
      outcome: None,
      message: None,
      answered_count: 0,
      correct_count: 0,
      rng,
    }
  }

  pub fn state(&self) -> QuizState {
    self.state
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn is_current(&self, generation: u64) -> bool {
    self.generation == generation
  }

  pub fn pool(&self) -> &[QuestionIdentifier] {
    &self.pool
  }

  pub fn current(&self) -> Option<&QuestionIdentifier> {
    self.current.as_ref()
  }

  pub fn question(&self) -> Option<&QuestionDetail> {
    self.question.as_ref()
  }

  pub fn selected_answer(&self) -> Option<&str> {
    self.selected_answer.as_deref()
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  pub fn snapshot(&self) -> QuizSnapshot {
    QuizSnapshot {
      state: self.state,
      generation: self.generation,
      identifier: self.current.clone(),
      question: self.question.clone(),
      selected_answer: self.selected_answer.clone(),
      outcome: self.outcome.clone(),
      message: self.message.clone(),
      remaining: self.pool.len(),
      answered_count: self.answered_count,
      correct_count: self.correct_count,
    }
  }

  // ==================== Lifecycle ====================

  /// Start a new session. Returns the generation async results must carry.
  pub fn begin(&mut self) -> u64 {
    self.generation += 1;
    self.state = QuizState::Loading;
    self.pool.clear();
    self.drawn.clear();
    self.clear_question();
    self.message = None;
    self.answered_count = 0;
    self.correct_count = 0;
    self.generation
  }

  /// Fill the pool from a freshly filtered subset and make the first draw.
  ///
  /// Returns the identifier whose content should be fetched next.
  pub fn populate(
    &mut self,
    generation: u64,
    filtered: &[QuestionIdentifier],
    seen: &HashSet<String>,
    filters_active: bool,
  ) -> Option<QuestionIdentifier> {
    if !self.is_current(generation) {
      tracing::debug!("Discarding stale question pool (generation {})", generation);
      return None;
    }

    if filtered.is_empty() && filters_active {
      self.complete(NO_MATCH_MESSAGE);
      return None;
    }

    self.adopt_pool(filtered, seen);
    if self.pool.is_empty() {
      let message = if filtered.is_empty() {
        NO_QUESTIONS_MESSAGE
      } else {
        ALL_SEEN_MESSAGE
      };
      self.complete(message);
      return None;
    }

    self.draw()
  }

  /// Take the next question out of the pool and enter Loading
  pub fn draw(&mut self) -> Option<QuestionIdentifier> {
    self.clear_question();
    let Some(index) = balanced_pick(&self.pool, &mut self.rng) else {
      self.complete(EXHAUSTED_MESSAGE);
      return None;
    };

    let next = self.pool.remove(index);
    self.drawn.insert(next.clone());
    self.current = Some(next.clone());
    self.state = QuizState::Loading;
    self.message = None;
    Some(next)
  }

  /// Content for the drawn question arrived
  pub fn show(&mut self, generation: u64, identifier: &QuestionIdentifier, detail: QuestionDetail) -> bool {
    if !self.is_current(generation) || self.current.as_ref() != Some(identifier) {
      tracing::debug!("Discarding stale content for {}", identifier.id);
      return false;
    }
    self.question = Some(detail);
    self.state = QuizState::Ready;
    true
  }

  /// An async step failed. The session stays resumable.
  pub fn fail(&mut self, generation: u64, message: impl Into<String>) -> bool {
    if !self.is_current(generation) {
      return false;
    }
    self.state = QuizState::Error;
    self.message = Some(message.into());
    true
  }

  // ==================== Answering ====================

  /// Only honoured while a question is showing
  pub fn select_answer(&mut self, answer: &str) -> bool {
    if self.state != QuizState::Ready {
      return false;
    }
    if self
      .question
      .as_ref()
      .is_some_and(|q| !q.accepts_selection(answer))
    {
      return false;
    }
    self.selected_answer = Some(answer.trim().to_string());
    true
  }

  /// Lock in the selection. No selection means nothing happens.
  pub fn submit_answer(&mut self) -> Option<AnswerOutcome> {
    if self.state != QuizState::Ready {
      return None;
    }
    let selected = self.selected_answer.clone()?;

    let (correct, correct_answers) = match &self.question {
      Some(q) => (q.is_correct(&selected), q.correct_answers.clone()),
      None => (false, Vec::new()),
    };

    self.answered_count += 1;
    if correct {
      self.correct_count += 1;
    }
    let outcome = AnswerOutcome {
      selected,
      correct,
      correct_answers,
    };
    self.outcome = Some(outcome.clone());
    self.state = QuizState::Answered;
    Some(outcome)
  }

  /// Move past an answered question. Returns the id to record as seen and
  /// the next identifier to fetch, if any.
  pub fn advance(&mut self) -> Option<(String, Option<QuestionIdentifier>)> {
    if self.state != QuizState::Answered {
      return None;
    }
    let seen_id = self
      .question
      .as_ref()
      .map(|q| q.unique_id.clone())
      .or_else(|| self.current.as_ref().map(|c| c.id.clone()))?;
    self.generation += 1;
    Some((seen_id, self.draw()))
  }

  /// Resume after an error: refetch the current question or draw a new one
  pub fn retry(&mut self) -> Option<QuestionIdentifier> {
    if self.state != QuizState::Error {
      return None;
    }
    self.generation += 1;
    self.message = None;
    match self.current.clone() {
      Some(current) => {
        self.state = QuizState::Loading;
        Some(current)
      }
      None => self.draw(),
    }
  }

  // ==================== Filter Changes ====================

  /// Rebuild the pool after the filtered subset changed
  pub fn update_pool(&mut self, filtered: &[QuestionIdentifier], seen: &HashSet<String>) -> PoolUpdate {
    if matches!(self.state, QuizState::Uninitialized | QuizState::Loading) {
      return PoolUpdate::Ignored;
    }

    let still_matches = self
      .current
      .as_ref()
      .is_some_and(|current| filtered.contains(current));

    self.adopt_pool(filtered, seen);

    if still_matches {
      if self.pool.is_empty() {
        // The current question stays visible until the user moves on
        self.state = QuizState::Complete;
        self.message = Some(NO_MATCH_MESSAGE.to_string());
        return PoolUpdate::Complete;
      }
      if self.state == QuizState::Complete {
        // Filters widened again around the question still on screen
        self.state = if self.outcome.is_some() {
          QuizState::Answered
        } else {
          QuizState::Ready
        };
        self.message = None;
      }
      return PoolUpdate::Kept;
    }

    self.generation += 1;
    if self.pool.is_empty() {
      self.clear_question();
      self.complete(NO_MATCH_MESSAGE);
      return PoolUpdate::Complete;
    }
    match self.draw() {
      Some(next) => PoolUpdate::Redraw(next),
      None => PoolUpdate::Complete,
    }
  }

  // ==================== Internals ====================

  /// Replace the pool with the filtered subset minus seen and drawn questions
  fn adopt_pool(&mut self, filtered: &[QuestionIdentifier], seen: &HashSet<String>) {
    let mut included = HashSet::with_capacity(filtered.len());
    self.pool = filtered
      .iter()
      .filter(|q| !seen.contains(&q.id) && !self.drawn.contains(*q))
      .filter(|q| included.insert((*q).clone()))
      .cloned()
      .collect();
    self.pool.shuffle(&mut self.rng);
  }

  fn clear_question(&mut self) {
    self.current = None;
    self.question = None;
    self.selected_answer = None;
    self.outcome = None;
  }

  fn complete(&mut self, message: &str) {
    self.clear_question();
    self.state = QuizState::Complete;
    self.message = Some(message.to_string());
  }
}
