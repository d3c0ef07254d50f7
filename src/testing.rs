//! Test doubles and identifier builders shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::db::{self, DbPool, StoreError};
use crate::domain::{
  AnswerOption, Difficulty, IdType, QuestionDetail, QuestionIdentifier, QuestionMetadata,
  SatCategories, SubjectType,
};
use crate::quiz::filter::FilterEngine;
use crate::quiz::store::{FilterStore, PersistedFilters, PreferenceStore, SeenStore};
use crate::source::{LiveIdentifiers, QuestionSource, SourceError};

/// Identifier with metadata filed under `class_code`
pub fn question(id: &str, subject: SubjectType, class_code: &str, difficulty: Difficulty) -> QuestionIdentifier {
  QuestionIdentifier::new(id, IdType::External, subject)
    .expect("test ids are non-empty")
    .with_metadata(Some(QuestionMetadata {
      skill_description: "Unknown Skill".into(),
      primary_class_description: "Unknown Category".into(),
      difficulty,
      raw_difficulty: difficulty.code().into(),
      skill_code: String::new(),
      primary_class_code: class_code.into(),
    }))
}

pub fn english(id: &str, class_code: &str, difficulty: Difficulty) -> QuestionIdentifier {
  question(id, SubjectType::English, class_code, difficulty)
}

pub fn math(id: &str, class_code: &str, difficulty: Difficulty) -> QuestionIdentifier {
  question(id, SubjectType::Math, class_code, difficulty)
}

/// Identifier the source returned without any classification
pub fn bare(id: &str, subject: SubjectType) -> QuestionIdentifier {
  QuestionIdentifier::new(id, IdType::External, subject).expect("test ids are non-empty")
}

/// Three English and two Math questions; only m1 is Algebra
pub fn small_universe() -> Vec<QuestionIdentifier> {
  vec![
    english("e1", "INI", Difficulty::Easy),
    english("e2", "CAS", Difficulty::Medium),
    english("e3", "SEC", Difficulty::Hard),
    math("m1", "H", Difficulty::Medium),
    math("m2", "P", Difficulty::Easy),
  ]
}

pub fn detail_for(identifier: &QuestionIdentifier) -> QuestionDetail {
  QuestionDetail {
    unique_id: identifier.id.clone(),
    subject_type: identifier.subject_type,
    stimulus: None,
    stem: format!("<p>Question {}</p>", identifier.id),
    answer_options: ["A", "B", "C", "D"]
      .iter()
      .map(|id| AnswerOption {
        id: id.to_string(),
        content: format!("<p>{}</p>", id),
      })
      .collect(),
    correct_answers: vec!["B".into()],
    rationale: Some("<p>Because.</p>".into()),
  }
}

pub fn memory_pool() -> DbPool {
  db::open_in_memory().expect("in-memory database")
}

pub fn engine_with(pool: &DbPool) -> FilterEngine {
  FilterEngine::new(Arc::new(SatCategories), Arc::new(pool.clone()))
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingStore;

impl FilterStore for FailingStore {
  fn load_filters(&self) -> Result<PersistedFilters, StoreError> {
    Err(StoreError::Unavailable)
  }

  fn save_filters(&self, _filters: &PersistedFilters) -> Result<(), StoreError> {
    Err(StoreError::Unavailable)
  }
}

impl PreferenceStore for FailingStore {
  fn subject_preference(&self) -> Result<crate::domain::SubjectPreference, StoreError> {
    Err(StoreError::Unavailable)
  }

  fn set_subject_preference(&self, _p: crate::domain::SubjectPreference) -> Result<(), StoreError> {
    Err(StoreError::Unavailable)
  }

  fn exclude_active(&self) -> Result<bool, StoreError> {
    Err(StoreError::Unavailable)
  }

  fn set_exclude_active(&self, _enabled: bool) -> Result<(), StoreError> {
    Err(StoreError::Unavailable)
  }
}

impl SeenStore for FailingStore {
  fn seen_ids(&self) -> Result<HashSet<String>, StoreError> {
    Err(StoreError::Unavailable)
  }

  fn add_seen_id(&self, _question_id: &str) -> Result<(), StoreError> {
    Err(StoreError::Unavailable)
  }

  fn clear_all(&self) -> Result<(), StoreError> {
    Err(StoreError::Unavailable)
  }
}

/// Scripted in-memory question source
#[derive(Default)]
pub struct FakeSource {
  pub english: Mutex<Vec<QuestionIdentifier>>,
  pub math: Mutex<Vec<QuestionIdentifier>>,
  pub live: Mutex<LiveIdentifiers>,
  pub content_overrides: Mutex<HashMap<String, QuestionDetail>>,
  pub fail_identifiers: AtomicBool,
  pub fail_content: AtomicBool,
  pub identifier_calls: AtomicUsize,
  pub content_calls: AtomicUsize,
}

impl FakeSource {
  pub fn with_questions(questions: Vec<QuestionIdentifier>) -> Self {
    let (english, math): (Vec<_>, Vec<_>) = questions
      .into_iter()
      .partition(|q| q.subject_type == SubjectType::English);
    Self {
      english: Mutex::new(english),
      math: Mutex::new(math),
      ..Self::default()
    }
  }

  pub fn set_live(&self, english: &[&str], math: &[&str]) {
    *self.live.lock().unwrap() = LiveIdentifiers {
      english_ids: english.iter().map(|s| s.to_string()).collect(),
      math_ids: math.iter().map(|s| s.to_string()).collect(),
    };
  }

  /// Serve `detail` instead of the generated content for its question
  pub fn set_content(&self, detail: QuestionDetail) {
    self
      .content_overrides
      .lock()
      .unwrap()
      .insert(detail.unique_id.clone(), detail);
  }

  pub fn set_failing(&self, identifiers: bool, content: bool) {
    self.fail_identifiers.store(identifiers, Ordering::SeqCst);
    self.fail_content.store(content, Ordering::SeqCst);
  }
}

impl QuestionSource for FakeSource {
  async fn fetch_identifiers(
    &self,
    subject: SubjectType,
    _domains: &[&str],
  ) -> Result<Vec<QuestionIdentifier>, SourceError> {
    self.identifier_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_identifiers.load(Ordering::SeqCst) {
      return Err(SourceError::Status(503));
    }
    let list = match subject {
      SubjectType::English => self.english.lock().unwrap().clone(),
      SubjectType::Math => self.math.lock().unwrap().clone(),
    };
    Ok(list)
  }

  async fn fetch_live_identifiers(&self) -> Result<LiveIdentifiers, SourceError> {
    if self.fail_identifiers.load(Ordering::SeqCst) {
      return Err(SourceError::Status(503));
    }
    Ok(self.live.lock().unwrap().clone())
  }

  async fn fetch_question_content(
    &self,
    identifier: &QuestionIdentifier,
  ) -> Result<QuestionDetail, SourceError> {
    self.content_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_content.load(Ordering::SeqCst) {
      return Err(SourceError::Malformed("scripted failure".into()));
    }
    let overridden = self.content_overrides.lock().unwrap().get(&identifier.id).cloned();
    Ok(overridden.unwrap_or_else(|| detail_for(identifier)))
  }
}
