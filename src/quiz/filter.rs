//! Filtering of the question universe by subject, live-item exclusion,
//! category and difficulty.
//!
//! Recomputation always runs in the same order:
//! 1. keep questions in the preferred subject(s)
//! 2. drop live questions when exclusion is enabled
//! 3. keep questions with metadata; this base is what every count is taken over
//! 4. narrow by category and difficulty: AND across the two dimensions,
//!    OR within each, an empty dimension matches everything

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::watch;

use super::store::{FilterStore, PersistedFilters};
use crate::db::LogOnError;
use crate::domain::{CategoryMapping, Difficulty, QuestionIdentifier, SubjectPreference};

/// What observers see after every recomputation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSnapshot {
  pub revision: u64,
  pub active_categories: Vec<String>,
  pub active_difficulties: Vec<String>,
  pub total_question_count: usize,
  pub filtered_question_count: usize,
}

/// A filter option with the number of eligible questions it matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionCount {
  pub value: String,
  pub label: String,
  pub count: usize,
  pub active: bool,
}

/// Everything a filter screen needs in one read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOverview {
  pub subject_preference: SubjectPreference,
  pub exclude_active_questions: bool,
  pub active_categories: Vec<String>,
  pub active_difficulties: Vec<String>,
  pub total_question_count: usize,
  pub filtered_question_count: usize,
  pub unseen_question_count: usize,
  pub categories: Vec<OptionCount>,
  pub difficulties: Vec<OptionCount>,
}

pub struct FilterEngine {
  mapping: Arc<dyn CategoryMapping>,
  store: Arc<dyn FilterStore>,
  initialized: bool,

  active_categories: BTreeSet<String>,
  active_difficulties: BTreeSet<Difficulty>,

  universe: Vec<QuestionIdentifier>,
  live_ids: HashSet<String>,
  seen_ids: HashSet<String>,
  subject_preference: SubjectPreference,
  exclude_active: bool,

  /// Subject and exclusion filtered, metadata present
  eligible: Vec<QuestionIdentifier>,
  filtered: Vec<QuestionIdentifier>,

  revision: u64,
  notifier: watch::Sender<FilterSnapshot>,
}

impl FilterEngine {
  pub fn new(mapping: Arc<dyn CategoryMapping>, store: Arc<dyn FilterStore>) -> Self {
    let (notifier, _) = watch::channel(FilterSnapshot::default());
    Self {
      mapping,
      store,
      initialized: false,
      active_categories: BTreeSet::new(),
      active_difficulties: BTreeSet::new(),
      universe: Vec::new(),
      live_ids: HashSet::new(),
      seen_ids: HashSet::new(),
      subject_preference: SubjectPreference::Both,
      exclude_active: false,
      eligible: Vec::new(),
      filtered: Vec::new(),
      revision: 0,
      notifier,
    }
  }

  /// Load persisted selections. Only the first call does anything; a failed
  /// read leaves both selections empty.
  pub fn initialize(&mut self) {
    if self.initialized {
      return;
    }
    self.initialized = true;

    match self.store.load_filters() {
      Ok(persisted) => {
        self.active_categories = persisted.categories.into_iter().collect();
        self.active_difficulties = persisted
          .difficulties
          .iter()
          .filter_map(|code| Difficulty::from_code(code))
          .collect();
        tracing::debug!(
          "Restored {} category and {} difficulty filters",
          self.active_categories.len(),
          self.active_difficulties.len()
        );
      }
      Err(e) => {
        tracing::warn!("Failed to load filter state, starting empty: {}", e);
        self.active_categories.clear();
        self.active_difficulties.clear();
      }
    }

    self.recompute();
  }

  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  /// Replace the question universe and exclusion parameters
  pub fn set_universe(
    &mut self,
    identifiers: Vec<QuestionIdentifier>,
    live_ids: HashSet<String>,
    seen_ids: HashSet<String>,
    subject_preference: SubjectPreference,
    exclude_active: bool,
  ) {
    let mut unique = HashSet::with_capacity(identifiers.len());
    self.universe = identifiers
      .into_iter()
      .filter(|q| unique.insert(q.clone()))
      .collect();
    self.live_ids = live_ids;
    self.seen_ids = seen_ids;
    self.subject_preference = subject_preference;
    self.exclude_active = exclude_active;
    self.recompute();
  }

  /// Change the subject and exclusion parameters; returns whether they changed
  pub fn update_preferences(&mut self, subject_preference: SubjectPreference, exclude_active: bool) -> bool {
    if self.subject_preference == subject_preference && self.exclude_active == exclude_active {
      return false;
    }
    self.subject_preference = subject_preference;
    self.exclude_active = exclude_active;
    self.recompute();
    true
  }

  pub fn set_seen_ids(&mut self, seen_ids: HashSet<String>) {
    self.seen_ids = seen_ids;
  }

  pub fn seen_ids(&self) -> &HashSet<String> {
    &self.seen_ids
  }

  pub fn mark_seen(&mut self, question_id: &str) {
    self.seen_ids.insert(question_id.to_string());
  }

  // ==================== Category Filters ====================

  pub fn add_filter_category(&mut self, name: &str) -> bool {
    if !self.mapping.is_valid_category(name) {
      tracing::warn!("Ignoring unknown category filter: {}", name);
      return false;
    }
    if !self.active_categories.insert(name.to_string()) {
      return false;
    }
    self.commit();
    true
  }

  pub fn remove_filter_category(&mut self, name: &str) -> bool {
    if !self.active_categories.remove(name) {
      return false;
    }
    self.commit();
    true
  }

  pub fn toggle_filter_category(&mut self, name: &str) -> bool {
    if self.active_categories.contains(name) {
      self.remove_filter_category(name)
    } else {
      self.add_filter_category(name)
    }
  }

  // ==================== Difficulty Filters ====================

  pub fn add_difficulty_filter(&mut self, code: &str) -> bool {
    let Some(difficulty) = Difficulty::from_code(code) else {
      tracing::warn!("Ignoring unknown difficulty filter: {}", code);
      return false;
    };
    if !self.active_difficulties.insert(difficulty) {
      return false;
    }
    self.commit();
    true
  }

  pub fn remove_difficulty_filter(&mut self, code: &str) -> bool {
    let Some(difficulty) = Difficulty::from_code(code) else {
      return false;
    };
    if !self.active_difficulties.remove(&difficulty) {
      return false;
    }
    self.commit();
    true
  }

  pub fn toggle_difficulty_filter(&mut self, code: &str) -> bool {
    match Difficulty::from_code(code) {
      Some(d) if self.active_difficulties.contains(&d) => self.remove_difficulty_filter(code),
      _ => self.add_difficulty_filter(code),
    }
  }

  /// Empty both selections with a single save and recomputation
  pub fn clear_all_filters(&mut self) -> bool {
    if !self.has_active_filters() {
      return false;
    }
    self.active_categories.clear();
    self.active_difficulties.clear();
    self.commit();
    true
  }

  // ==================== Reads ====================

  pub fn has_active_filters(&self) -> bool {
    !self.active_categories.is_empty() || !self.active_difficulties.is_empty()
  }

  pub fn active_categories(&self) -> &BTreeSet<String> {
    &self.active_categories
  }

  pub fn active_difficulties(&self) -> &BTreeSet<Difficulty> {
    &self.active_difficulties
  }

  pub fn subject_preference(&self) -> SubjectPreference {
    self.subject_preference
  }

  pub fn exclude_active(&self) -> bool {
    self.exclude_active
  }

  pub fn filtered_identifiers(&self) -> &[QuestionIdentifier] {
    &self.filtered
  }

  /// Questions eligible before category and difficulty narrowing
  pub fn total_question_count(&self) -> usize {
    self.eligible.len()
  }

  pub fn filtered_question_count(&self) -> usize {
    self.filtered.len()
  }

  pub fn unseen_question_count(&self) -> usize {
    self
      .filtered
      .iter()
      .filter(|q| !self.seen_ids.contains(&q.id))
      .count()
  }

  pub fn category_counts(&self) -> Vec<OptionCount> {
    self
      .mapping
      .filterable_categories(self.subject_preference)
      .into_iter()
      .map(|name| {
        let count = self
          .eligible
          .iter()
          .filter_map(|q| q.metadata.as_ref())
          .filter(|m| self.mapping.category_of(m) == name)
          .count();
        OptionCount {
          active: self.active_categories.contains(&name),
          label: name.clone(),
          value: name,
          count,
        }
      })
      .collect()
  }

  pub fn difficulty_counts(&self) -> Vec<OptionCount> {
    Difficulty::ALL
      .iter()
      .map(|d| OptionCount {
        value: d.code().to_string(),
        label: d.label().to_string(),
        count: self
          .eligible
          .iter()
          .filter(|q| q.difficulty() == Some(*d))
          .count(),
        active: self.active_difficulties.contains(d),
      })
      .collect()
  }

  /// Categories with at least one eligible question
  pub fn available_categories(&self) -> Vec<String> {
    self
      .category_counts()
      .into_iter()
      .filter(|c| c.count > 0)
      .map(|c| c.value)
      .collect()
  }

  /// Difficulties with at least one eligible question, Easy to Hard
  pub fn available_difficulties(&self) -> Vec<Difficulty> {
    Difficulty::ALL
      .into_iter()
      .filter(|d| self.eligible.iter().any(|q| q.difficulty() == Some(*d)))
      .collect()
  }

  pub fn overview(&self) -> FilterOverview {
    let snapshot = self.snapshot();
    FilterOverview {
      subject_preference: self.subject_preference,
      exclude_active_questions: self.exclude_active,
      active_categories: snapshot.active_categories,
      active_difficulties: snapshot.active_difficulties,
      total_question_count: snapshot.total_question_count,
      filtered_question_count: snapshot.filtered_question_count,
      unseen_question_count: self.unseen_question_count(),
      categories: self.category_counts(),
      difficulties: self.difficulty_counts(),
    }
  }

  pub fn snapshot(&self) -> FilterSnapshot {
    FilterSnapshot {
      revision: self.revision,
      active_categories: self.active_categories.iter().cloned().collect(),
      active_difficulties: self
        .active_difficulties
        .iter()
        .map(|d| d.code().to_string())
        .collect(),
      total_question_count: self.total_question_count(),
      filtered_question_count: self.filtered_question_count(),
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<FilterSnapshot> {
    self.notifier.subscribe()
  }

  // ==================== Internals ====================

  fn matches(&self, question: &QuestionIdentifier) -> bool {
    let Some(metadata) = &question.metadata else {
      return false;
    };
    let category_ok = self.active_categories.is_empty()
      || self.active_categories.contains(&self.mapping.category_of(metadata));
    let difficulty_ok =
      self.active_difficulties.is_empty() || self.active_difficulties.contains(&metadata.difficulty);
    category_ok && difficulty_ok
  }

  /// Persist, recompute, then notify
  fn commit(&mut self) {
    self.persist();
    self.recompute();
  }

  fn persist(&self) {
    let persisted = PersistedFilters {
      categories: self.active_categories.iter().cloned().collect(),
      difficulties: self
        .active_difficulties
        .iter()
        .map(|d| d.code().to_string())
        .collect(),
    };
    self
      .store
      .save_filters(&persisted)
      .log_warn("Failed to save filter state");
  }

  fn recompute(&mut self) {
    let eligible: Vec<QuestionIdentifier> = self
      .universe
      .iter()
      .filter(|q| self.subject_preference.includes(q.subject_type))
      .filter(|q| !(self.exclude_active && self.live_ids.contains(&q.id)))
      .filter(|q| q.metadata.is_some())
      .cloned()
      .collect();

    let filtered = if self.has_active_filters() {
      eligible.iter().filter(|q| self.matches(q)).cloned().collect()
    } else {
      eligible.clone()
    };

    self.eligible = eligible;
    self.filtered = filtered;
    self.revision += 1;

    tracing::debug!(
      "Filters recomputed: {} eligible, {} after category/difficulty",
      self.eligible.len(),
      self.filtered.len()
    );
    self.notifier.send_replace(self.snapshot());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{SatCategories, SubjectType};
  use crate::testing::{bare, engine_with, english, math, memory_pool, small_universe, FailingStore};

  fn ids(list: &[QuestionIdentifier]) -> Vec<&str> {
    let mut ids: Vec<&str> = list.iter().map(|q| q.id.as_str()).collect();
    ids.sort();
    ids
  }

  fn engine_over(universe: Vec<QuestionIdentifier>) -> FilterEngine {
    let mut engine = engine_with(&memory_pool());
    engine.initialize();
    engine.set_universe(universe, HashSet::new(), HashSet::new(), SubjectPreference::Both, false);
    engine
  }

  fn failing_engine() -> FilterEngine {
    FilterEngine::new(Arc::new(SatCategories), Arc::new(FailingStore))
  }

  #[test]
  fn test_no_filters_counts_match() {
    let engine = engine_over(small_universe());
    assert_eq!(engine.total_question_count(), 5);
    assert_eq!(engine.filtered_question_count(), 5);
  }

  #[test]
  fn test_category_filter_narrows() {
    let mut engine = engine_over(small_universe());
    assert!(engine.add_filter_category("Algebra"));

    assert_eq!(engine.filtered_question_count(), 1);
    assert_eq!(ids(engine.filtered_identifiers()), vec!["m1"]);
    assert_eq!(engine.total_question_count(), 5);
  }

  #[test]
  fn test_difficulty_filter_is_or_within_dimension() {
    let universe = vec![
      english("a", "INI", Difficulty::Easy),
      english("b", "INI", Difficulty::Medium),
      math("c", "H", Difficulty::Hard),
      math("d", "H", Difficulty::Medium),
      math("e", "P", Difficulty::Easy),
    ];
    let mut engine = engine_over(universe);
    engine.add_difficulty_filter("E");
    engine.add_difficulty_filter("H");

    assert_eq!(engine.filtered_question_count(), 3);
    assert_eq!(ids(engine.filtered_identifiers()), vec!["a", "c", "e"]);
  }

  #[test]
  fn test_filters_are_and_across_dimensions() {
    let mut engine = engine_over(small_universe());
    engine.add_filter_category("Advanced Math");
    engine.add_filter_category("Algebra");
    engine.add_difficulty_filter("E");

    assert_eq!(ids(engine.filtered_identifiers()), vec!["m2"]);
    for q in engine.filtered_identifiers() {
      let meta = q.metadata.as_ref().unwrap();
      assert!(engine.active_categories().contains(&SatCategories.category_of(meta)));
      assert!(engine.active_difficulties().contains(&meta.difficulty));
    }
  }

  #[test]
  fn test_exclude_active_removes_live_ids() {
    let mut engine = engine_with(&memory_pool());
    engine.initialize();
    let live: HashSet<String> = ["e1".to_string()].into_iter().collect();
    engine.set_universe(small_universe(), live, HashSet::new(), SubjectPreference::Both, true);

    assert_eq!(engine.total_question_count(), 4);
    assert!(engine.filtered_identifiers().iter().all(|q| q.id != "e1"));
  }

  #[test]
  fn test_live_ids_kept_when_exclusion_off() {
    let mut engine = engine_with(&memory_pool());
    let live: HashSet<String> = ["e1".to_string()].into_iter().collect();
    engine.set_universe(small_universe(), live, HashSet::new(), SubjectPreference::Both, false);
    assert_eq!(engine.total_question_count(), 5);
  }

  #[test]
  fn test_subject_preference_restricts_universe() {
    let mut engine = engine_with(&memory_pool());
    engine.set_universe(small_universe(), HashSet::new(), HashSet::new(), SubjectPreference::Math, false);

    assert_eq!(engine.total_question_count(), 2);
    assert!(
      engine
        .filtered_identifiers()
        .iter()
        .all(|q| q.subject_type == SubjectType::Math)
    );
  }

  #[test]
  fn test_questions_without_metadata_are_not_counted() {
    let mut universe = small_universe();
    universe.push(bare("x1", SubjectType::Math));
    let engine = engine_over(universe);

    assert_eq!(engine.total_question_count(), 5);
    assert_eq!(engine.filtered_question_count(), 5);
  }

  #[test]
  fn test_duplicate_identifiers_collapse() {
    let mut universe = small_universe();
    universe.push(math("m1", "H", Difficulty::Medium));
    let engine = engine_over(universe);
    assert_eq!(engine.total_question_count(), 5);
  }

  #[test]
  fn test_toggle_twice_restores_state() {
    let mut engine = engine_over(small_universe());
    engine.add_difficulty_filter("M");
    let before_categories = engine.active_categories().clone();
    let before = ids(engine.filtered_identifiers()).join(",");

    engine.toggle_filter_category("Algebra");
    assert_ne!(ids(engine.filtered_identifiers()).join(","), before);
    engine.toggle_filter_category("Algebra");

    assert_eq!(engine.active_categories(), &before_categories);
    assert_eq!(ids(engine.filtered_identifiers()).join(","), before);
  }

  #[test]
  fn test_toggle_difficulty_twice_restores_state() {
    let mut engine = engine_over(small_universe());
    assert!(engine.toggle_difficulty_filter("H"));
    assert_eq!(engine.filtered_question_count(), 1);
    assert!(engine.toggle_difficulty_filter("H"));
    assert!(engine.active_difficulties().is_empty());
    assert_eq!(engine.filtered_question_count(), 5);
  }

  #[test]
  fn test_invalid_category_is_ignored() {
    let mut engine = engine_over(small_universe());
    let revision = engine.snapshot().revision;

    assert!(!engine.add_filter_category("Calculus"));
    assert!(!engine.toggle_filter_category("Calculus"));
    assert!(engine.active_categories().is_empty());
    assert_eq!(engine.snapshot().revision, revision);
  }

  #[test]
  fn test_invalid_difficulty_is_ignored() {
    let mut engine = engine_over(small_universe());
    assert!(!engine.add_difficulty_filter("X"));
    assert!(!engine.remove_difficulty_filter("X"));
    assert!(engine.active_difficulties().is_empty());
  }

  #[test]
  fn test_remove_absent_category_is_noop() {
    let mut engine = engine_over(small_universe());
    assert!(!engine.remove_filter_category("Algebra"));
  }

  #[test]
  fn test_clear_all_filters() {
    let pool = memory_pool();
    let mut engine = engine_with(&pool);
    engine.set_universe(small_universe(), HashSet::new(), HashSet::new(), SubjectPreference::Both, false);
    engine.add_filter_category("Algebra");
    engine.add_difficulty_filter("E");

    let revision = engine.snapshot().revision;
    assert!(engine.clear_all_filters());

    assert_eq!(engine.snapshot().revision, revision + 1);
    assert!(!engine.has_active_filters());
    assert_eq!(engine.filtered_question_count(), 5);
    assert_eq!(pool.load_filters().unwrap(), PersistedFilters::default());
    assert!(!engine.clear_all_filters());
  }

  #[test]
  fn test_filters_persist_and_restore() {
    let pool = memory_pool();
    {
      let mut engine = engine_with(&pool);
      engine.initialize();
      engine.add_filter_category("Algebra");
      engine.add_filter_category("Craft and Structure");
      engine.add_difficulty_filter("H");
      engine.add_difficulty_filter("E");
    }

    let mut restored = engine_with(&pool);
    restored.initialize();

    let categories: Vec<_> = restored.active_categories().iter().cloned().collect();
    assert_eq!(categories, vec!["Algebra", "Craft and Structure"]);
    let difficulties: Vec<_> = restored.active_difficulties().iter().copied().collect();
    assert_eq!(difficulties, vec![Difficulty::Easy, Difficulty::Hard]);
  }

  #[test]
  fn test_initialize_runs_once() {
    let pool = memory_pool();
    let mut engine = engine_with(&pool);
    engine.initialize();
    engine.add_filter_category("Algebra");

    pool
      .save_filters(&PersistedFilters {
        categories: vec!["Geometry and Trigonometry".into()],
        difficulties: vec![],
      })
      .unwrap();
    engine.initialize();

    assert!(engine.active_categories().contains("Algebra"));
    assert_eq!(engine.active_categories().len(), 1);
  }

  #[test]
  fn test_initialize_with_failing_store_starts_empty() {
    let mut engine = failing_engine();
    engine.initialize();

    assert!(engine.is_initialized());
    assert!(!engine.has_active_filters());
  }

  #[test]
  fn test_save_failure_keeps_memory_state() {
    let mut engine = failing_engine();
    engine.set_universe(small_universe(), HashSet::new(), HashSet::new(), SubjectPreference::Both, false);

    assert!(engine.add_filter_category("Algebra"));
    assert_eq!(engine.filtered_question_count(), 1);
  }

  #[test]
  fn test_observer_sees_persisted_state() {
    let pool = memory_pool();
    let mut engine = engine_with(&pool);
    engine.set_universe(small_universe(), HashSet::new(), HashSet::new(), SubjectPreference::Both, false);
    let mut rx = engine.subscribe();
    let _ = rx.borrow_and_update();

    engine.add_filter_category("Algebra");

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.active_categories, vec!["Algebra"]);
    assert_eq!(snapshot.filtered_question_count, 1);
    assert_eq!(pool.load_filters().unwrap().categories, vec!["Algebra"]);
  }

  #[test]
  fn test_available_difficulties_in_fixed_order() {
    let universe = vec![
      math("a", "H", Difficulty::Hard),
      math("b", "H", Difficulty::Easy),
      math("c", "H", Difficulty::Hard),
    ];
    let engine = engine_over(universe);
    assert_eq!(engine.available_difficulties(), vec![Difficulty::Easy, Difficulty::Hard]);
  }

  #[test]
  fn test_category_counts_ignore_active_filters() {
    let mut engine = engine_over(small_universe());
    engine.add_filter_category("Algebra");

    let counts = engine.category_counts();
    let algebra = counts.iter().find(|c| c.value == "Algebra").unwrap();
    assert_eq!(algebra.count, 1);
    assert!(algebra.active);

    let available = engine.available_categories();
    assert_eq!(available.len(), 5);
    assert!(!available.contains(&"Expression of Ideas".to_string()));
  }

  #[test]
  fn test_difficulty_counts() {
    let engine = engine_over(small_universe());
    let counts: Vec<usize> = engine.difficulty_counts().iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![2, 2, 1]);
  }

  #[test]
  fn test_unseen_count() {
    let mut engine = engine_with(&memory_pool());
    let seen: HashSet<String> = ["e1".to_string(), "m2".to_string()].into_iter().collect();
    engine.set_universe(small_universe(), HashSet::new(), seen, SubjectPreference::Both, false);
    assert_eq!(engine.unseen_question_count(), 3);

    engine.mark_seen("e2");
    assert_eq!(engine.unseen_question_count(), 2);
  }

  #[test]
  fn test_update_preferences_recomputes() {
    let mut engine = engine_over(small_universe());
    assert!(engine.update_preferences(SubjectPreference::English, false));
    assert_eq!(engine.total_question_count(), 3);
    assert!(!engine.update_preferences(SubjectPreference::English, false));
  }

  #[test]
  fn test_overview_shape() {
    let mut engine = engine_over(small_universe());
    engine.add_difficulty_filter("E");
    let overview = engine.overview();

    assert_eq!(overview.total_question_count, 5);
    assert_eq!(overview.filtered_question_count, 2);
    assert_eq!(overview.active_difficulties, vec!["E"]);
    assert_eq!(overview.categories.len(), 8);
    assert_eq!(overview.difficulties.len(), 3);
  }
}
