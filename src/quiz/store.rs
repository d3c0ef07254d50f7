//! Durable state the quiz engine depends on.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::db::StoreError;
use crate::domain::SubjectPreference;

/// Filter selections as written to storage. Order is only for serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedFilters {
  pub categories: Vec<String>,
  pub difficulties: Vec<String>,
}

pub trait FilterStore: Send + Sync {
  fn load_filters(&self) -> Result<PersistedFilters, StoreError>;
  fn save_filters(&self, filters: &PersistedFilters) -> Result<(), StoreError>;
}

pub trait PreferenceStore: Send + Sync {
  fn subject_preference(&self) -> Result<SubjectPreference, StoreError>;
  fn set_subject_preference(&self, preference: SubjectPreference) -> Result<(), StoreError>;
  fn exclude_active(&self) -> Result<bool, StoreError>;
  fn set_exclude_active(&self, enabled: bool) -> Result<(), StoreError>;
}

/// Append-only record of questions already shown, plus a bulk reset
pub trait SeenStore: Send + Sync {
  fn seen_ids(&self) -> Result<HashSet<String>, StoreError>;
  fn add_seen_id(&self, question_id: &str) -> Result<(), StoreError>;
  fn clear_all(&self) -> Result<(), StoreError>;

  fn seen_count(&self) -> Result<usize, StoreError> {
    self.seen_ids().map(|ids| ids.len())
  }
}
