pub mod schema;
pub mod seen;
pub mod settings;

use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::SubjectPreference;
use crate::quiz::store::{FilterStore, PersistedFilters, PreferenceStore, SeenStore};

pub use schema::run_migrations;
pub use settings::{CATEGORY_FILTERS_KEY, DIFFICULTY_FILTERS_KEY};

pub type DbPool = Arc<Mutex<Connection>>;

/// Failure reading or writing durable state
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database unavailable")]
  Unavailable,

  #[error("Database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("Encoding error: {0}")]
  Encoding(#[from] serde_json::Error),
}

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
  /// Log the error at warn level and return None
  fn log_warn(self, context: &str) -> Option<T>;
  /// Log the error at warn level and return the default
  fn log_warn_default(self, context: &str) -> T
  where
    T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
  fn log_warn(self, context: &str) -> Option<T> {
    match self {
      Ok(v) => Some(v),
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        None
      }
    }
  }

  fn log_warn_default(self, context: &str) -> T
  where
    T: Default,
  {
    match self {
      Ok(v) => v,
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        T::default()
      }
    }
  }
}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> Result<MutexGuard<'_, Connection>, StoreError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    StoreError::Unavailable
  })
}

pub fn init_db(path: &Path) -> Result<DbPool, StoreError> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).ok();
  }

  let conn = Connection::open(path)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Fresh database that lives only as long as the pool
pub fn open_in_memory() -> Result<DbPool, StoreError> {
  let conn = Connection::open_in_memory()?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

// ==================== Store Implementations ====================

impl FilterStore for DbPool {
  fn load_filters(&self) -> Result<PersistedFilters, StoreError> {
    let conn = try_lock(self)?;
    Ok(PersistedFilters {
      categories: settings::get_string_list(&conn, CATEGORY_FILTERS_KEY)?,
      difficulties: settings::get_string_list(&conn, DIFFICULTY_FILTERS_KEY)?,
    })
  }

  fn save_filters(&self, filters: &PersistedFilters) -> Result<(), StoreError> {
    let mut conn = try_lock(self)?;
    let tx = conn.transaction()?;
    settings::set_string_list(&tx, CATEGORY_FILTERS_KEY, &filters.categories)?;
    settings::set_string_list(&tx, DIFFICULTY_FILTERS_KEY, &filters.difficulties)?;
    tx.commit()?;
    Ok(())
  }
}

impl PreferenceStore for DbPool {
  fn subject_preference(&self) -> Result<SubjectPreference, StoreError> {
    settings::get_subject_preference(&*try_lock(self)?)
  }

  fn set_subject_preference(&self, preference: SubjectPreference) -> Result<(), StoreError> {
    settings::set_subject_preference(&*try_lock(self)?, preference)
  }

  fn exclude_active(&self) -> Result<bool, StoreError> {
    settings::get_exclude_active(&*try_lock(self)?)
  }

  fn set_exclude_active(&self, enabled: bool) -> Result<(), StoreError> {
    settings::set_exclude_active(&*try_lock(self)?, enabled)
  }
}

impl SeenStore for DbPool {
  fn seen_ids(&self) -> Result<HashSet<String>, StoreError> {
    seen::get_seen_ids(&*try_lock(self)?)
  }

  fn add_seen_id(&self, question_id: &str) -> Result<(), StoreError> {
    seen::add_seen_id(&*try_lock(self)?, question_id)
  }

  fn clear_all(&self) -> Result<(), StoreError> {
    let removed = seen::clear_seen(&*try_lock(self)?)?;
    tracing::info!("Cleared {} seen questions", removed);
    Ok(())
  }

  fn seen_count(&self) -> Result<usize, StoreError> {
    let count = seen::get_seen_count(&*try_lock(self)?)?;
    Ok(count.max(0) as usize)
  }
}
