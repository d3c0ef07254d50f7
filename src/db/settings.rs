//! Key-value settings: subject preference, active-question exclusion and
//! the persisted filter selections.

use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;
use crate::domain::SubjectPreference;

type Result<T> = std::result::Result<T, StoreError>;

pub const CATEGORY_FILTERS_KEY: &str = "category_filters";
pub const DIFFICULTY_FILTERS_KEY: &str = "difficulty_filters";
pub const SUBJECT_PREFERENCE_KEY: &str = "subject_preference";
pub const EXCLUDE_ACTIVE_KEY: &str = "exclude_active_questions";

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
  let value = conn
    .query_row(
      "SELECT value FROM settings WHERE key = ?1",
      params![key],
      |row| row.get(0),
    )
    .optional()?;
  Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![key, value],
  )?;
  Ok(())
}

// ==================== Preferences ====================

pub fn get_subject_preference(conn: &Connection) -> Result<SubjectPreference> {
  Ok(get_setting(conn, SUBJECT_PREFERENCE_KEY)?
    .and_then(|v| SubjectPreference::from_str(&v))
    .unwrap_or_default())
}

pub fn set_subject_preference(conn: &Connection, preference: SubjectPreference) -> Result<()> {
  set_setting(conn, SUBJECT_PREFERENCE_KEY, preference.as_str())
}

pub fn get_exclude_active(conn: &Connection) -> Result<bool> {
  get_setting(conn, EXCLUDE_ACTIVE_KEY).map(|v| v.as_deref() == Some("true"))
}

pub fn set_exclude_active(conn: &Connection, enabled: bool) -> Result<()> {
  set_setting(conn, EXCLUDE_ACTIVE_KEY, if enabled { "true" } else { "false" })
}

// ==================== Filter Selections ====================

/// Read a JSON-encoded list of strings. A missing key is an empty list.
pub fn get_string_list(conn: &Connection, key: &str) -> Result<Vec<String>> {
  match get_setting(conn, key)? {
    Some(json) => Ok(serde_json::from_str(&json)?),
    None => Ok(Vec::new()),
  }
}

pub fn set_string_list(conn: &Connection, key: &str, values: &[String]) -> Result<()> {
  let json = serde_json::to_string(values)?;
  set_setting(conn, key, &json)
}
