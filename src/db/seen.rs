//! Questions the user has already been shown, across sessions.

use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashSet;

use super::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

pub fn get_seen_ids(conn: &Connection) -> Result<HashSet<String>> {
  let mut stmt = conn.prepare("SELECT question_id FROM seen_questions")?;
  let ids = stmt
    .query_map([], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<HashSet<_>>>()?;
  Ok(ids)
}

/// Record a question as seen. Re-adding keeps the first timestamp.
pub fn add_seen_id(conn: &Connection, question_id: &str) -> Result<()> {
  conn.execute(
    "INSERT OR IGNORE INTO seen_questions (question_id, seen_at) VALUES (?1, ?2)",
    params![question_id, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

pub fn clear_seen(conn: &Connection) -> Result<usize> {
  Ok(conn.execute("DELETE FROM seen_questions", [])?)
}

pub fn get_seen_count(conn: &Connection) -> Result<i64> {
  Ok(conn.query_row("SELECT COUNT(*) FROM seen_questions", [], |row| row.get(0))?)
}
