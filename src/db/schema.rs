use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS settings (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS seen_questions (
      question_id TEXT PRIMARY KEY,
      seen_at TEXT NOT NULL
    );

    -- Default settings
    INSERT OR IGNORE INTO settings (key, value) VALUES ('subject_preference', 'both');
    INSERT OR IGNORE INTO settings (key, value) VALUES ('exclude_active_questions', 'false');
    "#,
  )?;

  Ok(())
}
