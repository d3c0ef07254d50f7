//! Application configuration.
//!
//! Values load with priority config.toml > environment (.env) > defaults.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::SubjectType;

// ==================== Defaults ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

pub const DEFAULT_DATABASE_PATH: &str = "data/sat_quiz.db";

pub const QBANK_API_URL: &str =
  "https://qbank-api.collegeboard.org/msreportingquestionbank-prod/questionbank";

pub const DISCLOSED_ITEMS_URL: &str = "https://saic.collegeboard.org/disclosed";

/// Assessment event for the digital SAT
pub const SAT_ASMT_EVENT_ID: u32 = 99;

pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Test id the question bank uses for each section
pub fn subject_test_id(subject: SubjectType) -> u8 {
  match subject {
    SubjectType::English => 1,
    SubjectType::Math => 2,
  }
}

// ==================== Config File ====================

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
  database: Option<DatabaseSection>,
  server: Option<ServerSection>,
  api: Option<ApiSection>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
  path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
  addr: Option<String>,
  port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ApiSection {
  base_url: Option<String>,
  disclosed_url: Option<String>,
  timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
  pub base_url: String,
  pub disclosed_url: String,
  pub asmt_event_id: u32,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: QBANK_API_URL.to_string(),
      disclosed_url: DISCLOSED_ITEMS_URL.to_string(),
      asmt_event_id: SAT_ASMT_EVENT_ID,
      timeout_secs: REQUEST_TIMEOUT_SECS,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub database_path: PathBuf,
  pub server_addr: String,
  pub server_port: u16,
  pub api: ApiConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
      server_addr: SERVER_ADDR.to_string(),
      server_port: SERVER_PORT,
      api: ApiConfig::default(),
    }
  }
}

impl AppConfig {
  /// Load from ./config.toml and the process environment
  pub fn load() -> Self {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let file = match std::fs::read_to_string("config.toml") {
      Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
        Ok(file) => file,
        Err(e) => {
          tracing::warn!("Ignoring invalid config.toml: {}", e);
          ConfigFile::default()
        }
      },
      Err(_) => ConfigFile::default(),
    };

    Self::resolve(file, |key| std::env::var(key).ok())
  }

  fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
    let mut config = Self::default();

    // Priority 2: environment
    if let Some(path) = env("DATABASE_PATH") {
      config.database_path = PathBuf::from(path);
    }
    if let Some(port) = env("SERVER_PORT").and_then(|p| p.parse().ok()) {
      config.server_port = port;
    }
    if let Some(url) = env("QBANK_API_URL") {
      config.api.base_url = url;
    }

    // Priority 1: config.toml
    if let Some(path) = file.database.and_then(|d| d.path) {
      config.database_path = PathBuf::from(path);
    }
    if let Some(server) = file.server {
      if let Some(addr) = server.addr {
        config.server_addr = addr;
      }
      if let Some(port) = server.port {
        config.server_port = port;
      }
    }
    if let Some(api) = file.api {
      if let Some(url) = api.base_url {
        config.api.base_url = url;
      }
      if let Some(url) = api.disclosed_url {
        config.api.disclosed_url = url;
      }
      if let Some(secs) = api.timeout_secs {
        config.api.timeout_secs = secs;
      }
    }

    tracing::info!("Using database path: {}", config.database_path.display());
    config
  }

  /// Get the full server bind address
  pub fn bind_addr(&self) -> String {
    format!("{}:{}", self.server_addr, self.server_port)
  }
}
