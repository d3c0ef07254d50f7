//! Where question identifiers and content come from.

pub mod collegeboard;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;

use crate::domain::{QuestionDetail, QuestionIdentifier, SubjectType};

pub use collegeboard::CollegeBoardSource;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
  #[error("Request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Question bank returned status {0}")]
  Status(u16),

  #[error("Malformed response: {0}")]
  Malformed(String),
}

/// Ids currently in use on live tests, split by section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveIdentifiers {
  pub math_ids: Vec<String>,
  pub english_ids: Vec<String>,
}

impl LiveIdentifiers {
  pub fn all_ids(&self) -> HashSet<String> {
    self
      .math_ids
      .iter()
      .chain(self.english_ids.iter())
      .cloned()
      .collect()
  }
}

pub trait QuestionSource: Send + Sync {
  fn fetch_identifiers(
    &self,
    subject: SubjectType,
    domains: &[&str],
  ) -> impl Future<Output = Result<Vec<QuestionIdentifier>, SourceError>> + Send;

  fn fetch_live_identifiers(&self) -> impl Future<Output = Result<LiveIdentifiers, SourceError>> + Send;

  fn fetch_question_content(
    &self,
    identifier: &QuestionIdentifier,
  ) -> impl Future<Output = Result<QuestionDetail, SourceError>> + Send;
}
