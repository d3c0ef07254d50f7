use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Which section of the test a question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
  English,
  Math,
}

impl SubjectType {
  pub const ALL: [SubjectType; 2] = [Self::English, Self::Math];

  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "english" | "reading" | "rw" => Some(Self::English),
      "math" => Some(Self::Math),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::English => "english",
      Self::Math => "math",
    }
  }
}

/// The user's subject choice. `Both` disables subject narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectPreference {
  English,
  Math,
  #[default]
  Both,
}

impl SubjectPreference {
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "english" => Some(Self::English),
      "math" => Some(Self::Math),
      "both" => Some(Self::Both),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::English => "english",
      Self::Math => "math",
      Self::Both => "both",
    }
  }

  pub fn includes(&self, subject: SubjectType) -> bool {
    match self {
      Self::Both => true,
      Self::English => subject == SubjectType::English,
      Self::Math => subject == SubjectType::Math,
    }
  }

  /// Subjects covered by this preference, English first
  pub fn subjects(&self) -> &'static [SubjectType] {
    match self {
      Self::English => &[SubjectType::English],
      Self::Math => &[SubjectType::Math],
      Self::Both => &SubjectType::ALL,
    }
  }
}

/// Identifier namespace used by the question bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
  External,
  #[serde(rename = "IBN")]
  Ibn,
}

/// Question difficulty. Ordered Easy < Medium < Hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Difficulty {
  #[serde(rename = "E")]
  Easy,
  #[default]
  #[serde(rename = "M")]
  Medium,
  #[serde(rename = "H")]
  Hard,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

  /// Parse a single-letter code or a spelled-out level, case-insensitively
  pub fn from_code(s: &str) -> Option<Self> {
    match s.trim().to_uppercase().as_str() {
      "E" | "EASY" => Some(Self::Easy),
      "M" | "MEDIUM" => Some(Self::Medium),
      "H" | "HARD" => Some(Self::Hard),
      _ => None,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::Easy => "E",
      Self::Medium => "M",
      Self::Hard => "H",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::Easy => "Easy",
      Self::Medium => "Medium",
      Self::Hard => "Hard",
    }
  }
}

/// Classification attached to a question identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMetadata {
  pub skill_description: String,
  pub primary_class_description: String,
  /// Normalized difficulty; unrecognized source values land on Medium
  pub difficulty: Difficulty,
  /// Difficulty exactly as the source reported it, for display only
  pub raw_difficulty: String,
  pub skill_code: String,
  pub primary_class_code: String,
}

/// A lightweight reference to a question, without its content.
///
/// Equality and hashing only look at `(id_type, id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionIdentifier {
  pub id: String,
  pub id_type: IdType,
  pub subject_type: SubjectType,
  pub metadata: Option<QuestionMetadata>,
}

impl QuestionIdentifier {
  /// Returns None for an empty id
  pub fn new(id: impl Into<String>, id_type: IdType, subject_type: SubjectType) -> Option<Self> {
    let id = id.into();
    if id.trim().is_empty() {
      return None;
    }
    Some(Self {
      id,
      id_type,
      subject_type,
      metadata: None,
    })
  }

  pub fn with_metadata(mut self, metadata: Option<QuestionMetadata>) -> Self {
    self.metadata = metadata;
    self
  }

  pub fn difficulty(&self) -> Option<Difficulty> {
    self.metadata.as_ref().map(|m| m.difficulty)
  }
}

impl PartialEq for QuestionIdentifier {
  fn eq(&self, other: &Self) -> bool {
    self.id_type == other.id_type && self.id == other.id
  }
}

impl Eq for QuestionIdentifier {}

impl Hash for QuestionIdentifier {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id_type.hash(state);
    self.id.hash(state);
  }
}

/// One answer choice of a multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
  pub id: String,
  /// Raw HTML fragment
  pub content: String,
}

/// Full question content as returned by the question source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetail {
  /// Identifier id; this is the key written to the seen cache
  pub unique_id: String,
  pub subject_type: SubjectType,
  pub stimulus: Option<String>,
  pub stem: String,
  /// Empty for free-response questions
  pub answer_options: Vec<AnswerOption>,
  pub correct_answers: Vec<String>,
  pub rationale: Option<String>,
}

impl QuestionDetail {
  pub fn is_free_response(&self) -> bool {
    self.answer_options.is_empty()
  }

  /// Whether `answer` is an acceptable selection for this question
  pub fn accepts_selection(&self, answer: &str) -> bool {
    let answer = answer.trim();
    if answer.is_empty() {
      return false;
    }
    self.is_free_response()
      || self
        .answer_options
        .iter()
        .any(|o| o.id.eq_ignore_ascii_case(answer))
  }

  pub fn is_correct(&self, answer: &str) -> bool {
    let answer = answer.trim();
    self
      .correct_answers
      .iter()
      .any(|c| c.trim().eq_ignore_ascii_case(answer))
  }
}
