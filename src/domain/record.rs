//! Conversion of raw question bank records into typed identifiers.
//!
//! Records arrive as untyped JSON objects. Missing or null fields fall back
//! to the defaults below; non-string values are stringified. Nothing here
//! fails: a record that cannot be interpreted yields `None`.

use serde_json::{Map, Value};

use super::{Difficulty, IdType, QuestionIdentifier, QuestionMetadata, SubjectType};

pub type Record = Map<String, Value>;

/// A metadata field and the value used when the record lacks it
struct Field {
  key: &'static str,
  default: &'static str,
}

const SKILL_DESC: Field = Field { key: "skill_desc", default: "Unknown Skill" };
const PRIMARY_CLASS_DESC: Field = Field { key: "primary_class_cd_desc", default: "Unknown Category" };
const DIFFICULTY: Field = Field { key: "difficulty", default: "M" };
const SKILL_CODE: Field = Field { key: "skill_cd", default: "" };
const PRIMARY_CLASS_CODE: Field = Field { key: "primary_class_cd", default: "" };

const METADATA_FIELDS: [&Field; 5] = [
  &SKILL_DESC,
  &PRIMARY_CLASS_DESC,
  &DIFFICULTY,
  &SKILL_CODE,
  &PRIMARY_CLASS_CODE,
];

const EXTERNAL_ID_KEY: &str = "external_id";
const IBN_KEY: &str = "ibn";

/// Stringify a JSON value. Only null counts as absent.
pub fn value_to_string(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

/// Like `value_to_string`, but blank strings count as absent too
pub fn non_blank_string(value: &Value) -> Option<String> {
  value_to_string(value).filter(|s| !s.trim().is_empty())
}

fn field_value(record: &Record, field: &Field) -> String {
  record
    .get(field.key)
    .and_then(value_to_string)
    .unwrap_or_else(|| field.default.to_string())
}

/// Build metadata if at least one recognized metadata key is present
pub fn extract_metadata(record: &Record) -> Option<QuestionMetadata> {
  if !METADATA_FIELDS.iter().any(|f| record.contains_key(f.key)) {
    return None;
  }

  let raw_difficulty = field_value(record, &DIFFICULTY);
  let difficulty = Difficulty::from_code(&raw_difficulty).unwrap_or_default();

  Some(QuestionMetadata {
    skill_description: field_value(record, &SKILL_DESC),
    primary_class_description: field_value(record, &PRIMARY_CLASS_DESC),
    difficulty,
    raw_difficulty,
    skill_code: field_value(record, &SKILL_CODE),
    primary_class_code: field_value(record, &PRIMARY_CLASS_CODE),
  })
}

/// Build an identifier from a record, preferring the external id over the IBN.
///
/// Returns None when the record carries neither.
pub fn identifier_from_record(record: &Record, subject: SubjectType) -> Option<QuestionIdentifier> {
  let (id, id_type) = record
    .get(EXTERNAL_ID_KEY)
    .and_then(non_blank_string)
    .map(|id| (id, IdType::External))
    .or_else(|| {
      record
        .get(IBN_KEY)
        .and_then(non_blank_string)
        .map(|id| (id, IdType::Ibn))
    })?;

  QuestionIdentifier::new(id, id_type, subject).map(|q| q.with_metadata(extract_metadata(record)))
}

/// Convert a list of records, skipping the ones without an identifier
pub fn identifiers_from_records(records: &[Value], subject: SubjectType) -> Vec<QuestionIdentifier> {
  records
    .iter()
    .filter_map(Value::as_object)
    .filter_map(|r| identifier_from_record(r, subject))
    .collect()
}
