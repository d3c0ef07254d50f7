//! Question bank client.
//!
//! Identifier lists and live items come from the reporting question bank;
//! question content comes from the bank for external ids and from the
//! disclosed-item store for IBN ids.

use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{LiveIdentifiers, QuestionSource, SourceError};
use crate::config::{self, ApiConfig};
use crate::domain::record::{identifiers_from_records, non_blank_string};
use crate::domain::{AnswerOption, IdType, QuestionDetail, QuestionIdentifier, SubjectType};

pub struct CollegeBoardSource {
  client: reqwest::Client,
  base_url: String,
  disclosed_url: String,
  asmt_event_id: u32,
}

impl CollegeBoardSource {
  pub fn new(api: &ApiConfig) -> Result<Self, SourceError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(api.timeout_secs))
      .build()?;

    Ok(Self {
      client,
      base_url: api.base_url.trim_end_matches('/').to_string(),
      disclosed_url: api.disclosed_url.trim_end_matches('/').to_string(),
      asmt_event_id: api.asmt_event_id,
    })
  }

  async fn get_json(&self, url: &str) -> Result<Value, SourceError> {
    let resp = self.client.get(url).send().await?;
    if !resp.status().is_success() {
      return Err(SourceError::Status(resp.status().as_u16()));
    }
    Ok(resp.json().await?)
  }

  async fn post_json(&self, url: &str, body: &Value) -> Result<Value, SourceError> {
    let resp = self.client.post(url).json(body).send().await?;
    if !resp.status().is_success() {
      return Err(SourceError::Status(resp.status().as_u16()));
    }
    Ok(resp.json().await?)
  }
}

impl QuestionSource for CollegeBoardSource {
  async fn fetch_identifiers(
    &self,
    subject: SubjectType,
    domains: &[&str],
  ) -> Result<Vec<QuestionIdentifier>, SourceError> {
    let body = json!({
      "asmtEventId": self.asmt_event_id,
      "test": config::subject_test_id(subject),
      "domain": domains.join(","),
    });
    let url = format!("{}/digital/get-questions", self.base_url);
    let value = self.post_json(&url, &body).await?;

    let records = value
      .as_array()
      .ok_or_else(|| SourceError::Malformed("question list is not an array".into()))?;
    let identifiers = identifiers_from_records(records, subject);

    tracing::debug!(
      "Fetched {} {} identifiers ({} records)",
      identifiers.len(),
      subject.as_str(),
      records.len()
    );
    Ok(identifiers)
  }

  async fn fetch_live_identifiers(&self) -> Result<LiveIdentifiers, SourceError> {
    let url = format!("{}/lookup", self.base_url);
    let value = self.get_json(&url).await?;
    Ok(parse_live_identifiers(&value))
  }

  async fn fetch_question_content(
    &self,
    identifier: &QuestionIdentifier,
  ) -> Result<QuestionDetail, SourceError> {
    match identifier.id_type {
      IdType::External => {
        let url = format!("{}/digital/get-question", self.base_url);
        let value = self
          .post_json(&url, &json!({ "external_id": identifier.id }))
          .await?;
        parse_bank_question(identifier, &value)
      }
      IdType::Ibn => {
        let url = format!("{}/{}.json", self.disclosed_url, identifier.id);
        let value = self.get_json(&url).await?;
        parse_disclosed_question(identifier, &value)
      }
    }
  }
}

// ==================== Response Parsing ====================

fn string_list(value: Option<&Value>) -> Vec<String> {
  value
    .and_then(Value::as_array)
    .map(|items| items.iter().filter_map(non_blank_string).collect())
    .unwrap_or_default()
}

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
  object.get(key).and_then(non_blank_string)
}

/// Option letters in display order
fn option_letter(index: usize) -> String {
  char::from(b'A' + (index % 26) as u8).to_string()
}

pub fn parse_live_identifiers(value: &Value) -> LiveIdentifiers {
  LiveIdentifiers {
    math_ids: string_list(value.get("mathLiveItems")),
    english_ids: string_list(value.get("readingLiveItems")),
  }
}

/// Parse a `get-question` response. Options are relabelled A, B, C... in order,
/// which is how the bank reports the correct answer.
pub fn parse_bank_question(
  identifier: &QuestionIdentifier,
  value: &Value,
) -> Result<QuestionDetail, SourceError> {
  let object = value
    .as_object()
    .ok_or_else(|| SourceError::Malformed(format!("question {} is not an object", identifier.id)))?;

  let stem = text(object, "stem")
    .ok_or_else(|| SourceError::Malformed(format!("question {} has no stem", identifier.id)))?;

  let answer_options = match object.get("answerOptions") {
    Some(Value::Array(options)) => options
      .iter()
      .enumerate()
      .map(|(i, option)| AnswerOption {
        id: option_letter(i),
        content: option
          .get("content")
          .and_then(non_blank_string)
          .unwrap_or_default(),
      })
      .collect(),
    // Some responses key options by their letter
    Some(Value::Object(options)) => {
      let mut options: Vec<_> = options
        .iter()
        .map(|(key, option)| AnswerOption {
          id: key.to_uppercase(),
          content: option
            .get("body")
            .or_else(|| option.get("content"))
            .and_then(non_blank_string)
            .unwrap_or_default(),
        })
        .collect();
      options.sort_by(|a, b| a.id.cmp(&b.id));
      options
    }
    _ => Vec::new(),
  };

  Ok(QuestionDetail {
    unique_id: identifier.id.clone(),
    subject_type: identifier.subject_type,
    stimulus: text(object, "stimulus"),
    stem,
    answer_options,
    correct_answers: string_list(object.get("correct_answer")),
    rationale: text(object, "rationale"),
  })
}

/// Parse a disclosed item, which arrives as a one-element array
pub fn parse_disclosed_question(
  identifier: &QuestionIdentifier,
  value: &Value,
) -> Result<QuestionDetail, SourceError> {
  let item = match value {
    Value::Array(items) => items.first(),
    other => Some(other),
  }
  .and_then(Value::as_object)
  .ok_or_else(|| SourceError::Malformed(format!("disclosed item {} is empty", identifier.id)))?;

  let answer = item.get("answer").and_then(Value::as_object);

  let mut answer_options: Vec<AnswerOption> = answer
    .and_then(|a| a.get("choices"))
    .and_then(Value::as_object)
    .map(|choices| {
      choices
        .iter()
        .map(|(key, choice)| AnswerOption {
          id: key.to_uppercase(),
          content: choice
            .get("body")
            .and_then(non_blank_string)
            .unwrap_or_default(),
        })
        .collect()
    })
    .unwrap_or_default();
  answer_options.sort_by(|a, b| a.id.cmp(&b.id));

  let correct_answers = match answer.and_then(|a| a.get("correct_choice")) {
    Some(Value::Array(items)) => items.iter().filter_map(non_blank_string).collect(),
    Some(v) => non_blank_string(v)
      .map(|s| s.split(',').map(|c| c.trim().to_uppercase()).collect())
      .unwrap_or_default(),
    None => Vec::new(),
  };

  let stem = text(item, "prompt")
    .or_else(|| text(item, "body"))
    .ok_or_else(|| SourceError::Malformed(format!("disclosed item {} has no prompt", identifier.id)))?;

  // When both are present the body is the passage and the prompt is the question
  let stimulus = text(item, "prompt").and(text(item, "body"));

  Ok(QuestionDetail {
    unique_id: identifier.id.clone(),
    subject_type: identifier.subject_type,
    stimulus,
    stem,
    answer_options,
    correct_answers,
    rationale: answer.and_then(|a| text(a, "rationale")),
  })
}
