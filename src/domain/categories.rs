//! Question bank classification codes and their user-facing names.

use super::{QuestionMetadata, SubjectPreference, SubjectType};

/// Maps raw classification codes to category names
pub trait CategoryMapping: Send + Sync {
  fn is_valid_category(&self, name: &str) -> bool;

  /// Friendly name for a code. Unknown codes are returned unchanged.
  fn to_user_friendly_category(&self, code: &str) -> String;

  /// Categories a user may filter on for the given preference, in display order
  fn filterable_categories(&self, preference: SubjectPreference) -> Vec<String>;

  /// The category a question is filed under
  fn category_of(&self, metadata: &QuestionMetadata) -> String {
    if metadata.primary_class_code.is_empty() {
      metadata.primary_class_description.clone()
    } else {
      self.to_user_friendly_category(&metadata.primary_class_code)
    }
  }
}

/// Category definition
pub struct CategoryInfo {
  pub code: &'static str,
  pub name: &'static str,
  pub subject: SubjectType,
}

/// Reading and Writing domains followed by Math domains
pub const CATEGORIES: [CategoryInfo; 8] = [
  CategoryInfo {
    code: "INI",
    name: "Information and Ideas",
    subject: SubjectType::English,
  },
  CategoryInfo {
    code: "CAS",
    name: "Craft and Structure",
    subject: SubjectType::English,
  },
  CategoryInfo {
    code: "EOI",
    name: "Expression of Ideas",
    subject: SubjectType::English,
  },
  CategoryInfo {
    code: "SEC",
    name: "Standard English Conventions",
    subject: SubjectType::English,
  },
  CategoryInfo {
    code: "H",
    name: "Algebra",
    subject: SubjectType::Math,
  },
  CategoryInfo {
    code: "P",
    name: "Advanced Math",
    subject: SubjectType::Math,
  },
  CategoryInfo {
    code: "Q",
    name: "Problem-Solving and Data Analysis",
    subject: SubjectType::Math,
  },
  CategoryInfo {
    code: "S",
    name: "Geometry and Trigonometry",
    subject: SubjectType::Math,
  },
];

/// Get category info by code
pub fn get_category_info(code: &str) -> Option<&'static CategoryInfo> {
  CATEGORIES.iter().find(|c| c.code.eq_ignore_ascii_case(code.trim()))
}

/// Domain codes sent to the question bank when fetching a subject
pub fn domain_codes(subject: SubjectType) -> Vec<&'static str> {
  CATEGORIES
    .iter()
    .filter(|c| c.subject == subject)
    .map(|c| c.code)
    .collect()
}

/// The built-in digital SAT category table
#[derive(Debug, Clone, Copy, Default)]
pub struct SatCategories;

impl CategoryMapping for SatCategories {
  fn is_valid_category(&self, name: &str) -> bool {
    CATEGORIES.iter().any(|c| c.name == name)
  }

  fn to_user_friendly_category(&self, code: &str) -> String {
    get_category_info(code)
      .map(|c| c.name.to_string())
      .unwrap_or_else(|| code.to_string())
  }

  fn filterable_categories(&self, preference: SubjectPreference) -> Vec<String> {
    CATEGORIES
      .iter()
      .filter(|c| preference.includes(c.subject))
      .map(|c| c.name.to_string())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;

  fn metadata(code: &str, description: &str) -> QuestionMetadata {
    QuestionMetadata {
      skill_description: "Unknown Skill".into(),
      primary_class_description: description.into(),
      difficulty: Difficulty::Medium,
      raw_difficulty: "M".into(),
      skill_code: String::new(),
      primary_class_code: code.into(),
    }
  }

  #[test]
  fn test_code_to_friendly_name() {
    assert_eq!(SatCategories.to_user_friendly_category("H"), "Algebra");
    assert_eq!(SatCategories.to_user_friendly_category("ini"), "Information and Ideas");
    assert_eq!(SatCategories.to_user_friendly_category("ZZZ"), "ZZZ");
  }

  #[test]
  fn test_is_valid_category() {
    assert!(SatCategories.is_valid_category("Advanced Math"));
    assert!(!SatCategories.is_valid_category("Calculus"));
    assert!(!SatCategories.is_valid_category("P"));
  }

  #[test]
  fn test_filterable_categories_by_preference() {
    let math = SatCategories.filterable_categories(SubjectPreference::Math);
    assert_eq!(math.len(), 4);
    assert_eq!(math[0], "Algebra");

    let both = SatCategories.filterable_categories(SubjectPreference::Both);
    assert_eq!(both.len(), 8);
    assert_eq!(both[0], "Information and Ideas");
  }

  #[test]
  fn test_domain_codes() {
    assert_eq!(domain_codes(SubjectType::English), vec!["INI", "CAS", "EOI", "SEC"]);
    assert_eq!(domain_codes(SubjectType::Math), vec!["H", "P", "Q", "S"]);
  }

  #[test]
  fn test_category_of_prefers_code() {
    assert_eq!(SatCategories.category_of(&metadata("Q", "Whatever")), "Problem-Solving and Data Analysis");
    assert_eq!(SatCategories.category_of(&metadata("", "Geometry and Trigonometry")), "Geometry and Trigonometry");
  }
}
