pub mod categories;
pub mod question;
pub mod record;

pub use categories::{CategoryMapping, SatCategories};
pub use question::{
  AnswerOption, Difficulty, IdType, QuestionDetail, QuestionIdentifier, QuestionMetadata,
  SubjectPreference, SubjectType,
};
