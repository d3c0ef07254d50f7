pub mod filter;
pub mod selector;
pub mod service;
pub mod store;

pub use filter::{FilterEngine, FilterOverview, FilterSnapshot, OptionCount};
pub use selector::{AnswerOutcome, PoolUpdate, QuizSession, QuizSnapshot, QuizState};
pub use service::{QuizService, SettingsView};
pub use store::{FilterStore, PersistedFilters, PreferenceStore, SeenStore};
