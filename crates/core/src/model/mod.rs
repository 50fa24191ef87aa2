mod catalog;
mod ids;
mod question;
mod record;
mod summary;

pub use catalog::{CatalogError, QuestionCatalog};
pub use ids::{ExamSessionId, QuestionIndex};
pub use question::{Question, QuestionError, QuestionType};
pub use record::QuestionRecord;
pub use summary::{ExamSummary, QuestionOutcome};
