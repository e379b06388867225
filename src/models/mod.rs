pub mod attempt;
pub mod condition;
pub mod survey;

pub use attempt::{AbandonReason, AttemptRecord, BlockPatch, SessionPatch};
pub use condition::{Condition, ConditionKind};
pub use survey::{BlockSurvey, Demographics, FinalSurvey, YearOfStudy};
