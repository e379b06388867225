use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

use super::condition::ConditionKind;

const MAX_AGE: u8 = 120;

/// Answers to the survey shown after each block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockSurvey {
    pub satisfaction: u8,
    pub boredom: u8,
    /// Participant's recollection of the peer's matrix count.
    pub recall: Option<u32>,
}

impl BlockSurvey {
    /// Checks Likert ranges and the recall requirement for `condition`.
    /// Recall answers given under Control are dropped.
    pub fn validated(self, condition: ConditionKind, likert_max: u8) -> SessionResult<Self> {
        check_likert("satisfaction", self.satisfaction, likert_max)?;
        check_likert("boredom", self.boredom, likert_max)?;

        let recall = if condition.requires_recall() {
            if self.recall.is_none() {
                return Err(SessionError::MissingRecall {
                    condition: condition.to_string(),
                });
            }
            self.recall
        } else {
            None
        };

        Ok(Self { recall, ..self })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum YearOfStudy {
    Year(String),
    /// Free-text answer when none of the listed years apply.
    Other(String),
}

impl YearOfStudy {
    pub fn label(&self) -> String {
        match self {
            YearOfStudy::Year(year) => year.clone(),
            YearOfStudy::Other(detail) => format!("Other: {detail}"),
        }
    }
}

/// Answers to the final, once-per-session survey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalSurvey {
    pub importance: u8,
    pub distraction: u8,
    pub age: u8,
    pub gender: String,
    pub major: String,
    pub year_of_study: YearOfStudy,
}

impl FinalSurvey {
    pub fn into_demographics(self, likert_max: u8) -> SessionResult<Demographics> {
        check_likert("importance", self.importance, likert_max)?;
        check_likert("distraction", self.distraction, likert_max)?;
        if self.age == 0 || self.age > MAX_AGE {
            return Err(SessionError::InvalidSurvey {
                field: "age",
                reason: format!("must be between 1 and {MAX_AGE}"),
            });
        }
        let gender = required_text("gender", &self.gender)?;
        let major = required_text("major", &self.major)?;
        let year_of_study = match &self.year_of_study {
            YearOfStudy::Year(year) => required_text("yearOfStudy", year)?,
            YearOfStudy::Other(detail) => {
                required_text("yearOfStudy", detail)?;
                self.year_of_study.label()
            }
        };

        Ok(Demographics {
            importance: self.importance,
            distraction: self.distraction,
            age: self.age,
            gender,
            major,
            year_of_study,
        })
    }
}

/// Validated session-level fields as stamped onto every record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub importance: u8,
    pub distraction: u8,
    pub age: u8,
    pub gender: String,
    pub major: String,
    pub year_of_study: String,
}

fn check_likert(field: &'static str, value: u8, max: u8) -> SessionResult<()> {
    if value == 0 || value > max {
        return Err(SessionError::InvalidSurvey {
            field,
            reason: format!("{value} is outside 1..={max}"),
        });
    }
    Ok(())
}

fn required_text(field: &'static str, value: &str) -> SessionResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidSurvey {
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(trimmed.to_string())
}
