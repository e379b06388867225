use thiserror::Error;

/// Failures surfaced by the session core. None of them leave partial state
/// behind: a rejected call changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("answer must be a whole number, got {input:?}")]
    InvalidAnswer { input: String },

    #[error("cannot {event} while in {phase}")]
    InvalidTransition { event: String, phase: String },

    #[error("no attempts recorded yet; nothing to export")]
    EmptyExport,

    #[error("participant consent is required before starting")]
    ConsentRequired,

    #[error("recall guess is required for the {condition} condition")]
    MissingRecall { condition: String },

    #[error("invalid survey field `{field}`: {reason}")]
    InvalidSurvey { field: &'static str, reason: String },
}

impl SessionError {
    /// True for errors caused by participant input, which the caller should
    /// re-prompt for. Everything else is a sequencing bug in the caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SessionError::InvalidTransition { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
