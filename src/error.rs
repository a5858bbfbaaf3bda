//! Error taxonomy for answering prompts.
//!
//! Classification never fails; only the response path does. `CaptureFailed`
//! is normally absorbed by the coordinator's fallback path and only surfaces
//! when that fallback is disabled.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResponseError {
    /// The answer does not fit the prompt's expected shape.
    #[error("invalid answer '{answer}': {reason}")]
    InvalidAnswer { answer: String, reason: String },

    /// Re-verification found no live prompt in the pane.
    #[error("prompt is no longer active")]
    PromptNoLongerActive,

    /// The session manager could not capture the pane.
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// A valid key sequence was computed but could not be delivered.
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),
}

impl ResponseError {
    pub fn invalid_answer(answer: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAnswer {
            answer: answer.to_string(),
            reason: reason.into(),
        }
    }
}

/// Illegal prompt status transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("prompt was already answered with '{answer}'")]
    AlreadyAnswered { answer: String },
}
