//! Prompt detection and answer dispatch for AI coding-agent terminal panes.
//!
//! [`classifier::PromptClassifier`] turns a pane capture into a typed
//! [`prompt::Prompt`] (or "not a prompt"); [`responder::ResponseCoordinator`]
//! re-verifies the prompt against a fresh capture and replays the keys that
//! answer it through a [`responder::SessionManager`].

pub mod classifier;
pub mod config;
pub mod error;
pub mod keys;
pub mod log;
pub mod normalize;
pub mod patterns;
pub mod prompt;
pub mod responder;
pub mod tmux;

pub use classifier::PromptClassifier;
pub use keys::{Key, KeySequence, synthesize};
pub use prompt::{Detection, Prompt, PromptKind};
pub use responder::{AnswerRequest, FailureReason, ResponseCoordinator, ResponseResult, SessionManager};
