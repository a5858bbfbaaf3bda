//! Answer submission with re-verification.
//!
//! The UI renders a prompt from one capture and the user answers later. By
//! then the CLI may have moved on, so every submission captures the pane
//! again and classifies it before a single key is sent.
//!
//! ## State machine
//!
//! ```text
//! CAPTURING     → fresh capture ok        → CLASSIFYING
//!               → capture error           → CAPTURE_FAILED
//! CLASSIFYING   → prompt found            → ACTIVE
//!               → no prompt               → INACTIVE
//! ACTIVE        → fresh prompt is truth   → DISPATCHING
//! INACTIVE      → refuse, send nothing    → DONE
//! CAPTURE_FAILED→ caller-cached details   → DISPATCHING (unverified)
//! DISPATCHING   → synthesize + send keys  → DONE
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::PromptClassifier;
use crate::config::ResponderSettings;
use crate::error::ResponseError;
use crate::keys::{KeySequence, synthesize};
use crate::prompt::{ChoicePrompt, Detection, MenuOption, Prompt, PromptKind, YesNoPrompt};

/// The two calls this crate makes into a terminal session manager.
pub trait SessionManager {
    /// Snapshot the pane's current contents.
    fn capture(&self, session: &str) -> Result<String>;

    /// Replay `keys` into the pane, in order.
    fn send_keys(&self, session: &str, keys: &KeySequence) -> Result<()>;
}

impl<T: SessionManager + ?Sized> SessionManager for &T {
    fn capture(&self, session: &str) -> Result<String> {
        (**self).capture(session)
    }

    fn send_keys(&self, session: &str, keys: &KeySequence) -> Result<()> {
        (**self).send_keys(session, keys)
    }
}

/// A user's answer plus whatever the UI cached when it rendered the prompt.
///
/// The cached fields are only consulted when the pane cannot be captured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
    #[serde(default)]
    pub prompt_type: Option<PromptKind>,
    #[serde(default)]
    pub default_option_number: Option<u32>,
    /// Question the UI showed. When set, a fresh prompt with a different
    /// question is treated as a different prompt and nothing is sent.
    #[serde(default)]
    pub expected_question: Option<String>,
}

impl AnswerRequest {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Self::default()
        }
    }

    pub fn with_prompt_type(mut self, kind: PromptKind) -> Self {
        self.prompt_type = Some(kind);
        self
    }

    pub fn with_default_option(mut self, number: u32) -> Self {
        self.default_option_number = Some(number);
        self
    }

    pub fn with_expected_question(mut self, question: impl Into<String>) -> Self {
        self.expected_question = Some(question.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    PromptNoLongerActive,
    InvalidAnswer,
    CaptureFailed,
    DispatchFailed,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::PromptNoLongerActive => "prompt_no_longer_active",
            FailureReason::InvalidAnswer => "invalid_answer",
            FailureReason::CaptureFailed => "capture_failed",
            FailureReason::DispatchFailed => "dispatch_failed",
        }
    }
}

impl From<&ResponseError> for FailureReason {
    fn from(err: &ResponseError) -> Self {
        match err {
            ResponseError::InvalidAnswer { .. } => FailureReason::InvalidAnswer,
            ResponseError::PromptNoLongerActive => FailureReason::PromptNoLongerActive,
            ResponseError::CaptureFailed(_) => FailureReason::CaptureFailed,
            ResponseError::DispatchFailed(_) => FailureReason::DispatchFailed,
        }
    }
}

/// What the caller gets back from [`ResponseCoordinator::respond`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    /// Human-readable failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Transport error text when `send_keys` failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_error: Option<String>,
    /// Keys that were (or would have been) sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<KeySequence>,
    /// True when the keys were computed from a fresh classification.
    pub verified: bool,
    /// The prompt that was answered, marked `Answered` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Prompt>,
}

impl ResponseResult {
    fn answered(prompt: Prompt, keys: KeySequence, verified: bool) -> Self {
        Self {
            success: true,
            reason: None,
            message: None,
            dispatch_error: None,
            keys: Some(keys),
            verified,
            prompt: Some(prompt),
        }
    }

    fn failed(err: ResponseError, keys: Option<KeySequence>, verified: bool) -> Self {
        let dispatch_error = match &err {
            ResponseError::DispatchFailed(detail) => Some(detail.clone()),
            _ => None,
        };
        Self {
            success: false,
            reason: Some(FailureReason::from(&err)),
            message: Some(err.to_string()),
            dispatch_error,
            keys,
            verified,
            prompt: None,
        }
    }
}

enum ResponseState {
    Capturing,
    Classifying(String),
    Active(Prompt),
    Inactive,
    CaptureFailed(String),
    Dispatching { prompt: Prompt, verified: bool },
    Done(ResponseResult),
}

impl ResponseState {
    fn name(&self) -> &'static str {
        match self {
            ResponseState::Capturing => "capturing",
            ResponseState::Classifying(_) => "classifying",
            ResponseState::Active(_) => "active",
            ResponseState::Inactive => "inactive",
            ResponseState::CaptureFailed(_) => "capture_failed",
            ResponseState::Dispatching { .. } => "dispatching",
            ResponseState::Done(_) => "done",
        }
    }
}

/// Runs one answer submission against a session manager.
pub struct ResponseCoordinator<S> {
    sessions: S,
    classifier: PromptClassifier,
    settings: ResponderSettings,
}

impl<S: SessionManager> ResponseCoordinator<S> {
    pub fn new(sessions: S, classifier: PromptClassifier) -> Self {
        Self {
            sessions,
            classifier,
            settings: ResponderSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ResponderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Capture and classify without answering, for rendering.
    pub fn detect(&self, session: &str) -> Result<Detection> {
        let raw = self
            .sessions
            .capture(session)
            .with_context(|| format!("failed to capture session '{session}'"))?;
        Ok(self.classifier.classify_raw(&raw))
    }

    /// Answer whatever prompt is live in `session` right now.
    pub fn respond(&self, session: &str, request: &AnswerRequest) -> ResponseResult {
        let mut state = ResponseState::Capturing;
        loop {
            debug!(session = session, state = state.name(), "response state");
            state = match state {
                ResponseState::Capturing => match self.sessions.capture(session) {
                    Ok(raw) => ResponseState::Classifying(raw),
                    Err(e) => ResponseState::CaptureFailed(format!("{e:#}")),
                },
                ResponseState::Classifying(raw) => {
                    match self.classifier.classify_raw(&raw).prompt {
                        Some(prompt) => ResponseState::Active(prompt),
                        None => ResponseState::Inactive,
                    }
                }
                ResponseState::Active(prompt) => self.on_active(session, request, prompt),
                ResponseState::Inactive => {
                    info!(session = session, "prompt no longer active, nothing sent");
                    ResponseState::Done(ResponseResult::failed(
                        ResponseError::PromptNoLongerActive,
                        None,
                        true,
                    ))
                }
                ResponseState::CaptureFailed(detail) => {
                    self.on_capture_failed(session, request, detail)
                }
                ResponseState::Dispatching { prompt, verified } => {
                    ResponseState::Done(self.dispatch(session, request, prompt, verified))
                }
                ResponseState::Done(result) => return result,
            };
        }
    }

    fn on_active(&self, session: &str, request: &AnswerRequest, prompt: Prompt) -> ResponseState {
        if let Some(expected) = request.expected_question.as_deref() {
            if expected.trim() != prompt.question() {
                info!(
                    session = session,
                    expected = expected,
                    found = prompt.question(),
                    "a different prompt is live, nothing sent"
                );
                return ResponseState::Done(ResponseResult::failed(
                    ResponseError::PromptNoLongerActive,
                    None,
                    true,
                ));
            }
        }

        if let Some(cached) = request.prompt_type {
            if cached != prompt.kind() {
                warn!(
                    session = session,
                    cached = ?cached,
                    live = ?prompt.kind(),
                    "cached prompt type is stale, using live prompt"
                );
            }
        }
        if let (Some(cached), Some(live)) =
            (request.default_option_number, prompt.default_option_number())
        {
            if cached != live {
                warn!(
                    session = session,
                    cached = cached,
                    live = live,
                    "cached default option is stale, using live prompt"
                );
            }
        }

        ResponseState::Dispatching {
            prompt,
            verified: true,
        }
    }

    fn on_capture_failed(
        &self,
        session: &str,
        request: &AnswerRequest,
        detail: String,
    ) -> ResponseState {
        if !self.settings.fallback_on_capture_failure {
            warn!(session = session, error = %detail, "capture failed, fallback disabled");
            return ResponseState::Done(ResponseResult::failed(
                ResponseError::CaptureFailed(detail),
                None,
                false,
            ));
        }

        warn!(
            session = session,
            error = %detail,
            "capture failed, answering from cached prompt details"
        );
        match fallback_prompt(request) {
            Ok(prompt) => ResponseState::Dispatching {
                prompt,
                verified: false,
            },
            Err(e) => ResponseState::Done(ResponseResult::failed(e, None, false)),
        }
    }

    fn dispatch(
        &self,
        session: &str,
        request: &AnswerRequest,
        mut prompt: Prompt,
        verified: bool,
    ) -> ResponseResult {
        let keys = match synthesize(&prompt, &request.answer) {
            Ok(keys) => keys,
            Err(e) => return ResponseResult::failed(e, None, verified),
        };

        if let Err(e) = self.sessions.send_keys(session, &keys) {
            warn!(session = session, keys = %keys, error = %e, "failed to send keys");
            return ResponseResult::failed(
                ResponseError::DispatchFailed(format!("{e:#}")),
                Some(keys),
                verified,
            );
        }

        info!(
            session = session,
            keys = %keys,
            verified = verified,
            "answered prompt"
        );
        if let Err(e) = prompt.mark_answered(&request.answer) {
            warn!(session = session, error = %e, "prompt status not updated");
        }
        ResponseResult::answered(prompt, keys, verified)
    }
}

/// Largest menu the unverified fallback will rebuild.
const MAX_FALLBACK_OPTIONS: u32 = 99;

/// Build a prompt from caller-cached details when the pane can't be read.
///
/// Menus are rebuilt as single-select with just enough options to hold the
/// target and the cached default.
fn fallback_prompt(request: &AnswerRequest) -> Result<Prompt, ResponseError> {
    let question = request.expected_question.clone().unwrap_or_default();
    match request.prompt_type.unwrap_or(PromptKind::YesNo) {
        PromptKind::YesNo => Ok(Prompt::YesNo(YesNoPrompt::new(question, None))),
        PromptKind::MultipleChoice => {
            let target: u32 = request
                .answer
                .trim()
                .parse()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| {
                    ResponseError::invalid_answer(&request.answer, "expected an option number")
                })?;
            if target > MAX_FALLBACK_OPTIONS {
                return Err(ResponseError::invalid_answer(
                    &request.answer,
                    format!("option {target} is out of range (at most {MAX_FALLBACK_OPTIONS})"),
                ));
            }
            let default = request.default_option_number.unwrap_or(1).max(1);
            if default > MAX_FALLBACK_OPTIONS {
                return Err(ResponseError::invalid_answer(
                    &request.answer,
                    format!(
                        "cached default option {default} is out of range (at most {MAX_FALLBACK_OPTIONS})"
                    ),
                ));
            }
            let options = (1..=target.max(default))
                .map(|number| MenuOption {
                    number,
                    label: String::new(),
                    is_default: number == default,
                    requires_text_input: false,
                    is_checked: false,
                })
                .collect();
            Ok(Prompt::MultipleChoice(ChoicePrompt::new(question, options, false)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Key;
    use crate::prompt::PromptStatus;
    use anyhow::anyhow;
    use std::cell::RefCell;

    struct FakeSessions {
        capture: std::result::Result<String, String>,
        send_error: Option<String>,
        sent: RefCell<Vec<KeySequence>>,
    }

    impl FakeSessions {
        fn showing(text: &str) -> Self {
            Self {
                capture: Ok(text.to_string()),
                send_error: None,
                sent: RefCell::new(Vec::new()),
            }
        }

        fn unreachable(error: &str) -> Self {
            Self {
                capture: Err(error.to_string()),
                send_error: None,
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl SessionManager for FakeSessions {
        fn capture(&self, _session: &str) -> Result<String> {
            self.capture.clone().map_err(|e| anyhow!(e))
        }

        fn send_keys(&self, _session: &str, keys: &KeySequence) -> Result<()> {
            if let Some(err) = &self.send_error {
                return Err(anyhow!(err.clone()));
            }
            self.sent.borrow_mut().push(keys.clone());
            Ok(())
        }
    }

    fn coordinator(sessions: &FakeSessions) -> ResponseCoordinator<&FakeSessions> {
        ResponseCoordinator::new(sessions, PromptClassifier::default())
    }

    #[test]
    fn answers_live_yes_no_prompt() {
        let sessions = FakeSessions::showing("Do you want to proceed? (y/n)");
        let result = coordinator(&sessions).respond("agent", &AnswerRequest::new("yes"));

        assert!(result.success);
        assert!(result.verified);
        assert_eq!(
            result.keys.as_ref().unwrap().keys(),
            &[Key::Text("y".to_string()), Key::Enter]
        );
        assert_eq!(sessions.sent.borrow().len(), 1);
        assert!(matches!(
            result.prompt.as_ref().unwrap().status(),
            PromptStatus::Answered { answer, .. } if answer == "yes"
        ));
    }

    #[test]
    fn refuses_when_prompt_is_gone() {
        let sessions = FakeSessions::showing("Done.\n❯ ");
        let result = coordinator(&sessions).respond(
            "agent",
            &AnswerRequest::new("2").with_prompt_type(PromptKind::MultipleChoice),
        );

        assert!(!result.success);
        assert_eq!(result.reason, Some(FailureReason::PromptNoLongerActive));
        assert!(result.keys.is_none());
        assert!(sessions.sent.borrow().is_empty());
    }

    #[test]
    fn refuses_when_question_changed() {
        let sessions = FakeSessions::showing("Delete the branch? [y/N]");
        let request = AnswerRequest::new("y").with_expected_question("Push to origin?");
        let result = coordinator(&sessions).respond("agent", &request);

        assert_eq!(result.reason, Some(FailureReason::PromptNoLongerActive));
        assert!(sessions.sent.borrow().is_empty());
    }

    #[test]
    fn live_default_overrides_cached_default() {
        let sessions = FakeSessions::showing("Choose:\n  1. A\n❯ 2. B\n  3. C");
        let request = AnswerRequest::new("3")
            .with_prompt_type(PromptKind::MultipleChoice)
            .with_default_option(1);
        let result = coordinator(&sessions).respond("agent", &request);

        assert!(result.success);
        assert_eq!(result.keys.unwrap().keys(), &[Key::Down, Key::Enter]);
    }

    #[test]
    fn invalid_answer_sends_nothing() {
        let sessions = FakeSessions::showing("Proceed? (y/n)");
        let result = coordinator(&sessions).respond("agent", &AnswerRequest::new("maybe"));

        assert_eq!(result.reason, Some(FailureReason::InvalidAnswer));
        assert!(result.message.unwrap().contains("maybe"));
        assert!(sessions.sent.borrow().is_empty());
    }

    #[test]
    fn capture_failure_falls_back_to_cached_menu_details() {
        let sessions = FakeSessions::unreachable("can't find session: agent");
        let request = AnswerRequest::new("1")
            .with_prompt_type(PromptKind::MultipleChoice)
            .with_default_option(3);
        let result = coordinator(&sessions).respond("agent", &request);

        assert!(result.success);
        assert!(!result.verified);
        assert_eq!(result.keys.unwrap().keys(), &[Key::Up, Key::Up, Key::Enter]);
    }

    #[test]
    fn capture_failure_defaults_to_yes_no() {
        let sessions = FakeSessions::unreachable("server exited");
        let result = coordinator(&sessions).respond("agent", &AnswerRequest::new("n"));

        assert!(result.success);
        assert_eq!(
            sessions.sent.borrow()[0].keys(),
            &[Key::Text("n".to_string()), Key::Enter]
        );
    }

    #[test]
    fn capture_failure_defaults_menu_default_to_one() {
        let sessions = FakeSessions::unreachable("server exited");
        let request = AnswerRequest::new("2").with_prompt_type(PromptKind::MultipleChoice);
        let result = coordinator(&sessions).respond("agent", &request);

        assert_eq!(result.keys.unwrap().keys(), &[Key::Down, Key::Enter]);
    }

    #[test]
    fn capture_failure_without_fallback_reports_error() {
        let sessions = FakeSessions::unreachable("no server running");
        let result = coordinator(&sessions)
            .with_settings(ResponderSettings {
                fallback_on_capture_failure: false,
            })
            .respond("agent", &AnswerRequest::new("y"));

        assert_eq!(result.reason, Some(FailureReason::CaptureFailed));
        assert!(result.message.unwrap().contains("no server running"));
        assert!(sessions.sent.borrow().is_empty());
    }

    #[test]
    fn dispatch_failure_carries_transport_error() {
        let mut sessions = FakeSessions::showing("Proceed? [Y/n]");
        sessions.send_error = Some("tmux send-keys failed: pane dead".to_string());
        let result = coordinator(&sessions).respond("agent", &AnswerRequest::new("y"));

        assert!(!result.success);
        assert_eq!(result.reason, Some(FailureReason::DispatchFailed));
        assert_eq!(
            result.dispatch_error.as_deref(),
            Some("tmux send-keys failed: pane dead")
        );
        assert!(result.keys.is_some());
        assert!(result.prompt.is_none());
    }

    #[test]
    fn fallback_rejects_non_numeric_menu_answer() {
        let request = AnswerRequest::new("first").with_prompt_type(PromptKind::MultipleChoice);
        assert!(matches!(
            fallback_prompt(&request),
            Err(ResponseError::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn fallback_rejects_oversized_menu_answer() {
        let sessions = FakeSessions::unreachable("can't find session: agent");
        let request = AnswerRequest::new("5000000").with_prompt_type(PromptKind::MultipleChoice);
        let result = coordinator(&sessions).respond("agent", &request);

        assert!(!result.success);
        assert_eq!(result.reason, Some(FailureReason::InvalidAnswer));
        assert!(!result.verified);
        assert!(sessions.sent.borrow().is_empty());
    }

    #[test]
    fn fallback_rejects_oversized_cached_default() {
        let request = AnswerRequest::new("1")
            .with_prompt_type(PromptKind::MultipleChoice)
            .with_default_option(u32::MAX);
        assert!(matches!(
            fallback_prompt(&request),
            Err(ResponseError::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn fallback_accepts_largest_menu() {
        let request = AnswerRequest::new("99").with_prompt_type(PromptKind::MultipleChoice);
        match fallback_prompt(&request).unwrap() {
            Prompt::MultipleChoice(menu) => assert_eq!(menu.options.len(), 99),
            other => panic!("expected menu prompt, got: {other:?}"),
        }
    }

    #[test]
    fn detect_propagates_capture_errors() {
        let sessions = FakeSessions::unreachable("gone");
        let err = coordinator(&sessions).detect("agent").unwrap_err();
        assert!(format!("{err:#}").contains("gone"));
    }

    #[test]
    fn result_serializes_reason_in_snake_case() {
        let sessions = FakeSessions::showing("plain output");
        let result = coordinator(&sessions).respond("agent", &AnswerRequest::new("1"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["reason"], "prompt_no_longer_active");
        assert_eq!(
            FailureReason::PromptNoLongerActive.as_str(),
            "prompt_no_longer_active"
        );
    }
}
