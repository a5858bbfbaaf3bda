//! Prompt model shared by the classifier, the synthesizer and the coordinator.
//!
//! A [`Prompt`] is rebuilt from scratch on every classification. Nothing in
//! this crate keeps a prompt around between observations of a pane; the
//! coordinator re-derives one right before it sends keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PromptError;

/// Shape of a prompt, without its content. Callers cache this at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    YesNo,
    MultipleChoice,
}

/// One side of a yes/no confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YesNoOption {
    Yes,
    No,
}

impl YesNoOption {
    pub const ALL: [YesNoOption; 2] = [YesNoOption::Yes, YesNoOption::No];

    /// Single-letter text the CLI expects on its input line.
    pub fn key_text(self) -> &'static str {
        match self {
            YesNoOption::Yes => "y",
            YesNoOption::No => "n",
        }
    }

    /// Parse a user answer: `yes`/`y`/`no`/`n`, any case, surrounding
    /// whitespace ignored.
    pub fn parse_answer(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(YesNoOption::Yes),
            "n" | "no" => Some(YesNoOption::No),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PromptStatus {
    Pending,
    /// Terminal: no transition leaves this state.
    Answered {
        answer: String,
        answered_at: DateTime<Utc>,
    },
}

/// A single entry of a cursor-driven menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuOption {
    /// 1-based, contiguous within its prompt.
    pub number: u32,
    /// Label text with any checkbox glyph removed.
    pub label: String,
    /// The option under the cursor when the menu was captured.
    pub is_default: bool,
    /// The label reads like a free-form entry ("Type something else").
    pub requires_text_input: bool,
    /// Checkbox rendered as ticked (`[x]`). Always false for plain menus.
    pub is_checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YesNoPrompt {
    pub question: String,
    pub default_option: Option<YesNoOption>,
    pub status: PromptStatus,
}

impl YesNoPrompt {
    pub fn new(question: impl Into<String>, default_option: Option<YesNoOption>) -> Self {
        Self {
            question: question.into(),
            default_option,
            status: PromptStatus::Pending,
        }
    }

    pub fn options(&self) -> [YesNoOption; 2] {
        YesNoOption::ALL
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoicePrompt {
    pub question: String,
    pub options: Vec<MenuOption>,
    pub is_multi_select: bool,
    pub status: PromptStatus,
}

impl ChoicePrompt {
    pub fn new(question: impl Into<String>, options: Vec<MenuOption>, is_multi_select: bool) -> Self {
        Self {
            question: question.into(),
            options,
            is_multi_select,
            status: PromptStatus::Pending,
        }
    }

    /// Number of the option carrying the cursor.
    pub fn default_number(&self) -> Option<u32> {
        self.options.iter().find(|o| o.is_default).map(|o| o.number)
    }

    pub fn option(&self, number: u32) -> Option<&MenuOption> {
        self.options.iter().find(|o| o.number == number)
    }
}

/// A prompt the CLI is blocking on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Prompt {
    YesNo(YesNoPrompt),
    MultipleChoice(ChoicePrompt),
}

impl Prompt {
    pub fn kind(&self) -> PromptKind {
        match self {
            Prompt::YesNo(_) => PromptKind::YesNo,
            Prompt::MultipleChoice(_) => PromptKind::MultipleChoice,
        }
    }

    pub fn question(&self) -> &str {
        match self {
            Prompt::YesNo(p) => &p.question,
            Prompt::MultipleChoice(p) => &p.question,
        }
    }

    pub fn status(&self) -> &PromptStatus {
        match self {
            Prompt::YesNo(p) => &p.status,
            Prompt::MultipleChoice(p) => &p.status,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self.status(), PromptStatus::Answered { .. })
    }

    /// Default option number for menus; `None` for yes/no prompts.
    pub fn default_option_number(&self) -> Option<u32> {
        match self {
            Prompt::YesNo(_) => None,
            Prompt::MultipleChoice(p) => p.default_number(),
        }
    }

    /// Move from `Pending` to `Answered`. Fails if the prompt was already
    /// answered; the first answer is kept.
    pub fn mark_answered(&mut self, answer: &str) -> Result<(), PromptError> {
        let status = match self {
            Prompt::YesNo(p) => &mut p.status,
            Prompt::MultipleChoice(p) => &mut p.status,
        };
        if let PromptStatus::Answered { answer: previous, .. } = status {
            return Err(PromptError::AlreadyAnswered {
                answer: previous.clone(),
            });
        }
        *status = PromptStatus::Answered {
            answer: answer.to_string(),
            answered_at: Utc::now(),
        };
        Ok(())
    }
}

/// Outcome of classifying one capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub is_prompt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Prompt>,
    /// Normalized text with the prompt affordance removed, for display.
    pub clean_content: String,
}

impl Detection {
    pub fn none(clean_content: impl Into<String>) -> Self {
        Self {
            is_prompt: false,
            prompt: None,
            clean_content: clean_content.into(),
        }
    }

    pub fn found(prompt: Prompt, clean_content: impl Into<String>) -> Self {
        Self {
            is_prompt: true,
            prompt: Some(prompt),
            clean_content: clean_content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Prompt {
        Prompt::MultipleChoice(ChoicePrompt::new(
            "Pick one",
            vec![
                MenuOption {
                    number: 1,
                    label: "A".to_string(),
                    is_default: false,
                    requires_text_input: false,
                    is_checked: false,
                },
                MenuOption {
                    number: 2,
                    label: "B".to_string(),
                    is_default: true,
                    requires_text_input: false,
                    is_checked: false,
                },
            ],
            false,
        ))
    }

    #[test]
    fn parse_yes_no_answers() {
        assert_eq!(YesNoOption::parse_answer("yes"), Some(YesNoOption::Yes));
        assert_eq!(YesNoOption::parse_answer("  Y "), Some(YesNoOption::Yes));
        assert_eq!(YesNoOption::parse_answer("NO"), Some(YesNoOption::No));
        assert_eq!(YesNoOption::parse_answer("n"), Some(YesNoOption::No));
        assert_eq!(YesNoOption::parse_answer("yep"), None);
        assert_eq!(YesNoOption::parse_answer(""), None);
    }

    #[test]
    fn default_number_follows_cursor_flag() {
        let prompt = menu();
        assert_eq!(prompt.default_option_number(), Some(2));
        assert_eq!(prompt.kind(), PromptKind::MultipleChoice);
        assert_eq!(prompt.question(), "Pick one");
    }

    #[test]
    fn yes_no_prompt_has_fixed_options() {
        let prompt = YesNoPrompt::new("Continue?", Some(YesNoOption::No));
        assert_eq!(prompt.options(), [YesNoOption::Yes, YesNoOption::No]);
        assert_eq!(Prompt::YesNo(prompt).default_option_number(), None);
    }

    #[test]
    fn answered_is_terminal() {
        let mut prompt = menu();
        assert!(!prompt.is_answered());

        prompt.mark_answered("2").unwrap();
        assert!(prompt.is_answered());

        let err = prompt.mark_answered("1").unwrap_err();
        assert_eq!(
            err,
            PromptError::AlreadyAnswered {
                answer: "2".to_string()
            }
        );
        match prompt.status() {
            PromptStatus::Answered { answer, .. } => assert_eq!(answer, "2"),
            other => panic!("expected answered status, got: {other:?}"),
        }
    }

    #[test]
    fn prompt_serializes_with_type_tag() {
        let json = serde_json::to_value(menu()).unwrap();
        assert_eq!(json["type"], "multiple_choice");
        assert_eq!(json["status"]["state"], "pending");
        assert_eq!(json["options"][1]["is_default"], true);
    }

    #[test]
    fn detection_without_prompt_skips_prompt_field() {
        let json = serde_json::to_value(Detection::none("plain text")).unwrap();
        assert_eq!(json["is_prompt"], false);
        assert!(json.get("prompt").is_none());
    }
}
