//! Prompt classification over normalized pane text.
//!
//! Yes/no affordances are checked first, on the last non-blank line. Menus
//! are only accepted when a window of recent lines passes every check:
//!
//! ```text
//! A  cursor glyph on some `❯ N. label` line      → else reject
//! B  collect every `❯ N. label` / `  N. label`   → other lines ignored
//! C  numbers are exactly 1..=k, k >= 2            → else reject
//! D  exactly one collected line has the cursor    → else reject
//! ```
//!
//! Assistant narration such as "I will: 1. create a file 2. run tests" has
//! numbered lines but no cursor, and a stale answered menu next to a fresh
//! numbered list breaks the numbering, so both classify as plain text.

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::DetectorSettings;
use crate::normalize::normalize;
use crate::patterns::{OptionLine, PatternLibrary};
use crate::prompt::{ChoicePrompt, Detection, MenuOption, Prompt, YesNoPrompt};

/// Why a window was not accepted as a menu.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
enum MenuRejection {
    #[error("no cursor line in scan window")]
    NoCursor,
    #[error("option numbers {0:?} are not contiguous from 1 with at least two entries")]
    BadNumbering(Vec<u32>),
    #[error("expected exactly one cursor line, found {0}")]
    CursorCount(usize),
    #[error("checkbox and plain labels are mixed")]
    MixedCheckboxes,
}

/// Turns normalized pane text into a [`Detection`].
#[derive(Debug, Clone)]
pub struct PromptClassifier {
    patterns: PatternLibrary,
    scan_window_lines: usize,
}

impl Default for PromptClassifier {
    fn default() -> Self {
        Self {
            patterns: PatternLibrary::default(),
            scan_window_lines: DetectorSettings::default().scan_window_lines,
        }
    }
}

impl PromptClassifier {
    pub fn new(settings: &DetectorSettings) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: PatternLibrary::from_settings(settings)?,
            scan_window_lines: settings.scan_window_lines.max(1),
        })
    }

    /// Classify normalized text. Total: ambiguous output is "not a prompt".
    pub fn classify(&self, normalized: &str) -> Detection {
        if let Some(detection) = self.classify_yes_no(normalized) {
            return detection;
        }

        match self.classify_menu(normalized) {
            Ok(detection) => detection,
            Err(rejection) => {
                trace!(reason = %rejection, "not a menu prompt");
                Detection::none(normalized)
            }
        }
    }

    /// Normalize a raw capture, then classify it.
    pub fn classify_raw(&self, raw: &str) -> Detection {
        self.classify(&normalize(raw))
    }

    fn classify_yes_no(&self, text: &str) -> Option<Detection> {
        let lines: Vec<&str> = text.lines().collect();
        let last = lines.iter().rposition(|line| !line.trim().is_empty())?;
        let matched = self.patterns.match_yes_no(lines[last])?;

        debug!(question = %matched.question, "detected yes/no prompt");

        let mut kept: Vec<&str> = lines[..last].to_vec();
        if !matched.question.is_empty() {
            kept.push(&matched.question);
        }
        let clean = kept.join("\n");

        let prompt = YesNoPrompt::new(matched.question.clone(), matched.default_option);
        Some(Detection::found(Prompt::YesNo(prompt), clean))
    }

    fn classify_menu(&self, text: &str) -> Result<Detection, MenuRejection> {
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(self.scan_window_lines);
        let window = &lines[start..];

        // Layer A
        if !window.iter().any(|line| self.patterns.is_cursor_line(line)) {
            return Err(MenuRejection::NoCursor);
        }

        // Layer B: (index within window, parsed line)
        let collected: Vec<(usize, OptionLine)> = window
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| self.patterns.parse_option_line(line).map(|opt| (idx, opt)))
            .collect();

        // Layer C
        let mut numbers: Vec<u32> = collected.iter().map(|(_, opt)| opt.number).collect();
        numbers.sort_unstable();
        let contiguous = numbers.len() >= 2
            && numbers
                .iter()
                .enumerate()
                .all(|(i, n)| *n as usize == i + 1);
        if !contiguous {
            return Err(MenuRejection::BadNumbering(numbers));
        }

        // Layer D
        let cursors = collected.iter().filter(|(_, opt)| opt.has_cursor).count();
        if cursors != 1 {
            return Err(MenuRejection::CursorCount(cursors));
        }

        let checkboxes: Vec<Option<(bool, &str)>> = collected
            .iter()
            .map(|(_, opt)| self.patterns.split_checkbox(&opt.label))
            .collect();
        let checkbox_count = checkboxes.iter().filter(|c| c.is_some()).count();
        let is_multi_select = match checkbox_count {
            0 => false,
            n if n == collected.len() => true,
            _ => return Err(MenuRejection::MixedCheckboxes),
        };

        let mut options: Vec<MenuOption> = collected
            .iter()
            .zip(&checkboxes)
            .map(|((_, opt), checkbox)| {
                let (is_checked, label) = match checkbox {
                    Some((checked, rest)) => (*checked, rest.to_string()),
                    None => (false, opt.label.clone()),
                };
                MenuOption {
                    number: opt.number,
                    requires_text_input: self.patterns.requires_text_input(&label),
                    label,
                    is_default: opt.has_cursor,
                    is_checked,
                }
            })
            .collect();
        options.sort_by_key(|o| o.number);

        let first_option = collected.iter().map(|(idx, _)| *idx).min().unwrap_or(0);
        let question = window[..first_option]
            .iter()
            .rev()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
            .unwrap_or("")
            .to_string();

        let option_rows: Vec<usize> = collected.iter().map(|(idx, _)| start + idx).collect();
        let clean = lines
            .iter()
            .enumerate()
            .filter(|(row, _)| !option_rows.contains(row))
            .map(|(_, line)| *line)
            .collect::<Vec<_>>()
            .join("\n")
            .trim_end()
            .to_string();

        debug!(
            question = %question,
            options = options.len(),
            multi_select = is_multi_select,
            "detected menu prompt"
        );

        let prompt = ChoicePrompt::new(question, options, is_multi_select);
        Ok(Detection::found(Prompt::MultipleChoice(prompt), clean))
    }
}
