//! Recognizers for prompt affordances in normalized pane text.
//!
//! Yes/no prompts are single-line and fixed, so their patterns are compiled
//! once. Menu patterns depend on the configured cursor glyph and text-input
//! vocabulary and are built per [`PatternLibrary`].

use std::sync::LazyLock;

use regex::Regex;

use crate::config::DetectorSettings;
use crate::prompt::YesNoOption;

/// A yes/no recognizer: pattern with a `question` group, and the default
/// option that phrasing implies.
struct YesNoRecognizer {
    pattern: Regex,
    default_option: Option<YesNoOption>,
}

// First match wins. Every pattern is anchored at line end so an affordance
// quoted mid-sentence never matches.
static YES_NO_RECOGNIZERS: LazyLock<Vec<YesNoRecognizer>> = LazyLock::new(|| {
    vec![
        // "Overwrite file? (y/n)"
        YesNoRecognizer {
            pattern: Regex::new(r"^(?P<question>.*?)\s*\((?i:y/n)\)\s*$").unwrap(),
            default_option: None,
        },
        // "Delete branch? [y/N]"
        YesNoRecognizer {
            pattern: Regex::new(r"^(?P<question>.*?)\s*\[y/N\]\s*$").unwrap(),
            default_option: Some(YesNoOption::No),
        },
        // "Install hooks? [Y/n]"
        YesNoRecognizer {
            pattern: Regex::new(r"^(?P<question>.*?)\s*\[Y/n\]\s*$").unwrap(),
            default_option: Some(YesNoOption::Yes),
        },
        // "Apply patch? (yes/no)"
        YesNoRecognizer {
            pattern: Regex::new(r"^(?P<question>.*?)\s*\((?i:yes/no)\)\s*$").unwrap(),
            default_option: None,
        },
        // Gemini-style bare approval line
        YesNoRecognizer {
            pattern: Regex::new(r"^\s*(?P<question>Approve\?)\s*$").unwrap(),
            default_option: None,
        },
    ]
});

/// A matched yes/no affordance on a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YesNoMatch {
    pub question: String,
    pub default_option: Option<YesNoOption>,
}

/// A line shaped like a menu entry (`❯ 1. Yes` or `  2. No`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionLine {
    pub number: u32,
    pub label: String,
    pub has_cursor: bool,
}

/// Compiled recognizers for one detector configuration.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    cursor_line: Regex,
    plain_line: Regex,
    checkbox: Regex,
    text_input: Option<Regex>,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::from_settings(&DetectorSettings::default()).expect("default patterns are valid")
    }
}

impl PatternLibrary {
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self, regex::Error> {
        let glyph = regex::escape(settings.cursor_glyph.trim());
        let cursor_line = Regex::new(&format!(
            r"^\s*{glyph}\s*(?P<number>\d+)\.\s+(?P<label>.*\S)\s*$"
        ))?;
        let plain_line = Regex::new(r"^ {2,}(?P<number>\d+)\.\s+(?P<label>.*\S)\s*$")?;
        let checkbox = Regex::new(r"^\[(?P<mark>[ xX])\]\s*")?;

        let phrases: Vec<String> = settings
            .text_input_vocabulary
            .iter()
            .map(|phrase| phrase.trim())
            .filter(|phrase| !phrase.is_empty())
            .map(|phrase| regex::escape(phrase).replace(' ', r"\s+"))
            .collect();
        let text_input = if phrases.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"(?i)\b(?:{})", phrases.join("|")))?)
        };

        Ok(Self {
            cursor_line,
            plain_line,
            checkbox,
            text_input,
        })
    }

    /// Try every yes/no recognizer against one line, in order.
    pub fn match_yes_no(&self, line: &str) -> Option<YesNoMatch> {
        YES_NO_RECOGNIZERS.iter().find_map(|recognizer| {
            let caps = recognizer.pattern.captures(line)?;
            Some(YesNoMatch {
                question: caps["question"].trim().to_string(),
                default_option: recognizer.default_option,
            })
        })
    }

    /// Parse a menu entry line. Lines of any other shape return `None`.
    pub fn parse_option_line(&self, line: &str) -> Option<OptionLine> {
        let (caps, has_cursor) = match self.cursor_line.captures(line) {
            Some(caps) => (caps, true),
            None => (self.plain_line.captures(line)?, false),
        };
        let number: u32 = caps["number"].parse().ok()?;
        Some(OptionLine {
            number,
            label: caps["label"].to_string(),
            has_cursor,
        })
    }

    pub fn is_cursor_line(&self, line: &str) -> bool {
        self.cursor_line.is_match(line)
    }

    /// Split a leading checkbox off a label: `Some((checked, rest))`.
    pub fn split_checkbox<'a>(&self, label: &'a str) -> Option<(bool, &'a str)> {
        let caps = self.checkbox.captures(label)?;
        let checked = &caps["mark"] != " ";
        let rest = &label[caps.get(0)?.end()..];
        Some((checked, rest.trim()))
    }

    pub fn requires_text_input(&self, label: &str) -> bool {
        self.text_input
            .as_ref()
            .is_some_and(|re| re.is_match(label))
    }
}
