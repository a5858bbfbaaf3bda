//! Answer → keystroke synthesis.
//!
//! Line-oriented confirmations take typed text; cursor menus take arrow-key
//! navigation from the highlighted option. Checkbox menus additionally need
//! a `Space` to toggle and a walk past the last option to the confirm row.

use std::fmt;

use serde::Serialize;

use crate::error::ResponseError;
use crate::prompt::{ChoicePrompt, Prompt, YesNoOption};

/// One abstract key event, replayed verbatim by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "key", content = "text", rename_all = "snake_case")]
pub enum Key {
    Text(String),
    Enter,
    Up,
    Down,
    Space,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Text(text) => write!(f, "{text:?}"),
            Key::Enter => f.write_str("Enter"),
            Key::Up => f.write_str("Up"),
            Key::Down => f.write_str("Down"),
            Key::Space => f.write_str("Space"),
        }
    }
}

/// Ordered key events for one answer. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeySequence(Vec<Key>);

impl KeySequence {
    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.0.iter()
    }
}

impl From<Vec<Key>> for KeySequence {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys)
    }
}

impl<'a> IntoIterator for &'a KeySequence {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Compute the keys that answer `prompt` with `answer`.
///
/// The default option is read from `prompt` itself; callers pass the prompt
/// they trust (a fresh classification, or the fallback they built).
pub fn synthesize(prompt: &Prompt, answer: &str) -> Result<KeySequence, ResponseError> {
    if prompt.is_answered() {
        return Err(ResponseError::invalid_answer(answer, "prompt already answered"));
    }

    match prompt {
        Prompt::YesNo(_) => {
            let choice = YesNoOption::parse_answer(answer)
                .ok_or_else(|| ResponseError::invalid_answer(answer, "expected yes or no"))?;
            Ok(vec![Key::Text(choice.key_text().to_string()), Key::Enter].into())
        }
        Prompt::MultipleChoice(menu) => synthesize_menu(menu, answer),
    }
}

fn synthesize_menu(menu: &ChoicePrompt, answer: &str) -> Result<KeySequence, ResponseError> {
    let target: u32 = answer
        .trim()
        .parse()
        .map_err(|_| ResponseError::invalid_answer(answer, "expected an option number"))?;
    if menu.option(target).is_none() {
        return Err(ResponseError::invalid_answer(
            answer,
            format!("no option {target} (menu has {})", menu.options.len()),
        ));
    }
    let default = menu
        .default_number()
        .ok_or_else(|| ResponseError::invalid_answer(answer, "menu has no highlighted option"))?;

    let mut keys = Vec::new();
    navigate(default, target, &mut keys);

    if menu.is_multi_select {
        keys.push(Key::Space);
        let count = menu.options.len() as u32;
        // Past the last option sits the confirm row.
        keys.extend(std::iter::repeat_n(Key::Down, (count - target + 1) as usize));
    }

    keys.push(Key::Enter);
    Ok(keys.into())
}

fn navigate(from: u32, to: u32, keys: &mut Vec<Key>) {
    let offset = i64::from(to) - i64::from(from);
    let step = if offset > 0 { Key::Down } else { Key::Up };
    keys.extend(std::iter::repeat_n(step, offset.unsigned_abs() as usize));
}
