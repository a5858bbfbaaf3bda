use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIR: &str = ".paneprompt";

/// Classifier policy.
///
/// ```toml
/// [detector]
/// scan_window_lines = 50
/// cursor_glyph = "❯"
/// text_input_vocabulary = ["tell me", "something else"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DetectorSettings {
    #[serde(default = "default_scan_window_lines")]
    pub scan_window_lines: usize,
    #[serde(default = "default_cursor_glyph")]
    pub cursor_glyph: String,
    /// Phrases that mark a menu option as a free-form entry. Matched
    /// case-insensitively at a word start; entries are literal text.
    #[serde(default = "default_text_input_vocabulary")]
    pub text_input_vocabulary: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResponderSettings {
    /// Answer from caller-cached prompt details when the pane cannot be
    /// captured. When false a capture failure aborts the response.
    #[serde(default = "default_fallback_on_capture_failure")]
    pub fallback_on_capture_failure: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct TmuxSettings {
    #[serde(default)]
    pub key_delay_millis: u64,
}

fn default_scan_window_lines() -> usize {
    50
}

fn default_cursor_glyph() -> String {
    "❯".to_string()
}

fn default_text_input_vocabulary() -> Vec<String> {
    [
        "tell me",
        "tell claude",
        "different",
        "custom",
        "other",
        "something else",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_fallback_on_capture_failure() -> bool {
    true
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            scan_window_lines: default_scan_window_lines(),
            cursor_glyph: default_cursor_glyph(),
            text_input_vocabulary: default_text_input_vocabulary(),
        }
    }
}

impl Default for ResponderSettings {
    fn default() -> Self {
        Self {
            fallback_on_capture_failure: default_fallback_on_capture_failure(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ProjectConfig {
    #[serde(default)]
    pub detector: DetectorSettings,
    #[serde(default)]
    pub responder: ResponderSettings,
    #[serde(default)]
    pub tmux: TmuxSettings,
}

impl ProjectConfig {
    /// Search upward from `start` for a `.paneprompt/config.toml` file and
    /// load it. Returns the default config if no file is found.
    pub fn load(start: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = Self::find_config_file(start) {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: ProjectConfig = toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            Ok((config, Some(path)))
        } else {
            Ok((ProjectConfig::default(), None))
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.detector.scan_window_lines == 0 {
            bail!("detector.scan_window_lines must be at least 1");
        }
        let glyph = self.detector.cursor_glyph.trim();
        if glyph.is_empty() {
            bail!("detector.cursor_glyph must not be empty");
        }
        if glyph.chars().any(|c| c.is_ascii_digit()) {
            bail!("detector.cursor_glyph must not contain digits (got '{glyph}')");
        }
        if self
            .detector
            .text_input_vocabulary
            .iter()
            .any(|phrase| phrase.trim().is_empty())
        {
            bail!("detector.text_input_vocabulary must not contain empty phrases");
        }
        Ok(())
    }

    fn find_config_file(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_config_values() {
        let config = ProjectConfig::default();
        assert_eq!(config.detector.scan_window_lines, 50);
        assert_eq!(config.detector.cursor_glyph, "❯");
        assert!(
            config
                .detector
                .text_input_vocabulary
                .contains(&"tell me".to_string())
        );
        assert!(config.responder.fallback_on_capture_failure);
        assert_eq!(config.tmux.key_delay_millis, 0);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[detector]
scan_window_lines = 30
cursor_glyph = ">"
text_input_vocabulary = ["type here", "custom"]

[responder]
fallback_on_capture_failure = false

[tmux]
key_delay_millis = 25
"#;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.detector.scan_window_lines, 30);
        assert_eq!(config.detector.cursor_glyph, ">");
        assert_eq!(
            config.detector.text_input_vocabulary,
            vec!["type here", "custom"]
        );
        assert!(!config.responder.fallback_on_capture_failure);
        assert_eq!(config.tmux.key_delay_millis, 25);
        config.validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[detector]
scan_window_lines = 80
"#;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.detector.scan_window_lines, 80);
        assert_eq!(config.detector.cursor_glyph, "❯");
        assert!(config.responder.fallback_on_capture_failure);
    }

    #[test]
    fn validate_rejects_empty_glyph_and_zero_window() {
        let mut config = ProjectConfig::default();
        config.detector.cursor_glyph = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = ProjectConfig::default();
        config.detector.scan_window_lines = 0;
        assert!(config.validate().is_err());

        let mut config = ProjectConfig::default();
        config.detector.text_input_vocabulary = vec!["".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".paneprompt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            r#"
[responder]
fallback_on_capture_failure = false
"#,
        )
        .unwrap();

        let (config, path) = ProjectConfig::load(tmp.path()).unwrap();
        assert!(path.is_some());
        assert!(!config.responder.fallback_on_capture_failure);
        assert_eq!(config.detector.scan_window_lines, 50);
    }

    #[test]
    fn load_returns_default_when_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let (config, path) = ProjectConfig::load(tmp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn load_reports_invalid_values() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".paneprompt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            "[detector]\ncursor_glyph = \"\"\n",
        )
        .unwrap();

        let err = ProjectConfig::load(tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("cursor_glyph"));
    }

    #[test]
    fn load_walks_up_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".paneprompt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            "[tmux]\nkey_delay_millis = 10\n",
        )
        .unwrap();

        let nested = tmp.path().join("src").join("deep").join("nested");
        fs::create_dir_all(&nested).unwrap();

        let (config, path) = ProjectConfig::load(&nested).unwrap();
        assert!(path.is_some());
        assert_eq!(config.tmux.key_delay_millis, 10);
    }
}
