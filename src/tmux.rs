//! tmux-backed session manager.
//!
//! Captures pane text with `capture-pane` and replays key sequences with
//! `send-keys`. Text is always sent with `-l` so punctuation is never read
//! as a tmux key name; navigation keys are sent by name, one call per key.

use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::config::TmuxSettings;
use crate::keys::{Key, KeySequence};
use crate::responder::SessionManager;

/// Check that tmux is installed and reachable.
pub fn check_tmux() -> Result<String> {
    let output = Command::new("tmux").arg("-V").output().context(
        "tmux not found; install tmux (e.g., `apt install tmux` or `brew install tmux`)",
    )?;

    if !output.status.success() {
        bail!(
            "tmux -V failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!(version = %version, "tmux found");
    Ok(version)
}

fn run_tmux<I, S>(args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new("tmux")
        .args(args)
        .output()
        .context("failed to run tmux command")
}

/// Check if a tmux session (or pane target) exists.
pub fn session_exists(target: &str) -> bool {
    run_tmux(["has-session", "-t", target])
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Capture the current visible content of a tmux target.
pub fn capture_pane(target: &str) -> Result<String> {
    let output = run_tmux(["capture-pane", "-t", target, "-p"])
        .with_context(|| format!("failed to capture pane for target '{target}'"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("tmux capture-pane failed: {stderr}");
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// `send-keys` arguments for one key; `None` when there is nothing to send.
fn send_keys_args<'a>(target: &'a str, key: &'a Key) -> Option<Vec<&'a str>> {
    let name = match key {
        Key::Text(text) if text.is_empty() => return None,
        Key::Text(text) => {
            return Some(vec!["send-keys", "-t", target, "-l", "--", text.as_str()]);
        }
        Key::Enter => "C-m",
        Key::Up => "Up",
        Key::Down => "Down",
        Key::Space => "Space",
    };
    Some(vec!["send-keys", "-t", target, name])
}

fn send_key(target: &str, key: &Key) -> Result<()> {
    let Some(args) = send_keys_args(target, key) else {
        return Ok(());
    };
    let output = run_tmux(&args)
        .with_context(|| format!("failed to send {key} to target '{target}'"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("tmux send-keys {key} failed: {stderr}");
    }
    Ok(())
}

/// [`SessionManager`] over the local tmux server.
#[derive(Debug, Clone, Default)]
pub struct TmuxSessions {
    key_delay: Duration,
}

impl TmuxSessions {
    pub fn new(settings: &TmuxSettings) -> Self {
        Self {
            key_delay: Duration::from_millis(settings.key_delay_millis),
        }
    }
}

impl SessionManager for TmuxSessions {
    fn capture(&self, session: &str) -> Result<String> {
        if !session_exists(session) {
            bail!("tmux session '{session}' not found");
        }
        capture_pane(session)
    }

    fn send_keys(&self, session: &str, keys: &KeySequence) -> Result<()> {
        if !session_exists(session) {
            bail!("tmux session '{session}' not found");
        }

        for (i, key) in keys.iter().enumerate() {
            if i > 0 && !self.key_delay.is_zero() {
                thread::sleep(self.key_delay);
            }
            send_key(session, key)?;
        }

        debug!(session = session, keys = %keys, "sent keys");
        Ok(())
    }
}
