//! Response audit log: JSON lines, one per decision.
//!
//! Every `respond` invocation can append an entry recording what was asked,
//! what was sent (if anything) and why. Each line is a self-contained JSON
//! object with an RFC 3339 timestamp, easy to grep and post-process.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::prompt::{Detection, PromptKind};
use crate::responder::{AnswerRequest, ResponseResult};

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A structured event in the audit log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    #[serde(flatten)]
    pub event: LogEvent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    /// A capture was classified for display.
    Detected {
        session: String,
        kind: Option<PromptKind>,
        question: Option<String>,
    },
    /// Keys were sent to the session.
    Answered {
        session: String,
        answer: String,
        keys: String,
        verified: bool,
    },
    /// The answer was not delivered.
    Refused {
        session: String,
        answer: String,
        reason: String,
        message: Option<String>,
    },
}

impl LogEvent {
    pub fn detected(session: &str, detection: &Detection) -> Self {
        LogEvent::Detected {
            session: session.to_string(),
            kind: detection.prompt.as_ref().map(|p| p.kind()),
            question: detection.prompt.as_ref().map(|p| p.question().to_string()),
        }
    }

    pub fn response(session: &str, request: &AnswerRequest, result: &ResponseResult) -> Self {
        let keys = result.keys.as_ref().map(|k| k.to_string()).unwrap_or_default();
        match result.reason {
            None => LogEvent::Answered {
                session: session.to_string(),
                answer: request.answer.clone(),
                keys,
                verified: result.verified,
            },
            Some(reason) => LogEvent::Refused {
                session: session.to_string(),
                answer: request.answer.clone(),
                reason: reason.as_str().to_string(),
                message: result.message.clone(),
            },
        }
    }
}

/// Append-only writer for the audit log.
pub struct AuditLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl AuditLog {
    /// Open (or create) the log at `path`, creating parent directories.
    /// Appends to an existing file.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file: {}", path.display()))?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn log(&self, event: LogEvent) -> Result<()> {
        let entry = LogEntry {
            timestamp: now_rfc3339(),
            event,
        };

        let json = serde_json::to_string(&entry).context("failed to serialize log entry")?;

        debug!(event = %json, "audit log");

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("audit log writer poisoned"))?;
        writeln!(writer, "{json}").context("failed to write log entry")?;
        writer.flush().context("failed to flush log")?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
