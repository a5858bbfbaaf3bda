mod cli;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cli::{Cli, Command};
use paneprompt::config::ProjectConfig;
use paneprompt::log::{AuditLog, LogEvent};
use paneprompt::prompt::{Detection, Prompt, YesNoOption};
use paneprompt::tmux::{TmuxSessions, check_tmux};
use paneprompt::{AnswerRequest, PromptClassifier, ResponseCoordinator, ResponseResult};

fn config_source_label(config_path: Option<&Path>) -> String {
    config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults, no .paneprompt/config.toml found)".to_string())
}

fn push_kv(output: &mut String, key: &str, value: impl std::fmt::Display) {
    output.push_str(&format!("  {key:<20} {value}\n"));
}

fn render_config_human(config: &ProjectConfig, config_path: Option<&Path>) -> String {
    let mut output = String::new();
    output.push_str("Detector\n");
    push_kv(
        &mut output,
        "scan_window",
        format!("{} lines", config.detector.scan_window_lines),
    );
    push_kv(&mut output, "cursor_glyph", &config.detector.cursor_glyph);
    if config.detector.text_input_vocabulary.is_empty() {
        push_kv(&mut output, "text_input", "(none)");
    } else {
        push_kv(
            &mut output,
            "text_input",
            config.detector.text_input_vocabulary.join(", "),
        );
    }
    output.push('\n');

    output.push_str("Responder\n");
    push_kv(
        &mut output,
        "capture_fallback",
        config.responder.fallback_on_capture_failure,
    );
    output.push('\n');

    output.push_str("Tmux\n");
    push_kv(
        &mut output,
        "key_delay",
        format!("{}ms", config.tmux.key_delay_millis),
    );
    output.push('\n');

    output.push_str("Source Path\n");
    push_kv(&mut output, "path", config_source_label(config_path));

    output
}

fn render_config_json(config: &ProjectConfig, config_path: Option<&Path>) -> Result<String> {
    let payload = serde_json::json!({
        "detector": {
            "scan_window_lines": config.detector.scan_window_lines,
            "cursor_glyph": &config.detector.cursor_glyph,
            "text_input_vocabulary": &config.detector.text_input_vocabulary
        },
        "responder": {
            "fallback_on_capture_failure": config.responder.fallback_on_capture_failure
        },
        "tmux": {
            "key_delay_millis": config.tmux.key_delay_millis
        },
        "source_path": config_source_label(config_path)
    });

    serde_json::to_string_pretty(&payload).context("failed to serialize config to JSON")
}

fn yes_no_label(option: YesNoOption) -> &'static str {
    match option {
        YesNoOption::Yes => "yes",
        YesNoOption::No => "no",
    }
}

fn render_detection_human(detection: &Detection) -> String {
    let mut output = String::new();
    let Some(prompt) = &detection.prompt else {
        output.push_str("No prompt detected\n");
        return output;
    };

    match prompt {
        Prompt::YesNo(p) => {
            output.push_str("Yes/No Prompt\n");
            push_kv(&mut output, "question", &p.question);
            push_kv(
                &mut output,
                "default",
                p.default_option.map(yes_no_label).unwrap_or("(none)"),
            );
        }
        Prompt::MultipleChoice(p) => {
            if p.is_multi_select {
                output.push_str("Multi-Select Prompt\n");
            } else {
                output.push_str("Multiple-Choice Prompt\n");
            }
            push_kv(&mut output, "question", &p.question);
            for option in &p.options {
                let cursor = if option.is_default { '>' } else { ' ' };
                let check = match (p.is_multi_select, option.is_checked) {
                    (false, _) => "",
                    (true, true) => "[x] ",
                    (true, false) => "[ ] ",
                };
                let text_input = if option.requires_text_input {
                    " (text input)"
                } else {
                    ""
                };
                output.push_str(&format!(
                    "  {cursor} {}. {check}{}{text_input}\n",
                    option.number, option.label
                ));
            }
        }
    }
    output
}

fn render_result_human(result: &ResponseResult) -> String {
    let mut output = String::new();
    if result.success {
        output.push_str("Answered\n");
    } else {
        output.push_str("Not answered\n");
    }
    if let Some(reason) = result.reason {
        push_kv(&mut output, "reason", reason.as_str());
    }
    if let Some(message) = &result.message {
        push_kv(&mut output, "message", message);
    }
    if let Some(keys) = &result.keys {
        push_kv(&mut output, "keys", keys);
    }
    push_kv(&mut output, "verified", result.verified);
    output
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output to JSON")
}

fn read_capture(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read capture {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read capture from stdin")?;
            Ok(buf)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let quiet = match &cli.command {
        Command::Config { .. } => true,
        Command::Classify { json, .. }
        | Command::Detect { json, .. }
        | Command::Respond { json, .. } => *json,
    };

    let filter = match cli.verbose {
        0 if quiet => "paneprompt=warn",
        0 => "paneprompt=info",
        1 => "paneprompt=debug",
        _ => "paneprompt=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir().context("failed to get current directory (was it deleted?)")?;
    let (config, config_path) = ProjectConfig::load(&cwd)?;

    match config_path {
        Some(ref p) => info!("loaded config from {}", p.display()),
        None => info!("no .paneprompt/config.toml found, using defaults"),
    }

    let classifier =
        PromptClassifier::new(&config.detector).context("invalid detector settings")?;

    match cli.command {
        Command::Classify { file, json } => {
            let raw = read_capture(file.as_ref())?;
            let detection = classifier.classify_raw(&raw);
            if json {
                println!("{}", to_json(&detection)?);
            } else {
                print!("{}", render_detection_human(&detection));
            }
        }
        Command::Detect {
            session,
            audit_log,
            json,
        } => {
            check_tmux()?;
            let coordinator =
                ResponseCoordinator::new(TmuxSessions::new(&config.tmux), classifier);
            let detection = coordinator.detect(&session)?;
            if let Some(path) = audit_log {
                AuditLog::new(&path)?.log(LogEvent::detected(&session, &detection))?;
            }
            if json {
                println!("{}", to_json(&detection)?);
            } else {
                print!("{}", render_detection_human(&detection));
            }
        }
        Command::Respond {
            session,
            answer,
            prompt_type,
            default_option,
            question,
            audit_log,
            json,
        } => {
            let mut request = AnswerRequest::new(answer);
            if let Some(kind) = prompt_type {
                request = request.with_prompt_type(kind.into());
            }
            if let Some(number) = default_option {
                request = request.with_default_option(number);
            }
            if let Some(question) = question {
                request = request.with_expected_question(question);
            }

            let log = audit_log.as_deref().map(AuditLog::new).transpose()?;
            let coordinator =
                ResponseCoordinator::new(TmuxSessions::new(&config.tmux), classifier)
                    .with_settings(config.responder.clone());
            let result = coordinator.respond(&session, &request);

            if let Some(log) = &log {
                log.log(LogEvent::response(&session, &request, &result))?;
            }
            if json {
                println!("{}", to_json(&result)?);
            } else {
                print!("{}", render_result_human(&result));
            }
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Config { json } => {
            if json {
                println!("{}", render_config_json(&config, config_path.as_deref())?);
            } else {
                print!("{}", render_config_human(&config, config_path.as_deref()));
            }
        }
    }

    Ok(())
}
