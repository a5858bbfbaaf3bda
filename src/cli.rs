use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use paneprompt::PromptKind;

#[derive(Parser, Debug)]
#[command(
    name = "paneprompt",
    about = "Detect interactive prompts in agent tmux panes and answer them",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a saved pane capture
    Classify {
        /// Capture file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Emit JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Capture a tmux session and report the live prompt
    Detect {
        /// tmux session or pane target
        session: String,

        /// Append the detection to a JSON-lines audit log
        #[arg(long, value_name = "PATH")]
        audit_log: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Answer the prompt live in a tmux session
    Respond {
        /// tmux session or pane target
        session: String,

        /// "y"/"yes"/"n"/"no" or a 1-based option number
        answer: String,

        /// Prompt type the answer was chosen for; used if the pane can't be read
        #[arg(long, value_enum)]
        prompt_type: Option<CliPromptType>,

        /// Highlighted option when the answer was chosen
        #[arg(long, value_name = "N")]
        default_option: Option<u32>,

        /// Question the answer was chosen for; refuse if a different one is live
        #[arg(long, value_name = "TEXT")]
        question: Option<String>,

        /// Append the outcome to a JSON-lines audit log
        #[arg(long, value_name = "PATH")]
        audit_log: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Show project configuration
    Config {
        /// Emit JSON instead of a human-readable summary
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliPromptType {
    YesNo,
    MultipleChoice,
}

impl From<CliPromptType> for PromptKind {
    fn from(value: CliPromptType) -> Self {
        match value {
            CliPromptType::YesNo => PromptKind::YesNo,
            CliPromptType::MultipleChoice => PromptKind::MultipleChoice,
        }
    }
}
