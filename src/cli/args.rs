use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::session::ConversationMode;

#[derive(Parser, Debug)]
#[command(name = "taskroute")]
#[command(version)]
#[command(about = "A technical assistant that routes questions to watsonx.ai prompt deployments", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Prompt mode: send only the question, or fold in recent history
    #[arg(short, long, value_enum)]
    pub mode: Option<ConversationMode>,

    /// Project directory for transcripts (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Don't save the chat transcript
    #[arg(long)]
    pub no_transcript: bool,

    /// Non-interactive question to answer
    #[arg(short = 'q', long = "prompt")]
    pub prompt: Option<String>,

    /// Output format for non-interactive mode
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, requires = "prompt")]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// Start a chat session (default)
    Chat,
    /// Check configuration and deployment reachability
    Status,
    /// List saved transcripts for this project
    Transcripts,
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
    /// Markdown formatted output
    Markdown,
}
