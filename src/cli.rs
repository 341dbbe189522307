//! Command-line interface for narrator
//!
//! Provides argument parsing using clap derive macros.

use crate::narration::types::OutputFormat;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Narrate text books into chapter audio files
#[derive(Parser, Debug)]
#[command(
    name = "narrator",
    version,
    about = "Narrate text books into chapter audio files"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-chunk logs, -vv: everything)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Narrate a text file, one output file per `# ` chapter
    Narrate(NarrateArgs),

    /// List voices offered by the provider
    Voices {
        /// Voice name prefix to filter by (e.g. en, en-GB, de-DE)
        #[arg(long, value_name = "PREFIX", default_value = crate::defaults::DEFAULT_VOICE_LANGUAGE)]
        lang: String,
    },

    /// Check ffmpeg, credentials and the scratch directory
    Check,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(clap::Args, Debug)]
pub struct NarrateArgs {
    /// UTF-8 text file with `# ` chapter headings
    pub input: PathBuf,

    /// Directory for the chapter files (default: next to the input)
    #[arg(long, short = 'o', value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Output format: flac or opus (default from config)
    #[arg(long, short = 'f', value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Author tag
    #[arg(long, value_name = "NAME")]
    pub author: Option<String>,

    /// Album tag (default: input file name)
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Cover image (default: <input>.jpg or <input>.png if present)
    #[arg(long, value_name = "IMAGE")]
    pub cover: Option<PathBuf>,

    /// Voice name, e.g. en-GB-Wavenet-B
    #[arg(long, value_name = "VOICE")]
    pub voice: Option<String>,

    /// Start without asking for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (secrets masked)
    Show,
    /// Print the default configuration file path
    Path,
}
