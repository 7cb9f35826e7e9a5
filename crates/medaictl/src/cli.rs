//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MedAI screening panels from the terminal
#[derive(Parser, Debug)]
#[command(name = "medaictl")]
#[command(about = "MedAI - skin lesion, diabetes risk and symptom triage screening", long_about = None)]
#[command(version = env!("MEDAI_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Configuration file (overrides $MEDAI_CONFIG and the default locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug logging on stderr (overridden by $MEDAI_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the terminal state as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a skin lesion photo
    Lesion {
        /// Image file (any format the decoder understands)
        image: PathBuf,

        /// Override the upload width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Override the upload height in pixels
        #[arg(long)]
        height: Option<u32>,
    },

    /// Estimate diabetes risk from a questionnaire
    Diabetes {
        /// Questionnaire file (.json or .toml); unset fields keep their defaults
        #[arg(long, value_name = "FILE")]
        form: Option<PathBuf>,

        /// Set one field, e.g. --set bmi=31.2 --set "education_level=High School"
        #[arg(long = "set", value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },

    /// Get triage advice for free-text symptoms
    Triage {
        /// Symptom description; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        symptoms: Vec<String>,
    },

    /// Show the resolved configuration
    Config,
}
