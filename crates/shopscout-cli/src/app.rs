//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shopscout")]
#[command(
    author,
    version,
    about = "Hybrid product search and AI-powered recommendations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the catalog snapshot (.json or .csv)
    #[arg(long, global = true, env = "SHOPSCOUT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Path to a JSON config file
    #[arg(long, global = true, env = "SHOPSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend products for a query
    Recommend(QueryArgs),

    /// Generate clarifying survey questions for a query
    Questions(QueryArgs),

    /// Recommend products from a query plus survey answers
    Survey(SurveyArgs),

    /// Show catalog status
    Status,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Search query, e.g. "영상편집용 가벼운 노트북"
    #[arg(required = true)]
    pub query: Vec<String>,
}

#[derive(Args)]
pub struct SurveyArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Search id issued by the questions command (advisory)
    #[arg(long)]
    pub search_id: Option<String>,

    /// Survey answers as inline JSON:
    /// [{"question_id": 1, "question": "...", "answer": "..."}]
    #[arg(long, conflicts_with = "answers_file")]
    pub answers: Option<String>,

    /// Survey answers as a JSON file with the same shape
    #[arg(long)]
    pub answers_file: Option<PathBuf>,
}

impl QueryArgs {
    pub fn query_string(&self) -> String {
        self.query.join(" ")
    }
}

impl SurveyArgs {
    pub fn query_string(&self) -> String {
        self.query.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Cli,
    /// Machine-readable JSON
    Json,
}
