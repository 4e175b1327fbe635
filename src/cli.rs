//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};

use crate::data::profile::{PreferencesInput, ProfileInput};

#[derive(Parser, Debug)]
#[command(version, about = "Canadian university program recommender")]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::default(), global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the JSON API (default)
    Serve,
    /// Rank programs for a profile given on the command line
    Search(SearchArgs),
    /// Load and validate configuration, taxonomy, and catalogue, then exit
    Check,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Free-text interests, e.g. "robotics and AI"
    #[arg(long)]
    pub interests: String,
    /// Overall average (0-100); 0 means unknown
    #[arg(long, default_value_t = 0.0)]
    pub average: f64,
    /// Grade: 9, 10, 11, 12, or graduate
    #[arg(long)]
    pub grade: Option<String>,
    /// A course taken or in progress; repeat for several
    #[arg(long = "subject")]
    pub subjects: Vec<String>,
    #[arg(long, default_value = "")]
    pub extracurriculars: String,
    /// Preferred city or region
    #[arg(long, default_value = "")]
    pub location: String,
    /// A preference such as "co-op"; repeat for several
    #[arg(long = "preference")]
    pub preferences: Vec<String>,
    /// Number of programs to show
    #[arg(long)]
    pub top_k: Option<usize>,
    /// Print the full ranking as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub fn to_profile_input(&self) -> ProfileInput {
        ProfileInput {
            name: String::new(),
            grade: self.grade.clone(),
            average: self.average,
            interests: self.interests.clone(),
            subjects: self.subjects.clone(),
            extracurriculars: self.extracurriculars.clone(),
            location: self.location.clone(),
            preferences: (!self.preferences.is_empty())
                .then(|| PreferencesInput::List(self.preferences.clone())),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable, for development
    Pretty,
    /// One JSON object per line, for log shipping
    Json,
}

impl Default for TracingFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}
