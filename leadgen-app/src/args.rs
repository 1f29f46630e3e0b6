use crate::commands::jobs::SubmitJobRequest;
use clap::Parser;
use std::path::PathBuf;

/// LeadGen - collect business contacts for a search query and location
#[derive(Parser, Debug)]
#[command(name = "leadgen")]
#[command(author = "LeadGen Contributors")]
#[command(version)]
#[command(about = "Find business emails and phone numbers from search results", long_about = None)]
pub struct Cli {
    /// What to search for (e.g., "plumbers")
    #[arg(short = 'q', long = "query")]
    pub query: String,

    /// Where to search (e.g., "boston")
    #[arg(short = 'l', long = "location")]
    pub location: String,

    /// Number of contacts to collect (a multiple of 10, at most 100)
    #[arg(short = 'n', long = "count", default_value = "20")]
    pub count: u32,

    /// Config file (defaults to the platform config directory)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Enable debug logging for all crates
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub fn to_request(&self) -> SubmitJobRequest {
        SubmitJobRequest {
            query: self.query.clone(),
            location: self.location.clone(),
            target_count: self.count,
        }
    }
}
