use crate::models::{Backend, Source};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "litfinder",
    version,
    about = "Search open scholarly metadata and summarize abstracts",
    long_about = "Search OpenAlex, Crossref and arXiv, clean the abstracts and summarize them with a \
                  pretrained model backend. Run without a command to be prompted for a query."
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "More log output on stderr (-v info, -vv debug)"
    )]
    pub verbose: u8,
    #[arg(
        long,
        global = true,
        env = "LITFINDER_CONFIG",
        help = "Settings file (default: <config dir>/litfinder/settings.json)"
    )]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, help = "Summarization backend")]
    pub backend: Option<Backend>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search every selected source, then clean and summarize the results
    Search(SearchArgs),
    /// Fetch one abstract by DOI, arXiv ID or title and summarize it
    Lookup {
        query: String,
        #[arg(long, help = "Print the cleaned abstract too")]
        show_abstract: bool,
    },
    /// Summarize text from a file or stdin
    Summarize {
        #[arg(long, help = "Read from this file instead of stdin")]
        file: Option<PathBuf>,
    },
    /// Strip markup and collapse whitespace, no network involved
    Clean {
        #[arg(long, help = "Read from this file instead of stdin")]
        file: Option<PathBuf>,
    },
    /// Count whitespace tokens, optionally printing the truncated text
    Tokens {
        #[arg(long, help = "Read from this file instead of stdin")]
        file: Option<PathBuf>,
        #[arg(long, help = "Truncate to this many tokens")]
        max: Option<usize>,
    },
    /// Inspect or create the settings file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Check settings, backend availability and network access
    Check,
}

#[derive(clap::Args, Debug, Default, Clone)]
pub struct SearchArgs {
    pub query: String,
    #[arg(long, help = "Maximum results per source")]
    pub max_results: Option<usize>,
    #[arg(long = "source", value_enum, help = "Source to query; repeat for several")]
    pub sources: Vec<Source>,
    #[arg(long, help = "Skip summarization")]
    pub no_summarize: bool,
    #[arg(long, help = "Extract keywords too")]
    pub keywords: bool,
    #[arg(long, help = "Summary length in words")]
    pub max_words: Option<usize>,
    #[arg(long, help = "Summarize only this many papers")]
    pub preview: Option<usize>,
    #[arg(long, help = "Summarize every result (slower)")]
    pub all: bool,
    #[arg(long, help = "Flip \"Family Given\" author names")]
    pub normalize_authors: bool,
    #[arg(long, help = "Write results as CSV to this path")]
    pub csv: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the settings file path
    Path,
    /// Print the effective settings
    Show,
    /// Write a settings file with defaults
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}
