use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "estatewatch")]
#[command(about = "Keeps the latest property search on disk, flags new listings and finds deals")]
#[command(version)]
pub struct Cli {
    /// Directory holding the database (defaults to the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// How long a listing counts as new, e.g. "48h", "3d"
    #[arg(long, global = true)]
    pub window: Option<String>,

    /// Show debug logging on stderr
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replace the stored dataset with a scraper export
    Import(ImportArgs),

    /// Show the stored listings scored against the market trend
    Report(ReportArgs),

    /// List the most underpriced listings
    Deals(DealsArgs),

    /// Rank neighborhoods by median price per square meter
    Groups(GroupsArgs),

    /// Show storage usage and dataset summary
    Info(InfoArgs),

    /// Delete the stored dataset (new-listing history is kept)
    Clear,

    /// Forget listings first seen longer ago than the retention period
    Prune(PruneArgs),
}

#[derive(Parser)]
pub struct ImportArgs {
    /// JSON file: an array of listings, or an object with a "records" array
    pub file: PathBuf,

    /// Search parameters to store with the dataset, as a JSON object
    #[arg(long)]
    pub params: Option<String>,
}

#[derive(Parser)]
pub struct ReportArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Only list listings that are currently new
    #[arg(long, default_value_t = false)]
    pub new_only: bool,
}

#[derive(Parser)]
pub struct DealsArgs {
    /// Number of listings to show (defaults to the configured value)
    #[arg(long)]
    pub top: Option<usize>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct GroupsArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InfoArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct PruneArgs {
    /// Retention in months (defaults to the configured value)
    #[arg(long)]
    pub months: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["estatewatch", "deals", "--top", "3", "--window", "3d", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.window.as_deref(), Some("3d"));
        match cli.command {
            Command::Deals(args) => {
                assert_eq!(args.top, Some(3));
                assert!(!args.json);
            }
            _ => panic!("expected deals"),
        }
    }

    #[test]
    fn import_takes_a_file() {
        let cli = Cli::try_parse_from(["estatewatch", "import", "listings.json", "--params", "{}"]).unwrap();
        match cli.command {
            Command::Import(args) => {
                assert_eq!(args.file, PathBuf::from("listings.json"));
                assert_eq!(args.params.as_deref(), Some("{}"));
            }
            _ => panic!("expected import"),
        }
    }
}
