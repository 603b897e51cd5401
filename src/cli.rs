// src/cli.rs

use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Who changed this code, and why", long_about = None)]
pub struct Args {
    /// Path to the git repository (or any directory inside it)
    #[arg(short, long, default_value = ".", global = true)]
    pub repo: PathBuf,

    /// JSON file with work items to resolve ticket references against
    #[arg(long, global = true)]
    pub items: Option<PathBuf>,

    /// Annotate straight from history, without the line cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Number of line annotations kept in the cache
    #[arg(long, default_value_t = 100, global = true, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub capacity: usize,

    /// Background workers prefetching neighbouring lines
    #[arg(long, default_value_t = 3, global = true)]
    pub workers: usize,

    /// How far back file annotations look, in months
    #[arg(long, default_value_t = 12, global = true)]
    pub window_months: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recent history, contributors and work items for a whole file
    File {
        /// File path relative to the repository root
        path: String,
    },
    /// History of a single line and its immediate neighbours
    Line {
        path: String,
        /// 1-based line number
        number: usize,
    },
    /// One summary row per line over a range
    Lines {
        path: String,
        #[arg(long, default_value_t = 1)]
        from: usize,
        /// Last line to annotate (defaults to the end of the file)
        #[arg(long)]
        to: Option<usize>,
    },
    /// Files that most often change together with the given one
    Related {
        path: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["git-lore", "line", "src/main.rs", "12"]).unwrap();
        assert_eq!(args.repo, PathBuf::from("."));
        assert_eq!(args.capacity, 100);
        assert_eq!(args.workers, 3);
        assert!(!args.no_cache);
        assert!(matches!(args.command, Command::Line { number: 12, .. }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["git-lore", "lines", "a.rs", "--to", "9", "--workers", "0", "--no-cache"]).unwrap();
        assert_eq!(args.workers, 0);
        assert!(args.no_cache);
        assert!(matches!(args.command, Command::Lines { from: 1, to: Some(9), .. }));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(Args::try_parse_from(["git-lore", "--capacity", "0", "file", "a.rs"]).is_err());
        let args = Args::try_parse_from(["git-lore", "--capacity", "1", "file", "a.rs"]).unwrap();
        assert_eq!(args.capacity, 1);
    }
}
