use clap::{Args, Parser, Subcommand};

use crate::generate::Engine;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recap a TV series up to and including one episode.
    Series(SeriesArgs),
    /// Recap a book up to and including one chapter.
    Book(BookArgs),
}

#[derive(Debug, Args)]
pub struct SeriesArgs {
    /// Series title as searched on TMDB.
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub season: u32,

    #[arg(long)]
    pub episode: u32,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Args)]
pub struct BookArgs {
    /// Book title; turned into the site slug.
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub chapter: u32,

    /// Part number (default: 1).
    #[arg(long)]
    pub part: Option<u32>,

    /// Override the summary site base URL (`RECAP_BOOK_BASE_URL`).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Skip the randomized delay between summary page fetches.
    #[arg(long, default_value_t = false)]
    pub no_delay: bool,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Print the recap as JSON (`characterContext`, `storyRecap`, `generatedAt`).
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Print the resolved summary window and stop before generation.
    #[arg(long, default_value_t = false)]
    pub window_only: bool,

    /// Recap language (`RECAP_OUTPUT_LANGUAGE`, default: Turkish).
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Debug, Args)]
pub struct EngineArgs {
    /// Text generation backend (`RECAP_ENGINE`, default: gemini).
    #[arg(long, value_enum)]
    pub engine: Option<Engine>,

    /// Model name for the selected backend.
    #[arg(long)]
    pub model: Option<String>,

    /// Command to run when `--engine command` (prompt on stdin, recap on stdout).
    #[arg(long)]
    pub command: Option<String>,

    /// Arguments for `--command` (pass after `--`).
    #[arg(last = true)]
    pub command_args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;

    #[test]
    fn book_part_is_optional() {
        let cli = Cli::parse_from(["recapper", "book", "--title", "Dune", "--chapter", "4"]);
        let Command::Book(args) = cli.command else {
            panic!("expected book command");
        };
        assert_eq!(args.part, None);
        assert_eq!(args.chapter, 4);
        assert!(!args.output.json);
    }

    #[test]
    fn command_engine_takes_trailing_args() {
        let cli = Cli::parse_from([
            "recapper", "series", "--title", "X", "--season", "1", "--episode", "2", "--engine",
            "command", "--command", "sh", "--", "-c", "cat",
        ]);
        let Command::Series(args) = cli.command else {
            panic!("expected series command");
        };
        assert_eq!(args.engine.engine, Some(Engine::Command));
        assert_eq!(args.engine.command.as_deref(), Some("sh"));
        assert_eq!(args.engine.command_args, vec!["-c".to_owned(), "cat".to_owned()]);
    }
}
