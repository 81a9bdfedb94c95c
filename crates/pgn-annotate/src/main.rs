mod commands;
mod config;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chess_pgn::Encoding;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use commands::AnnotateArgs;
use config::AnnotateConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgn-annotate")]
#[command(about = "Check, index and engine-annotate PGN files")]
struct Cli {
    /// Configuration file (defaults to annotate.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Character encoding of the PGN input
    #[arg(long, value_enum, default_value_t = EncodingArg::Auto, global = true)]
    encoding: EncodingArg,
    /// More log output, repeat for engine traffic
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse every game and report problems
    Check {
        /// PGN file
        pgn: PathBuf,
    },
    /// List game offsets and roster tags
    Index {
        /// PGN file
        pgn: PathBuf,
    },
    /// Annotate one game with engine analysis
    Annotate {
        /// PGN file
        pgn: PathBuf,
        /// Game number, starting at 1
        #[arg(short, long, default_value = "1")]
        game: usize,
        /// Configured engine name or executable path
        #[arg(short, long)]
        engine: Option<String>,
        /// Search depth per position
        #[arg(short, long)]
        depth: Option<u32>,
        /// Search time per position in milliseconds
        #[arg(long)]
        movetime: Option<u64>,
        /// Engine lines per position
        #[arg(long)]
        multipv: Option<u32>,
        /// Output PGN file (defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Write per-player statistics as JSON
        #[arg(long)]
        stats: Option<PathBuf>,
    },
    /// Show an engine's identity and options
    EngineInfo {
        /// Configured engine name or executable path
        engine: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EncodingArg {
    Auto,
    Utf8,
    Latin1,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Auto => Encoding::Auto,
            EncodingArg::Utf8 => Encoding::Utf8,
            EncodingArg::Latin1 => Encoding::Latin1,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AnnotateConfig> {
    match path {
        Some(path) => AnnotateConfig::read(path).with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(AnnotateConfig::load(&AnnotateConfig::config_path())?),
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let encoding = Encoding::from(cli.encoding);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Check { pgn } => {
            let summary = commands::check(&pgn, encoding, &mut stdout)?;
            if !summary.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Index { pgn } => {
            commands::index(&pgn, encoding, &mut stdout)?;
        }
        Commands::Annotate {
            pgn,
            game,
            engine,
            depth,
            movetime,
            multipv,
            out,
            stats,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let args = AnnotateArgs {
                pgn,
                game,
                engine,
                depth,
                movetime_ms: movetime,
                multipv,
                out,
                stats,
            };
            let summary = commands::annotate(&config, &args, encoding, &mut stdout)?;
            commands::print_summary(&summary, &mut io::stderr())?;
        }
        Commands::EngineInfo { engine } => {
            let config = load_config(cli.config.as_ref())?;
            commands::engine_info(&config, engine.as_deref(), &mut stdout)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses_annotate_command() {
        let cli = Cli::try_parse_from([
            "pgn-annotate",
            "annotate",
            "games.pgn",
            "-g",
            "3",
            "-e",
            "sf",
            "--depth",
            "18",
            "--multipv",
            "2",
            "-o",
            "out.pgn",
        ])
        .unwrap();

        match cli.command {
            Commands::Annotate {
                pgn,
                game,
                engine,
                depth,
                movetime,
                multipv,
                out,
                stats,
            } => {
                assert_eq!(pgn, PathBuf::from("games.pgn"));
                assert_eq!(game, 3);
                assert_eq!(engine.as_deref(), Some("sf"));
                assert_eq!(depth, Some(18));
                assert_eq!(movetime, None);
                assert_eq!(multipv, Some(2));
                assert_eq!(out, Some(PathBuf::from("out.pgn")));
                assert!(stats.is_none());
            }
            _ => panic!("Expected Annotate command"),
        }
    }

    #[test]
    fn test_cli_annotate_defaults() {
        let cli = Cli::try_parse_from(["pgn-annotate", "annotate", "games.pgn"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.encoding, EncodingArg::Auto);
        match cli.command {
            Commands::Annotate { game, engine, out, .. } => {
                assert_eq!(game, 1);
                assert!(engine.is_none());
                assert!(out.is_none());
            }
            _ => panic!("Expected Annotate command"),
        }
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pgn-annotate",
            "check",
            "games.pgn",
            "-vv",
            "--encoding",
            "latin1",
            "--config",
            "my.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(Encoding::from(cli.encoding), Encoding::Latin1);
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert!(matches!(cli.command, Commands::Check { .. }));
    }

    #[test]
    fn test_cli_engine_info() {
        let cli = Cli::try_parse_from(["pgn-annotate", "engine-info", "stockfish"]).unwrap();
        match cli.command {
            Commands::EngineInfo { engine } => assert_eq!(engine.as_deref(), Some("stockfish")),
            _ => panic!("Expected EngineInfo command"),
        }
        assert!(Cli::try_parse_from(["pgn-annotate", "index"]).is_err());
    }

    #[test]
    fn test_cli_help_lists_subcommands() {
        let mut cmd = Cli::command();
        let help = cmd.render_help().to_string();
        for name in ["check", "index", "annotate", "engine-info"] {
            assert!(help.contains(name), "{}", help);
        }
    }

    #[test]
    fn test_load_config_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(&missing)).is_err());
    }
}
