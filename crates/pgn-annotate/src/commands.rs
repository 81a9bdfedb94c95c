//! Subcommand implementations. Each one writes its report to `out`.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chess_analysis::{AnnotationSummary, EngineSession, GameAnalyzer, MoveQuality, PlayerStats};
use chess_pgn::{write_game, write_pgn, Encoding, GameReader, LexerOptions, ParseOptions, ParsedGame};
use serde::Serialize;

/// Counts reported by `check`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub games: usize,
    pub clean_games: usize,
    pub diagnostics: usize,
}

impl CheckSummary {
    pub fn is_clean(&self) -> bool {
        self.diagnostics == 0
    }
}

/// Options of the `annotate` subcommand.
#[derive(Debug, Clone)]
pub struct AnnotateArgs {
    pub pgn: PathBuf,
    /// 1-based.
    pub game: usize,
    pub engine: Option<String>,
    pub depth: Option<u32>,
    pub movetime_ms: Option<u64>,
    pub multipv: Option<u32>,
    /// Annotated PGN destination, `out` when unset.
    pub out: Option<PathBuf>,
    /// JSON summary destination.
    pub stats: Option<PathBuf>,
}

#[derive(Serialize)]
struct StatsReport<'a> {
    pgn: &'a Path,
    game: usize,
    engine: &'a str,
    #[serde(flatten)]
    summary: &'a AnnotationSummary,
}

fn open(path: &Path, encoding: Encoding) -> Result<GameReader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let options = ParseOptions {
        lexer: LexerOptions {
            encoding,
            ..LexerOptions::default()
        },
        ..ParseOptions::default()
    };
    Ok(GameReader::with_options(BufReader::new(file), options))
}

/// Reads game `number` (1-based) of a PGN file.
pub fn read_game_at(path: &Path, encoding: Encoding, number: usize) -> Result<ParsedGame> {
    if number == 0 {
        bail!("Game numbers start at 1");
    }
    let mut reader = open(path, encoding)?;
    for _ in 1..number {
        if reader.skip_game().is_none() {
            break;
        }
    }
    match reader.read_game() {
        Some(parsed) => Ok(parsed),
        None => bail!("{} contains only {} games", path.display(), reader.games_read()),
    }
}

/// Parses every game and lists the problems found.
pub fn check<W: Write>(path: &Path, encoding: Encoding, out: &mut W) -> Result<CheckSummary> {
    let mut summary = CheckSummary::default();
    for parsed in open(path, encoding)? {
        summary.games += 1;
        if parsed.is_clean() {
            summary.clean_games += 1;
        }
        summary.diagnostics += parsed.diagnostics.len();
        for diagnostic in &parsed.diagnostics {
            writeln!(out, "{}: {}", path.display(), diagnostic)?;
        }
    }
    writeln!(
        out,
        "{} games, {} clean, {} problems",
        summary.games, summary.clean_games, summary.diagnostics
    )?;
    Ok(summary)
}

/// Lists each game's number, byte offset and roster tags, tab separated.
pub fn index<W: Write>(path: &Path, encoding: Encoding, out: &mut W) -> Result<usize> {
    let mut reader = open(path, encoding)?;
    let mut count = 0;
    while let Some(parsed) = reader.read_headers() {
        count += 1;
        let h = &parsed.headers;
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            count,
            parsed.offset,
            h.roster_value("Event"),
            h.roster_value("Date"),
            h.roster_value("White"),
            h.roster_value("Black"),
            h.roster_value("Result"),
        )?;
    }
    Ok(count)
}

/// Analyses one game with an engine and writes it back annotated.
pub fn annotate<W: Write>(
    config: &crate::config::AnnotateConfig,
    args: &AnnotateArgs,
    encoding: Encoding,
    out: &mut W,
) -> Result<AnnotationSummary> {
    let parsed = read_game_at(&args.pgn, encoding, args.game)?;
    for diagnostic in &parsed.diagnostics {
        tracing::warn!("{}", diagnostic);
    }
    let mut game = parsed.game;

    let (engine_name, engine) = config.engine(args.engine.as_deref());
    let session = EngineSession::setup(
        &engine.path,
        engine.uci_options(&engine_name)?,
        engine.session_config(),
    )
    .with_context(|| format!("Failed to start engine {}", engine_name))?;
    let label = session.name().unwrap_or(&engine_name).to_string();
    tracing::info!("Annotating game {} of {} with {}", args.game, args.pgn.display(), label);

    let mut analysis = config.analysis;
    if let Some(ms) = args.movetime_ms {
        analysis.movetime_ms = Some(ms);
        analysis.depth = args.depth;
    } else if let Some(depth) = args.depth {
        analysis.depth = Some(depth);
    }
    if let Some(multipv) = args.multipv {
        analysis.multipv = multipv;
    }

    let annotator = config.annotator(&label);
    let mut analyzer = GameAnalyzer::new(session, analysis);
    let summary = analyzer
        .annotate(&mut game, &annotator)
        .with_context(|| format!("Failed to analyse game {}", args.game))?;
    analyzer.into_session().quit()?;

    match &args.out {
        Some(path) => {
            write_pgn(path, std::slice::from_ref(&game))
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => write_game(out, &game)?,
    }
    if let Some(path) = &args.stats {
        let report = StatsReport {
            pgn: &args.pgn,
            game: args.game,
            engine: &label,
            summary: &summary,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(summary)
}

/// Per-player counts, one line per side.
pub fn print_summary<W: Write>(summary: &AnnotationSummary, out: &mut W) -> Result<()> {
    for (side, stats) in [("White", &summary.white), ("Black", &summary.black)] {
        writeln!(out, "{}: {}", side, describe(stats))?;
    }
    Ok(())
}

fn describe(stats: &PlayerStats) -> String {
    let counts: Vec<String> = MoveQuality::ALL
        .iter()
        .filter(|&&q| stats.count(q) > 0)
        .map(|&q| format!("{} {}", stats.count(q), q))
        .collect();
    if counts.is_empty() {
        format!("{} moves", stats.total_moves)
    } else {
        format!("{} moves, {}", stats.total_moves, counts.join(", "))
    }
}

/// Starts an engine and prints its identity and declared options.
pub fn engine_info<W: Write>(config: &crate::config::AnnotateConfig, name: Option<&str>, out: &mut W) -> Result<()> {
    let (engine_name, engine) = config.engine(name);
    let mut session = EngineSession::setup(
        &engine.path,
        engine.uci_options(&engine_name)?,
        engine.session_config(),
    )
    .with_context(|| format!("Failed to start engine {}", engine_name))?;

    writeln!(out, "id name {}", session.name().unwrap_or("?"))?;
    writeln!(out, "id author {}", session.author().unwrap_or("?"))?;
    writeln!(out, "path {}", session.path().display())?;
    for option in session.options() {
        writeln!(out, "{}", option)?;
    }
    session.quit()?;
    Ok(())
}
