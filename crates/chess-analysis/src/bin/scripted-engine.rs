//! Deterministic UCI engine for the session tests.
//!
//! Behavior comes from environment variables:
//!
//! - `SCRIPTED_ENGINE_SCORES`: comma separated scores, one per `go`, the last
//!   one repeating. `cp` values as plain numbers, mates as `m3` / `m-2`.
//!   Defaults to `25`.
//! - `SCRIPTED_ENGINE_PV`: principal variation in UCI notation, `e2e4 e7e5
//!   g1f3` by default. Empty means `bestmove (none)`.
//! - `SCRIPTED_ENGINE_CRASH_ON`: command name that makes the engine exit.
//! - `SCRIPTED_ENGINE_SILENT`: never answer anything.
//! - `SCRIPTED_ENGINE_DELAY_MS`: pause before `bestmove` of limited searches.
//! - `SCRIPTED_ENGINE_LOG`: file receiving every command read.
//!
//! Info lines of a multi-PV search are emitted highest index first.

use std::env;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::process;
use std::thread;
use std::time::Duration;

use uci::{
    EngineInfo, EngineMessage, GuiCommand, InfoBuilder, OptionKind, OptionSpec, Score, UciEngine,
    UciError,
};

struct Script {
    scores: Vec<Score>,
    pv: Vec<String>,
    crash_on: Option<String>,
    silent: bool,
    delay: Option<Duration>,
    log: Option<File>,
}

impl Script {
    fn from_env() -> Self {
        let scores = env::var("SCRIPTED_ENGINE_SCORES")
            .unwrap_or_else(|_| "25".to_string())
            .split(',')
            .filter_map(parse_score)
            .collect();
        let pv = env::var("SCRIPTED_ENGINE_PV")
            .unwrap_or_else(|_| "e2e4 e7e5 g1f3".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let log = env::var("SCRIPTED_ENGINE_LOG")
            .ok()
            .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());
        Self {
            scores,
            pv,
            crash_on: env::var("SCRIPTED_ENGINE_CRASH_ON").ok(),
            silent: env::var("SCRIPTED_ENGINE_SILENT").is_ok(),
            delay: env::var("SCRIPTED_ENGINE_DELAY_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis),
            log,
        }
    }

    fn score(&self, search: usize) -> Score {
        self.scores
            .get(search)
            .or(self.scores.last())
            .copied()
            .unwrap_or(Score::Cp(0))
    }

    fn record(&mut self, command: &GuiCommand) {
        if let Some(log) = self.log.as_mut() {
            let _ = writeln!(log, "{}", command);
        }
    }

    fn crashes_on(&self, command: &GuiCommand) -> bool {
        let name = command.to_uci();
        self.crash_on.as_deref() == name.split_whitespace().next()
    }

    fn best_move(&self) -> &str {
        self.pv.first().map(String::as_str).unwrap_or("(none)")
    }
}

fn parse_score(text: &str) -> Option<Score> {
    let text = text.trim();
    match text.strip_prefix('m') {
        Some(moves) => moves.parse().ok().map(Score::Mate),
        None => text.parse().ok().map(Score::Cp),
    }
}

fn declared_options() -> Vec<OptionSpec> {
    let spin = |name: &str, default, min, max| OptionSpec {
        name: name.to_string(),
        kind: OptionKind::Spin { default, min, max },
    };
    let check = |name: &str| OptionSpec {
        name: name.to_string(),
        kind: OptionKind::Check { default: false },
    };
    vec![
        spin("Hash", 16, 1, 1024),
        spin("MultiPV", 1, 1, 5),
        check("UCI_AnalyseMode"),
        check("UCI_LimitStrength"),
        spin("UCI_Elo", 1500, 1320, 3190),
        OptionSpec {
            name: "Clear Hash".to_string(),
            kind: OptionKind::Button,
        },
        OptionSpec {
            name: "Style".to_string(),
            kind: OptionKind::Combo {
                default: "Normal".to_string(),
                vars: vec!["Solid".to_string(), "Normal".to_string(), "Risky".to_string()],
            },
        },
    ]
}

fn pv_info(depth: u32, index: u32, score: Score, pv: &[String]) -> EngineInfo {
    let builder = InfoBuilder::new().depth(depth).multipv(index).nodes(u64::from(depth) * 1000);
    let builder = match score {
        Score::Cp(cp) => {
            let step = i32::try_from(index.saturating_sub(1)).unwrap_or(i32::MAX);
            builder.score_cp(cp.saturating_sub(step.saturating_mul(10)))
        }
        Score::Mate(moves) => builder.score_mate(moves),
    };
    builder.pv(pv.iter()).build()
}

fn run() -> Result<(), UciError> {
    let mut script = Script::from_env();
    let mut engine = UciEngine::stdio();
    let mut multipv = 1;
    let mut searches = 0;
    let mut searching = false;

    while let Some(command) = engine.read_command()? {
        script.record(&command);
        if script.crashes_on(&command) {
            process::exit(3);
        }
        if script.silent {
            if command == GuiCommand::Quit {
                break;
            }
            continue;
        }
        match command {
            GuiCommand::Uci => {
                engine.send(EngineMessage::Unknown("Scripted engine for session tests".to_string()))?;
                engine.identify("Scripted Engine", "chess-analysis")?;
                for spec in declared_options() {
                    engine.send(spec)?;
                }
                engine.send(EngineMessage::UciOk)?;
            }
            GuiCommand::IsReady => engine.send(EngineMessage::ReadyOk)?,
            GuiCommand::SetOption { name, value } if name == "MultiPV" => {
                multipv = value.and_then(|v| v.parse().ok()).unwrap_or(1);
            }
            GuiCommand::Go(go) => {
                let score = script.score(searches);
                searches += 1;
                for depth in 1..=go.depth.unwrap_or(3) {
                    for index in (1..=multipv).rev() {
                        engine.send(pv_info(depth, index, score, &script.pv))?;
                    }
                }
                engine.send(InfoBuilder::new().string("scripted search done").build())?;
                if go.infinite {
                    searching = true;
                } else {
                    if let Some(delay) = script.delay {
                        thread::sleep(delay);
                    }
                    engine.best_move(script.best_move(), None)?;
                }
            }
            GuiCommand::Stop if searching => {
                searching = false;
                engine.best_move(script.best_move(), script.pv.get(1).map(String::as_str))?;
            }
            GuiCommand::Quit => break,
            _ => {}
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("scripted-engine: {}", e);
        process::exit(1);
    }
}
