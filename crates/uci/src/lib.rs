//! UCI (Universal Chess Interface) protocol library.
//!
//! Both directions of the UCI text protocol. [`GuiCommand`] is what a
//! controller writes to an engine's stdin, [`EngineMessage`] what it reads
//! back. Each type parses and formats, so the same code serves the
//! annotator and the scripted test engine.
//!
//! A session runs `uci` until `uciok`, then any number of `setoption`,
//! `isready`/`readyok` to synchronize, and per search `position` followed
//! by `go`. The engine streams `info` lines and finishes with `bestmove`.

mod command;
mod info;
mod option;

pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, InfoBuilder, Score, ScoreBound};
pub use option::{OptionKind, OptionSpec};

use std::fmt;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid value '{value}' for option {name}: {reason}")]
    InvalidOptionValue {
        name: String,
        value: String,
        reason: String,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found. `(none)` when there is no legal move.
    BestMove { mv: String, ponder: Option<String> },
    /// Option declaration.
    Option(OptionSpec),
    /// Anything else the engine prints.
    Unknown(String),
}

impl EngineMessage {
    /// Parse one line of engine output. Never fails: unrecognized or
    /// malformed lines come back as [`EngineMessage::Unknown`].
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("uciok") => EngineMessage::UciOk,
            Some("readyok") => EngineMessage::ReadyOk,
            Some("id") => {
                let field = parts.next();
                let value = parts.collect::<Vec<_>>().join(" ");
                match field {
                    Some("name") => EngineMessage::Id {
                        name: Some(value),
                        author: None,
                    },
                    Some("author") => EngineMessage::Id {
                        name: None,
                        author: Some(value),
                    },
                    _ => EngineMessage::Unknown(line.to_string()),
                }
            }
            Some("bestmove") => match parts.next() {
                Some(mv) => {
                    let ponder = match parts.next() {
                        Some("ponder") => parts.next().map(str::to_string),
                        _ => None,
                    };
                    EngineMessage::BestMove {
                        mv: mv.to_string(),
                        ponder,
                    }
                }
                None => EngineMessage::Unknown(line.to_string()),
            },
            Some("info") => match EngineInfo::parse(line) {
                Some(info) => EngineMessage::Info(info),
                None => EngineMessage::Unknown(line.to_string()),
            },
            Some("option") => match OptionSpec::parse(line) {
                Ok(spec) => EngineMessage::Option(spec),
                Err(_) => EngineMessage::Unknown(line.to_string()),
            },
            _ => EngineMessage::Unknown(line.to_string()),
        }
    }

    /// Format as protocol text without the trailing newline. An `Id`
    /// carrying both fields spans two lines.
    pub fn to_uci(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EngineMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMessage::Id { name, author } => {
                let lines = [("name", name), ("author", author)];
                let mut sep = "";
                for (field, value) in lines {
                    if let Some(value) = value {
                        write!(f, "{}id {} {}", sep, field, value)?;
                        sep = "\n";
                    }
                }
                Ok(())
            }
            EngineMessage::UciOk => f.write_str("uciok"),
            EngineMessage::ReadyOk => f.write_str("readyok"),
            EngineMessage::Info(info) => fmt::Display::fmt(info, f),
            EngineMessage::BestMove { mv, ponder } => {
                write!(f, "bestmove {}", mv)?;
                if let Some(ponder) = ponder {
                    write!(f, " ponder {}", ponder)?;
                }
                Ok(())
            }
            EngineMessage::Option(spec) => fmt::Display::fmt(spec, f),
            EngineMessage::Unknown(line) => f.write_str(line),
        }
    }
}

impl From<EngineInfo> for EngineMessage {
    fn from(info: EngineInfo) -> Self {
        EngineMessage::Info(info)
    }
}

impl From<OptionSpec> for EngineMessage {
    fn from(spec: OptionSpec) -> Self {
        EngineMessage::Option(spec)
    }
}

/// The engine end of a UCI pipe: reads [`GuiCommand`]s, writes
/// [`EngineMessage`]s and flushes after every one.
pub struct UciEngine<R, W> {
    reader: R,
    writer: W,
}

impl UciEngine<BufReader<Stdin>, Stdout> {
    /// Engine talking over the process's own stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> UciEngine<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Next command, or `None` once the controller closed the pipe.
    pub fn read_command(&mut self) -> Result<Option<GuiCommand>, UciError> {
        let mut buf = String::new();
        match self.reader.read_line(&mut buf)? {
            0 => Ok(None),
            _ => GuiCommand::parse(&buf).map(Some),
        }
    }

    pub fn send(&mut self, msg: impl Into<EngineMessage>) -> Result<(), UciError> {
        writeln!(self.writer, "{}", msg.into())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Both `id` lines.
    pub fn identify(&mut self, name: &str, author: &str) -> Result<(), UciError> {
        self.send(EngineMessage::Id {
            name: Some(name.into()),
            author: Some(author.into()),
        })
    }

    pub fn best_move(&mut self, mv: &str, ponder: Option<&str>) -> Result<(), UciError> {
        self.send(EngineMessage::BestMove {
            mv: mv.into(),
            ponder: ponder.map(Into::into),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_engine_messages() {
        assert_eq!(EngineMessage::parse("uciok\n"), EngineMessage::UciOk);
        assert_eq!(EngineMessage::parse("readyok"), EngineMessage::ReadyOk);
        assert_eq!(
            EngineMessage::parse("id name Stockfish 16.1"),
            EngineMessage::Id {
                name: Some("Stockfish 16.1".to_string()),
                author: None
            }
        );
        assert_eq!(
            EngineMessage::parse("bestmove e2e4 ponder e7e5"),
            EngineMessage::BestMove {
                mv: "e2e4".to_string(),
                ponder: Some("e7e5".to_string())
            }
        );
        assert_eq!(
            EngineMessage::parse("bestmove (none)"),
            EngineMessage::BestMove {
                mv: "(none)".to_string(),
                ponder: None
            }
        );
        assert!(matches!(
            EngineMessage::parse("option name Hash type spin default 16 min 1 max 1024"),
            EngineMessage::Option(_)
        ));
        assert!(matches!(
            EngineMessage::parse("info depth 3 score cp 12 pv e2e4"),
            EngineMessage::Info(_)
        ));
        assert_eq!(
            EngineMessage::parse("Stockfish 16 by the Stockfish developers"),
            EngineMessage::Unknown("Stockfish 16 by the Stockfish developers".to_string())
        );
        assert!(matches!(EngineMessage::parse("bestmove"), EngineMessage::Unknown(_)));
    }

    #[test]
    fn engine_loop_reads_until_eof() {
        let input = b"uci\nisready\n" as &[u8];
        let mut output = Vec::new();
        let mut engine = UciEngine::new(input, &mut output);

        assert_eq!(engine.read_command().unwrap(), Some(GuiCommand::Uci));
        engine.identify("Scripted", "Tests").unwrap();
        engine.send(EngineMessage::UciOk).unwrap();
        assert_eq!(engine.read_command().unwrap(), Some(GuiCommand::IsReady));
        engine.send(EngineMessage::ReadyOk).unwrap();
        assert_eq!(engine.read_command().unwrap(), None);

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "id name Scripted\nid author Tests\nuciok\nreadyok\n");
    }
}
