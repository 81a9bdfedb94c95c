//! Commands sent from GUI to engine.

use std::fmt;

use crate::UciError;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// The next position belongs to a different game.
    UciNewGame,
    /// Change an engine option. Buttons carry no value.
    SetOption { name: String, value: Option<String> },
    /// Set up position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
    /// Unknown command (for forward compatibility).
    Unknown(String),
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search this many nodes.
    pub nodes: Option<u64>,
    /// Search for a mate in this many moves.
    pub mate: Option<u32>,
    /// Search indefinitely until `stop`.
    pub infinite: bool,
}

impl GoOptions {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime: Some(ms),
            ..Self::default()
        }
    }

    pub fn infinite() -> Self {
        Self {
            infinite: true,
            ..Self::default()
        }
    }
}

fn value_of<'a, T: std::str::FromStr>(
    parts: &mut impl Iterator<Item = &'a str>,
    key: &str,
) -> Result<T, UciError> {
    parts
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| UciError::ParseError(format!("missing or invalid value for '{}'", key)))
}

impl GuiCommand {
    /// Parse a UCI command string.
    pub fn parse(input: &str) -> Result<Self, UciError> {
        let input = input.trim();
        let mut parts = input.split_whitespace();

        match parts.next().unwrap_or("") {
            "uci" => Ok(GuiCommand::Uci),
            "isready" => Ok(GuiCommand::IsReady),
            "ucinewgame" => Ok(GuiCommand::UciNewGame),
            "stop" => Ok(GuiCommand::Stop),
            "quit" => Ok(GuiCommand::Quit),
            "setoption" => Self::parse_setoption(parts),
            "position" => Self::parse_position(parts),
            "go" => Self::parse_go(parts),
            _ => Ok(GuiCommand::Unknown(input.to_string())),
        }
    }

    fn parse_setoption<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        if parts.next() != Some("name") {
            return Err(UciError::ParseError("Expected 'name' after setoption".to_string()));
        }
        let mut name = Vec::new();
        let mut value: Option<Vec<&str>> = None;
        for part in parts {
            match value.as_mut() {
                Some(v) => v.push(part),
                None if part == "value" => value = Some(Vec::new()),
                None => name.push(part),
            }
        }
        if name.is_empty() {
            return Err(UciError::ParseError("Missing option name".to_string()));
        }
        Ok(GuiCommand::SetOption {
            name: name.join(" "),
            value: value.map(|v| v.join(" ")),
        })
    }

    fn parse_position<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let fen = match parts.next() {
            Some("startpos") => None,
            Some("fen") => {
                let fen: Vec<&str> = parts.by_ref().take_while(|&p| p != "moves").collect();
                if fen.is_empty() {
                    return Err(UciError::ParseError("Empty FEN".to_string()));
                }
                let moves = parts.map(str::to_string).collect();
                return Ok(GuiCommand::Position {
                    fen: Some(fen.join(" ")),
                    moves,
                });
            }
            Some(other) => {
                return Err(UciError::ParseError(format!(
                    "Expected 'startpos' or 'fen', got '{}'",
                    other
                )));
            }
            None => {
                return Err(UciError::ParseError(
                    "Expected 'startpos' or 'fen'".to_string(),
                ));
            }
        };
        let moves = match parts.next() {
            Some("moves") => parts.map(str::to_string).collect(),
            _ => Vec::new(),
        };
        Ok(GuiCommand::Position { fen, moves })
    }

    fn parse_go<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let mut opts = GoOptions::default();
        while let Some(key) = parts.next() {
            match key {
                "movetime" => opts.movetime = Some(value_of(&mut parts, key)?),
                "depth" => opts.depth = Some(value_of(&mut parts, key)?),
                "nodes" => opts.nodes = Some(value_of(&mut parts, key)?),
                "mate" => opts.mate = Some(value_of(&mut parts, key)?),
                "infinite" => opts.infinite = true,
                // Clock parameters take a value we do not use.
                "wtime" | "btime" | "winc" | "binc" | "movestogo" => {
                    parts.next();
                }
                _ => {}
            }
        }
        Ok(GuiCommand::Go(opts))
    }

    /// Format the command as a protocol line, without the newline.
    pub fn to_uci(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GuiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuiCommand::Uci => write!(f, "uci"),
            GuiCommand::IsReady => write!(f, "isready"),
            GuiCommand::UciNewGame => write!(f, "ucinewgame"),
            GuiCommand::SetOption { name, value: None } => write!(f, "setoption name {}", name),
            GuiCommand::SetOption {
                name,
                value: Some(value),
            } => write!(f, "setoption name {} value {}", name, value),
            GuiCommand::Position { fen, moves } => {
                match fen {
                    Some(fen) => write!(f, "position fen {}", fen)?,
                    None => write!(f, "position startpos")?,
                }
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            }
            GuiCommand::Go(opts) => {
                write!(f, "go")?;
                if let Some(d) = opts.depth {
                    write!(f, " depth {}", d)?;
                }
                if let Some(n) = opts.nodes {
                    write!(f, " nodes {}", n)?;
                }
                if let Some(m) = opts.mate {
                    write!(f, " mate {}", m)?;
                }
                if let Some(t) = opts.movetime {
                    write!(f, " movetime {}", t)?;
                }
                if opts.infinite {
                    write!(f, " infinite")?;
                }
                Ok(())
            }
            GuiCommand::Stop => write!(f, "stop"),
            GuiCommand::Quit => write!(f, "quit"),
            GuiCommand::Unknown(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_commands() {
        assert_eq!(GuiCommand::parse("uci").unwrap(), GuiCommand::Uci);
        assert_eq!(GuiCommand::parse("isready\n").unwrap(), GuiCommand::IsReady);
        assert_eq!(GuiCommand::parse("ucinewgame").unwrap(), GuiCommand::UciNewGame);
        assert_eq!(
            GuiCommand::parse("").unwrap(),
            GuiCommand::Unknown(String::new())
        );
    }

    #[test]
    fn parse_position_startpos_with_moves() {
        let cmd = GuiCommand::parse("position startpos moves e2e4 e7e5").unwrap();
        assert_eq!(
            cmd,
            GuiCommand::Position {
                fen: None,
                moves: vec!["e2e4".to_string(), "e7e5".to_string()]
            }
        );
    }

    #[test]
    fn parse_position_fen_with_moves() {
        let cmd = GuiCommand::parse(
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1 moves e7e5",
        )
        .unwrap();
        assert_eq!(
            cmd,
            GuiCommand::Position {
                fen: Some("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".to_string()),
                moves: vec!["e7e5".to_string()]
            }
        );
        assert!(GuiCommand::parse("position fen").is_err());
        assert!(GuiCommand::parse("position").is_err());
    }

    #[test]
    fn parse_setoption() {
        assert_eq!(
            GuiCommand::parse("setoption name Skill Level value 10").unwrap(),
            GuiCommand::SetOption {
                name: "Skill Level".to_string(),
                value: Some("10".to_string())
            }
        );
        assert_eq!(
            GuiCommand::parse("setoption name Clear Hash").unwrap(),
            GuiCommand::SetOption {
                name: "Clear Hash".to_string(),
                value: None
            }
        );
        assert!(GuiCommand::parse("setoption value 3").is_err());
    }

    #[test]
    fn parse_go() {
        let GuiCommand::Go(opts) = GuiCommand::parse("go wtime 1000 btime 1000 depth 12").unwrap()
        else {
            panic!("Expected Go command");
        };
        assert_eq!(opts.depth, Some(12));
        assert!(!opts.infinite);
        assert!(GuiCommand::parse("go depth x").is_err());
    }

    #[test]
    fn format_round_trips() {
        let commands = [
            GuiCommand::SetOption {
                name: "MultiPV".to_string(),
                value: Some("3".to_string()),
            },
            GuiCommand::Position {
                fen: Some("8/8/8/8/8/8/4k3/4K3 w - - 0 1".to_string()),
                moves: vec!["e1d1".to_string()],
            },
            GuiCommand::Go(GoOptions::depth(18)),
            GuiCommand::Go(GoOptions::movetime(250)),
            GuiCommand::Go(GoOptions::infinite()),
        ];
        for cmd in commands {
            assert_eq!(GuiCommand::parse(&cmd.to_uci()).unwrap(), cmd);
        }
        assert_eq!(GuiCommand::Go(GoOptions::depth(5)).to_uci(), "go depth 5");
    }
}
