//! UCI `info` lines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Score in centipawns or mate distance, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Hundredths of a pawn.
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated).
    Mate(i32),
}

/// Marks a score reported during an aspiration window fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBound {
    Lower,
    Upper,
}

/// One `info` line. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Plies searched.
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    /// 1-based index of the line when several are searched.
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub bound: Option<ScoreBound>,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Milliseconds.
    pub time: Option<u64>,
    /// Principal variation in UCI move notation.
    pub pv: Vec<String>,
    pub currmove: Option<String>,
    pub currmovenumber: Option<u32>,
    /// Per mille.
    pub hashfull: Option<u32>,
    /// Free text, always last on the line.
    pub string: Option<String>,
}

const KEYWORDS: &[&str] = &[
    "depth",
    "seldepth",
    "multipv",
    "score",
    "nodes",
    "nps",
    "time",
    "pv",
    "currmove",
    "currmovenumber",
    "hashfull",
    "tbhits",
    "sbhits",
    "cpuload",
    "refutation",
    "currline",
    "string",
];

fn is_keyword(token: &str) -> bool {
    KEYWORDS.contains(&token)
}

impl EngineInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// PV index, 1 when the engine did not say.
    pub fn pv_index(&self) -> u32 {
        self.multipv.unwrap_or(1)
    }

    /// Format as a protocol line, without the newline.
    pub fn to_uci(&self) -> String {
        self.to_string()
    }

    /// Parse a UCI info line. Unknown keywords and malformed values are
    /// skipped rather than rejected, engines vary too much.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().peekable();
        if parts.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::new();
        while let Some(key) = parts.next() {
            match key {
                "depth" => info.depth = number(&mut parts),
                "seldepth" => info.seldepth = number(&mut parts),
                "multipv" => info.multipv = number(&mut parts),
                "nodes" => info.nodes = number(&mut parts),
                "nps" => info.nps = number(&mut parts),
                "time" => info.time = number(&mut parts),
                "hashfull" => info.hashfull = number(&mut parts),
                "currmove" => info.currmove = parts.next().map(str::to_string),
                "currmovenumber" => info.currmovenumber = number(&mut parts),
                "score" => {
                    let kind = parts.next();
                    let value = number(&mut parts);
                    info.score = match (kind, value) {
                        (Some("cp"), Some(cp)) => Some(Score::Cp(cp)),
                        (Some("mate"), Some(m)) => Some(Score::Mate(m)),
                        _ => None,
                    };
                    info.bound = match parts.peek() {
                        Some(&"lowerbound") => Some(ScoreBound::Lower),
                        Some(&"upperbound") => Some(ScoreBound::Upper),
                        _ => None,
                    };
                    if info.bound.is_some() {
                        parts.next();
                    }
                }
                "pv" => {
                    while let Some(mv) = parts.next_if(|p| !is_keyword(p)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    info.string = Some(parts.by_ref().collect::<Vec<_>>().join(" "));
                }
                _ => {}
            }
        }

        Some(info)
    }
}

fn number<'a, T: FromStr>(parts: &mut impl Iterator<Item = &'a str>) -> Option<T> {
    parts.next().and_then(|v| v.parse().ok())
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Cp(cp) => write!(f, "cp {}", cp),
            Score::Mate(moves) => write!(f, "mate {}", moves),
        }
    }
}

impl fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("info")?;
        let search = [
            ("depth", self.depth.map(u64::from)),
            ("seldepth", self.seldepth.map(u64::from)),
            ("multipv", self.multipv.map(u64::from)),
        ];
        for (key, value) in search {
            if let Some(value) = value {
                write!(f, " {} {}", key, value)?;
            }
        }
        if let Some(score) = &self.score {
            write!(f, " score {}", score)?;
            match self.bound {
                Some(ScoreBound::Lower) => f.write_str(" lowerbound")?,
                Some(ScoreBound::Upper) => f.write_str(" upperbound")?,
                None => {}
            }
        }
        let counters = [
            ("nodes", self.nodes),
            ("nps", self.nps),
            ("time", self.time),
            ("hashfull", self.hashfull.map(u64::from)),
        ];
        for (key, value) in counters {
            if let Some(value) = value {
                write!(f, " {} {}", key, value)?;
            }
        }
        if let Some(mv) = &self.currmove {
            write!(f, " currmove {}", mv)?;
        }
        if let Some(n) = self.currmovenumber {
            write!(f, " currmovenumber {}", n)?;
        }
        if !self.pv.is_empty() {
            write!(f, " pv {}", self.pv.join(" "))?;
        }
        // Free text swallows the rest of the line, so it goes last.
        if let Some(text) = &self.string {
            write!(f, " string {}", text)?;
        }
        Ok(())
    }
}

/// Chained construction of [`EngineInfo`], mostly for engines and tests.
#[derive(Default)]
pub struct InfoBuilder {
    info: EngineInfo,
}

impl InfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, plies: u32) -> Self {
        self.info.depth = Some(plies);
        self
    }

    pub fn multipv(mut self, k: u32) -> Self {
        self.info.multipv = Some(k);
        self
    }

    pub fn score(mut self, score: Score) -> Self {
        self.info.score = Some(score);
        self
    }

    pub fn score_cp(self, cp: i32) -> Self {
        self.score(Score::Cp(cp))
    }

    pub fn score_mate(self, moves: i32) -> Self {
        self.score(Score::Mate(moves))
    }

    pub fn bound(mut self, bound: ScoreBound) -> Self {
        self.info.bound = Some(bound);
        self
    }

    pub fn nodes(mut self, count: u64) -> Self {
        self.info.nodes = Some(count);
        self
    }

    pub fn time(mut self, millis: u64) -> Self {
        self.info.time = Some(millis);
        self
    }

    pub fn pv<S: Into<String>>(mut self, moves: impl IntoIterator<Item = S>) -> Self {
        self.info.pv = moves.into_iter().map(Into::into).collect();
        self
    }

    pub fn string(mut self, text: impl Into<String>) -> Self {
        self.info.string = Some(text.into());
        self
    }

    pub fn build(self) -> EngineInfo {
        self.info
    }
}
