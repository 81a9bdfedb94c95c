//! Chess position analysis with UCI engines.
//!
//! This crate drives an external UCI engine, classifies moves from the
//! evaluation swing they cause and writes the verdicts into PGN game trees.
//!
//! # Overview
//!
//! - [`EngineSession`] - One engine subprocess with a reader thread and a state machine
//! - [`Evaluation`] - Position evaluation (centipawn or mate score)
//! - [`Thresholds`] / [`MoveQuality`] - Classification of moves by evaluation swing
//! - [`Annotator`] - Writes NAGs, `[%eval]` / `[%annotation]` commands and engine lines
//! - [`GameAnalyzer`] - Scores the mainline of a game with an engine session
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{AnalysisConfig, Annotator, EngineSession, GameAnalyzer, SessionConfig};
//!
//! let session = EngineSession::setup("stockfish", Vec::new(), SessionConfig::default())?;
//! let mut analyzer = GameAnalyzer::new(session, AnalysisConfig::default());
//! let summary = analyzer.annotate(&mut game, &Annotator::new("Stockfish"))?;
//! println!("White blunders: {}", summary.white.blunders);
//! ```

pub mod analyzer;
pub mod annotator;
pub mod engine;
pub mod evaluation;
pub mod quality;

pub use analyzer::{AnalysisConfig, AnalyzerError, GameAnalyzer, PositionScore};
pub use annotator::{AnnotationSummary, Annotator, DEFAULT_HINT_PLIES};
pub use engine::{
    EngineError, EngineSession, PvLine, SearchEvent, SearchLimits, SearchResult, SessionConfig, SessionState,
};
pub use evaluation::Evaluation;
pub use quality::{MoveQuality, PlayerStats, Thresholds};
