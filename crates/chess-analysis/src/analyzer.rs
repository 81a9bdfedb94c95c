//! Game analysis over the mainline of a game tree.
//!
//! This module provides the [`GameAnalyzer`], which scores every mainline
//! position with an [`EngineSession`] so an [`Annotator`] can classify the
//! moves afterwards.

use chess_pgn::{Game, MoveEngine, NodeId, TreeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotator::{AnnotationSummary, Annotator};
use crate::engine::{EngineError, EngineSession, PvLine, SearchLimits};
use crate::Evaluation;

/// Errors that can occur during game analysis.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Error from the analysis engine.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// The game tree rejected an update.
    #[error("Game tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Engine verdict on one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionScore {
    pub node: NodeId,
    /// Best evaluation, from the side to move at `node`.
    pub evaluation: Evaluation,
    /// In UCI notation.
    pub best_move: Option<String>,
    /// Lines ordered by PV index.
    pub lines: Vec<PvLine>,
}

/// Configuration for game analysis. Unset fields keep their defaults, so a
/// configured `movetime_ms` still runs with the default depth limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum search depth for position analysis.
    pub depth: Option<u32>,
    pub movetime_ms: Option<u64>,
    /// Lines searched per position, the extra ones become variations.
    pub multipv: u32,
    /// Plies at the start of the game left unscored, e.g. known opening moves.
    pub first_ply: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            depth: Some(15),
            movetime_ms: None,
            multipv: 1,
            first_ply: 0,
        }
    }
}

impl AnalysisConfig {
    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            depth: self.depth,
            movetime_ms: self.movetime_ms,
            multipv: Some(self.multipv.max(1)),
        }
    }
}

/// Scores games with a UCI engine.
pub struct GameAnalyzer {
    session: EngineSession,
    config: AnalysisConfig,
}

impl GameAnalyzer {
    /// Creates an analyzer around a session in the `Ready` state.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use chess_analysis::{AnalysisConfig, EngineSession, GameAnalyzer, SessionConfig};
    ///
    /// let session = EngineSession::setup("stockfish", Vec::new(), SessionConfig::default())?;
    /// let mut analyzer = GameAnalyzer::new(session, AnalysisConfig::default());
    /// ```
    pub fn new(session: EngineSession, config: AnalysisConfig) -> Self {
        Self { session, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn session(&self) -> &EngineSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EngineSession {
        &mut self.session
    }

    pub fn into_session(self) -> EngineSession {
        self.session
    }

    /// Scores the start position and every mainline position from
    /// `first_ply` on.
    ///
    /// Positions the engine reports no score for (some engines stay silent
    /// on checkmate or stalemate) are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails or a node disappears.
    pub fn analyze_mainline(&mut self, game: &Game) -> Result<Vec<PositionScore>, AnalyzerError> {
        self.session.new_game()?;
        let nodes: Vec<NodeId> = std::iter::once(game.root()).chain(game.mainline()).collect();
        let total = nodes.len();
        let limits = self.config.limits();

        let mut scores = Vec::with_capacity(total);
        for (ply, node) in nodes.into_iter().enumerate().skip(self.config.first_ply as usize) {
            let position = game.node(node)?.position();
            let result = self.session.analyse(position, &limits)?;
            let Some(evaluation) = result.evaluation() else {
                tracing::warn!("No score for ply {} ({})", ply, position);
                continue;
            };
            tracing::info!("Ply {}/{}: {} best {:?}", ply, total - 1, evaluation, result.best_move);
            scores.push(PositionScore {
                node,
                evaluation,
                best_move: result.best_move,
                lines: result.lines.into_values().collect(),
            });
        }
        Ok(scores)
    }

    /// Scores the mainline and hands the scores to `annotator`.
    pub fn annotate<E: MoveEngine>(
        &mut self,
        game: &mut Game,
        annotator: &Annotator<E>,
    ) -> Result<AnnotationSummary, AnalyzerError> {
        let scores = self.analyze_mainline(game)?;
        Ok(annotator.annotate_game(game, &scores)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.limits(), SearchLimits::depth(15).with_multipv(1));
        assert_eq!(config.first_ply, 0);
    }

    #[test]
    fn test_config_from_toml() {
        let config: AnalysisConfig = toml::from_str("multipv = 3\nfirst_ply = 6\n").unwrap();
        assert_eq!(config.limits(), SearchLimits::depth(15).with_multipv(3));
        assert_eq!(config.first_ply, 6);

        let config: AnalysisConfig = toml::from_str("movetime_ms = 250\n").unwrap();
        assert_eq!(config.limits().movetime_ms, Some(250));
        assert_eq!(config.limits().depth, Some(15));
    }

    #[test]
    fn test_config_json() {
        let config = AnalysisConfig {
            depth: None,
            movetime_ms: Some(250),
            multipv: 2,
            first_ply: 2,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"movetime_ms\":250"));
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
