//! Writing move classifications back into a game.
//!
//! Each classified move gets the NAG of its class and a comment carrying
//! embedded commands: `[%eval]` with the score from White's point of view
//! and, when the move was classified, `[%annotation]` with the verdict and
//! the swing. Commands from an earlier run are replaced, other comment text
//! is kept.

use std::collections::HashMap;

use chess_pgn::{Game, MoveEngine, NodeId, Side, StandardChess, TreeError};
use serde::Serialize;

use crate::analyzer::PositionScore;
use crate::engine::PvLine;
use crate::quality::{swing, MoveQuality, PlayerStats, Thresholds};
use crate::Evaluation;

const EVAL_COMMAND: &str = "eval";
const ANNOTATION_COMMAND: &str = "annotation";

/// Plies of an engine line kept when it is added as a variation.
pub const DEFAULT_HINT_PLIES: usize = 3;

/// Outcome of annotating a whole game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationSummary {
    pub white: PlayerStats,
    pub black: PlayerStats,
    /// Nodes where an engine line was grafted.
    #[serde(skip)]
    pub variations: Vec<NodeId>,
}

impl AnnotationSummary {
    pub fn stats(&self, side: Side) -> &PlayerStats {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

/// Classifies moves and annotates the tree.
pub struct Annotator<E: MoveEngine = StandardChess> {
    name: String,
    thresholds: Thresholds,
    variation_classes: Vec<MoveQuality>,
    hint_plies: usize,
    engine: E,
}

impl Annotator<StandardChess> {
    /// An annotator writing `name` into the `Annotator` header. Blunders get
    /// the engine's lines added as variations.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_engine(name, StandardChess)
    }
}

impl<E: MoveEngine> Annotator<E> {
    pub fn with_engine(name: impl Into<String>, engine: E) -> Self {
        Self {
            name: name.into(),
            thresholds: Thresholds::default(),
            variation_classes: vec![MoveQuality::Blunder],
            hint_plies: DEFAULT_HINT_PLIES,
            engine,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Classes whose moves get the engine's lines added as variations.
    pub fn with_variations_for(mut self, classes: impl IntoIterator<Item = MoveQuality>) -> Self {
        self.variation_classes = classes.into_iter().collect();
        self
    }

    /// Length of grafted engine lines. Zero turns variations off.
    pub fn with_hint_plies(mut self, plies: usize) -> Self {
        self.hint_plies = plies;
        self
    }

    pub fn hint_plies(&self) -> usize {
        self.hint_plies
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn adds_variation_for(&self, quality: MoveQuality) -> bool {
        self.variation_classes.contains(&quality)
    }

    /// Classifies the move leading to `node` and writes the verdict into the
    /// tree. `prior` is the best evaluation before the move, `post` the one
    /// after it, both from the mover's point of view. The root has no move
    /// and is left alone.
    pub fn annotate(
        &self,
        game: &mut Game,
        node: NodeId,
        prior: Evaluation,
        post: Evaluation,
    ) -> Result<Option<MoveQuality>, TreeError> {
        let target = game.node(node)?;
        if target.mv().is_none() {
            return Ok(None);
        }
        let mover = self.engine.side_to_move(target.position())?.opposite();
        let quality = self.thresholds.classify(prior, post);

        let mut commands = vec![format!("[%{} {}]", EVAL_COMMAND, post.for_white(mover))];
        if let Some(quality) = quality {
            commands.push(format!(
                "[%{} {} {}]",
                ANNOTATION_COMMAND,
                quality,
                Evaluation::Centipawns(swing(prior, post))
            ));
        }

        let target = game.node_mut(node)?;
        if let Some(quality) = quality {
            target.nags.push(quality.nag());
        }
        let text = strip_commands(target.comment.as_deref().unwrap_or_default(), &[EVAL_COMMAND, ANNOTATION_COMMAND]);
        target.comment = Some(if text.is_empty() {
            commands.join(" ")
        } else {
            format!("{} {}", text, commands.join(" "))
        });
        Ok(quality)
    }

    /// Adds engine lines found at the position before `node` as variations
    /// of `node`'s move, each cut to the hint length. Lines starting with the
    /// played move and lines the rules reject are skipped. Returns the first
    /// node of each added line.
    pub fn add_variations(&self, game: &mut Game, node: NodeId, lines: &[PvLine]) -> Result<Vec<NodeId>, TreeError> {
        let target = game.node(node)?;
        let Some(parent) = target.parent() else {
            return Ok(Vec::new());
        };
        if self.hint_plies == 0 {
            return Ok(Vec::new());
        }
        let played = target.mv().map(|m| m.uci.clone());
        let mover = self.engine.side_to_move(game.node(parent)?.position())?;

        let mut added = Vec::new();
        for line in lines {
            if line.moves.is_empty() || line.moves.first() == played.as_ref() {
                continue;
            }
            let hint = &line.moves[..line.moves.len().min(self.hint_plies)];
            match game.add_uci_line(parent, hint, &self.engine) {
                Ok(ids) => {
                    if let Some(&first) = ids.first() {
                        let first_node = game.node_mut(first)?;
                        if first_node.comment.is_none() {
                            first_node.comment =
                                Some(format!("[%{} {}]", EVAL_COMMAND, line.evaluation.for_white(mover)));
                        }
                        added.push(first);
                    }
                }
                Err(TreeError::IllegalMove(e)) => {
                    tracing::warn!("Skipping engine line {}: {}", hint.join(" "), e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(added)
    }

    /// Annotates every move whose position and predecessor were scored, sets
    /// the `Annotator` header and grafts variations for the configured
    /// classes.
    pub fn annotate_game(&self, game: &mut Game, scores: &[PositionScore]) -> Result<AnnotationSummary, TreeError> {
        if !self.name.is_empty() {
            game.headers.set("Annotator", self.name.clone());
        }
        let by_node: HashMap<NodeId, &PositionScore> = scores.iter().map(|s| (s.node, s)).collect();

        let mut summary = AnnotationSummary::default();
        for score in scores {
            let Some(parent) = game.parent(score.node) else {
                continue;
            };
            let Some(before) = by_node.get(&parent) else {
                continue;
            };
            let mover = self.engine.side_to_move(game.node(parent)?.position())?;
            let quality = self.annotate(game, score.node, before.evaluation, score.evaluation.negate())?;
            tracing::debug!("{} {:?}: {:?}", score.node, game.node(score.node)?.san(), quality);

            match mover {
                Side::White => summary.white.record(quality),
                Side::Black => summary.black.record(quality),
            }
            if quality.is_some_and(|q| self.adds_variation_for(q)) {
                let added = self.add_variations(game, score.node, &before.lines)?;
                summary.variations.extend(added);
            }
        }
        Ok(summary)
    }
}

/// Removes `[%name ...]` commands with one of `names` and normalizes
/// whitespace. Other commands and text stay.
pub fn strip_commands(comment: &str, names: &[&str]) -> String {
    let mut kept = String::with_capacity(comment.len());
    let mut rest = comment;
    while let Some(start) = rest.find("[%") {
        let body = &rest[start + 2..];
        let name_end = body
            .find(|c: char| c.is_whitespace() || c == ']')
            .unwrap_or(body.len());
        let end = if names.contains(&&body[..name_end]) {
            body.find(']').map(|close| start + 2 + close + 1)
        } else {
            None
        };
        match end {
            Some(end) => {
                kept.push_str(&rest[..start]);
                kept.push(' ');
                rest = &rest[end..];
            }
            None => {
                kept.push_str(&rest[..start + 2]);
                rest = body;
            }
        }
    }
    kept.push_str(rest);
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
