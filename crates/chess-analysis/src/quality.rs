//! Move quality classification.

use std::fmt;

use chess_pgn::Nag;
use serde::{Deserialize, Serialize};

use crate::Evaluation;

/// Classification of a move by the evaluation swing it caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    /// Very strong improvement on the engine's expectation (`!!`)
    Brilliant,
    /// Clear improvement (`!`)
    Good,
    /// Small improvement, an interesting try (`!?`)
    Speculative,
    /// Noticeable loss (`?!`)
    Dubious,
    /// Significant loss (`?`)
    Mistake,
    /// Major loss (`??`)
    Blunder,
}

impl MoveQuality {
    pub const ALL: [MoveQuality; 6] = [
        MoveQuality::Brilliant,
        MoveQuality::Good,
        MoveQuality::Speculative,
        MoveQuality::Dubious,
        MoveQuality::Mistake,
        MoveQuality::Blunder,
    ];

    /// The move assessment NAG written for this class.
    pub fn nag(self) -> Nag {
        match self {
            MoveQuality::Brilliant => Nag::BRILLIANT_MOVE,
            MoveQuality::Good => Nag::GOOD_MOVE,
            MoveQuality::Speculative => Nag::SPECULATIVE_MOVE,
            MoveQuality::Dubious => Nag::DUBIOUS_MOVE,
            MoveQuality::Mistake => Nag::MISTAKE,
            MoveQuality::Blunder => Nag::BLUNDER,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MoveQuality::Brilliant => "brilliant",
            MoveQuality::Good => "good",
            MoveQuality::Speculative => "speculative",
            MoveQuality::Dubious => "dubious",
            MoveQuality::Mistake => "mistake",
            MoveQuality::Blunder => "blunder",
        }
    }
}

impl fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Swing limits in centipawns. Losses are compared with `<=`, gains with
/// `>=`. The sign of each limit is implied by its class, so `blunder = 300`
/// and `blunder = -300` mean the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub blunder: i32,
    pub mistake: i32,
    pub dubious: i32,
    pub good: i32,
    pub brilliant: i32,
    /// Disabled unless set.
    pub speculative: Option<i32>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            blunder: -300,
            mistake: -150,
            dubious: -60,
            good: 100,
            brilliant: 300,
            speculative: None,
        }
    }
}

impl Thresholds {
    /// Classifies a move from the evaluations before and after it, both from
    /// the mover's point of view.
    pub fn classify(&self, prior: Evaluation, post: Evaluation) -> Option<MoveQuality> {
        let swing = swing(prior, post);
        let losses = [
            (self.blunder, MoveQuality::Blunder),
            (self.mistake, MoveQuality::Mistake),
            (self.dubious, MoveQuality::Dubious),
        ];
        if let Some((_, quality)) = losses.iter().find(|(limit, _)| swing <= -limit.saturating_abs()) {
            return Some(*quality);
        }
        let mut gains = vec![
            (self.brilliant, MoveQuality::Brilliant),
            (self.good, MoveQuality::Good),
        ];
        if let Some(limit) = self.speculative {
            gains.push((limit, MoveQuality::Speculative));
        }
        gains
            .into_iter()
            .find(|(limit, _)| swing >= limit.saturating_abs())
            .map(|(_, quality)| quality)
    }
}

/// Classification counts for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    /// Moves that were classified, with or without a verdict
    pub total_moves: u32,
    pub brilliant_moves: u32,
    pub good_moves: u32,
    pub speculative_moves: u32,
    pub dubious_moves: u32,
    pub mistakes: u32,
    pub blunders: u32,
}

impl PlayerStats {
    pub fn record(&mut self, quality: Option<MoveQuality>) {
        self.total_moves += 1;
        let Some(quality) = quality else {
            return;
        };
        let counter = match quality {
            MoveQuality::Brilliant => &mut self.brilliant_moves,
            MoveQuality::Good => &mut self.good_moves,
            MoveQuality::Speculative => &mut self.speculative_moves,
            MoveQuality::Dubious => &mut self.dubious_moves,
            MoveQuality::Mistake => &mut self.mistakes,
            MoveQuality::Blunder => &mut self.blunders,
        };
        *counter += 1;
    }

    pub fn count(&self, quality: MoveQuality) -> u32 {
        match quality {
            MoveQuality::Brilliant => self.brilliant_moves,
            MoveQuality::Good => self.good_moves,
            MoveQuality::Speculative => self.speculative_moves,
            MoveQuality::Dubious => self.dubious_moves,
            MoveQuality::Mistake => self.mistakes,
            MoveQuality::Blunder => self.blunders,
        }
    }
}

/// Evaluation change caused by a move, mates mapped onto the centipawn scale.
pub fn swing(prior: Evaluation, post: Evaluation) -> i32 {
    post.to_centipawns().saturating_sub(prior.to_centipawns())
}
