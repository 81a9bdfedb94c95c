//! Chess position evaluation types.

use std::fmt;

use chess_pgn::Side;
use serde::{Deserialize, Serialize};
use uci::Score;

/// Centipawn value a mate maps to before subtracting the distance.
pub const MATE_VALUE: i32 = 10_000;

/// Longest mate, in full moves, taken from an engine. Longer claims are
/// clamped so the ply count stays below [`MATE_VALUE`].
pub const MAX_MATE_MOVES: i32 = 4_000;

/// Represents a chess position evaluation from the side to move.
///
/// Evaluations can be either centipawn scores (for normal positions)
/// or mate scores (when a forced mate is found).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evaluation {
    /// Centipawn evaluation (positive = side to move is better)
    Centipawns(i32),
    /// Plies until mate (positive = side to move mates, negative or zero =
    /// side to move gets mated, zero meaning it already is).
    Mate(i32),
    /// The side to move has just delivered mate. Only produced by
    /// [`Evaluation::negate`] of `Mate(0)`.
    MateGiven,
}

impl Evaluation {
    /// Converts a UCI score. UCI counts mates in full moves, this type in plies.
    pub fn from_score(score: Score) -> Self {
        match score {
            Score::Cp(cp) => Evaluation::Centipawns(cp),
            Score::Mate(moves) => {
                let moves = moves.clamp(-MAX_MATE_MOVES, MAX_MATE_MOVES);
                if moves > 0 {
                    Evaluation::Mate(moves * 2 - 1)
                } else {
                    Evaluation::Mate(moves * 2)
                }
            }
        }
    }

    /// Maps the evaluation onto a single centipawn scale, mates becoming
    /// `±(10000 - plies)`. Mates never reach zero, however distant.
    pub fn to_centipawns(self) -> i32 {
        match self {
            Evaluation::Centipawns(cp) => cp,
            Evaluation::Mate(plies) => {
                let plies = plies.clamp(1 - MATE_VALUE, MATE_VALUE - 1);
                if plies > 0 {
                    MATE_VALUE - plies
                } else {
                    -(MATE_VALUE + plies)
                }
            }
            Evaluation::MateGiven => MATE_VALUE,
        }
    }

    /// The same evaluation from the other side's point of view.
    pub fn negate(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(cp.saturating_neg()),
            Evaluation::Mate(0) => Evaluation::MateGiven,
            Evaluation::Mate(plies) => Evaluation::Mate(plies.saturating_neg()),
            Evaluation::MateGiven => Evaluation::Mate(0),
        }
    }

    /// The evaluation from White's point of view, given who is to move.
    pub fn for_white(self, to_move: Side) -> Self {
        match to_move {
            Side::White => self,
            Side::Black => self.negate(),
        }
    }

    pub fn is_mate(self) -> bool {
        !matches!(self, Evaluation::Centipawns(_))
    }
}

/// Formats the way `[%eval]` comment commands expect: pawns with an explicit
/// sign (`+0.35`), or `#+3` / `#-2` in full moves for mates.
impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Evaluation::Centipawns(cp) => {
                let sign = if cp < 0 { '-' } else { '+' };
                let abs = cp.unsigned_abs();
                write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
            }
            Evaluation::Mate(plies) if plies > 0 => write!(f, "#+{}", (i64::from(plies) + 1) / 2),
            Evaluation::Mate(plies) => write!(f, "#-{}", (1 - i64::from(plies)) / 2),
            Evaluation::MateGiven => write!(f, "#+0"),
        }
    }
}
