//! Move resolution against an external rules engine.
//!
//! The tree never interprets chess rules itself. Positions are carried as FEN
//! text and every move is resolved through a [`MoveEngine`].

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};
use thiserror::Error;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Null move spellings accepted in move text. The first is the one written.
pub const NULL_MOVES: [&str; 4] = ["--", "0000", "Z0", "@@@@"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("illegal move {san} in {position}")]
    IllegalMove { san: String, position: String },

    #[error("invalid position: {0}")]
    InvalidPosition(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

/// Result of applying one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    /// Normalized SAN including check and mate suffixes.
    pub san: String,
    /// Long algebraic form as used by UCI.
    pub uci: String,
    /// FEN of the position after the move.
    pub position: String,
}

/// Chess rules collaborator consumed by the parser, the tree and the
/// annotator.
pub trait MoveEngine {
    fn start_position(&self) -> String {
        START_FEN.to_string()
    }

    /// Checks a FEN and returns it in normalized form.
    fn validate_position(&self, fen: &str) -> Result<String, MoveError>;

    /// Resolves a SAN move (or a null move) in `position`.
    fn apply_move(&self, position: &str, san: &str) -> Result<PlayedMove, MoveError>;

    /// Resolves a UCI move in `position`.
    fn apply_uci(&self, position: &str, uci: &str) -> Result<PlayedMove, MoveError>;

    fn side_to_move(&self, position: &str) -> Result<Side, MoveError>;

    /// Converts a UCI move to SAN in `position`.
    fn uci_to_san(&self, position: &str, uci: &str) -> Result<String, MoveError> {
        self.apply_uci(position, uci).map(|played| played.san)
    }
}

/// Fullmove number and side to move read from a FEN.
pub fn move_number(fen: &str) -> (u32, Side) {
    let mut fields = fen.split_whitespace().skip(1);
    let side = match fields.next() {
        Some("b") => Side::Black,
        _ => Side::White,
    };
    let number = fields
        .nth(3)
        .and_then(|n| n.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1);
    (number, side)
}

/// Ply index of a move played from the position `fen`, counting from 1.
pub fn ply_of(fen: &str) -> u32 {
    let (number, side) = move_number(fen);
    (number - 1)
        .saturating_mul(2)
        .saturating_add(u32::from(side == Side::Black) + 1)
}

pub fn is_null_move(san: &str) -> bool {
    NULL_MOVES.contains(&san)
}

/// Standard chess through `shakmaty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardChess;

impl StandardChess {
    fn load(&self, fen: &str) -> Result<Chess, MoveError> {
        let parsed: Fen = fen
            .parse()
            .map_err(|e| MoveError::InvalidPosition(format!("{fen}: {e}")))?;
        parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| MoveError::InvalidPosition(format!("{fen}: {e}")))
    }

    fn fen(pos: &Chess) -> String {
        Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string()
    }

    fn play(pos: Chess, mv: &shakmaty::Move) -> PlayedMove {
        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        let mut after = pos;
        let san = SanPlus::from_move_and_play_unchecked(&mut after, mv);
        PlayedMove {
            san: san.to_string(),
            uci,
            position: Self::fen(&after),
        }
    }

    fn null_move(&self, position: &str, pos: Chess) -> Result<PlayedMove, MoveError> {
        if pos.is_check() {
            return Err(MoveError::IllegalMove {
                san: NULL_MOVES[0].to_string(),
                position: position.to_string(),
            });
        }
        let after = pos
            .swap_turn()
            .map_err(|e| MoveError::InvalidPosition(e.to_string()))?;
        Ok(PlayedMove {
            san: NULL_MOVES[0].to_string(),
            uci: "0000".to_string(),
            position: Self::fen(&after),
        })
    }
}

impl MoveEngine for StandardChess {
    fn validate_position(&self, fen: &str) -> Result<String, MoveError> {
        self.load(fen).map(|pos| Self::fen(&pos))
    }

    fn apply_move(&self, position: &str, san: &str) -> Result<PlayedMove, MoveError> {
        let pos = self.load(position)?;
        if is_null_move(san) {
            return self.null_move(position, pos);
        }
        let illegal = || MoveError::IllegalMove {
            san: san.to_string(),
            position: position.to_string(),
        };
        // Accept 0-0 style castling as written in older files.
        let normalized = san.replace('0', "O");
        let san_text = if san.starts_with("0-0") { normalized.as_str() } else { san };
        let parsed: SanPlus = san_text.parse().map_err(|_| illegal())?;
        let mv = parsed.san.to_move(&pos).map_err(|_| illegal())?;
        Ok(Self::play(pos, &mv))
    }

    fn apply_uci(&self, position: &str, uci: &str) -> Result<PlayedMove, MoveError> {
        let pos = self.load(position)?;
        if uci == "0000" {
            return self.null_move(position, pos);
        }
        let illegal = || MoveError::IllegalMove {
            san: uci.to_string(),
            position: position.to_string(),
        };
        let parsed: UciMove = uci.parse().map_err(|_| illegal())?;
        let mv = parsed.to_move(&pos).map_err(|_| illegal())?;
        Ok(Self::play(pos, &mv))
    }

    fn side_to_move(&self, position: &str) -> Result<Side, MoveError> {
        let pos = self.load(position)?;
        Ok(match pos.turn() {
            Color::White => Side::White,
            Color::Black => Side::Black,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_san() {
        let engine = StandardChess;
        let played = engine.apply_move(START_FEN, "e4").unwrap();
        assert_eq!(played.san, "e4");
        assert_eq!(played.uci, "e2e4");
        assert_eq!(
            played.position,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn test_illegal_san() {
        let engine = StandardChess;
        let err = engine.apply_move(START_FEN, "e5").unwrap_err();
        assert!(matches!(err, MoveError::IllegalMove { .. }));
        assert!(engine.apply_move(START_FEN, "Xy9").is_err());
    }

    #[test]
    fn test_invalid_position() {
        let engine = StandardChess;
        assert!(matches!(
            engine.validate_position("not a fen"),
            Err(MoveError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_uci_to_san() {
        let engine = StandardChess;
        assert_eq!(engine.uci_to_san(START_FEN, "g1f3").unwrap(), "Nf3");
        assert!(engine.uci_to_san(START_FEN, "g1g3").is_err());
    }

    #[test]
    fn test_null_move() {
        let engine = StandardChess;
        for null in NULL_MOVES {
            let played = engine.apply_move(START_FEN, null).unwrap();
            assert_eq!(played.san, "--");
            assert_eq!(engine.side_to_move(&played.position).unwrap(), Side::Black);
        }
    }

    #[test]
    fn test_zero_castling() {
        let engine = StandardChess;
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(engine.apply_move(fen, "0-0").unwrap().san, "O-O");
        assert_eq!(engine.apply_move(fen, "0-0-0").unwrap().san, "O-O-O");
    }

    #[test]
    fn test_move_number() {
        assert_eq!(move_number(START_FEN), (1, Side::White));
        assert_eq!(ply_of(START_FEN), 1);
        let black = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 12";
        assert_eq!(move_number(black), (12, Side::Black));
        assert_eq!(ply_of(black), 24);
        let late = "4k3/8/8/8/8/8/8/4K2R b K - 0 4000000000";
        assert_eq!(ply_of(late), u32::MAX);
    }
}
