//! PGN (Portable Game Notation) reading, editing and writing.
//!
//! # Overview
//!
//! - [`Lexer`] - Streaming tokenizer with tag, comment and move text modes
//! - [`GameReader`] - Builds one [`Game`] per call from a multi-game source
//! - [`Game`] - Move tree with variations, headers, comments and NAGs
//! - [`MoveEngine`] - Rules collaborator resolving SAN; [`StandardChess`] uses `shakmaty`
//! - [`game_to_string`] / [`write_pgn`] - PGN export
//!
//! # Example
//!
//! ```
//! use chess_pgn::{parse_game, game_to_string};
//!
//! let parsed = parse_game("1. e4 e5 2. Nf3 (2. Bc4) Nc6 *").unwrap();
//! assert!(parsed.is_clean());
//! let game = parsed.game;
//! assert_eq!(game.mainline().count(), 4);
//! assert!(game_to_string(&game).contains("2. Nf3 (2. Bc4) 2... Nc6 *"));
//! ```

pub mod headers;
pub mod lexer;
pub mod nag;
pub mod parser;
pub mod position;
pub mod token;
pub mod tree;
pub mod writer;

pub use headers::{Headers, ROSTER};
pub use lexer::{Encoding, Lexer, LexerOptions};
pub use nag::{Nag, NagClass, NagSet};
pub use parser::{
    parse_game, read_games, Diagnostic, DiagnosticKind, GameReader, ParseOptions, ParsedBoard,
    ParsedGame, ParsedHeaders, UnknownGlyphs,
};
pub use position::{MoveEngine, MoveError, PlayedMove, Side, StandardChess, START_FEN};
pub use token::{LexError, Token, TokenKind};
pub use tree::{Game, GameNode, NodeId, PlyMove, TreeError};
pub use writer::{game_to_string, write_game, write_pgn};
