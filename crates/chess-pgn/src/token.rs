//! Token types produced by the PGN lexer.

use std::fmt;

/// Lexical error attached to an [`TokenKind::Error`] token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexError {
    /// A character that cannot start any token.
    IllegalCharacter,
    /// A tag section that hit a newline or end of input before `]`.
    UnterminatedTag,
    /// A `{` comment without a closing `}`.
    UnterminatedComment,
    /// A `$` not followed by digits, or a NAG value above 255.
    BadNag,
    /// A `]` or `}` outside of the section it would close.
    UnexpectedClose,
    /// The underlying reader failed.
    Read,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::IllegalCharacter => write!(f, "illegal character"),
            LexError::UnterminatedTag => write!(f, "unterminated tag"),
            LexError::UnterminatedComment => write!(f, "unterminated comment"),
            LexError::BadNag => write!(f, "malformed NAG"),
            LexError::UnexpectedClose => write!(f, "unexpected closing bracket"),
            LexError::Read => write!(f, "read error"),
        }
    }
}

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Move number indication such as `12.` or `12...`.
    MoveNumber,
    /// A move in SAN, including null moves.
    SanPly,
    /// `$n` or a textual glyph such as `!?`.
    Nag,
    /// Text of a `{ ... }` comment.
    Comment,
    /// `{`
    BlockCommentOpen,
    /// `}`
    BlockCommentClose,
    /// `[`
    TagOpen,
    /// `]`
    TagClose,
    /// Tag name inside a tag section.
    TagName,
    /// Unquoted, unescaped tag value.
    TagValue,
    /// `;` comment or `%` escape line.
    LineComment,
    /// `(`
    VariationOpen,
    /// `)`
    VariationClose,
    /// Line break in move text.
    Newline,
    /// Game termination marker: `1-0`, `0-1`, `1/2-1/2` or `*`.
    EndOfGame,
    /// End of the input.
    EndOfFile,
    /// Malformed input.
    Error(LexError),
}

/// A token with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based byte column.
    pub column: u32,
    /// Absolute byte offset of the first byte of the token.
    pub offset: u64,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32, offset: u64) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
            offset,
        }
    }

    /// Returns true for tokens that end the token stream of a game.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TokenKind::EndOfGame | TokenKind::EndOfFile)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?}) @ {}:{}", self.kind, self.text, self.line, self.column)
    }
}
