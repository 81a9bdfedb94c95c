//! Tree builder: token stream to [`Game`]s.
//!
//! [`GameReader`] pulls tokens from one [`Lexer`] and builds one game per
//! call. The builder runs in one of three modes, switched per token:
//!
//! - `Headers` collects tag pairs and comments written before the moves,
//! - `Movetext` resolves moves and grows the tree,
//! - `Skip` discards everything up to the end of the game.
//!
//! Problems inside a game are recorded as [`Diagnostic`]s and switch the
//! builder to `Skip`, so one corrupt game never stops the rest of the file.

use std::fmt;
use std::io::Read;

use tracing::debug;

use crate::headers::Headers;
use crate::lexer::{Lexer, LexerOptions};
use crate::nag::Nag;
use crate::position::{MoveEngine, StandardChess};
use crate::token::{LexError, Token, TokenKind};
use crate::tree::{Game, NodeId};

/// What to do with a textual glyph that has no NAG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownGlyphs {
    #[default]
    Drop,
    /// Append the glyph text to the node comment.
    Comment,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub unknown_glyphs: UnknownGlyphs,
    pub lexer: LexerOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Lex,
    Parse,
    IllegalMove,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Lex => write!(f, "lex error"),
            DiagnosticKind::Parse => write!(f, "parse error"),
            DiagnosticKind::IllegalMove => write!(f, "illegal move"),
        }
    }
}

/// A problem found while reading one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
    /// 0-based index of the game in the source.
    pub game_index: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "game {} at {}:{}: {}: {}",
            self.game_index + 1,
            self.line,
            self.column,
            self.kind,
            self.message
        )
    }
}

/// One game read from the source.
#[derive(Debug, Clone)]
pub struct ParsedGame {
    pub game: Game,
    pub diagnostics: Vec<Diagnostic>,
    /// Byte offset of the first token of the game.
    pub offset: u64,
}

impl ParsedGame {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Tag pairs of one game, read without resolving moves.
#[derive(Debug, Clone)]
pub struct ParsedHeaders {
    pub headers: Headers,
    pub diagnostics: Vec<Diagnostic>,
    pub offset: u64,
}

/// Where one game's mainline ends, read without keeping its tree.
#[derive(Debug, Clone)]
pub struct ParsedBoard {
    pub headers: Headers,
    /// FEN after the last mainline move.
    pub position: String,
    /// Mainline moves played.
    pub plies: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Headers,
    Movetext,
    Skip,
}

enum Step {
    Continue,
    Finish,
    /// Finish and hand the token back to the next game.
    FinishKeep(Token),
}

#[derive(Default)]
struct TagParts {
    name: Option<String>,
    value: Option<String>,
}

/// State of the game under construction.
struct Builder<'e, E: ?Sized> {
    engine: &'e E,
    options: ParseOptions,
    game: Game,
    mode: Mode,
    headers_only: bool,
    cursor: NodeId,
    stack: Vec<NodeId>,
    after_number: bool,
    pending_pre: Option<String>,
    comment: Option<String>,
    tag: Option<TagParts>,
    seen_movetext: bool,
    diagnostics: Vec<Diagnostic>,
    index: usize,
}

fn append_text(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}

fn is_movetext(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::MoveNumber
            | TokenKind::SanPly
            | TokenKind::Nag
            | TokenKind::VariationOpen
            | TokenKind::VariationClose
    )
}

impl<'e, E: MoveEngine + ?Sized> Builder<'e, E> {
    fn new(engine: &'e E, options: ParseOptions, index: usize, headers_only: bool) -> Self {
        let game = Game::with_root(engine.start_position());
        let cursor = game.root();
        Self {
            engine,
            options,
            game,
            mode: Mode::Headers,
            headers_only,
            cursor,
            stack: Vec::new(),
            after_number: false,
            pending_pre: None,
            comment: None,
            tag: None,
            seen_movetext: false,
            diagnostics: Vec::new(),
            index,
        }
    }

    fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>, token: &Token) {
        let diagnostic = Diagnostic {
            kind,
            message: message.into(),
            line: token.line,
            column: token.column,
            game_index: self.index,
        };
        debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Records a diagnostic and skips the rest of the game.
    fn fail(&mut self, kind: DiagnosticKind, message: impl Into<String>, token: &Token) {
        self.report(kind, message, token);
        self.mode = Mode::Skip;
        self.comment = None;
        self.tag = None;
    }

    fn lex_failure(&mut self, error: LexError, token: &Token) {
        let kind = match error {
            LexError::UnterminatedTag | LexError::UnterminatedComment => DiagnosticKind::Parse,
            _ => DiagnosticKind::Lex,
        };
        let message = if token.text.is_empty() {
            error.to_string()
        } else {
            format!("{} near {:?}", error, token.text)
        };
        self.fail(kind, message, token);
    }

    fn step(&mut self, token: Token) -> Step {
        if is_movetext(token.kind) {
            self.seen_movetext = true;
        }
        match self.mode {
            Mode::Skip => self.skip(token),
            Mode::Headers => self.headers(token),
            Mode::Movetext => self.movetext(token),
        }
    }

    fn skip(&mut self, token: Token) -> Step {
        match token.kind {
            TokenKind::EndOfGame => {
                self.game.set_result(token.text);
                Step::Finish
            }
            TokenKind::EndOfFile => Step::Finish,
            TokenKind::TagOpen if self.seen_movetext => Step::FinishKeep(token),
            _ => Step::Continue,
        }
    }

    /// Handles comment tokens. Returns false if the token is not one.
    fn comment_token(&mut self, token: &Token) -> bool {
        match token.kind {
            TokenKind::BlockCommentOpen => self.comment = Some(String::new()),
            TokenKind::Comment => {
                if let Some(buffer) = self.comment.as_mut() {
                    buffer.push_str(&token.text);
                }
            }
            TokenKind::BlockCommentClose => {
                if let Some(text) = self.comment.take() {
                    self.attach_comment(&text);
                }
            }
            TokenKind::LineComment => {
                if let Some(text) = token.text.strip_prefix(';') {
                    self.attach_comment(text);
                }
            }
            _ => return false,
        }
        true
    }

    fn attach_comment(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.after_number {
            append_text(&mut self.pending_pre, text);
        } else if let Ok(node) = self.game.node_mut(self.cursor) {
            append_text(&mut node.comment, text);
        }
    }

    fn headers(&mut self, token: Token) -> Step {
        if self.comment_token(&token) {
            return Step::Continue;
        }
        match token.kind {
            TokenKind::TagOpen => {
                self.tag = Some(TagParts::default());
                Step::Continue
            }
            TokenKind::TagName => {
                let accepted = match self.tag.as_mut() {
                    Some(tag) if tag.name.is_none() => {
                        tag.name = Some(token.text.clone());
                        true
                    }
                    _ => false,
                };
                if !accepted {
                    self.fail(DiagnosticKind::Parse, "unexpected tag name", &token);
                }
                Step::Continue
            }
            TokenKind::TagValue => {
                let accepted = match self.tag.as_mut() {
                    Some(tag) if tag.name.is_some() && tag.value.is_none() => {
                        tag.value = Some(token.text.clone());
                        true
                    }
                    _ => false,
                };
                if !accepted {
                    self.fail(DiagnosticKind::Parse, "unexpected tag value", &token);
                }
                Step::Continue
            }
            TokenKind::TagClose => {
                match self.tag.take() {
                    Some(TagParts {
                        name: Some(name),
                        value: Some(value),
                    }) => self.game.headers.set(name, value),
                    _ => self.fail(DiagnosticKind::Parse, "malformed tag pair", &token),
                }
                Step::Continue
            }
            TokenKind::Newline => Step::Continue,
            TokenKind::EndOfGame => {
                self.check_result(&token);
                self.game.set_result(token.text);
                Step::Finish
            }
            TokenKind::EndOfFile => {
                self.report(DiagnosticKind::Parse, "missing game termination", &token);
                Step::Finish
            }
            TokenKind::Error(error) => {
                self.lex_failure(error, &token);
                Step::Continue
            }
            _ => {
                if self.tag.is_some() {
                    self.fail(DiagnosticKind::Parse, "unterminated tag", &token);
                    return Step::Continue;
                }
                self.enter_movetext(token)
            }
        }
    }

    fn enter_movetext(&mut self, token: Token) -> Step {
        if self.headers_only {
            self.mode = Mode::Skip;
            return Step::Continue;
        }
        if let Some(fen) = self.game.headers.get("FEN").map(str::to_string) {
            match self.engine.validate_position(&fen) {
                Ok(position) => self.game.reset_root(position),
                Err(e) => {
                    self.fail(DiagnosticKind::Parse, format!("bad FEN tag: {e}"), &token);
                    return Step::Continue;
                }
            }
        }
        self.mode = Mode::Movetext;
        self.movetext(token)
    }

    fn movetext(&mut self, token: Token) -> Step {
        if self.comment_token(&token) {
            return Step::Continue;
        }
        match token.kind {
            TokenKind::MoveNumber => {
                let digits = token.text.trim_end_matches('.');
                if !digits.is_empty() && digits.parse::<u32>().map_or(true, |n| n == 0) {
                    self.fail(
                        DiagnosticKind::Parse,
                        format!("malformed move number {:?}", token.text),
                        &token,
                    );
                } else {
                    self.after_number = true;
                }
                Step::Continue
            }
            TokenKind::SanPly => {
                self.play(&token);
                Step::Continue
            }
            TokenKind::Nag => {
                self.nag(&token);
                Step::Continue
            }
            TokenKind::VariationOpen => {
                match self.game.parent(self.cursor) {
                    Some(anchor) => {
                        self.flush_pending();
                        self.stack.push(self.cursor);
                        self.cursor = anchor;
                    }
                    None => self.fail(
                        DiagnosticKind::Parse,
                        "variation without a preceding move",
                        &token,
                    ),
                }
                Step::Continue
            }
            TokenKind::VariationClose => {
                match self.stack.pop() {
                    Some(resume) => {
                        self.flush_pending();
                        self.cursor = resume;
                    }
                    None => self.fail(DiagnosticKind::Parse, "unbalanced ')'", &token),
                }
                Step::Continue
            }
            TokenKind::Newline => Step::Continue,
            TokenKind::EndOfGame => {
                if !self.stack.is_empty() {
                    self.report(DiagnosticKind::Parse, "unclosed variation", &token);
                }
                self.flush_pending();
                self.check_result(&token);
                self.game.set_result(token.text);
                Step::Finish
            }
            TokenKind::TagOpen => {
                self.report(DiagnosticKind::Parse, "missing game termination", &token);
                Step::FinishKeep(token)
            }
            TokenKind::EndOfFile => {
                self.report(DiagnosticKind::Parse, "missing game termination", &token);
                Step::Finish
            }
            TokenKind::Error(error) => {
                self.lex_failure(error, &token);
                Step::Continue
            }
            _ => {
                self.fail(
                    DiagnosticKind::Parse,
                    format!("unexpected token {:?}", token.text),
                    &token,
                );
                Step::Continue
            }
        }
    }

    /// A pre-comment that never got its move becomes a regular comment.
    fn flush_pending(&mut self) {
        self.after_number = false;
        if let Some(text) = self.pending_pre.take() {
            self.attach_comment(&text);
        }
    }

    fn play(&mut self, token: &Token) {
        let position = match self.game.node(self.cursor) {
            Ok(node) => node.position().to_string(),
            Err(e) => {
                self.fail(DiagnosticKind::Parse, e.to_string(), token);
                return;
            }
        };
        let played = match self.engine.apply_move(&position, &token.text) {
            Ok(played) => played,
            Err(e) => {
                self.fail(DiagnosticKind::IllegalMove, e.to_string(), token);
                return;
            }
        };
        match self.game.push_child(self.cursor, played) {
            Ok(id) => {
                self.cursor = id;
                self.after_number = false;
                if let Some(pre) = self.pending_pre.take() {
                    if let Ok(node) = self.game.node_mut(id) {
                        node.pre_comment = Some(pre);
                    }
                }
            }
            Err(e) => self.fail(DiagnosticKind::Parse, e.to_string(), token),
        }
    }

    fn nag(&mut self, token: &Token) {
        let cursor = self.cursor;
        match Nag::parse(&token.text) {
            Some(nag) => {
                if let Ok(node) = self.game.node_mut(cursor) {
                    node.nags.push(nag);
                }
            }
            None => match self.options.unknown_glyphs {
                UnknownGlyphs::Drop => debug!("dropping unknown glyph {:?}", token.text),
                UnknownGlyphs::Comment => {
                    if let Ok(node) = self.game.node_mut(cursor) {
                        append_text(&mut node.comment, &token.text);
                    }
                }
            },
        }
    }

    fn check_result(&mut self, token: &Token) {
        let header = self.game.headers.get("Result").map(str::to_string);
        if let Some(header) = header {
            if header != token.text {
                self.report(
                    DiagnosticKind::Parse,
                    format!("result {} does not match Result tag {}", token.text, header),
                    token,
                );
            }
        }
    }
}

/// Reads games one at a time from a PGN source.
///
/// ```
/// use chess_pgn::GameReader;
///
/// let pgn = "[Event \"A\"]\n1. e4 e5 *\n\n[Event \"B\"]\n1. d4 *\n";
/// let mut reader = GameReader::new(pgn.as_bytes());
/// let first = reader.read_game().unwrap();
/// assert_eq!(first.game.headers.get("Event"), Some("A"));
/// let second = reader.read_game().unwrap();
/// assert_eq!(second.game.mainline().count(), 1);
/// assert!(reader.read_game().is_none());
/// ```
pub struct GameReader<R, E = StandardChess> {
    lexer: Lexer<R>,
    engine: E,
    options: ParseOptions,
    peeked: Option<Token>,
    games: usize,
}

impl<R: Read> GameReader<R, StandardChess> {
    pub fn new(reader: R) -> Self {
        Self::with_engine(reader, StandardChess, ParseOptions::default())
    }

    pub fn with_options(reader: R, options: ParseOptions) -> Self {
        Self::with_engine(reader, StandardChess, options)
    }
}

impl<R: Read, E: MoveEngine> GameReader<R, E> {
    pub fn with_engine(reader: R, engine: E, options: ParseOptions) -> Self {
        Self {
            lexer: Lexer::with_options(reader, options.lexer),
            engine,
            options,
            peeked: None,
            games: 0,
        }
    }

    /// Number of games consumed so far.
    pub fn games_read(&self) -> usize {
        self.games
    }

    fn next_token(&mut self) -> Token {
        match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token(),
        }
    }

    /// Skips blank lines and escape lines between games. Returns the offset
    /// of the next game, or `None` at the end of input.
    fn next_game_start(&mut self) -> Option<u64> {
        loop {
            let token = self.next_token();
            match token.kind {
                TokenKind::Newline => continue,
                TokenKind::LineComment if token.text.starts_with('%') => continue,
                TokenKind::EndOfFile => {
                    self.peeked = Some(token);
                    return None;
                }
                _ => {
                    let offset = token.offset;
                    self.peeked = Some(token);
                    return Some(offset);
                }
            }
        }
    }

    fn run(&mut self, headers_only: bool) -> Option<(Builder<'_, E>, u64)> {
        let offset = self.next_game_start()?;
        let index = self.games;
        self.games += 1;
        let mut pending = self.peeked.take();
        let mut builder = Builder::new(&self.engine, self.options, index, headers_only);
        loop {
            let token = match pending.take() {
                Some(token) => token,
                None => self.lexer.next_token(),
            };
            match builder.step(token) {
                Step::Continue => {}
                Step::Finish => break,
                Step::FinishKeep(token) => {
                    self.peeked = Some(token);
                    break;
                }
            }
        }
        Some((builder, offset))
    }

    /// Reads the next game. `None` means the input is exhausted.
    pub fn read_game(&mut self) -> Option<ParsedGame> {
        let (builder, offset) = self.run(false)?;
        debug!(
            game = builder.index,
            nodes = builder.game.len(),
            diagnostics = builder.diagnostics.len(),
            "parsed game"
        );
        Some(ParsedGame {
            game: builder.game,
            diagnostics: builder.diagnostics,
            offset,
        })
    }

    /// Plays the next game through and keeps only its final position. Moves
    /// after a diagnostic are not played.
    pub fn read_board(&mut self) -> Option<ParsedBoard> {
        let (builder, offset) = self.run(false)?;
        let game = builder.game;
        let (last, plies) = game
            .mainline()
            .fold((game.root(), 0), |(_, plies), id| (id, plies + 1));
        let position = game
            .node(last)
            .map(|node| node.position().to_string())
            .unwrap_or_default();
        Some(ParsedBoard {
            headers: game.headers,
            position,
            plies,
            diagnostics: builder.diagnostics,
            offset,
        })
    }

    /// Reads the tag pairs of the next game and skips its moves.
    pub fn read_headers(&mut self) -> Option<ParsedHeaders> {
        let (builder, offset) = self.run(true)?;
        Some(ParsedHeaders {
            headers: builder.game.headers,
            diagnostics: builder.diagnostics,
            offset,
        })
    }

    /// Skips one game. Returns the offset at which the following game
    /// begins, which is the input length after the last game.
    pub fn skip_game(&mut self) -> Option<u64> {
        self.run(true)?;
        Some(match self.next_game_start() {
            Some(offset) => offset,
            None => self.peeked.as_ref().map_or(self.lexer.offset(), |t| t.offset),
        })
    }

    /// Start offsets of every remaining game.
    pub fn game_offsets(&mut self) -> Vec<u64> {
        let mut offsets = Vec::new();
        while let Some(start) = self.next_game_start() {
            offsets.push(start);
            self.run(true);
        }
        offsets
    }
}

impl<R: Read, E: MoveEngine> Iterator for GameReader<R, E> {
    type Item = ParsedGame;

    fn next(&mut self) -> Option<ParsedGame> {
        self.read_game()
    }
}

/// Reads every game in `text`.
pub fn read_games(text: &str) -> Vec<ParsedGame> {
    GameReader::new(text.as_bytes()).collect()
}

/// Reads the first game in `text`.
pub fn parse_game(text: &str) -> Option<ParsedGame> {
    GameReader::new(text.as_bytes()).read_game()
}
