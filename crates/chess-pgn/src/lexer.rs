//! PGN lexer with tag, comment and move text modes.
//!
//! The lexer reads from any [`Read`] source through a bounded buffer that is
//! refilled on demand. Token text is accumulated separately from the read
//! buffer, so a token that straddles a refill is never truncated and the
//! output is the same as lexing the whole text in one piece.
//!
//! # Example
//!
//! ```
//! use chess_pgn::{Lexer, TokenKind};
//!
//! let kinds: Vec<TokenKind> = Lexer::new("1. e4 *".as_bytes()).map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![TokenKind::MoveNumber, TokenKind::SanPly, TokenKind::EndOfGame, TokenKind::EndOfFile]
//! );
//! ```

use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::token::{LexError, Token, TokenKind};

/// Default size of the read buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Smallest read buffer the lexer accepts.
pub const MIN_BUFFER_SIZE: usize = 64;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// How token bytes are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8 or Latin-1, decided once per source by the first token with
    /// non-ASCII bytes.
    #[default]
    Auto,
    /// UTF-8 with replacement characters for invalid sequences.
    Utf8,
    /// ISO-8859-1, every byte is one character.
    Latin1,
}

impl Encoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Auto => match std::str::from_utf8(bytes) {
                Ok(s) => s.to_string(),
                Err(_) => latin1(bytes),
            },
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => latin1(bytes),
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Lexer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerOptions {
    /// Size of the read buffer in bytes (at least [`MIN_BUFFER_SIZE`]).
    pub buffer_size: usize,
    pub encoding: Encoding,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            encoding: Encoding::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Default,
    Tag,
    Comment,
}

/// Buffered byte source that tracks line, column and absolute offset.
struct Source<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    chunk: usize,
    eof: bool,
    failed: bool,
    offset: u64,
    line: u32,
    column: u32,
}

impl<R: Read> Source<R> {
    fn new(reader: R, chunk: usize) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(chunk),
            pos: 0,
            chunk,
            eof: false,
            failed: false,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Reads another chunk. Returns false once the reader is exhausted.
    fn fill(&mut self) -> bool {
        if self.eof {
            return false;
        }
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        let filled = self.buf.len();
        self.buf.resize(filled + self.chunk, 0);
        loop {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => {
                    self.buf.truncate(filled);
                    self.eof = true;
                    return false;
                }
                Ok(n) => {
                    self.buf.truncate(filled + n);
                    return true;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("PGN source read failed at byte {}: {}", self.offset, e);
                    self.buf.truncate(filled);
                    self.eof = true;
                    self.failed = true;
                    return false;
                }
            }
        }
    }

    fn peek_at(&mut self, n: usize) -> Option<u8> {
        while self.pos + n >= self.buf.len() {
            if !self.fill() {
                return None;
            }
        }
        Some(self.buf[self.pos + n])
    }

    fn peek(&mut self) -> Option<u8> {
        self.peek_at(0)
    }

    fn starts_with(&mut self, pattern: &[u8]) -> bool {
        pattern
            .iter()
            .enumerate()
            .all(|(i, &b)| self.peek_at(i) == Some(b))
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    /// Consumes bytes while `pred` holds, appending them to `out`.
    fn take_while(&mut self, out: &mut Vec<u8>, pred: impl Fn(u8) -> bool) {
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            out.push(b);
            self.bump();
        }
    }
}

fn is_san_start(b: u8) -> bool {
    matches!(b, b'a'..=b'h' | b'K' | b'Q' | b'R' | b'B' | b'N' | b'P' | b'O' | b'Z' | b'@')
}

fn is_san_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'=' | b'+' | b'#' | b':' | b'-' | b'@')
}

fn is_glyph_char(b: u8) -> bool {
    matches!(b, b'!' | b'?' | b'+' | b'-' | b'=' | b'~' | b'/')
}

fn is_tag_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Streaming PGN tokenizer.
///
/// One lexer serves a whole multi-game source: consumers pull tokens until
/// [`TokenKind::EndOfGame`] and then keep pulling for the next game. Errors
/// never abort the stream; they come back as [`TokenKind::Error`] tokens.
pub struct Lexer<R> {
    source: Source<R>,
    mode: Mode,
    encoding: Encoding,
    finished: bool,
    reported_failure: bool,
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, LexerOptions::default())
    }

    pub fn with_options(reader: R, options: LexerOptions) -> Self {
        let mut source = Source::new(reader, options.buffer_size.max(MIN_BUFFER_SIZE));
        if source.starts_with(UTF8_BOM) {
            for _ in UTF8_BOM {
                source.bump();
            }
            source.column = 1;
        }
        Self {
            source,
            mode: Mode::Default,
            encoding: options.encoding,
            finished: false,
            reported_failure: false,
        }
    }

    /// Absolute byte offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.source.offset
    }

    /// Current 1-based line number.
    pub fn line(&self) -> u32 {
        self.source.line
    }

    /// Returns the next token. After the end of input this keeps returning
    /// [`TokenKind::EndOfFile`].
    pub fn next_token(&mut self) -> Token {
        match self.mode {
            Mode::Default => self.lex_default(),
            Mode::Tag => self.lex_tag(),
            Mode::Comment => self.lex_comment(),
        }
    }

    fn token(&mut self, kind: TokenKind, bytes: &[u8], start: (u32, u32, u64)) -> Token {
        if self.encoding == Encoding::Auto && !bytes.is_ascii() {
            self.encoding = match std::str::from_utf8(bytes) {
                Ok(_) => Encoding::Utf8,
                Err(_) => Encoding::Latin1,
            };
            debug!(encoding = ?self.encoding, line = start.0, "detected source encoding");
        }
        Token::new(kind, self.encoding.decode(bytes), start.0, start.1, start.2)
    }

    fn start(&self) -> (u32, u32, u64) {
        (self.source.line, self.source.column, self.source.offset)
    }

    fn end_of_input(&mut self, start: (u32, u32, u64)) -> Token {
        if self.source.failed && !self.reported_failure {
            self.reported_failure = true;
            return self.token(TokenKind::Error(LexError::Read), b"", start);
        }
        self.token(TokenKind::EndOfFile, b"", start)
    }

    fn skip_blanks(&mut self) {
        while let Some(b) = self.source.peek() {
            if matches!(b, b' ' | b'\t' | b'\r' | 0x0c) {
                self.source.bump();
            } else {
                break;
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.start();
        let b = self.source.bump().unwrap_or_default();
        self.token(kind, &[b], start)
    }

    /// `;` comment or `%` escape, marker included in the token text.
    fn rest_of_line(&mut self) -> Token {
        let start = self.start();
        let mut text = Vec::new();
        self.source.take_while(&mut text, |b| b != b'\n');
        if text.last() == Some(&b'\r') {
            text.pop();
        }
        self.token(TokenKind::LineComment, &text, start)
    }

    fn lex_default(&mut self) -> Token {
        self.skip_blanks();
        let start = self.start();
        let Some(b) = self.source.peek() else {
            return self.end_of_input(start);
        };

        match b {
            b'\n' => self.single(TokenKind::Newline),
            b'%' if self.source.column == 1 => self.rest_of_line(),
            b';' => self.rest_of_line(),
            b'{' => {
                self.mode = Mode::Comment;
                self.single(TokenKind::BlockCommentOpen)
            }
            b'[' => {
                self.mode = Mode::Tag;
                self.single(TokenKind::TagOpen)
            }
            b'}' | b']' => self.single(TokenKind::Error(LexError::UnexpectedClose)),
            b'(' => self.single(TokenKind::VariationOpen),
            b')' => self.single(TokenKind::VariationClose),
            b'*' => self.single(TokenKind::EndOfGame),
            b'$' => self.lex_numeric_nag(),
            b'0'..=b'9' => self.lex_number(),
            b'.' => {
                let mut text = Vec::new();
                self.source.take_while(&mut text, |b| b == b'.');
                self.token(TokenKind::MoveNumber, &text, start)
            }
            b'-' if self.source.starts_with(b"--")
                && !self.source.peek_at(2).is_some_and(is_glyph_char) =>
            {
                self.source.bump();
                self.source.bump();
                self.token(TokenKind::SanPly, b"--", start)
            }
            b if is_glyph_char(b) => {
                let mut text = Vec::new();
                self.source.take_while(&mut text, is_glyph_char);
                self.token(TokenKind::Nag, &text, start)
            }
            b if b.is_ascii_alphabetic() || b == b'@' => self.lex_word(),
            _ => {
                let mut text = vec![b];
                self.source.bump();
                if b >= 0x80 {
                    self.source.take_while(&mut text, |c| (0x80..0xC0).contains(&c));
                }
                self.token(TokenKind::Error(LexError::IllegalCharacter), &text, start)
            }
        }
    }

    fn lex_numeric_nag(&mut self) -> Token {
        let start = self.start();
        let mut text = vec![b'$'];
        self.source.bump();
        let mut digits = Vec::new();
        self.source.take_while(&mut digits, |b| b.is_ascii_digit());
        text.extend_from_slice(&digits);
        let valid = !digits.is_empty()
            && self
                .encoding
                .decode(&digits)
                .parse::<u16>()
                .is_ok_and(|v| v <= u16::from(u8::MAX));
        let kind = if valid {
            TokenKind::Nag
        } else {
            TokenKind::Error(LexError::BadNag)
        };
        self.token(kind, &text, start)
    }

    fn lex_number(&mut self) -> Token {
        let start = self.start();
        for result in [&b"1/2-1/2"[..], b"1-0", b"0-1"] {
            if self.source.starts_with(result) {
                for _ in result {
                    self.source.bump();
                }
                return self.token(TokenKind::EndOfGame, result, start);
            }
        }
        if self.source.starts_with(b"0-0") || self.source.starts_with(b"0000") {
            let mut text = Vec::new();
            self.source.take_while(&mut text, is_san_char);
            return self.token(TokenKind::SanPly, &text, start);
        }
        let mut text = Vec::new();
        self.source.take_while(&mut text, |b| b.is_ascii_digit());
        self.source.take_while(&mut text, |b| b == b'.');
        self.token(TokenKind::MoveNumber, &text, start)
    }

    fn lex_word(&mut self) -> Token {
        let start = self.start();
        let first = self.source.peek().unwrap_or_default();
        let mut text = Vec::new();
        self.source.take_while(&mut text, is_san_char);
        let kind = match text.as_slice() {
            b"N" | b"D" => TokenKind::Nag,
            _ if is_san_start(first) => TokenKind::SanPly,
            _ => TokenKind::Error(LexError::IllegalCharacter),
        };
        self.token(kind, &text, start)
    }

    fn lex_tag(&mut self) -> Token {
        self.skip_blanks();
        let start = self.start();
        match self.source.peek() {
            None | Some(b'\n') => {
                self.mode = Mode::Default;
                self.token(TokenKind::Error(LexError::UnterminatedTag), b"", start)
            }
            Some(b']') => {
                self.mode = Mode::Default;
                self.single(TokenKind::TagClose)
            }
            Some(b'"') => self.lex_tag_value(),
            Some(b) if is_tag_name_char(b) => {
                let mut text = Vec::new();
                self.source.take_while(&mut text, is_tag_name_char);
                self.token(TokenKind::TagName, &text, start)
            }
            Some(_) => self.single(TokenKind::Error(LexError::IllegalCharacter)),
        }
    }

    fn lex_tag_value(&mut self) -> Token {
        let start = self.start();
        self.source.bump();
        let mut value = Vec::new();
        loop {
            match self.source.peek() {
                None | Some(b'\n') => {
                    self.mode = Mode::Default;
                    return self.token(TokenKind::Error(LexError::UnterminatedTag), &value, start);
                }
                Some(b'"') => {
                    self.source.bump();
                    return self.token(TokenKind::TagValue, &value, start);
                }
                Some(b'\\') => {
                    self.source.bump();
                    match self.source.peek() {
                        Some(escaped @ (b'"' | b'\\')) => {
                            value.push(escaped);
                            self.source.bump();
                        }
                        _ => value.push(b'\\'),
                    }
                }
                Some(b) => {
                    value.push(b);
                    self.source.bump();
                }
            }
        }
    }

    fn lex_comment(&mut self) -> Token {
        let start = self.start();
        match self.source.peek() {
            Some(b'}') => {
                self.mode = Mode::Default;
                self.single(TokenKind::BlockCommentClose)
            }
            None => {
                self.mode = Mode::Default;
                self.token(TokenKind::Error(LexError::UnterminatedComment), b"", start)
            }
            Some(_) => {
                let mut text = Vec::new();
                self.source.take_while(&mut text, |b| b != b'}');
                if self.source.peek().is_none() {
                    self.mode = Mode::Default;
                    return self.token(TokenKind::Error(LexError::UnterminatedComment), &text, start);
                }
                self.token(TokenKind::Comment, &text, start)
            }
        }
    }
}

impl<R: Read> Iterator for Lexer<R> {
    type Item = Token;

    /// Yields every token up to and including the first end-of-file token.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::EndOfFile {
            self.finished = true;
        }
        Some(token)
    }
}
