//! PGN export.
//!
//! Writes the seven tag roster first (with conventional defaults), then the
//! remaining tags in their original order, a blank line and the move text
//! wrapped at 80 columns.

use std::io::Write;
use std::path::Path;

use crate::headers::ROSTER;
use crate::position::{move_number, Side};
use crate::tree::{Game, GameNode, NodeId};

const LINE_WIDTH: usize = 80;

/// Writes games to a PGN file, separated by blank lines.
///
/// # Errors
///
/// Returns an `std::io::Error` if the file cannot be created or written.
pub fn write_pgn<P: AsRef<Path>>(path: P, games: &[Game]) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for (i, game) in games.iter().enumerate() {
        if i > 0 {
            writeln!(file)?;
        }
        write_game(&mut file, game)?;
    }
    file.flush()
}

/// Writes one game.
pub fn write_game<W: Write>(out: &mut W, game: &Game) -> std::io::Result<()> {
    out.write_all(game_to_string(game).as_bytes())
}

/// Renders one game as PGN text, ending with a newline.
pub fn game_to_string(game: &Game) -> String {
    let result = game
        .result()
        .or_else(|| game.headers.get("Result"))
        .unwrap_or("*")
        .to_string();

    let mut text = String::new();
    for name in ROSTER {
        let value = if name == "Result" {
            game.headers.get(name).unwrap_or(result.as_str())
        } else {
            game.headers.roster_value(name)
        };
        text.push_str(&format!("[{} \"{}\"]\n", name, escape_tag(value)));
    }
    for (name, value) in game.headers.iter() {
        if !ROSTER.contains(&name) {
            text.push_str(&format!("[{} \"{}\"]\n", name, escape_tag(value)));
        }
    }
    text.push('\n');

    let mut movetext = Movetext::default();
    movetext.root(game);
    movetext.word(&result);
    text.push_str(&movetext.finish());
    text
}

fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Word-wrapping accumulator for move text.
#[derive(Default)]
struct Movetext {
    lines: Vec<String>,
    line: String,
    open_paren: bool,
}

impl Movetext {
    fn word(&mut self, word: &str) {
        let word = if self.open_paren {
            self.open_paren = false;
            format!("({word}")
        } else {
            word.to_string()
        };
        if !self.line.is_empty() && self.line.len() + 1 + word.len() > LINE_WIDTH {
            self.lines.push(std::mem::take(&mut self.line));
        }
        if !self.line.is_empty() {
            self.line.push(' ');
        }
        self.line.push_str(&word);
    }

    fn close_paren(&mut self) {
        if self.line.len() + 1 > LINE_WIDTH {
            self.lines.push(std::mem::take(&mut self.line));
        }
        self.line.push(')');
    }

    fn comment(&mut self, comment: &str) {
        let sanitized = comment.replace('}', ")");
        let words: Vec<&str> = sanitized.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            [only] => self.word(&format!("{{{only}}}")),
            [first, middle @ .., last] => {
                self.word(&format!("{{{first}"));
                for word in middle {
                    self.word(word);
                }
                self.word(&format!("{last}}}"));
            }
        }
    }

    fn root(&mut self, game: &Game) {
        let Ok(root) = game.node(game.root()) else {
            return;
        };
        if let Some(comment) = &root.comment {
            self.comment(comment);
        }
        for nag in root.nags.iter() {
            self.word(&nag.to_string());
        }
        if let Some(first) = root.main_child() {
            self.line_from(game, first, true);
        }
    }

    /// Writes `start` and everything that follows it on its line, with the
    /// variations branching off along the way.
    fn line_from(&mut self, game: &Game, start: NodeId, mut need_number: bool) {
        let mut current = start;
        loop {
            let Ok(node) = game.node(current) else {
                return;
            };
            need_number = self.node(game, node, need_number);

            let siblings = node.parent().map(|p| game.children(p)).unwrap_or(&[]);
            if siblings.first() == Some(&current) {
                for &variation in &siblings[1..] {
                    self.open_paren = true;
                    self.line_from(game, variation, true);
                    self.close_paren();
                    need_number = true;
                }
            }

            match node.main_child() {
                Some(next) => current = next,
                None => return,
            }
        }
    }

    /// Writes one move. Returns whether the next move needs a number.
    fn node(&mut self, game: &Game, node: &GameNode, need_number: bool) -> bool {
        let Some(mv) = node.mv() else {
            return need_number;
        };
        let parent_position = node
            .parent()
            .and_then(|p| game.node(p).ok())
            .map(GameNode::position)
            .unwrap_or_default();
        let (number, side) = move_number(parent_position);
        let white = side == Side::White;
        if white {
            self.word(&format!("{number}."));
        } else if need_number || node.pre_comment.is_some() {
            self.word(&format!("{number}..."));
        }
        if let Some(pre) = &node.pre_comment {
            self.comment(pre);
        }
        self.word(&mv.san);
        for nag in node.nags.iter() {
            self.word(&nag.to_string());
        }
        match &node.comment {
            Some(comment) if !comment.trim().is_empty() => {
                self.comment(comment);
                true
            }
            _ => false,
        }
    }

    fn finish(mut self) -> String {
        if !self.line.is_empty() {
            self.lines.push(self.line);
        }
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_game;
    use crate::position::StandardChess;

    #[test]
    fn test_roster_and_variations() {
        let parsed = parse_game("[Event \"Test\"]\n1. e4 e5 2. Nf3 (2. Bc4) Nc6 *\n").unwrap();
        let text = game_to_string(&parsed.game);
        assert_eq!(
            text,
            "[Event \"Test\"]\n[Site \"?\"]\n[Date \"????.??.??\"]\n[Round \"?\"]\n\
             [White \"?\"]\n[Black \"?\"]\n[Result \"*\"]\n\n\
             1. e4 e5 2. Nf3 (2. Bc4) 2... Nc6 *\n"
        );
    }

    #[test]
    fn test_comments_and_nags() {
        let parsed =
            parse_game("1. e4 $1 {main} 1... {pre} e5 $14 2. Nf3 (2. Bc4 {bishop}) 1-0").unwrap();
        let text = game_to_string(&parsed.game);
        assert!(text.ends_with("1. e4 $1 {main} 1... {pre} e5 $14 2. Nf3 (2. Bc4 {bishop}) 1-0\n"));
    }

    #[test]
    fn test_extra_tags_and_escapes() {
        let mut game = crate::tree::Game::new();
        game.headers.set("Annotator", "say \"hi\"");
        game.headers.set("Result", "1/2-1/2");
        let e4 = game.add_variant(game.root(), "e4", &StandardChess).unwrap();
        game.set_comment(e4, Some("a } b".to_string())).unwrap();
        let text = game_to_string(&game);
        assert!(text.contains("[Result \"1/2-1/2\"]\n[Annotator \"say \\\"hi\\\"\"]\n\n"));
        assert!(text.ends_with("1. e4 {a ) b} 1/2-1/2\n"));
    }

    #[test]
    fn test_wraps_long_lines() {
        let moves = "1. Nf3 Nf6 2. Ng1 Ng8 ".repeat(12);
        let parsed = parse_game(&format!("{moves}*")).unwrap();
        let text = game_to_string(&parsed.game);
        let movetext = text.split("\n\n").nth(1).unwrap();
        assert!(movetext.lines().count() > 1);
        assert!(movetext.lines().all(|l| l.len() <= LINE_WIDTH));
    }

    #[test]
    fn test_write_pgn_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.pgn");
        let games: Vec<Game> = crate::parser::read_games("1. e4 *\n1. d4 *")
            .into_iter()
            .map(|p| p.game)
            .collect();
        write_pgn(&path, &games).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("[Event \"?\"]").count(), 2);
        assert_eq!(crate::parser::read_games(&written).len(), 2);
    }
}
