//! Reading realistic multi-game files from disk.

use std::fs::File;
use std::io::Write;

use chess_pgn::{DiagnosticKind, Encoding, GameReader, LexerOptions, ParseOptions};

const SAMPLE: &str = r#"[Event "Casual Game"]
[Site "Berlin GER"]
[Date "1852.??.??"]
[Round "?"]
[White "Adolf Anderssen"]
[Black "Jean Dufresne"]
[Result "1-0"]

1.e4 e5 2.Nf3 Nc6 3.Bc4 Bc5 4.b4 Bxb4 5.c3 Ba5 6.d4 exd4 7.O-O d3 8.Qb3 Qf6
9.e5 Qg6 10.Re1 Nge7 11.Ba3 b5 12.Qxb5 Rb8 13.Qa4 Bb6 14.Nbd2 Bb7 15.Ne4 Qf5
16.Bxd3 Qh5 17.Nf6+ gxf6 18.exf6 Rg8 19.Rad1 Qxf3 20.Rxe7+ Nxe7 21.Qxd7+ Kxd7
22.Bf5+ Ke8 23.Bd7+ Kf8 24.Bxe7# 1-0

[Event "Broken"]
[Result "*"]

1. e4 e5 2. Qxf7 Ke7 *

% an escape line between games
[Event "Annotated"]
[Result "1/2-1/2"]

{The main line} 1. d4 d5 2. c4 $1 ( 2. Nf3 {quiet} ) 2... e6 ; solid
3. Nc3 1/2-1/2
"#;

fn write_fixture(bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("sample.pgn");
    let mut file = File::create(&path).expect("Failed to create fixture");
    file.write_all(bytes).expect("Failed to write fixture");
    (dir, path)
}

#[test]
fn test_reads_every_game_from_file() {
    let (_dir, path) = write_fixture(SAMPLE.as_bytes());
    let file = File::open(&path).unwrap();
    let games: Vec<_> = GameReader::new(file).collect();

    assert_eq!(games.len(), 3, "Expected three games");

    let immortal = &games[0];
    assert!(immortal.is_clean(), "{:?}", immortal.diagnostics);
    assert_eq!(immortal.game.headers.get("White"), Some("Adolf Anderssen"));
    assert_eq!(immortal.game.mainline().count(), 47);
    assert_eq!(immortal.game.result(), Some("1-0"));

    let broken = &games[1];
    assert_eq!(broken.diagnostics.len(), 1);
    assert_eq!(broken.diagnostics[0].kind, DiagnosticKind::IllegalMove);
    assert_eq!(broken.diagnostics[0].game_index, 1);
    assert_eq!(broken.game.mainline().count(), 2);

    let annotated = &games[2];
    assert!(annotated.is_clean(), "{:?}", annotated.diagnostics);
    let game = &annotated.game;
    let root = game.node(game.root()).unwrap();
    assert_eq!(root.comment.as_deref(), Some("The main line"));
    let line: Vec<_> = game.mainline().collect();
    assert_eq!(line.len(), 5);
    let d5 = line[1];
    assert_eq!(game.children(d5).len(), 2);
    let nf3 = game.children(d5)[1];
    assert_eq!(game.node(nf3).unwrap().comment.as_deref(), Some("quiet"));
    assert_eq!(game.node(line[3]).unwrap().comment.as_deref(), Some("solid"));
}

#[test]
fn test_small_buffer_reads_the_same_games() {
    let (_dir, path) = write_fixture(SAMPLE.as_bytes());
    let options = ParseOptions {
        lexer: LexerOptions {
            buffer_size: 64,
            encoding: Encoding::Auto,
        },
        ..ParseOptions::default()
    };
    let small: Vec<_> = GameReader::with_options(File::open(&path).unwrap(), options).collect();
    let large: Vec<_> = GameReader::new(SAMPLE.as_bytes()).collect();
    assert_eq!(small.len(), large.len());
    for (a, b) in small.iter().zip(&large) {
        assert_eq!(a.game, b.game);
        assert_eq!(a.diagnostics, b.diagnostics);
        assert_eq!(a.offset, b.offset);
    }
}

#[test]
fn test_bom_and_latin1() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"[White \"J\xf6rg\"]\n1. e4 *\n");
    let (_dir, path) = write_fixture(&bytes);
    let mut reader = GameReader::new(File::open(&path).unwrap());
    let parsed = reader.read_game().unwrap();
    assert!(parsed.is_clean(), "{:?}", parsed.diagnostics);
    assert_eq!(parsed.game.headers.get("White"), Some("J\u{f6}rg"));
    assert_eq!(parsed.offset, 3);
}

#[test]
fn test_index_file() {
    let (_dir, path) = write_fixture(SAMPLE.as_bytes());
    let mut reader = GameReader::new(File::open(&path).unwrap());
    let offsets = reader.game_offsets();
    assert_eq!(offsets.len(), 3);
    assert_eq!(offsets[0], 0);
    assert_eq!(offsets[1], SAMPLE.find("[Event \"Broken\"]").unwrap() as u64);
    assert_eq!(offsets[2], SAMPLE.find("[Event \"Annotated\"]").unwrap() as u64);

    let mut reader = GameReader::new(File::open(&path).unwrap());
    let events: Vec<String> = std::iter::from_fn(|| reader.read_headers())
        .map(|h| h.headers.get("Event").unwrap_or("?").to_string())
        .collect();
    assert_eq!(events, vec!["Casual Game", "Broken", "Annotated"]);
}
