//! Property tests for PGN export and re-import.
//!
//! 1. Writing a game and reading it back yields an isomorphic tree
//! 2. N written games read back as exactly N games, whatever the blank lines
//! 3. Promote/demote edits restore sibling order

use chess_pgn::{game_to_string, read_games, Game, Nag, NodeId, StandardChess};
use proptest::prelude::*;

const CANDIDATES: &[&str] = &[
    "e4", "e5", "d4", "d5", "Nf3", "Nc6", "Nf6", "c4", "c5", "Bc4", "Bb5", "g3", "g6", "Bg2",
    "Bg7", "O-O", "a3", "a6", "h3", "h6", "Qe2", "Qe7", "exd5", "exd4", "Nxe5", "Nxd4",
];

const WORDS: &[&str] = &[
    "good", "bad", "[%clk", "0:01:00]", "(idea)", "better", "is", "Kasparov", "Müller", "!",
    "1.", "e4", "$1", ";", "\"quoted\"",
];

const RESULTS: &[&str] = &["1-0", "0-1", "1/2-1/2", "*"];

/// Edits applied to a fresh game.
#[derive(Debug, Clone)]
enum Op {
    Move { node: usize, san: usize },
    Comment { node: usize, words: Vec<&'static str> },
    PreComment { node: usize, words: Vec<&'static str> },
    Nag { node: usize, nag: u8 },
}

fn words_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(WORDS), 1..5)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), 0..CANDIDATES.len()).prop_map(|(node, san)| Op::Move { node, san }),
        1 => (any::<usize>(), words_strategy()).prop_map(|(node, words)| Op::Comment { node, words }),
        1 => (any::<usize>(), words_strategy())
            .prop_map(|(node, words)| Op::PreComment { node, words }),
        1 => (any::<usize>(), any::<u8>()).prop_map(|(node, nag)| Op::Nag { node, nag }),
    ]
}

fn all_nodes(game: &Game) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    let mut stack = vec![game.root()];
    while let Some(id) = stack.pop() {
        nodes.push(id);
        stack.extend(game.children(id).iter().rev());
    }
    nodes
}

fn build_game(ops: &[Op], event: &str, result: &str) -> Game {
    let mut game = Game::new();
    game.headers.set("Event", event);
    game.headers.set("Opening", "Test \\ opening");
    game.set_result(result);
    for op in ops {
        let nodes = all_nodes(&game);
        match op {
            Op::Move { node, san } => {
                let at = nodes[node % nodes.len()];
                // Illegal candidates are simply not added.
                let _ = game.add_variant(at, CANDIDATES[*san], &StandardChess);
            }
            Op::Comment { node, words } => {
                let at = nodes[node % nodes.len()];
                game.set_comment(at, Some(words.join(" "))).unwrap();
            }
            Op::PreComment { node, words } => {
                let at = nodes[node % nodes.len()];
                if at != game.root() {
                    game.node_mut(at).unwrap().pre_comment = Some(words.join(" "));
                }
            }
            Op::Nag { node, nag } => {
                let at = nodes[node % nodes.len()];
                game.push_nag(at, Nag(*nag)).unwrap();
            }
        }
    }
    game
}

fn normalize(text: &Option<String>) -> Option<String> {
    text.as_ref()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn assert_isomorphic(a: &Game, a_id: NodeId, b: &Game, b_id: NodeId) {
    let left = a.node(a_id).unwrap();
    let right = b.node(b_id).unwrap();
    assert_eq!(left.san(), right.san());
    assert_eq!(normalize(&left.comment), normalize(&right.comment));
    assert_eq!(normalize(&left.pre_comment), normalize(&right.pre_comment));
    assert_eq!(left.nags, right.nags);
    assert_eq!(left.children().len(), right.children().len());
    for (&x, &y) in left.children().iter().zip(right.children()) {
        assert_isomorphic(a, x, b, y);
    }
}

proptest! {
    #[test]
    fn written_game_reads_back_isomorphic(
        ops in prop::collection::vec(op_strategy(), 0..60),
        event in "[a-zA-Z \"\\\\]{0,12}",
        result in prop::sample::select(RESULTS),
    ) {
        let game = build_game(&ops, &event, result);
        let text = game_to_string(&game);
        let parsed = read_games(&text);
        prop_assert_eq!(parsed.len(), 1, "{}", text);
        prop_assert!(parsed[0].is_clean(), "{:?}\n{}", parsed[0].diagnostics, text);

        let back = &parsed[0].game;
        for (name, value) in game.headers.iter() {
            prop_assert_eq!(back.headers.get(name), Some(value));
        }
        prop_assert_eq!(back.result(), Some(result));
        assert_isomorphic(&game, game.root(), back, back.root());
    }

    #[test]
    fn n_games_read_back_as_n(
        games in prop::collection::vec(
            (prop::collection::vec(op_strategy(), 0..12), prop::sample::select(RESULTS), 0usize..4),
            0..6,
        ),
    ) {
        let mut text = String::new();
        for (ops, result, blank_lines) in &games {
            text.push_str(&game_to_string(&build_game(ops, "Match", result)));
            text.push_str(&"\n".repeat(*blank_lines));
        }
        let parsed = read_games(&text);
        prop_assert_eq!(parsed.len(), games.len());
        prop_assert!(parsed.iter().all(|p| p.is_clean()));
    }

    #[test]
    fn promote_then_demote_restores_order(count in 2usize..6, pick in any::<usize>()) {
        let mut game = Game::new();
        let root = game.root();
        for san in &["e4", "d4", "c4", "Nf3", "g3", "b3"][..count] {
            game.add_variant(root, san, &StandardChess).unwrap();
        }
        let original = game.children(root).to_vec();
        let node = original[pick % count];

        game.promote_variant(node).unwrap();
        let idx = original.iter().position(|&n| n == node).unwrap();
        if idx > 0 {
            game.demote_variant(node).unwrap();
        }
        prop_assert_eq!(game.children(root), original.as_slice());
    }

    #[test]
    fn promote_to_main_then_demote_restores_two_siblings(second_first in any::<bool>()) {
        let mut game = Game::new();
        let root = game.root();
        let a = game.add_variant(root, "e4", &StandardChess).unwrap();
        let b = game.add_variant(root, "d4", &StandardChess).unwrap();
        let original = game.children(root).to_vec();
        let node = if second_first { b } else { a };

        game.promote_variant_to_main(node).unwrap();
        prop_assert_eq!(game.children(root)[0], node);
        if node == b {
            game.demote_variant(node).unwrap();
        }
        prop_assert_eq!(game.children(root), original.as_slice());
    }
}
