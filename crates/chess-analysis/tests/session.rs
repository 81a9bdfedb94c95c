//! Engine session tests against the deterministic `scripted-engine` binary.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chess_analysis::{EngineError, EngineSession, Evaluation, SearchEvent, SearchLimits, SessionConfig, SessionState};
use chess_pgn::START_FEN;

const ENGINE: &str = env!("CARGO_BIN_EXE_scripted-engine");

fn config(vars: &[(&str, &str)]) -> SessionConfig {
    SessionConfig {
        timeout: Duration::from_secs(5),
        quit_grace: Duration::from_millis(500),
        search_timeout: Duration::from_secs(5),
        env: vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        ..SessionConfig::default()
    }
}

fn no_options() -> Vec<(String, Option<String>)> {
    Vec::new()
}

fn start(vars: &[(&str, &str)]) -> EngineSession {
    EngineSession::setup(ENGINE, no_options(), config(vars)).expect("Failed to start scripted engine")
}

/// Session whose engine logs every received command to a file in `dir`.
fn start_logged(dir: &Path, vars: &[(&str, &str)]) -> (EngineSession, std::path::PathBuf) {
    let log = dir.join("commands.log");
    let log_str = log.to_str().expect("temp path is UTF-8").to_string();
    let mut all = vec![("SCRIPTED_ENGINE_LOG", log_str.as_str())];
    all.extend_from_slice(vars);
    (start(&all), log)
}

fn read_log(path: &Path) -> String {
    fs::read_to_string(path).expect("Failed to read command log")
}

#[test]
fn test_setup_reaches_ready() {
    let mut session = start(&[]);
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.name(), Some("Scripted Engine"));
    assert_eq!(session.author(), Some("chess-analysis"));
    assert_eq!(session.options().len(), 7);
    assert!(session.option("multipv").is_some(), "Option lookup ignores case");
    assert_eq!(session.option_value("Hash").as_deref(), Some("16"));

    session.is_ready().expect("isready after setup");
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_setup_applies_options() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("commands.log");
    let vars = config(&[("SCRIPTED_ENGINE_LOG", log.to_str().unwrap())]);
    let options = vec![
        ("Hash".to_string(), Some("64".to_string())),
        ("clear hash".to_string(), None),
    ];
    let mut session = EngineSession::setup(ENGINE, options, vars).expect("setup with options");
    assert_eq!(session.option_value("Hash").as_deref(), Some("64"));
    session.quit().unwrap();

    let commands = read_log(&log);
    assert!(commands.contains("setoption name Hash value 64\n"), "{}", commands);
    assert!(commands.contains("setoption name Clear Hash\n"), "{}", commands);
    let uci = commands.find("uci\n").unwrap();
    let ready = commands.find("isready").unwrap();
    let hash = commands.find("setoption name Hash").unwrap();
    assert!(uci < hash && hash < ready);
}

#[test]
fn test_setup_rejects_bad_options() {
    let too_big = vec![("Hash".to_string(), Some("4096".to_string()))];
    let result = EngineSession::setup(ENGINE, too_big, config(&[]));
    assert!(matches!(result, Err(EngineError::InvalidOption(_))));

    let unknown = vec![("Threads".to_string(), Some("2".to_string()))];
    match EngineSession::setup(ENGINE, unknown, config(&[])) {
        Err(EngineError::UnknownOption(name)) => assert_eq!(name, "Threads"),
        _ => panic!("Expected UnknownOption"),
    }
}

#[test]
fn test_crash_during_handshake_is_start_failure() {
    let result = EngineSession::setup(ENGINE, no_options(), config(&[("SCRIPTED_ENGINE_CRASH_ON", "uci")]));
    assert!(matches!(result, Err(EngineError::StartFailure { .. })));
}

#[test]
fn test_silent_engine_times_out() {
    let mut vars = config(&[("SCRIPTED_ENGINE_SILENT", "1")]);
    vars.timeout = Duration::from_millis(300);
    match EngineSession::setup(ENGINE, no_options(), vars) {
        Err(EngineError::Timeout { waiting_for, .. }) => assert_eq!(waiting_for, "uciok"),
        _ => panic!("Expected Timeout"),
    }
}

#[test]
fn test_multipv_lines_merge_by_index() {
    let mut session = start(&[]);
    let result = session
        .analyse(START_FEN, &SearchLimits::depth(2).with_multipv(3))
        .expect("analysis");

    assert_eq!(result.best_move.as_deref(), Some("e2e4"));
    assert_eq!(result.lines.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(result.evaluation(), Some(Evaluation::Centipawns(25)));
    assert_eq!(result.lines[&2].evaluation, Evaluation::Centipawns(15));
    assert_eq!(result.lines[&3].evaluation, Evaluation::Centipawns(5));
    assert_eq!(result.lines[&3].depth, 2);
    assert_eq!(result.lines[&1].moves, vec!["e2e4", "e7e5", "g1f3"]);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_events_arrive_in_order() {
    let mut session = start(&[]);
    session.start_analysis(START_FEN, &SearchLimits::depth(2)).unwrap();
    assert_eq!(session.state(), SessionState::Searching);

    let mut depths = Vec::new();
    let mut infos = 0;
    let result = loop {
        match session.next_event(Duration::from_secs(5)).unwrap() {
            Some(SearchEvent::Line(line)) => depths.push(line.depth),
            Some(SearchEvent::Info(_)) => infos += 1,
            Some(SearchEvent::Finished(result)) => break result,
            None => panic!("Timed out waiting for events"),
        }
    };
    assert_eq!(depths, vec![1, 2]);
    assert_eq!(infos, 1);
    assert_eq!(result.lines.len(), 1);
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.poll_event().unwrap(), None);
}

#[test]
fn test_start_analysis_while_searching_is_invalid() {
    let mut session = start(&[]);
    session.start_analysis(START_FEN, &SearchLimits::infinite()).unwrap();

    let second = session.start_analysis(START_FEN, &SearchLimits::depth(5));
    assert!(matches!(
        second,
        Err(EngineError::InvalidState {
            state: SessionState::Searching,
            ..
        })
    ));
    assert!(matches!(
        session.set_option("Hash", Some("32")),
        Err(EngineError::InvalidState { .. })
    ));
    assert_eq!(session.state(), SessionState::Searching);

    session.stop().unwrap();
    let result = session.wait_for_result(Duration::from_secs(5)).unwrap();
    assert_eq!(result.best_move.as_deref(), Some("e2e4"));
    assert_eq!(result.ponder.as_deref(), Some("e7e5"));
    assert_eq!(result.lines.len(), 1);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_stop_requires_search() {
    let mut session = start(&[]);
    assert!(matches!(session.stop(), Err(EngineError::InvalidState { .. })));
    assert!(matches!(
        session.wait_for_result(Duration::from_millis(10)),
        Err(EngineError::InvalidState { .. })
    ));
}

#[test]
fn test_is_ready_during_search_keeps_events() {
    let mut session = start(&[]);
    session.start_analysis(START_FEN, &SearchLimits::infinite().with_multipv(2)).unwrap();
    session.is_ready().unwrap();
    assert_eq!(session.state(), SessionState::Searching);

    session.stop().unwrap();
    let result = session.wait_for_result(Duration::from_secs(5)).unwrap();
    assert_eq!(result.lines.len(), 2);
}

#[test]
fn test_wait_for_result_timeout_keeps_search() {
    let mut session = start(&[("SCRIPTED_ENGINE_DELAY_MS", "700")]);
    session.start_analysis(START_FEN, &SearchLimits::depth(1)).unwrap();
    match session.wait_for_result(Duration::from_millis(100)) {
        Err(EngineError::Timeout { waiting_for, .. }) => assert_eq!(waiting_for, "bestmove"),
        other => panic!("Expected Timeout, got {:?}", other.map(|r| r.best_move)),
    }
    assert_eq!(session.state(), SessionState::Searching);
    let result = session.wait_for_result(Duration::from_secs(5)).unwrap();
    assert_eq!(result.best_move.as_deref(), Some("e2e4"));
}

#[test]
fn test_option_validation() {
    let mut session = start(&[]);
    session.set_option("style", Some("risky")).unwrap();
    assert_eq!(session.option_value("Style").as_deref(), Some("Risky"));

    assert!(matches!(
        session.set_option("Hash", Some("0")),
        Err(EngineError::InvalidOption(_))
    ));
    assert!(matches!(
        session.set_option("UCI_AnalyseMode", Some("maybe")),
        Err(EngineError::InvalidOption(_))
    ));
    assert!(matches!(
        session.set_option("Contempt", Some("10")),
        Err(EngineError::UnknownOption(_))
    ));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_analysis_and_play_configure_engine() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, log) = start_logged(dir.path(), &[]);

    session.analyse(START_FEN, &SearchLimits::depth(1).with_multipv(3)).unwrap();
    session.start_play(START_FEN, 50).unwrap();
    session.wait_for_result(Duration::from_secs(5)).unwrap();
    session.set_elo(2000).unwrap();
    assert!(matches!(session.set_elo(100), Err(EngineError::InvalidOption(_))));
    session.new_game().unwrap();
    session.quit().unwrap();

    let commands: Vec<String> = read_log(&log).lines().map(str::to_string).collect();
    let position = |needle: &str| {
        commands
            .iter()
            .position(|c| c == needle)
            .unwrap_or_else(|| panic!("{} not sent: {:?}", needle, commands))
    };
    let analysis_multipv = position("setoption name MultiPV value 3");
    let analysis_mode = position("setoption name UCI_AnalyseMode value true");
    let analysis_go = position("go depth 1");
    let play_multipv = position("setoption name MultiPV value 1");
    let play_mode = position("setoption name UCI_AnalyseMode value false");
    let play_go = position("go movetime 50");
    assert!(analysis_multipv < analysis_go && analysis_mode < analysis_go);
    assert!(analysis_go < play_multipv && play_multipv < play_go && play_mode < play_go);
    assert_eq!(commands[play_go - 1], format!("position fen {}", START_FEN));

    let limit = position("setoption name UCI_LimitStrength value true");
    assert!(limit < position("setoption name UCI_Elo value 2000"));
    assert!(!commands.iter().any(|c| c == "setoption name UCI_Elo value 100"));
    position("ucinewgame");
    assert_eq!(commands.last().map(String::as_str), Some("quit"));
}

#[test]
fn test_mate_score_and_no_move() {
    let mut session = start(&[("SCRIPTED_ENGINE_SCORES", "m2,m0"), ("SCRIPTED_ENGINE_PV", "")]);
    let first = session.analyse(START_FEN, &SearchLimits::depth(1)).unwrap();
    assert_eq!(first.evaluation(), Some(Evaluation::Mate(3)));
    assert_eq!(first.best_move, None);

    let second = session.analyse(START_FEN, &SearchLimits::depth(1)).unwrap();
    assert_eq!(second.evaluation(), Some(Evaluation::Mate(0)));
}

#[test]
fn test_crash_during_search_is_lost() {
    let mut session = start(&[("SCRIPTED_ENGINE_CRASH_ON", "go")]);
    session.start_analysis(START_FEN, &SearchLimits::depth(3)).unwrap();
    assert!(matches!(
        session.wait_for_result(Duration::from_secs(5)),
        Err(EngineError::Lost)
    ));
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(matches!(session.is_ready(), Err(EngineError::InvalidState { .. })));
    session.quit().unwrap();
}

#[test]
fn test_quit_is_idempotent() {
    let mut session = start(&[]);
    session.quit().unwrap();
    session.quit().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(matches!(
        session.start_analysis(START_FEN, &SearchLimits::depth(1)),
        Err(EngineError::InvalidState { .. })
    ));
}
