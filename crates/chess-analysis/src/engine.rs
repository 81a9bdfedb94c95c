//! UCI engine session running an analysis program as a subprocess.
//!
//! Engine output is read on a dedicated thread, parsed into
//! [`EngineMessage`]s and handed over through a channel, so callers never
//! block on the pipe unless they ask to wait. The session tracks a small
//! state machine:
//!
//! ```text
//! Stopped -> Starting -> Ready <-> Searching
//!                          |          |
//!                          +-> Stopped <-+
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uci::{EngineInfo, EngineMessage, GoOptions, GuiCommand, OptionKind, OptionSpec, ScoreBound, UciError};

use crate::Evaluation;

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not be launched or exited during the handshake.
    #[error("Failed to start engine {path}: {reason}")]
    StartFailure { path: String, reason: String },
    /// The engine did not acknowledge in time.
    #[error("Engine did not send {waiting_for} within {after:?}")]
    Timeout {
        waiting_for: &'static str,
        after: Duration,
    },
    /// The engine process went away.
    #[error("Engine process lost")]
    Lost,
    /// The operation is not allowed in the current state.
    #[error("Cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    /// A value was rejected by the option declaration.
    #[error(transparent)]
    InvalidOption(UciError),
    /// The engine never declared this option.
    #[error("Engine has no option named {0}")]
    UnknownOption(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Ready,
    Searching,
}

/// Timing and process settings for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound for every acknowledgement (`uciok`, `readyok`).
    pub timeout: Duration,
    /// How long `quit` waits before killing the process.
    pub quit_grace: Duration,
    /// Upper bound for [`EngineSession::analyse`] before the search is stopped.
    pub search_timeout: Duration,
    /// Extra command line arguments.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            quit_grace: Duration::from_secs(2),
            search_timeout: Duration::from_secs(300),
            args: Vec::new(),
            env: Vec::new(),
        }
    }
}

/// How far a search goes. Without depth and movetime the search is infinite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub depth: Option<u32>,
    pub movetime_ms: Option<u64>,
    /// Number of principal variations, 1 when unset.
    pub multipv: Option<u32>,
}

impl SearchLimits {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime_ms: Some(ms),
            ..Self::default()
        }
    }

    pub fn infinite() -> Self {
        Self::default()
    }

    pub fn with_multipv(mut self, lines: u32) -> Self {
        self.multipv = Some(lines);
        self
    }

    pub fn is_infinite(&self) -> bool {
        self.depth.is_none() && self.movetime_ms.is_none()
    }

    fn go_options(&self) -> GoOptions {
        GoOptions {
            depth: self.depth,
            movetime: self.movetime_ms,
            infinite: self.is_infinite(),
            ..GoOptions::default()
        }
    }
}

/// Latest report for one principal variation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvLine {
    /// 1-based PV index.
    pub index: u32,
    pub depth: u32,
    /// Score from the side to move.
    pub evaluation: Evaluation,
    pub bound: Option<ScoreBound>,
    /// Moves in UCI notation.
    pub moves: Vec<String>,
}

impl PvLine {
    fn from_info(info: &EngineInfo) -> Option<Self> {
        Some(Self {
            index: info.pv_index(),
            depth: info.depth.unwrap_or(0),
            evaluation: Evaluation::from_score(info.score?),
            bound: info.bound,
            moves: info.pv.clone(),
        })
    }
}

/// Outcome of a finished search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// `None` when the engine answered `bestmove (none)`.
    pub best_move: Option<String>,
    pub ponder: Option<String>,
    /// Final lines merged by PV index.
    pub lines: BTreeMap<u32, PvLine>,
}

impl SearchResult {
    pub fn best_line(&self) -> Option<&PvLine> {
        self.lines.values().next()
    }

    /// Score of the best line, from the side to move.
    pub fn evaluation(&self) -> Option<Evaluation> {
        self.best_line().map(|line| line.evaluation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// Score update for one principal variation.
    Line(PvLine),
    /// Search information without a score.
    Info(EngineInfo),
    /// The search ended with `bestmove`.
    Finished(SearchResult),
}

enum ReaderMsg {
    Message(EngineMessage),
    Eof,
    Err(io::Error),
}

/// A running UCI engine.
pub struct EngineSession {
    path: PathBuf,
    config: SessionConfig,
    state: SessionState,
    child: Child,
    stdin: Option<ChildStdin>,
    rx: mpsc::Receiver<ReaderMsg>,
    reader_thread: Option<JoinHandle<()>>,
    /// Messages that arrived while waiting for an acknowledgement.
    pending: VecDeque<EngineMessage>,
    name: Option<String>,
    author: Option<String>,
    options: Vec<OptionSpec>,
    values: BTreeMap<String, Option<String>>,
    lines: BTreeMap<u32, PvLine>,
}

impl EngineSession {
    /// Launches the engine, performs the `uci` handshake, applies `options`
    /// and waits for `readyok`.
    ///
    /// A bare program name is looked up in `PATH`.
    ///
    /// # Errors
    ///
    /// - `EngineError::StartFailure` if the path is not an executable file or
    ///   the process exits before acknowledging
    /// - `EngineError::Timeout` if `uciok` or `readyok` do not arrive in time
    /// - `EngineError::UnknownOption` / `EngineError::InvalidOption` for
    ///   options the engine rejects
    pub fn setup<I>(path: impl AsRef<Path>, options: I, config: SessionConfig) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let path = path.as_ref();
        let start_failure = |reason: String| EngineError::StartFailure {
            path: path.display().to_string(),
            reason,
        };
        let executable = resolve_executable(path).ok_or_else(|| start_failure("not an executable file".to_string()))?;

        let mut child = Command::new(&executable)
            .args(&config.args)
            .envs(config.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| start_failure(e.to_string()))?;

        let stdin = child.stdin.take().ok_or_else(|| start_failure("no stdin pipe".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| start_failure("no stdout pipe".to_string()))?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::Builder::new()
            .name("uci-reader".to_string())
            .spawn(move || read_engine_output(stdout, tx))
            .map_err(|e| start_failure(e.to_string()))?;

        tracing::debug!("Started engine {} (pid {})", executable.display(), child.id());

        let mut session = Self {
            path: executable,
            config,
            state: SessionState::Starting,
            child,
            stdin: Some(stdin),
            rx,
            reader_thread: Some(reader_thread),
            pending: VecDeque::new(),
            name: None,
            author: None,
            options: Vec::new(),
            values: BTreeMap::new(),
            lines: BTreeMap::new(),
        };

        let handshake = session
            .send(GuiCommand::Uci)
            .and_then(|()| session.wait_for("uciok", |msg| *msg == EngineMessage::UciOk));
        match handshake {
            Err(EngineError::Lost) => return Err(start_failure("exited before uciok".to_string())),
            other => other?,
        }

        for (name, value) in options {
            session.apply_option(&name, value.as_deref())?;
        }
        match session.is_ready() {
            Err(EngineError::Lost) => return Err(start_failure("exited before readyok".to_string())),
            other => other?,
        }
        session.state = SessionState::Ready;

        tracing::info!(
            "Engine {} ready with {} options",
            session.name().unwrap_or("(unnamed)"),
            session.options.len()
        );
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name from `id name`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Author from `id author`.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Options declared by the engine, in declaration order.
    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    /// Looks up an option. UCI option names are case-insensitive.
    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.name.eq_ignore_ascii_case(name))
    }

    /// The value last sent for an option, or its declared default.
    pub fn option_value(&self, name: &str) -> Option<String> {
        let spec = self.option(name)?;
        match self.values.get(&spec.name) {
            Some(value) => value.clone(),
            None => spec.default_value(),
        }
    }

    /// Sends `ucinewgame` and waits until the engine is ready again.
    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.require(SessionState::Ready, "start a new game")?;
        self.send(GuiCommand::UciNewGame)?;
        self.is_ready()
    }

    /// `isready` / `readyok` barrier.
    pub fn is_ready(&mut self) -> Result<(), EngineError> {
        self.ensure_running("synchronize")?;
        self.send(GuiCommand::IsReady)?;
        self.wait_for("readyok", |msg| *msg == EngineMessage::ReadyOk)
    }

    /// Validates `value` against the engine's declaration and sends it.
    /// Buttons take `None`.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> Result<(), EngineError> {
        self.require(SessionState::Ready, "set an option")?;
        self.apply_option(name, value)
    }

    /// Limits playing strength through `UCI_LimitStrength` and `UCI_Elo`.
    pub fn set_elo(&mut self, elo: u32) -> Result<(), EngineError> {
        self.require(SessionState::Ready, "set the rating")?;
        if self.option("UCI_LimitStrength").is_none() {
            return Err(EngineError::UnknownOption("UCI_LimitStrength".to_string()));
        }
        let elo = elo.to_string();
        let spec = self
            .option("UCI_Elo")
            .ok_or_else(|| EngineError::UnknownOption("UCI_Elo".to_string()))?;
        spec.validate(Some(&elo)).map_err(EngineError::InvalidOption)?;

        self.apply_option("UCI_LimitStrength", Some("true"))?;
        self.apply_option("UCI_Elo", Some(&elo))
    }

    /// Starts an analysis search and returns immediately. Results arrive as
    /// [`SearchEvent`]s.
    pub fn start_analysis(&mut self, position: &str, limits: &SearchLimits) -> Result<(), EngineError> {
        self.require(SessionState::Ready, "start an analysis")?;
        self.configure_search(limits.multipv.unwrap_or(1), true)?;
        self.start_search(position, limits.go_options())
    }

    /// Starts a search for a move to play and returns immediately.
    pub fn start_play(&mut self, position: &str, movetime_ms: u64) -> Result<(), EngineError> {
        self.require(SessionState::Ready, "start a search")?;
        self.configure_search(1, false)?;
        self.start_search(position, GoOptions::movetime(movetime_ms))
    }

    /// Asks the engine to finish the search. The session stays `Searching`
    /// until `bestmove` arrives.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.require(SessionState::Searching, "stop")?;
        self.send(GuiCommand::Stop)
    }

    /// Runs an analysis to completion. An infinite or overlong search is
    /// stopped after `SessionConfig::search_timeout`.
    pub fn analyse(&mut self, position: &str, limits: &SearchLimits) -> Result<SearchResult, EngineError> {
        self.start_analysis(position, limits)?;
        match self.wait_for_result(self.config.search_timeout) {
            Err(EngineError::Timeout { .. }) if self.state == SessionState::Searching => {
                tracing::warn!("Search exceeded {:?}, stopping", self.config.search_timeout);
                self.stop()?;
                self.wait_for_result(self.config.timeout)
            }
            other => other,
        }
    }

    /// Next event if one is available, without blocking.
    pub fn poll_event(&mut self) -> Result<Option<SearchEvent>, EngineError> {
        self.ensure_running("poll events")?;
        loop {
            let msg = match self.pending.pop_front() {
                Some(msg) => msg,
                None => match self.try_recv()? {
                    Some(msg) => msg,
                    None => return Ok(None),
                },
            };
            if let Some(event) = self.handle(msg) {
                return Ok(Some(event));
            }
        }
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_event(&mut self, timeout: Duration) -> Result<Option<SearchEvent>, EngineError> {
        self.ensure_running("wait for events")?;
        let deadline = Instant::now() + timeout;
        loop {
            let msg = match self.pending.pop_front() {
                Some(msg) => msg,
                None => match self.recv(deadline.saturating_duration_since(Instant::now()))? {
                    Some(msg) => msg,
                    None => return Ok(None),
                },
            };
            if let Some(event) = self.handle(msg) {
                return Ok(Some(event));
            }
        }
    }

    /// Waits for the running search to finish.
    pub fn wait_for_result(&mut self, timeout: Duration) -> Result<SearchResult, EngineError> {
        self.require(SessionState::Searching, "wait for a result")?;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.next_event(remaining)? {
                Some(SearchEvent::Finished(result)) => return Ok(result),
                Some(_) => {}
                None => {
                    return Err(EngineError::Timeout {
                        waiting_for: "bestmove",
                        after: timeout,
                    })
                }
            }
        }
    }

    /// Sends `quit`, waits for the process to exit and kills it after the
    /// grace period. Calling it again does nothing.
    pub fn quit(&mut self) -> Result<(), EngineError> {
        if let Some(mut stdin) = self.stdin.take() {
            tracing::trace!(target: "uci", ">> quit");
            // The pipe may already be broken; closing it is what matters.
            let _ = writeln!(stdin, "{}", GuiCommand::Quit).and_then(|()| stdin.flush());
        }
        self.state = SessionState::Stopped;

        if !wait_with_grace(&mut self.child, self.config.quit_grace)? {
            tracing::warn!("Engine {} ignored quit, killing it", self.path.display());
            let _ = self.child.kill();
            self.child.wait()?;
        }
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn require(&self, state: SessionState, operation: &'static str) -> Result<(), EngineError> {
        if self.state != state {
            return Err(EngineError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.state == SessionState::Stopped {
            return Err(EngineError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn apply_option(&mut self, name: &str, value: Option<&str>) -> Result<(), EngineError> {
        let (name, value) = {
            let spec = self
                .option(name)
                .ok_or_else(|| EngineError::UnknownOption(name.to_string()))?;
            let value = spec.validate(value).map_err(EngineError::InvalidOption)?;
            (spec.name.clone(), value)
        };
        self.send(GuiCommand::SetOption {
            name: name.clone(),
            value: value.clone(),
        })?;
        self.values.insert(name, value);
        Ok(())
    }

    /// Sets `MultiPV` and `UCI_AnalyseMode` when the engine has them,
    /// skipping values that are already in effect.
    fn configure_search(&mut self, multipv: u32, analyse: bool) -> Result<(), EngineError> {
        let multipv = match self.option("MultiPV").map(|o| &o.kind) {
            Some(OptionKind::Spin { min, max, .. }) if min <= max => Some(i64::from(multipv).clamp(*min, *max)),
            _ => {
                if multipv > 1 {
                    tracing::warn!("Engine has no MultiPV option, searching a single line");
                }
                None
            }
        };
        if let Some(lines) = multipv {
            self.ensure_option("MultiPV", lines.to_string())?;
        }
        if self.option("UCI_AnalyseMode").is_some() {
            self.ensure_option("UCI_AnalyseMode", analyse.to_string())?;
        }
        Ok(())
    }

    fn ensure_option(&mut self, name: &str, value: String) -> Result<(), EngineError> {
        if self.option_value(name).as_deref() == Some(value.as_str()) {
            return Ok(());
        }
        self.apply_option(name, Some(&value))
    }

    fn start_search(&mut self, position: &str, go: GoOptions) -> Result<(), EngineError> {
        self.send(GuiCommand::Position {
            fen: Some(position.to_string()),
            moves: Vec::new(),
        })?;
        self.send(GuiCommand::Go(go))?;
        self.lines.clear();
        self.state = SessionState::Searching;
        tracing::debug!("Search started on {}", position);
        Ok(())
    }

    fn send(&mut self, command: GuiCommand) -> Result<(), EngineError> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(EngineError::Lost);
        };
        tracing::trace!(target: "uci", ">> {}", command);
        let written = writeln!(stdin, "{}", command).and_then(|()| stdin.flush());
        if let Err(e) = written {
            return Err(self.lost(&e.to_string()));
        }
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<EngineMessage>, EngineError> {
        match self.rx.recv_timeout(timeout) {
            Ok(ReaderMsg::Message(msg)) => Ok(Some(msg)),
            Ok(ReaderMsg::Err(e)) => Err(self.lost(&e.to_string())),
            Ok(ReaderMsg::Eof) | Err(RecvTimeoutError::Disconnected) => Err(self.lost("end of output")),
            Err(RecvTimeoutError::Timeout) => Ok(None),
        }
    }

    fn try_recv(&mut self) -> Result<Option<EngineMessage>, EngineError> {
        match self.rx.try_recv() {
            Ok(ReaderMsg::Message(msg)) => Ok(Some(msg)),
            Ok(ReaderMsg::Err(e)) => Err(self.lost(&e.to_string())),
            Ok(ReaderMsg::Eof) | Err(TryRecvError::Disconnected) => Err(self.lost("end of output")),
            Err(TryRecvError::Empty) => Ok(None),
        }
    }

    /// Reads until `done` matches. Everything else is recorded or queued.
    fn wait_for(
        &mut self,
        waiting_for: &'static str,
        done: impl Fn(&EngineMessage) -> bool,
    ) -> Result<(), EngineError> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv(remaining)? {
                Some(msg) if done(&msg) => return Ok(()),
                Some(msg) => self.record(msg),
                None => {
                    return Err(EngineError::Timeout {
                        waiting_for,
                        after: self.config.timeout,
                    })
                }
            }
        }
    }

    fn record(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::Id { name, author } => {
                self.name = name.or(self.name.take());
                self.author = author.or(self.author.take());
            }
            EngineMessage::Option(spec) => {
                match self.options.iter_mut().find(|o| o.name.eq_ignore_ascii_case(&spec.name)) {
                    Some(existing) => *existing = spec,
                    None => self.options.push(spec),
                }
            }
            EngineMessage::Unknown(_) => {}
            other => self.pending.push_back(other),
        }
    }

    fn handle(&mut self, msg: EngineMessage) -> Option<SearchEvent> {
        match msg {
            EngineMessage::Info(info) if self.state == SessionState::Searching => match PvLine::from_info(&info) {
                Some(line) => {
                    self.merge_line(line.clone());
                    Some(SearchEvent::Line(line))
                }
                None => Some(SearchEvent::Info(info)),
            },
            EngineMessage::BestMove { mv, ponder } if self.state == SessionState::Searching => {
                self.state = SessionState::Ready;
                let best_move = (mv != "(none)").then_some(mv);
                tracing::debug!("Search finished with {:?}", best_move);
                Some(SearchEvent::Finished(SearchResult {
                    best_move,
                    ponder,
                    lines: std::mem::take(&mut self.lines),
                }))
            }
            other => {
                tracing::trace!("Ignoring {:?} while {:?}", other, self.state);
                None
            }
        }
    }

    /// Replaces the line with the same PV index. Bound-only updates without
    /// moves keep the previous moves.
    fn merge_line(&mut self, mut line: PvLine) {
        if line.moves.is_empty() {
            if let Some(previous) = self.lines.get(&line.index) {
                line.moves = previous.moves.clone();
            }
        }
        self.lines.insert(line.index, line);
    }

    fn lost(&mut self, reason: &str) -> EngineError {
        if self.state != SessionState::Stopped {
            tracing::warn!("Lost engine {}: {}", self.path.display(), reason);
        }
        self.state = SessionState::Stopped;
        self.stdin = None;
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        EngineError::Lost
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            tracing::warn!("Failed to shut down engine {}: {}", self.path.display(), e);
        }
    }
}

fn read_engine_output(stdout: ChildStdout, tx: mpsc::Sender<ReaderMsg>) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                let _ = tx.send(ReaderMsg::Eof);
                return;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                tracing::trace!(target: "uci", "<< {}", line);
                if tx.send(ReaderMsg::Message(EngineMessage::parse(line))).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(ReaderMsg::Err(e));
                return;
            }
        }
    }
}

/// Returns whether the child exited within `grace`.
fn wait_with_grace(child: &mut Child, grace: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + grace;
    loop {
        if child.try_wait()?.is_some() {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        thread::sleep(Duration::from_millis(10));
    }
}

fn resolve_executable(path: &Path) -> Option<PathBuf> {
    if path.components().count() == 1 && !path.is_file() {
        let dirs = std::env::var_os("PATH")?;
        return std::env::split_paths(&dirs)
            .map(|dir| dir.join(path))
            .find(|candidate| is_executable(candidate));
    }
    is_executable(path).then(|| path.to_path_buf())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uci::Score;

    #[test]
    fn test_engine_not_found() {
        let result = EngineSession::setup("/nonexistent/path/to/stockfish", Vec::new(), SessionConfig::default());
        match result {
            Err(EngineError::StartFailure { path, .. }) => {
                assert_eq!(path, "/nonexistent/path/to/stockfish");
            }
            _ => panic!("Expected StartFailure error"),
        }
    }

    #[test]
    fn test_directory_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineSession::setup(dir.path(), Vec::new(), SessionConfig::default());
        assert!(matches!(result, Err(EngineError::StartFailure { .. })));
    }

    #[test]
    fn test_limits_to_go() {
        assert_eq!(SearchLimits::depth(12).go_options(), GoOptions::depth(12));
        assert_eq!(SearchLimits::movetime(500).go_options(), GoOptions::movetime(500));
        assert_eq!(SearchLimits::infinite().with_multipv(3).go_options(), GoOptions::infinite());
    }

    #[test]
    fn test_pv_line_from_info() {
        let info = EngineInfo::parse("info depth 9 multipv 2 score mate 2 pv d1h5 g7g6 h5e5").unwrap();
        let line = PvLine::from_info(&info).unwrap();
        assert_eq!(line.index, 2);
        assert_eq!(line.depth, 9);
        assert_eq!(line.evaluation, Evaluation::from_score(Score::Mate(2)));
        assert_eq!(line.moves, vec!["d1h5", "g7g6", "h5e5"]);

        let no_score = EngineInfo::parse("info depth 9 currmove e2e4 currmovenumber 1").unwrap();
        assert!(PvLine::from_info(&no_score).is_none());
    }

    #[test]
    fn test_search_result_best_line_is_lowest_index() {
        let mut result = SearchResult::default();
        for index in [3, 1, 2] {
            result.lines.insert(
                index,
                PvLine {
                    index,
                    depth: 5,
                    evaluation: Evaluation::Centipawns(100 - index as i32 * 10),
                    bound: None,
                    moves: vec![],
                },
            );
        }
        assert_eq!(result.best_line().map(|l| l.index), Some(1));
        assert_eq!(result.evaluation(), Some(Evaluation::Centipawns(90)));
    }

    #[test]
    fn test_engine_error_display() {
        let timeout = EngineError::Timeout {
            waiting_for: "uciok",
            after: Duration::from_millis(250),
        };
        assert!(timeout.to_string().contains("uciok"));

        let state = EngineError::InvalidState {
            operation: "stop",
            state: SessionState::Ready,
        };
        assert_eq!(state.to_string(), "Cannot stop while Ready");
    }
}
