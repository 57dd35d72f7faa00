//! The UCI driver's process lifecycle (spec §4.2): spawn, handshake,
//! configure, run analysis cycles, and escalate shutdown.
//!
//! Grounded on `engine::process::EngineProcess` in the teacher — same
//! split of a `tokio::process::Child` plus a `Lines<BufReader<ChildStdout>>`
//! reader, same raw-string command sending, same `log` facade calls at
//! each step. The state machine is flattened relative to the teacher's
//! (no `Analyzing`/`Stopping` states — this driver never needs to stop a
//! `go` early, spec §5 "Cancellation") but the spawn/handshake/configure/
//! shutdown shape is the same.

use std::process::Stdio;

use log::{debug, info, trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use vampirc_uci::{parse_one, UciMessage};

use super::options::{apply_user_option, from_uci_option_config, Applied};
use super::types::{
    DriverError, DriverResult, EvaluationInfo, GoMode, OptionDescriptor, Score, HANDSHAKE_TIMEOUT,
    SHUTDOWN_STEP,
};

/// A spawned, handshaken UCI engine subprocess, ready to drive analysis
/// cycles one half-move at a time (spec §5: exactly one child process,
/// totally ordered commands/responses, no concurrent cycles).
pub struct EngineDriver {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    pub engine_name: Option<String>,
    pub options: Vec<OptionDescriptor>,
}

impl EngineDriver {
    /// Spawn `program` (with `args`) and run the UCI handshake. Fails
    /// fatally if `uciok` does not arrive within 10 seconds (spec §4.2).
    pub async fn spawn(program: &str, args: &[String]) -> DriverResult<Self> {
        info!("spawning engine: {program} {args:?}");
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(DriverError::Spawn)?;
        let stdin = child.stdin.take().ok_or(DriverError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(DriverError::NoStdout)?;
        let lines = BufReader::new(stdout).lines();

        Self::spawn_stderr_drain(child.stderr.take());

        let mut driver = Self { child, stdin, lines, engine_name: None, options: Vec::new() };
        timeout(HANDSHAKE_TIMEOUT, driver.handshake())
            .await
            .map_err(|_| DriverError::HandshakeTimeout(HANDSHAKE_TIMEOUT))??;
        Ok(driver)
    }

    fn spawn_stderr_drain(stderr: Option<tokio::process::ChildStderr>) {
        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("engine stderr: {line}");
                }
            });
        }
    }

    /// Send `uci\n`, collect `id`/`option` lines until `uciok`.
    async fn handshake(&mut self) -> DriverResult<()> {
        self.send("uci\n").await?;
        loop {
            let line = self.next_line().await?;
            trace!("engine> {line}");
            match parse_one(&line) {
                UciMessage::Id { name: Some(name), .. } => {
                    self.engine_name = Some(name);
                }
                UciMessage::Option(cfg) => {
                    self.options.push(from_uci_option_config(cfg));
                }
                UciMessage::UciOk => return Ok(()),
                _ => {}
            }
        }
    }

    /// Apply `--option NAME=VALUE` settings, then send `isready` and
    /// await `readyok` (spec §4.2 "Configuring"). Invalid specs —
    /// malformed `NAME=VALUE` syntax, unknown names, out-of-range spins,
    /// bad combo values — are all EngineRecoverable (spec §7): logged,
    /// skipped, run continues.
    pub async fn configure(&mut self, user_options: &[String]) -> DriverResult<()> {
        for raw in user_options {
            let Some((name, value)) = raw.split_once('=') else {
                crate::error::Error::log_recoverable(
                    "option",
                    &format!("malformed option spec '{raw}', expected NAME=VALUE"),
                );
                continue;
            };
            match apply_user_option(name, value, &self.options) {
                Applied::SetOption { name, value: Some(value) } => {
                    self.send(&format!("setoption name {name} value {value}\n")).await?;
                }
                Applied::SetOption { name, value: None } => {
                    self.send(&format!("setoption name {name}\n")).await?;
                }
                Applied::Recoverable(message) => crate::error::Error::log_recoverable("option", &message),
            }
        }

        self.send("isready\n").await?;
        timeout(HANDSHAKE_TIMEOUT, self.await_readyok())
            .await
            .map_err(|_| DriverError::HandshakeTimeout(HANDSHAKE_TIMEOUT))??;
        Ok(())
    }

    async fn await_readyok(&mut self) -> DriverResult<()> {
        loop {
            let line = self.next_line().await?;
            if line == "readyok" {
                return Ok(());
            }
        }
    }

    /// Run one complete analysis cycle: `position fen <fen>` then
    /// `go depth <d>` / `go movetime <ms>`, harvesting the running best
    /// score/PV until `bestmove` (spec §4.2 "Analysis cycle").
    pub async fn analyze(&mut self, fen: &str, mode: GoMode) -> DriverResult<EvaluationInfo> {
        self.send(&format!("position fen {fen}\n")).await?;
        let go_command = match mode {
            GoMode::Depth(depth) => format!("go depth {depth}\n"),
            GoMode::MoveTimeMs(ms) => format!("go movetime {ms}\n"),
        };
        self.send(&go_command).await?;

        let mut score: Option<Score> = None;
        let mut mate_locked = false;
        let mut pv: Vec<String> = Vec::new();

        loop {
            let line = self.next_line().await?;
            match parse_one(&line) {
                UciMessage::Info(attrs) => {
                    let mut saw_bound = false;
                    let mut line_pv: Option<Vec<String>> = None;
                    let mut line_score: Option<Score> = None;

                    for attr in attrs {
                        match attr {
                            vampirc_uci::UciInfoAttribute::Pv(moves) => {
                                line_pv = Some(moves.iter().map(|m| m.to_string()).collect());
                            }
                            vampirc_uci::UciInfoAttribute::Score(s) => {
                                if s.lower_bound == Some(true) || s.upper_bound == Some(true) {
                                    saw_bound = true;
                                } else if let Some(mate) = s.mate {
                                    line_score = Some(Score::Mate(mate as i32));
                                } else if let Some(cp) = s.cp {
                                    line_score = Some(Score::Cp(cp));
                                }
                            }
                            _ => {}
                        }
                    }

                    if saw_bound {
                        // Discard bound-only info lines entirely (spec §4.2).
                        continue;
                    }
                    if let Some(p) = line_pv {
                        pv = p;
                    }
                    match line_score {
                        Some(Score::Mate(m)) => {
                            score = Some(Score::Mate(m));
                            mate_locked = true;
                        }
                        Some(Score::Cp(cp)) if !mate_locked => {
                            score = Some(Score::Cp(cp));
                        }
                        _ => {}
                    }
                }
                UciMessage::BestMove { best_move, .. } => {
                    let best = pv
                        .first()
                        .cloned()
                        .unwrap_or_else(|| best_move.to_string());
                    return Ok(EvaluationInfo { score, pv, best_move: best });
                }
                _ => {}
            }
        }
    }

    /// Read one line from the engine's stdout. When the stream ends
    /// before a `bestmove` was harvested, this is where the "child
    /// reaper" from spec §4.2 lives: a non-blocking `try_wait` names the
    /// exit code or signal so the fatal error is actionable instead of
    /// a bare "missing bestmove" (spec's design note prefers this
    /// explicit post-read check over process-global signal handling).
    async fn next_line(&mut self) -> DriverResult<String> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => match self.child.try_wait() {
                Ok(Some(status)) => {
                    warn!("engine process exited unexpectedly: {status}");
                    Err(DriverError::UnexpectedExit(describe_exit(status)))
                }
                _ => Err(DriverError::MissingBestMove),
            },
            Err(e) => Err(DriverError::Io(e)),
        }
    }

    async fn send(&mut self, command: &str) -> DriverResult<()> {
        debug!("gui> {}", command.trim_end());
        if let Err(e) = self.stdin.write_all(command.as_bytes()).await {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Err(DriverError::BrokenPipe);
            }
            return Err(DriverError::Io(e));
        }
        self.stdin.flush().await.map_err(DriverError::Io)
    }

    /// Shutdown escalation ladder (spec §4.2): `quit`, wait 2s; SIGTERM,
    /// wait 2s; SIGQUIT, wait 2s; SIGKILL, wait 2s; then give up.
    pub async fn shutdown(mut self) {
        if self.send("quit\n").await.is_ok() && Self::wait_briefly(&mut self.child).await {
            info!("engine exited cleanly after quit");
            return;
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            let pid = match self.child.id() {
                Some(id) => Pid::from_raw(id as i32),
                None => return,
            };

            for signal in [Signal::SIGTERM, Signal::SIGQUIT, Signal::SIGKILL] {
                let _ = signal::kill(pid, signal);
                if Self::wait_briefly(&mut self.child).await {
                    info!("engine exited after {signal}");
                    return;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.kill().await;
        }

        warn!("engine process did not exit after full shutdown escalation");
    }

    async fn wait_briefly(child: &mut Child) -> bool {
        matches!(timeout(SHUTDOWN_STEP, child.wait()).await, Ok(Ok(_)))
    }
}

/// Render a child's exit status naming the signal (if any) or exit code
/// (spec §4.2 "A child-reaping handler... converts it to a fatal error
/// with a message naming the signal (if any) and exit code").
fn describe_exit(status: std::process::ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("killed by signal {signal}");
        }
    }
    match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "exited with no status".to_string(),
    }
}
