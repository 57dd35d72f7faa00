//! Top-level error taxonomy for the annotator.
//!
//! Mirrors the teacher's `engine::types::EngineError` shape (one
//! `thiserror` enum, `From` conversions for the library errors we wrap)
//! but adds the fatal/recoverable split the orchestrator needs to decide
//! whether to abort a game, abort a file, or keep going.

use crate::position::PositionError;
use crate::uci::DriverError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while annotating a batch of PGN files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad command line; printed with a "try --help" hint, exits before
    /// any engine is spawned.
    #[error("{0}")]
    Usage(String),

    /// Input file missing or PGN parse failure. The current file is
    /// aborted; the orchestrator moves on to the next one.
    #[error("input error: {0}")]
    Input(String),

    /// Handshake timeout, unexpected engine exit, broken pipe, missing
    /// `bestmove`. Triggers shutdown escalation and aborts the run.
    #[error("engine error: {0}")]
    EngineFatal(#[from] DriverError),

    /// The game's own move list contains an illegal move, or its `FEN`
    /// tag doesn't describe a legal starting position. State is
    /// unrecoverable for that game, so this is treated like EngineFatal.
    #[error("position error: {0}")]
    Move(#[from] PositionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// EngineRecoverable errors (invalid option spec, unknown option
    /// name, out-of-range spin, bad combo value) are not represented as
    /// `Error` variants at all: they are logged at the call site via
    /// `log::error!` and swallowed, per spec §7. This helper exists so
    /// call sites have one place to do that consistently.
    pub fn log_recoverable(context: &str, message: &str) {
        log::error!("{context}: {message}");
    }
}
