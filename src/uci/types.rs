//! Shared types for the UCI driver (C2): errors, timeouts, option
//! descriptors and the evaluation record harvested from a `go` cycle.
//!
//! Modeled on `engine::types` in the teacher: a `thiserror` enum for
//! fatal/IO failures, plain structs for everything else.

use std::time::Duration;

/// Wall-clock deadline for the `uci` -> `uciok` and `isready` -> `readyok`
/// handshake phases (spec §4.2).
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay the shutdown escalation ladder sleeps between each signal
/// (spec §4.2).
pub const SHUTDOWN_STEP: Duration = Duration::from_secs(2);

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Fatal engine-driver errors (spec §7's `EngineFatal`). Any of these
/// aborts the current game/run and triggers shutdown escalation.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("I/O error communicating with engine: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine did not complete handshake within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("engine pipe closed unexpectedly")]
    BrokenPipe,

    #[error("engine process exited unexpectedly: {0}")]
    UnexpectedExit(String),

    #[error("engine never sent bestmove before its output stream ended")]
    MissingBestMove,

    #[error("failed to spawn engine process: {0}")]
    Spawn(std::io::Error),

    #[error("no stdin handle for engine process")]
    NoStdin,

    #[error("no stdout handle for engine process")]
    NoStdout,
}

/// One parsed UCI `option` descriptor (spec §3 "Engine-option descriptor").
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    pub name: String,
    pub kind: OptionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    Check { default: Option<bool> },
    Spin { default: Option<i64>, min: Option<i64>, max: Option<i64> },
    Combo { default: Option<String>, allowed: Vec<String> },
    Button,
    String { default: Option<String> },
}

/// How a half-move's analysis cycle should be bounded (spec §6: `-s`/`-d`
/// are mutually exclusive).
#[derive(Debug, Clone, Copy)]
pub enum GoMode {
    Depth(u32),
    MoveTimeMs(u64),
}

/// Centipawn-or-mate score, signed from the engine's side-to-move
/// perspective at the moment it was reported (spec §3 "Evaluation info").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    Mate(i32),
}

impl Score {
    /// `mate_in_one = 2000` anchor from spec §4.4: a mate-in-*k* score
    /// converts to cp as `round(mate_in_one / k)`, preserving sign.
    const MATE_IN_ONE_CP: f64 = 2000.0;

    pub fn to_cp(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(0) => 0,
            Score::Mate(k) => {
                let magnitude = (Self::MATE_IN_ONE_CP / k.unsigned_abs() as f64).round() as i32;
                if k < 0 { -magnitude } else { magnitude }
            }
        }
    }

    pub fn negate(self) -> Score {
        match self {
            Score::Cp(cp) => Score::Cp(-cp),
            Score::Mate(k) => Score::Mate(-k),
        }
    }
}

/// The result of one complete `go` cycle: the running-best score/PV plus
/// the authoritative best move (spec §4.2 "Analysis cycle").
#[derive(Debug, Clone)]
pub struct EvaluationInfo {
    pub score: Option<Score>,
    /// Principal variation as LAN (UCI) tokens, latest `info` line wins.
    pub pv: Vec<String>,
    /// First token of the last complete PV if one was seen, else the
    /// `bestmove` token itself.
    pub best_move: String,
}
