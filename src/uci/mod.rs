//! The UCI driver (C2): owns the single engine subprocess for a run and
//! speaks the handshake/configure/analyze/shutdown protocol against it.

mod options;
mod process;
mod types;

pub use options::apply_user_option;
pub use process::EngineDriver;
pub use types::{
    DriverError, DriverResult, EvaluationInfo, GoMode, OptionDescriptor, OptionKind, Score,
    HANDSHAKE_TIMEOUT, SHUTDOWN_STEP,
};
