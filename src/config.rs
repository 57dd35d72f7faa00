//! Command-line surface (spec §6, an external collaborator per spec
//! §1): a thin `clap` adapter that shapes raw arguments into the
//! `RunConfig` the orchestrator (C7) consumes. No business logic lives
//! here beyond validating the shape spec §6 describes.

use std::path::PathBuf;

use clap::Parser;

use crate::error::Error;
use crate::uci::GoMode;

#[derive(Parser, Debug)]
#[command(name = "annotate", version, about = "Annotate PGN games by driving a UCI engine")]
pub struct Cli {
    /// One or more PGN input paths.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Engine program and arguments. First token is the program path;
    /// later occurrences append further arguments to the same engine
    /// invocation (spec §6).
    #[arg(short = 'e', long = "engine", required = true, num_args = 1)]
    pub engine: Vec<String>,

    /// Per half-move thinking time in seconds. Mutually exclusive with
    /// `--depth`.
    #[arg(short = 's', long = "seconds")]
    pub seconds: Option<u64>,

    /// Per half-move search depth. Mutually exclusive with `--seconds`.
    #[arg(short = 'd', long = "depth")]
    pub depth: Option<u32>,

    /// Hash table size in megabytes, passed to the engine as `Hash=<N>`.
    #[arg(short = 'm', long = "memory")]
    pub memory: Option<u64>,

    /// Engine option in `NAME=VALUE` form; may be repeated. Kept as raw
    /// strings here — a malformed spec (no `=`) is an EngineRecoverable
    /// error (spec §7), not a usage error, so validation happens once
    /// the engine is up and can log-and-skip it instead of aborting the
    /// whole run before anything is spawned.
    #[arg(short = 'o', long = "option")]
    pub option: Vec<String>,

    /// A book file for the ECO lookup adapter (spec §4.5): tab-
    /// separated `fen`, `eco`, `variation`, `alt_eco` columns.
    #[arg(long = "eco-book")]
    pub eco_book: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// The orchestrator's resolved run configuration (spec §6).
pub struct RunConfig {
    pub paths: Vec<PathBuf>,
    pub engine_program: String,
    pub engine_args: Vec<String>,
    pub go_mode: GoMode,
    /// Raw `NAME=VALUE` option specs, `Hash=<memory>` prepended if
    /// `--memory` was given. Split and validated once the engine's
    /// option descriptors are known (spec §4.2 "Configuring"); a
    /// malformed spec here is logged and skipped, not a usage error.
    pub user_options: Vec<String>,
    pub eco_book: Option<PathBuf>,
    pub verbose: bool,
}

impl TryFrom<Cli> for RunConfig {
    type Error = Error;

    fn try_from(cli: Cli) -> Result<Self, Error> {
        if cli.seconds.is_some() && cli.depth.is_some() {
            return Err(Error::Usage(
                "--seconds and --depth are mutually exclusive".to_string(),
            ));
        }

        let go_mode = match (cli.seconds, cli.depth) {
            (_, Some(depth)) => GoMode::Depth(depth),
            (Some(seconds), None) => GoMode::MoveTimeMs(seconds * 1000),
            (None, None) => GoMode::MoveTimeMs(30 * 1000),
        };

        let mut engine = cli.engine.into_iter();
        let engine_program = engine
            .next()
            .ok_or_else(|| Error::Usage("--engine requires at least a program path".to_string()))?;
        let engine_args: Vec<String> = engine.collect();

        let mut user_options = Vec::new();
        if let Some(memory) = cli.memory {
            user_options.push(format!("Hash={memory}"));
        }
        user_options.extend(cli.option);

        Ok(Self {
            paths: cli.paths,
            engine_program,
            engine_args,
            go_mode,
            user_options,
            eco_book: cli.eco_book,
            verbose: cli.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_seconds_and_depth_together() {
        let cli = Cli {
            paths: vec![PathBuf::from("game.pgn")],
            engine: vec!["stockfish".to_string()],
            seconds: Some(1),
            depth: Some(10),
            memory: None,
            option: vec![],
            eco_book: None,
            verbose: false,
        };
        assert!(RunConfig::try_from(cli).is_err());
    }

    #[test]
    fn memory_becomes_hash_option() {
        let cli = Cli {
            paths: vec![PathBuf::from("game.pgn")],
            engine: vec!["stockfish".to_string(), "--uci".to_string()],
            seconds: None,
            depth: None,
            memory: Some(256),
            option: vec!["Skill Level=10".to_string()],
            eco_book: None,
            verbose: false,
        };
        let config = RunConfig::try_from(cli).unwrap();
        assert_eq!(config.engine_program, "stockfish");
        assert_eq!(config.engine_args, vec!["--uci".to_string()]);
        assert_eq!(config.user_options[0], "Hash=256");
        assert_eq!(config.user_options[1], "Skill Level=10");
    }

    #[test]
    fn default_go_mode_is_thirty_seconds() {
        let cli = Cli {
            paths: vec![PathBuf::from("game.pgn")],
            engine: vec!["stockfish".to_string()],
            seconds: None,
            depth: None,
            memory: None,
            option: vec![],
            eco_book: None,
            verbose: false,
        };
        let config = RunConfig::try_from(cli).unwrap();
        assert!(matches!(config.go_mode, GoMode::MoveTimeMs(30_000)));
    }
}
