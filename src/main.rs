//! The orchestrator (C7, spec §2, §6): parses arguments, spawns the
//! single engine subprocess for the whole run, iterates input files,
//! delegates each parsed game to the analyzer (C4), and concatenates
//! the emitter's (C6) output to standard output.
//!
//! Spec §5 is explicit that the analyzer is single-threaded and
//! synchronous at the game level, and that exactly one engine child
//! process exists for a run — so the driver is spawned once here and
//! threaded through every file and every game, never per-game.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use annotate::analyzer::Analyzer;
use annotate::config::{Cli, RunConfig};
use annotate::eco::EcoBook;
use annotate::emitter;
use annotate::error::Error;
use annotate::logging;
use annotate::pgn_input;
use annotate::uci::EngineDriver;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match RunConfig::try_from(cli) {
        Ok(config) => config,
        Err(Error::Usage(message)) => {
            eprintln!("error: {message}");
            eprintln!("try --help for usage");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RunConfig) -> Result<(), Error> {
    let mut driver = EngineDriver::spawn(&config.engine_program, &config.engine_args)
        .await
        .map_err(Error::EngineFatal)?;
    driver.configure(&config.user_options).await.map_err(Error::EngineFatal)?;

    let eco_book = match &config.eco_book {
        Some(path) => EcoBook::load(path),
        None => EcoBook::empty(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut result = Ok(());
    let mut game_number = 0u32;

    for path in &config.paths {
        match process_file(path, &mut driver, &config, &eco_book, &mut game_number, &mut out).await {
            Ok(()) => {}
            Err(e @ Error::Input(_)) => {
                log::error!("{e}");
                continue;
            }
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    driver.shutdown().await;
    result
}

async fn process_file(
    path: &Path,
    driver: &mut EngineDriver,
    config: &RunConfig,
    eco_book: &EcoBook,
    game_number: &mut u32,
    out: &mut impl Write,
) -> Result<(), Error> {
    let games = pgn_input::read_games(path)?;
    for game in &games {
        let mut analyzer = Analyzer::new(driver, eco_book, config.go_mode);
        let mut annotated = analyzer.analyze_game(game).await?;
        *game_number += 1;
        annotated.game_number = *game_number;
        let rendered = emitter::render(&annotated);
        write!(out, "{rendered}").map_err(Error::Io)?;
    }
    Ok(())
}
