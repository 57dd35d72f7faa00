//! Logging setup (ambient stack, spec §7): installs `env_logger` with
//! the timestamp format spec §7 requires for verbose stderr lines —
//! weekday, month, day, `HH:MM:SS.µs`, year — writing to stderr so
//! stdout stays reserved for the annotated PGN stream (spec §2 C7,
//! §6).
//!
//! Grounded on the teacher's `log`-facade-everywhere style in
//! `engine/*.rs`; this crate is a CLI rather than a Tauri app, so it
//! pairs `log` with `env_logger` at `main()` instead of
//! `tauri-plugin-log`, the standard substitution outside a GUI shell.

use std::io::Write;

use chrono::Local;
use log::LevelFilter;

pub fn init(verbose: bool) {
    let default_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    env_logger::Builder::new()
        .filter_level(default_level)
        .format(|buf, record| {
            let now = Local::now();
            writeln!(
                buf,
                "{} {}: {}",
                now.format("%a %b %d %H:%M:%S%.6f %Y"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}
