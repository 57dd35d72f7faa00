//! PGN input (opaque collaborator, spec §1): reads a file into a
//! sequence of parsed games. The tokenizer itself — matching tag pairs,
//! move text and comments — is delegated entirely to `pgn_reader`; this
//! module only shapes its callback stream into the plain
//! `tags`/`sans` pair the analyzer (C4) consumes.

use std::fs::File;
use std::path::Path;

use pgn_reader::{BufferedReader, RawHeader, SanPlus, Skip, Visitor};

use crate::error::Error;

/// One game as delivered by the PGN reader: original tag pairs in
/// file order, and the main line's moves in SAN.
#[derive(Debug, Clone, Default)]
pub struct ParsedGame {
    pub tags: Vec<(String, String)>,
    pub sans: Vec<String>,
}

impl ParsedGame {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct GameVisitor {
    tags: Vec<(String, String)>,
    sans: Vec<String>,
    in_variation: u32,
}

impl Visitor for GameVisitor {
    type Result = ParsedGame;

    fn begin_game(&mut self) {
        self.tags.clear();
        self.sans.clear();
        self.in_variation = 0;
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        let key = String::from_utf8_lossy(key).into_owned();
        let value = value.decode_utf8().map(|v| v.into_owned()).unwrap_or_default();
        self.tags.push((key, value));
    }

    fn end_headers(&mut self) -> Skip {
        Skip(false)
    }

    fn san(&mut self, san_plus: SanPlus) {
        if self.in_variation == 0 {
            self.sans.push(san_plus.to_string());
        }
    }

    fn begin_variation(&mut self) -> Skip {
        // Only the main line is analyzed (spec §2: one half-move per
        // ply of the recorded game); sub-variations are skipped.
        self.in_variation += 1;
        Skip(true)
    }

    fn end_variation(&mut self) {
        self.in_variation = self.in_variation.saturating_sub(1);
    }

    fn end_game(&mut self) -> Self::Result {
        ParsedGame { tags: std::mem::take(&mut self.tags), sans: std::mem::take(&mut self.sans) }
    }
}

/// Read every game out of the PGN file at `path`.
pub fn read_games(path: &Path) -> Result<Vec<ParsedGame>, Error> {
    let file = File::open(path)
        .map_err(|e| Error::Input(format!("{}: {e}", path.display())))?;
    let mut reader = BufferedReader::new(file);
    let mut visitor = GameVisitor::default();
    let mut games = Vec::new();
    loop {
        match reader.read_game(&mut visitor) {
            Ok(Some(game)) => games.push(game),
            Ok(None) => break,
            Err(e) => return Err(Error::Input(format!("{}: {e}", path.display()))),
        }
    }
    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    struct TempFile {
        path: std::path::PathBuf,
    }

    impl TempFile {
        fn new(contents: &str) -> Self {
            let mut path = std::env::temp_dir();
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            path.push(format!("annotate-test-{}-{n}.pgn", std::process::id()));
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(contents.as_bytes()).unwrap();
            Self { path }
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    #[test]
    fn reads_tags_and_mainline_sans() {
        let pgn = "[Event \"Test\"]\n[White \"A\"]\n[Black \"B\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 (2. f4 exf4) Nc6 3. Bb5 1-0\n";
        let file = TempFile::new(pgn);
        let games = read_games(&file.path).unwrap();
        assert_eq!(games.len(), 1);
        let game = &games[0];
        assert_eq!(game.tag("Event"), Some("Test"));
        assert_eq!(game.sans, vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
    }
}
