//! ECO lookup adapter (C5): maps a position's ECO-significant
//! fingerprint to an opening record.
//!
//! Spec §4.5 is explicit that a full opening book is not part of the
//! core — "implementers may plug in any sorted-table or hash-table
//! lookup over a supplied book file." This mirrors the teacher's
//! `opening.rs`, which loads ECO records from bundled tab-separated
//! files at startup (`csv::ReaderBuilder` with a `\t` delimiter) and
//! indexes them by a normalized position key instead of the opening's
//! move order. Here the book is an external file supplied at runtime
//! (`--eco-book`, see `config.rs`) rather than `include_bytes!`-embedded
//! data, and the index key is the ECO-significant FEN (spec §3) instead
//! of a `shakmaty::Setup` equality check, since that's the fingerprint
//! the analyzer already computes for the repetition table.

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};

/// One opening-book hit: the ECO code, the variation name, and an
/// optional alternate code (Scid's secondary ECO classification).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcoRecord {
    pub code: String,
    pub variation: String,
    pub alt_code: Option<String>,
}

/// A loaded opening book, keyed by ECO-significant FEN (spec §3, §8).
///
/// Book file format: tab-separated, one header line, columns
/// `fen`, `eco`, `variation`, and an optional `alt_eco`. Unparsable
/// lines are logged and skipped rather than aborting the run — a bad
/// book is a quality-of-annotation problem, not a fatal one.
#[derive(Debug, Clone, Default)]
pub struct EcoBook {
    by_fen: HashMap<String, EcoRecord>,
}

impl EcoBook {
    pub fn empty() -> Self {
        Self { by_fen: HashMap::new() }
    }

    /// Load a book from `path`. Returns an empty book (with a warning)
    /// rather than failing the whole run if the file can't be read —
    /// ECO stamping is an enrichment, not load-bearing for annotation.
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!("could not read ECO book {}: {e}", path.display());
                return Self::empty();
            }
        };
        Self::from_tsv(&data)
    }

    fn from_tsv(data: &[u8]) -> Self {
        let mut by_fen = HashMap::new();
        let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(data);
        for result in reader.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!("skipping malformed ECO book row: {e}");
                    continue;
                }
            };
            let (Some(fen), Some(eco), Some(variation)) =
                (record.get(0), record.get(1), record.get(2))
            else {
                continue;
            };
            let alt_code = record.get(3).filter(|s| !s.is_empty()).map(str::to_string);
            by_fen.insert(
                fen.to_string(),
                EcoRecord { code: eco.to_string(), variation: variation.to_string(), alt_code },
            );
        }
        info!("loaded {} ECO book entries", by_fen.len());
        Self { by_fen }
    }

    /// Look up a position by its ECO-significant FEN (spec §4.4 step 8).
    pub fn lookup(&self, eco_fen: &str) -> Option<&EcoRecord> {
        self.by_fen.get(eco_fen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tsv_rows() {
        let tsv = b"fen\teco\tvariation\talt_eco\nrnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -\tB00\tKing's Pawn\t\n";
        let book = EcoBook::from_tsv(tsv);
        let hit = book
            .lookup("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -")
            .unwrap();
        assert_eq!(hit.code, "B00");
        assert_eq!(hit.variation, "King's Pawn");
        assert!(hit.alt_code.is_none());
    }

    #[test]
    fn missing_file_yields_empty_book() {
        let book = EcoBook::load(Path::new("/nonexistent/path/book.tsv"));
        assert!(book.lookup("anything").is_none());
    }
}
