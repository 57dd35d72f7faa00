//! The analyzer (C4, spec §4.4): drives the UCI engine and the position
//! model half-move by half-move, comparing each played move against the
//! engine's preferred line and building the per-move and per-side
//! records the emitter (C6) renders.

use shakmaty::Color;

use crate::eco::{EcoBook, EcoRecord};
use crate::error::Error;
use crate::pgn_input::ParsedGame;
use crate::position::GamePosition;
use crate::terminal::{self, RepetitionTable, TerminalState};
use crate::uci::{EngineDriver, EvaluationInfo, GoMode, Score};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Ok,
    Error,
    Blunder,
}

/// Per-move annotation (spec §3). `loss`/`classification`/`played_score`
/// are filled in one half-move later than the rest, once the engine has
/// evaluated the position the played move led to (see module docs on
/// `Analyzer::analyze_game`); they stay at their "undefined" defaults
/// for the game's final half-move, which has no following evaluation.
#[derive(Debug, Clone)]
pub struct MoveAnnotation {
    pub ply: usize,
    pub color: Color,
    /// Fullmove number of the position this move was played from
    /// (honors a non-standard starting fullmove from a `[FEN]` tag).
    pub fullmove: u32,
    pub played_san: String,
    pub best_san: Option<String>,
    pub deviates: bool,
    pub pv: Option<Vec<String>>,
    pub best_score: Option<Score>,
    pub played_score: Option<Score>,
    pub loss: Option<i32>,
    pub classification: Classification,
    /// Set only on the half-move that ended the game in a terminal
    /// state (spec §4.6 "Terminal-state override").
    pub terminal_reason: Option<&'static str>,
}

/// Per-side aggregate statistics (spec §3 "Per-side evaluation").
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluation {
    pub moves: u32,
    pub forced_moves: u32,
    pub errors: u32,
    pub blunders: u32,
    pub total_loss: i64,
}

impl Evaluation {
    pub fn errors_per_move(&self) -> f64 {
        if self.moves == 0 { 0.0 } else { self.errors as f64 / self.moves as f64 }
    }

    pub fn blunders_per_move(&self) -> f64 {
        if self.moves == 0 { 0.0 } else { self.blunders as f64 / self.moves as f64 }
    }

    /// Average centipawn loss per *unforced* move (spec §3's explicit
    /// "derived" wording), since a forced reply has no loss to speak
    /// of — there was nothing else it could have played.
    pub fn loss_per_move(&self) -> f64 {
        let unforced = self.moves.saturating_sub(self.forced_moves);
        if unforced == 0 { 0.0 } else { self.total_loss as f64 / unforced as f64 }
    }
}

/// Finished analysis of one game: the original tags, the per-move
/// annotations, per-side totals, the ECO stamp (if any) and the
/// terminal state (if the analyzer detected one the PGN didn't record).
pub struct AnnotatedGame {
    pub tags: Vec<(String, String)>,
    pub moves: Vec<MoveAnnotation>,
    pub white: Evaluation,
    pub black: Evaluation,
    pub eco: Option<EcoRecord>,
    pub terminal: Option<TerminalState>,
    pub engine_name: Option<String>,
    /// This game's 1-indexed position in the run (spec §4.6 reserved
    /// `Game` tag); filled in by the orchestrator, which is the only
    /// component that knows a game's place across the whole batch.
    pub game_number: u32,
}

pub struct Analyzer<'a> {
    driver: &'a mut EngineDriver,
    eco_book: &'a EcoBook,
    mode: GoMode,
}

impl<'a> Analyzer<'a> {
    pub fn new(driver: &'a mut EngineDriver, eco_book: &'a EcoBook, mode: GoMode) -> Self {
        Self { driver, eco_book, mode }
    }

    /// Replay and annotate one parsed game (spec §4.4).
    ///
    /// Each half-move's `Info_i` is the engine's evaluation of the
    /// position *before* that move, from the mover's perspective. The
    /// move actually played is scored by the *next* half-move's
    /// `Info_{i+1}` (the engine's evaluation of the position the move
    /// led to, from the opponent's perspective, negated back) — so a
    /// move's loss and classification are only known once the
    /// following half-move's cycle has run. This loop keeps the
    /// previous iteration's annotation open and closes it out as soon
    /// as the next `Info` arrives; the final half-move of the game
    /// never gets a following evaluation, so it stays "ok, undefined".
    pub async fn analyze_game(&mut self, game: &ParsedGame) -> Result<AnnotatedGame, Error> {
        let mut position = match game.tag("FEN") {
            Some(fen) => GamePosition::from_fen(fen)?,
            None => GamePosition::new_initial(),
        };
        let mut repetitions = RepetitionTable::new(&position);
        let mut white = Evaluation::default();
        let mut black = Evaluation::default();
        let mut annotations: Vec<MoveAnnotation> = Vec::new();
        let mut pending_best_score: Option<Score> = None;
        let mut terminal: Option<TerminalState> = None;
        let mut eco: Option<EcoRecord> = None;

        for (ply, token) in game.sans.iter().enumerate() {
            let color = position.side_to_move();
            let fullmove = position.fullmove_number();
            let forced = position.legal_move_count() == 1;

            let fen = position.to_fen();
            let info = self.driver.analyze(&fen, self.mode).await?;

            if let Some(prev) = annotations.last_mut() {
                if let Some(best_score) = pending_best_score.take() {
                    close_out(prev, best_score, info.score, color_eval_mut(&mut white, &mut black, prev.color));
                }
            }
            pending_best_score = info.score;

            let before_move = position.clone();
            position.apply_move(token)?;

            let evaluation = color_eval_mut(&mut white, &mut black, color);
            evaluation.moves += 1;
            if forced {
                evaluation.forced_moves += 1;
            }

            if let Some(state) = terminal::detect(&position, &mut repetitions) {
                // Spec §4.4 step 6 ("otherwise") is skipped entirely for
                // the move that ends the game: no best-move/PV
                // comparison is attached, just the terminal reason.
                terminal = Some(state);
                annotations.push(MoveAnnotation {
                    ply,
                    color,
                    fullmove,
                    played_san: token.clone(),
                    best_san: None,
                    deviates: false,
                    pv: None,
                    best_score: info.score,
                    played_score: None,
                    loss: None,
                    classification: Classification::Ok,
                    terminal_reason: Some(state.reason()),
                });
                pending_best_score = None;
                break;
            }

            let (best_san, pv_numbered) = self.describe_best_line(&before_move, &info);
            let deviates = best_san.as_deref().is_some_and(|b| b != token.as_str());

            annotations.push(MoveAnnotation {
                ply,
                color,
                fullmove,
                played_san: token.clone(),
                best_san,
                deviates,
                pv: pv_numbered,
                best_score: info.score,
                played_score: None,
                loss: None,
                classification: Classification::Ok,
                terminal_reason: None,
            });

            let eco_fen = position.eco_fen();
            if let Some(hit) = self.eco_book.lookup(&eco_fen) {
                eco = Some(hit.clone());
            }
        }

        Ok(AnnotatedGame {
            tags: game.tags.clone(),
            moves: annotations,
            white,
            black,
            eco,
            terminal,
            engine_name: self.driver.engine_name.clone(),
            game_number: 0,
        })
    }

    /// Apply the engine's best move to a clone of `position` for its
    /// SAN, and convert the raw LAN principal variation into a
    /// move-numbered SAN line (spec §4.4 step 6). Returns
    /// `(best_san, numbered_pv)`.
    fn describe_best_line(
        &self,
        position: &GamePosition,
        info: &EvaluationInfo,
    ) -> (Option<String>, Option<Vec<String>>) {
        if info.best_move.is_empty() {
            return (None, None);
        }

        let mut best_clone = position.clone();
        let best_san = match best_clone.apply_move(&info.best_move) {
            Ok(record) => Some(record.san),
            Err(_) => {
                log::error!("engine bestmove '{}' is illegal in this position", info.best_move);
                None
            }
        };

        let pv_sans = convert_pv_to_san(position, &info.pv);
        let numbered = if pv_sans.is_empty() {
            None
        } else {
            Some(number_plies(position.fullmove_number(), position.side_to_move(), &pv_sans))
        };

        (best_san, numbered)
    }
}

/// Replay LAN tokens on a fresh clone of `position`, stopping at the
/// first illegal token (spec §4.4 step 6, §8 "PV conversion
/// idempotence"). Free function (no engine/book state needed) so it
/// can be exercised directly in tests.
pub fn convert_pv_to_san(position: &GamePosition, pv: &[String]) -> Vec<String> {
    let mut clone = position.clone();
    let mut out = Vec::with_capacity(pv.len());
    for token in pv {
        match clone.apply_move(token) {
            Ok(record) => out.push(record.san),
            Err(_) => break,
        }
    }
    out
}

fn color_eval_mut<'a>(white: &'a mut Evaluation, black: &'a mut Evaluation, color: Color) -> &'a mut Evaluation {
    match color {
        Color::White => white,
        Color::Black => black,
    }
}

/// Finalize the previous half-move's annotation now that the next
/// half-move's pre-move evaluation has arrived (spec §4.4 "Score
/// arithmetic").
fn close_out(
    prev: &mut MoveAnnotation,
    best_score: Score,
    next_score: Option<Score>,
    evaluation: &mut Evaluation,
) {
    let Some(next_score) = next_score else { return };
    let played_score = next_score.negate();
    prev.played_score = Some(played_score);

    let loss = best_score.to_cp() - played_score.to_cp();
    if loss < 0 {
        // The played move scored better than the engine's own
        // pre-move assessment (search noise / depth mismatch) — loss
        // is undefined, classify as ok, contribute nothing (spec §4.4).
        return;
    }

    prev.loss = Some(loss);
    evaluation.total_loss += loss as i64;
    prev.classification = if loss >= 100 {
        evaluation.blunders += 1;
        Classification::Blunder
    } else if loss >= 50 {
        evaluation.errors += 1;
        Classification::Error
    } else {
        Classification::Ok
    };
}

/// Prepend move numbers to a sequence of SAN tokens starting at
/// `start_fullmove`/`start_color` (spec §8 scenario 4): white plies get
/// `"N. san"`, a leading black ply gets `"N. ... san"`, everything else
/// is bare SAN.
pub fn number_plies(start_fullmove: u32, start_color: Color, sans: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(sans.len());
    let mut fullmove = start_fullmove;
    let mut color = start_color;
    for (idx, san) in sans.iter().enumerate() {
        if idx == 0 && color == Color::Black {
            out.push(format!("{fullmove}. ... {san}"));
        } else if color == Color::White {
            out.push(format!("{fullmove}. {san}"));
        } else {
            out.push(san.clone());
        }
        if color == Color::Black {
            fullmove += 1;
        }
        color = match color {
            Color::White => Color::Black,
            Color::Black => Color::White,
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_pv_from_white_to_move() {
        let sans: Vec<String> =
            ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"].into_iter().map(String::from).collect();
        let numbered = number_plies(1, Color::White, &sans);
        assert_eq!(
            numbered,
            vec!["1. e4", "e5", "2. Nf3", "Nc6", "3. Bb5", "a6"]
        );
    }

    #[test]
    fn numbers_pv_from_black_to_move() {
        let sans: Vec<String> = ["e5", "Nf3", "Nc6", "Bb5", "a6"].into_iter().map(String::from).collect();
        let numbered = number_plies(1, Color::Black, &sans);
        assert_eq!(
            numbered,
            vec!["1. ... e5", "2. Nf3", "Nc6", "3. Bb5", "a6"]
        );
    }

    #[test]
    fn converts_lan_pv_to_san_from_the_initial_position() {
        let position = GamePosition::new_initial();
        let pv: Vec<String> = ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6"]
            .into_iter()
            .map(String::from)
            .collect();
        let sans = convert_pv_to_san(&position, &pv);
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
    }

    #[test]
    fn converts_lan_pv_stopping_at_first_illegal_token() {
        let position = GamePosition::new_initial();
        let pv: Vec<String> = ["e2e4", "e7e5", "g1g3"].into_iter().map(String::from).collect();
        let sans = convert_pv_to_san(&position, &pv);
        assert_eq!(sans, vec!["e4", "e5"]);
    }
}
