//! Terminal-state detector (C3, spec §4.3): classifies a position as
//! ongoing or one of {white-mates, black-mates, stalemate,
//! draw-by-repetition, draw-by-50-move-rule, draw-by-insufficient-
//! material}, checked in that order after a move has been applied.

use std::collections::HashMap;

use shakmaty::Color;

use crate::position::GamePosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    WhiteMates,
    BlackMates,
    Stalemate,
    DrawByRepetition,
    DrawByFiftyMoveRule,
    DrawByInsufficientMaterial,
}

impl TerminalState {
    /// The PGN result token this terminal state overrides the `Result`
    /// tag with (spec §4.6 "Terminal-state override").
    pub fn result_tag(self) -> &'static str {
        match self {
            TerminalState::WhiteMates => "1-0",
            TerminalState::BlackMates => "0-1",
            _ => "1/2-1/2",
        }
    }

    /// Human-readable reason appended as the final comment (spec §4.6).
    pub fn reason(self) -> &'static str {
        match self {
            TerminalState::WhiteMates => "White mates",
            TerminalState::BlackMates => "Black mates",
            TerminalState::Stalemate => "Stalemate",
            TerminalState::DrawByRepetition => "Draw by 3-fold repetition",
            TerminalState::DrawByFiftyMoveRule => "Draw by 50-move rule",
            TerminalState::DrawByInsufficientMaterial => "Draw by insufficient material",
        }
    }
}

/// One table per game (spec §3 "Repetition table"), keyed by
/// ECO-significant FEN, dropped when the game completes.
pub struct RepetitionTable {
    counts: HashMap<String, u32>,
}

impl RepetitionTable {
    /// Initialized with the starting position at count 1.
    pub fn new(initial: &GamePosition) -> Self {
        let mut counts = HashMap::new();
        counts.insert(initial.eco_fen(), 1);
        Self { counts }
    }

    /// Increment the count for `position` and return the new total.
    fn record(&mut self, position: &GamePosition) -> u32 {
        let count = self.counts.entry(position.eco_fen()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Classify `position` (which must already reflect the move just
/// applied) as ongoing (`None`) or terminal, updating `repetitions`
/// along the way. Order matches spec §4.3 exactly.
pub fn detect(position: &GamePosition, repetitions: &mut RepetitionTable) -> Option<TerminalState> {
    if position.legal_move_count() == 0 {
        return Some(if position.in_check() {
            match position.side_to_move() {
                Color::White => TerminalState::BlackMates,
                Color::Black => TerminalState::WhiteMates,
            }
        } else {
            TerminalState::Stalemate
        });
    }

    if repetitions.record(position) >= 3 {
        return Some(TerminalState::DrawByRepetition);
    }

    if position.halfmove_clock() >= 100 {
        return Some(TerminalState::DrawByFiftyMoveRule);
    }

    if position.is_insufficient_material() {
        return Some(TerminalState::DrawByInsufficientMaterial);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fools_mate_is_black_mates() {
        let mut pos = GamePosition::new_initial();
        let mut reps = RepetitionTable::new(&pos);
        for m in ["f3", "e5", "g4", "Qh4#"] {
            pos.apply_move(m).unwrap();
        }
        assert_eq!(detect(&pos, &mut reps), Some(TerminalState::BlackMates));
    }

    #[test]
    fn stalemate_detected() {
        // Classic king+pawn stalemate: Black to move, no legal replies.
        let mut pos = GamePosition::from_fen("k7/P7/1K6/8/8/8/8/8 b - - 0 1").unwrap();
        let mut reps = RepetitionTable::new(&pos);
        assert_eq!(detect(&pos, &mut reps), Some(TerminalState::Stalemate));
    }

    #[test]
    fn threefold_repetition_detected() {
        let mut pos = GamePosition::new_initial();
        let mut reps = RepetitionTable::new(&pos);
        let shuffle = ["Nf3", "Nf6", "Ng1", "Ng8"];
        let mut last = None;
        for _ in 0..2 {
            for m in shuffle {
                pos.apply_move(m).unwrap();
                last = detect(&pos, &mut reps);
            }
        }
        assert_eq!(last, Some(TerminalState::DrawByRepetition));
    }

    #[test]
    fn fifty_move_rule_detected() {
        let pos = GamePosition::from_fen("k7/8/8/8/8/8/8/7K w - - 100 80").unwrap();
        let mut reps = RepetitionTable::new(&pos);
        assert_eq!(detect(&pos, &mut reps), Some(TerminalState::DrawByFiftyMoveRule));
    }
}
