//! The position model (C1): a thin wrapper over `shakmaty::Chess` that
//! gives the rest of the crate one place to apply SAN or UCI move
//! tokens and read back the FEN/SAN/flags the analyzer and emitter need.
//!
//! Grounded on the FEN/UciMove/SanPlus idiom in the teacher's
//! `chess::analysis::GameAnalysisService::analyze_game` and
//! `engine::communication`: parse with `Fen::from_ascii`, build the
//! position with `into_position(CastlingMode::Standard)`, play moves
//! with `play_unchecked`, and take `SanPlus` for the move's own notation.

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position, Role};

#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("invalid FEN: {0}")]
    Fen(#[from] shakmaty::fen::ParseFenError),

    #[error("FEN describes an illegal position: {0}")]
    IllegalSetup(String),

    #[error("illegal or unparsable move '{0}'")]
    IllegalMove(String),
}

/// One applied half-move: its SAN rendering plus the flags the
/// annotator and emitter need without re-deriving them (spec §3
/// "Move record").
#[derive(Debug, Clone)]
pub struct MoveRecord {
    pub san: String,
    pub uci: String,
    pub is_capture: bool,
    pub is_check: bool,
    pub is_mate: bool,
}

/// A board position plus the legality/terminal-state queries the rest
/// of the crate needs. Cheap to clone: `shakmaty::Chess` is a small
/// value type.
#[derive(Debug, Clone)]
pub struct GamePosition {
    chess: Chess,
}

impl GamePosition {
    pub fn new_initial() -> Self {
        Self { chess: Chess::new() }
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let fen = Fen::from_ascii(fen.as_bytes())?;
        let chess: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| PositionError::IllegalSetup(e.to_string()))?;
        Ok(Self { chess })
    }

    /// Apply one move given as either SAN (`"Nf3"`) or UCI/LAN
    /// (`"g1f3"`) notation, returning the record of what happened.
    /// Tries SAN first since that's what PGN move text carries; falls
    /// back to UCI since the engine's PV and `bestmove` are LAN tokens
    /// (spec §4.3 "Accepting both notations").
    pub fn apply_move(&mut self, token: &str) -> Result<MoveRecord, PositionError> {
        let mv = self
            .resolve_san(token)
            .or_else(|| self.resolve_uci(token))
            .ok_or_else(|| PositionError::IllegalMove(token.to_string()))?;

        let is_capture = mv.is_capture();
        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        let sanplus = SanPlus::from_move_and_play_unchecked(&mut self.chess, &mv);

        Ok(MoveRecord {
            san: sanplus.to_string(),
            uci,
            is_capture,
            is_check: self.chess.is_check(),
            is_mate: self.chess.is_checkmate(),
        })
    }

    fn resolve_san(&self, token: &str) -> Option<Move> {
        let san: San = token.parse().ok()?;
        san.to_move(&self.chess).ok()
    }

    fn resolve_uci(&self, token: &str) -> Option<Move> {
        let uci = UciMove::from_ascii(token.as_bytes()).ok()?;
        uci.to_move(&self.chess).ok()
    }

    pub fn to_fen(&self) -> String {
        Fen::from_position(self.chess.clone(), EnPassantMode::Legal).to_string()
    }

    /// FEN with the halfmove clock and fullmove number stripped (spec
    /// §3 "Repetition table", §8 "ECO-significant FEN"). Used both to
    /// key the repetition table and as the ECO book lookup fingerprint.
    pub fn eco_fen(&self) -> String {
        self.to_fen().split(' ').take(4).collect::<Vec<_>>().join(" ")
    }

    pub fn side_to_move(&self) -> shakmaty::Color {
        self.chess.turn()
    }

    pub fn in_check(&self) -> bool {
        self.chess.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.chess.is_checkmate()
    }

    pub fn is_stalemate(&self) -> bool {
        self.chess.is_stalemate()
    }

    /// Number of legal replies in the current position; `1` marks a
    /// forced move (spec §3 "Forced move").
    pub fn legal_move_count(&self) -> usize {
        self.chess.legal_moves().len()
    }

    /// All legal moves in the current position (spec §4.1 `legal-moves`).
    pub fn legal_moves(&self) -> Vec<Move> {
        self.chess.legal_moves().to_vec()
    }

    /// The piece on `square`, if any (spec §4.1 `piece-at(rank, file)`).
    pub fn piece_at(&self, square: shakmaty::Square) -> Option<(shakmaty::Color, Role)> {
        self.chess.board().piece_at(square).map(|piece| (piece.color, piece.role))
    }

    pub fn fullmove_number(&self) -> u32 {
        self.chess.fullmoves().get()
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.chess.halfmove_clock()
    }

    /// True when neither side has enough material to deliver
    /// checkmate by any sequence of legal moves (spec §4.5
    /// "Insufficient material").
    pub fn is_insufficient_material(&self) -> bool {
        self.insufficient_by_topology()
    }

    fn insufficient_by_topology(&self) -> bool {
        let board = self.chess.board();
        let material = board.material();
        let white = &material.white;
        let black = &material.black;

        let no_heavy = white.queen == 0
            && white.rook == 0
            && white.pawn == 0
            && black.queen == 0
            && black.rook == 0
            && black.pawn == 0;
        let no_knight_and_bishop = !(white.knight >= 1 && white.bishop >= 1)
            && !(black.knight >= 1 && black.bishop >= 1);
        let single_knight_each = white.knight <= 1 && black.knight <= 1;
        let single_bishop_each = white.bishop <= 1 && black.bishop <= 1;
        let bishop_colors_ok = white.bishop == 0
            || black.bishop == 0
            || self.same_colored_bishops(shakmaty::Color::White, shakmaty::Color::Black);

        no_heavy
            && no_knight_and_bishop
            && single_knight_each
            && single_bishop_each
            && bishop_colors_ok
    }

    fn same_colored_bishops(&self, a: shakmaty::Color, b: shakmaty::Color) -> bool {
        let board = self.chess.board();
        let find_bishop_square =
            |color: shakmaty::Color| (board.by_color(color) & board.by_role(Role::Bishop)).into_iter().next();
        match (find_bishop_square(a), find_bishop_square(b)) {
            (Some(sq_a), Some(sq_b)) => sq_a.is_light() == sq_b.is_light(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_san_and_uci_tokens() {
        let mut pos = GamePosition::new_initial();
        let record = pos.apply_move("e4").unwrap();
        assert_eq!(record.san, "e4");
        assert!(!record.is_capture);

        let record = pos.apply_move("e7e5").unwrap();
        assert_eq!(record.san, "e5");
    }

    #[test]
    fn detects_checkmate() {
        let mut pos = GamePosition::new_initial();
        for m in ["f3", "e5", "g4", "Qh4#"] {
            pos.apply_move(m).unwrap();
        }
        assert!(pos.is_checkmate());
    }

    #[test]
    fn legal_moves_lists_all_twenty_opening_moves() {
        let pos = GamePosition::new_initial();
        assert_eq!(pos.legal_moves().len(), 20);
        assert_eq!(pos.legal_moves().len(), pos.legal_move_count());
    }

    #[test]
    fn piece_at_reports_the_initial_back_rank() {
        let pos = GamePosition::new_initial();
        assert_eq!(
            pos.piece_at(shakmaty::Square::E1),
            Some((shakmaty::Color::White, Role::King))
        );
        assert_eq!(
            pos.piece_at(shakmaty::Square::E8),
            Some((shakmaty::Color::Black, Role::King))
        );
        assert_eq!(pos.piece_at(shakmaty::Square::E4), None);
    }

    #[test]
    fn rejects_illegal_move() {
        let mut pos = GamePosition::new_initial();
        assert!(pos.apply_move("e5").is_err());
    }

    #[test]
    fn king_vs_king_is_insufficient() {
        let pos = GamePosition::from_fen("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
        assert!(pos.is_insufficient_material());
    }

    #[test]
    fn eco_fen_strips_clocks() {
        let pos = GamePosition::new_initial();
        assert_eq!(
            pos.eco_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
    }

    #[test]
    fn rook_vs_king_is_sufficient() {
        let pos = GamePosition::from_fen("8/8/4k3/8/8/4K3/8/R7 w - - 0 1").unwrap();
        assert!(!pos.is_insufficient_material());
    }

    #[test]
    fn knight_vs_knight_is_insufficient() {
        let pos = GamePosition::from_fen("8/4n3/4k3/8/8/4K3/4N3/8 w - - 0 1").unwrap();
        assert!(pos.is_insufficient_material());
    }

    #[test]
    fn bishop_vs_knight_is_insufficient() {
        let pos = GamePosition::from_fen("8/4n3/4k3/8/8/4K3/4B3/8 w - - 0 1").unwrap();
        assert!(pos.is_insufficient_material());
    }

    #[test]
    fn opposite_colored_bishops_are_sufficient() {
        let pos = GamePosition::from_fen("k1b5/8/8/8/7B/8/8/K7 w - - 0 1").unwrap();
        assert!(!pos.is_insufficient_material());
    }

    #[test]
    fn knight_and_bishop_same_side_is_sufficient() {
        let pos = GamePosition::from_fen("k7/8/8/8/8/3NB3/8/K7 w - - 0 1").unwrap();
        assert!(!pos.is_insufficient_material());
    }
}
