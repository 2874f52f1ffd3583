//! Standard chess rules backed by `shakmaty`.

use std::collections::{BTreeMap, BTreeSet};

use shakmaty::fen::{Epd, Fen};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position as _, Role};
use tracing::debug;

use super::{render_placement, BoardStatus, LegalMove, Move, PositionSnapshot, RulesEngine, RulesError};
use crate::fraction::{Fraction, Mover, Side, KING_VALUE};

/// Halfmove clock at which the seventy-five move rule ends the game.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Occurrences of one position that end the game in a draw.
const FIVEFOLD_REPETITION: u32 = 5;

/// An immutable chess position.
///
/// Carries how often every position of the game so far has occurred,
/// counted from the position the game started in.
#[derive(Debug, Clone)]
pub struct ChessPosition {
    inner: Chess,
    seen: BTreeMap<String, u32>,
}

impl ChessPosition {
    fn new(inner: Chess) -> Self {
        let seen = BTreeMap::from([(repetition_key(&inner), 1)]);
        Self { inner, seen }
    }

    fn successor(&self, inner: Chess) -> Self {
        let mut seen = self.seen.clone();
        *seen.entry(repetition_key(&inner)).or_insert(0) += 1;
        Self { inner, seen }
    }

    /// How many times this position has occurred in the game.
    pub fn repetitions(&self) -> u32 {
        self.seen
            .get(&repetition_key(&self.inner))
            .copied()
            .unwrap_or(1)
    }

    /// Full FEN of the position.
    pub fn fen(&self) -> String {
        Fen::from_position(self.inner.clone(), EnPassantMode::Legal).to_string()
    }

    /// FEN piece-placement field.
    pub fn placement(&self) -> String {
        self.inner.board().to_string()
    }

    fn legal_notations(&self) -> BTreeSet<String> {
        self.inner
            .legal_moves()
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect()
    }
}

impl PartialEq for ChessPosition {
    fn eq(&self, other: &Self) -> bool {
        self.inner.board() == other.inner.board()
            && self.inner.turn() == other.inner.turn()
            && self.inner.castles().castling_rights() == other.inner.castles().castling_rights()
            && self.inner.halfmoves() == other.inner.halfmoves()
            && self.inner.fullmoves() == other.inner.fullmoves()
            && self.legal_notations() == other.legal_notations()
            && self.seen == other.seen
    }
}

/// Board, side to move, castling rights and en passant square: the
/// fields that make two positions the same for repetition.
fn repetition_key(pos: &Chess) -> String {
    Epd::from_position(pos.clone(), EnPassantMode::Legal).to_string()
}

fn parse_fen(fen: &str) -> Result<Chess, RulesError> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| RulesError::InvalidPosition(format!("unparseable FEN '{}': {}", fen, e)))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| RulesError::InvalidPosition(format!("illegal FEN '{}': {}", fen, e)))
}

/// Orthodox chess from the standard starting position or a custom FEN.
#[derive(Debug, Clone, Default)]
pub struct StandardChess {
    start: Option<Chess>,
}

impl StandardChess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start games from a custom position.
    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let start = parse_fen(fen)?;
        debug!(fen, "custom start position loaded");
        Ok(Self { start: Some(start) })
    }
}

fn color_of(side: Side) -> Color {
    match side {
        Side::White => Color::White,
        Side::Black => Color::Black,
    }
}

fn role_of(fraction: Fraction) -> Role {
    match fraction {
        Fraction::Pawn => Role::Pawn,
        Fraction::Knight => Role::Knight,
        Fraction::Bishop => Role::Bishop,
        Fraction::Rook => Role::Rook,
        Fraction::Queen => Role::Queen,
    }
}

fn mover_of(role: Role) -> Mover {
    match role {
        Role::Pawn => Mover::Fraction(Fraction::Pawn),
        Role::Knight => Mover::Fraction(Fraction::Knight),
        Role::Bishop => Mover::Fraction(Fraction::Bishop),
        Role::Rook => Mover::Fraction(Fraction::Rook),
        Role::Queen => Mover::Fraction(Fraction::Queen),
        Role::King => Mover::King,
    }
}

impl RulesEngine for StandardChess {
    type Position = ChessPosition;

    fn initial_position(&self) -> ChessPosition {
        ChessPosition::new(self.start.clone().unwrap_or_default())
    }

    fn restore(&self, fen: &str) -> Result<ChessPosition, RulesError> {
        parse_fen(fen).map(ChessPosition::new)
    }

    fn legal_moves(&self, position: &ChessPosition) -> Vec<LegalMove> {
        position
            .inner
            .legal_moves()
            .iter()
            .map(|m| LegalMove {
                mv: Move::new(m.to_uci(CastlingMode::Standard).to_string()),
                mover: mover_of(m.role()),
            })
            .collect()
    }

    fn apply(&self, position: &ChessPosition, mv: &Move) -> Result<ChessPosition, RulesError> {
        let legal = position.inner.legal_moves();
        let found = legal
            .iter()
            .find(|m| m.to_uci(CastlingMode::Standard).to_string() == mv.as_str())
            .ok_or_else(|| RulesError::InvalidMove { mv: mv.clone() })?;
        let inner = position
            .inner
            .clone()
            .play(found)
            .map_err(|_| RulesError::InvalidMove { mv: mv.clone() })?;
        Ok(position.successor(inner))
    }

    fn status(&self, position: &ChessPosition) -> BoardStatus {
        let pos = &position.inner;
        if pos.is_checkmate() {
            BoardStatus::Checkmate
        } else if pos.is_stalemate() {
            BoardStatus::Stalemate
        } else if pos.is_insufficient_material()
            || pos.halfmoves() >= SEVENTY_FIVE_MOVE_PLIES
            || position.repetitions() >= FIVEFOLD_REPETITION
        {
            BoardStatus::Draw
        } else if pos.is_check() {
            BoardStatus::Check
        } else {
            BoardStatus::InProgress
        }
    }

    fn side_to_move(&self, position: &ChessPosition) -> Side {
        match position.inner.turn() {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }

    fn active_fractions(&self, position: &ChessPosition, side: Side) -> BTreeSet<Fraction> {
        let board = position.inner.board();
        let own = board.by_color(color_of(side));
        Fraction::ALL
            .into_iter()
            .filter(|fraction| (own & board.by_role(role_of(*fraction))).any())
            .collect()
    }

    fn material(&self, position: &ChessPosition, side: Side) -> u32 {
        let board = position.inner.board();
        let own = board.by_color(color_of(side));
        let fractions: u32 = Fraction::ALL
            .into_iter()
            .map(|fraction| {
                let count = (own & board.by_role(role_of(fraction))).count() as u32;
                count * fraction.value()
            })
            .sum();
        let kings = (own & board.by_role(Role::King)).count() as u32;
        fractions + kings * KING_VALUE
    }

    fn snapshot(&self, position: &ChessPosition) -> PositionSnapshot {
        let placement = position.placement();
        let side_to_move = self.side_to_move(position);
        let turn = match side_to_move {
            Side::White => "w",
            Side::Black => "b",
        };
        PositionSnapshot {
            key: format!("{} {}", placement, turn),
            fen: position.fen(),
            board: render_placement(&placement),
            side_to_move,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(rules: &StandardChess, moves: &[&str]) -> ChessPosition {
        let mut position = rules.initial_position();
        for mv in moves {
            position = rules.apply(&position, &Move::from(*mv)).unwrap();
        }
        position
    }

    #[test]
    fn test_start_position_has_twenty_moves() {
        let rules = StandardChess::new();
        let start = rules.initial_position();
        let legal = rules.legal_moves(&start);
        assert_eq!(legal.len(), 20);

        let pawn_moves = legal
            .iter()
            .filter(|m| m.mover == Mover::Fraction(Fraction::Pawn))
            .count();
        let knight_moves = legal
            .iter()
            .filter(|m| m.mover == Mover::Fraction(Fraction::Knight))
            .count();
        assert_eq!(pawn_moves, 16);
        assert_eq!(knight_moves, 4);
        assert!(legal.iter().any(|m| m.mv.as_str() == "e2e4"));
        assert!(legal.iter().any(|m| m.mv.as_str() == "g1f3"));
    }

    #[test]
    fn test_apply_rejects_illegal_move() {
        let rules = StandardChess::new();
        let start = rules.initial_position();
        let err = rules.apply(&start, &Move::from("e2e5")).unwrap_err();
        assert_eq!(
            err,
            RulesError::InvalidMove {
                mv: Move::from("e2e5")
            }
        );
    }

    #[test]
    fn test_apply_flips_side_and_is_deterministic() {
        let rules = StandardChess::new();
        let a = play(&rules, &["e2e4", "e7e5"]);
        let b = play(&rules, &["e2e4", "e7e5"]);
        assert_eq!(a, b);
        assert_eq!(rules.side_to_move(&a), Side::White);
        assert_ne!(a, rules.initial_position());
    }

    #[test]
    fn test_fools_mate_is_checkmate() {
        let rules = StandardChess::new();
        let mated = play(&rules, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(rules.status(&mated), BoardStatus::Checkmate);
        assert!(rules.legal_moves(&mated).is_empty());
    }

    #[test]
    fn test_check_is_not_terminal() {
        let rules = StandardChess::new();
        let checked = play(&rules, &["e2e4", "f7f6", "d1h5"]);
        assert_eq!(rules.status(&checked), BoardStatus::Check);
    }

    #[test]
    fn test_material_and_active_fractions() {
        let rules = StandardChess::new();
        let start = rules.initial_position();
        assert_eq!(rules.material(&start, Side::White), 49);
        assert_eq!(rules.material(&start, Side::Black), 49);
        assert_eq!(
            rules.active_fractions(&start, Side::Black).len(),
            Fraction::ALL.len()
        );

        let traded = play(&rules, &["e2e4", "d7d5", "e4d5"]);
        assert_eq!(rules.material(&traded, Side::Black), 48);
        assert_eq!(rules.material(&traded, Side::White), 49);
    }

    #[test]
    fn test_lone_king_has_no_active_fractions() {
        let rules = StandardChess::from_fen("7k/8/8/8/8/8/8/K6r w - - 0 1").unwrap();
        let start = rules.initial_position();
        assert!(rules.active_fractions(&start, Side::White).is_empty());
        assert_eq!(
            rules.active_fractions(&start, Side::Black),
            BTreeSet::from([Fraction::Rook])
        );
        assert!(rules
            .legal_moves(&start)
            .iter()
            .all(|m| m.mover == Mover::King));
    }

    #[test]
    fn test_from_fen_rejects_garbage() {
        assert!(matches!(
            StandardChess::from_fen("not a fen"),
            Err(RulesError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_stalemate_is_reported() {
        let rules = StandardChess::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let start = rules.initial_position();
        assert_eq!(rules.status(&start), BoardStatus::Stalemate);
        assert!(rules.legal_moves(&start).is_empty());
    }

    #[test]
    fn test_bare_kings_are_a_draw() {
        let rules = StandardChess::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(rules.status(&rules.initial_position()), BoardStatus::Draw);
    }

    #[test]
    fn test_seventy_five_move_rule_is_a_draw() {
        let rules =
            StandardChess::from_fen("r3k3/8/8/8/8/8/8/R3K3 w - - 150 90").unwrap();
        assert_eq!(rules.status(&rules.initial_position()), BoardStatus::Draw);
    }

    #[test]
    fn test_fivefold_repetition_is_a_draw() {
        let rules = StandardChess::new();
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let mut position = rules.initial_position();
        for cycle in 1..=3 {
            for mv in shuffle {
                position = rules.apply(&position, &Move::from(mv)).unwrap();
            }
            assert_eq!(position.repetitions(), cycle + 1);
            assert_eq!(rules.status(&position), BoardStatus::InProgress);
        }
        for mv in shuffle {
            position = rules.apply(&position, &Move::from(mv)).unwrap();
        }
        assert_eq!(position.repetitions(), 5);
        assert_eq!(rules.status(&position), BoardStatus::Draw);
    }

    #[test]
    fn test_restore_keeps_castling_rights() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let rules = StandardChess::from_fen(fen).unwrap();
        let snapshot = rules.snapshot(&rules.initial_position());
        assert_eq!(snapshot.fen, fen);

        let restored = StandardChess::new().restore(&snapshot.fen).unwrap();
        assert_eq!(restored, rules.initial_position());
        assert!(rules
            .legal_moves(&restored)
            .iter()
            .any(|m| m.mv.as_str() == "e1g1"));
        assert!(matches!(
            StandardChess::new().restore("8/8/8 w"),
            Err(RulesError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_snapshot_renders_board_and_key() {
        let rules = StandardChess::new();
        let snapshot = rules.snapshot(&rules.initial_position());
        assert_eq!(
            snapshot.key,
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w"
        );
        assert_eq!(
            snapshot.fen,
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert_eq!(snapshot.side_to_move, Side::White);
        assert!(snapshot.board.starts_with("8 r n b q k b n r"));
    }
}
