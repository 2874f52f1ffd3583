//! Deterministic move selection when the royal step does not settle.

use std::collections::BTreeSet;

use super::transcript::Proposal;
use crate::rules::{LegalMove, Move};

/// First-level fallback: among proposals still legal, the one with the
/// smallest `(round, fraction ordinal, move)` key.
pub fn proposal_fallback<'a>(
    proposals: impl IntoIterator<Item = &'a Proposal>,
    legal: &BTreeSet<Move>,
) -> Option<&'a Proposal> {
    proposals
        .into_iter()
        .filter(|p| legal.contains(&p.mv))
        .min_by(|a, b| a.fallback_key().cmp(&b.fallback_key()))
}

/// Second-level fallback: the lexicographically smallest legal move.
pub fn legal_fallback(legal: &[LegalMove]) -> Option<&Move> {
    legal.iter().map(|m| &m.mv).min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fraction::{Fraction, Mover};

    fn proposal(fraction: Fraction, mv: &str, round: u32) -> Proposal {
        Proposal {
            fraction,
            mv: Move::from(mv),
            justification: String::new(),
            round,
        }
    }

    fn legal_set(moves: &[&str]) -> BTreeSet<Move> {
        moves.iter().map(|m| Move::from(*m)).collect()
    }

    #[test]
    fn test_proposal_fallback_prefers_lowest_ordinal() {
        let proposals = vec![
            proposal(Fraction::Queen, "d1h5", 1),
            proposal(Fraction::Knight, "g1f3", 1),
            proposal(Fraction::Pawn, "h2h4", 1),
        ];
        let legal = legal_set(&["d1h5", "g1f3", "h2h4"]);
        let picked = proposal_fallback(&proposals, &legal).unwrap();
        assert_eq!(picked.fraction, Fraction::Pawn);
    }

    #[test]
    fn test_proposal_fallback_prefers_earlier_round() {
        let proposals = vec![
            proposal(Fraction::Pawn, "e2e4", 2),
            proposal(Fraction::Rook, "a1b1", 1),
        ];
        let legal = legal_set(&["e2e4", "a1b1"]);
        assert_eq!(
            proposal_fallback(&proposals, &legal).unwrap().fraction,
            Fraction::Rook
        );
    }

    #[test]
    fn test_proposal_fallback_skips_illegal_moves() {
        let proposals = vec![
            proposal(Fraction::Pawn, "e2e5", 1),
            proposal(Fraction::Knight, "g1f3", 1),
        ];
        let legal = legal_set(&["g1f3"]);
        assert_eq!(
            proposal_fallback(&proposals, &legal).unwrap().mv,
            Move::from("g1f3")
        );
        assert!(proposal_fallback(&proposals, &BTreeSet::new()).is_none());
    }

    #[test]
    fn test_legal_fallback_is_lexicographic_minimum() {
        let legal = vec![
            LegalMove {
                mv: Move::from("g1f3"),
                mover: Mover::Fraction(Fraction::Knight),
            },
            LegalMove {
                mv: Move::from("a2a4"),
                mover: Mover::Fraction(Fraction::Pawn),
            },
            LegalMove {
                mv: Move::from("a2a3"),
                mover: Mover::Fraction(Fraction::Pawn),
            },
        ];
        assert_eq!(legal_fallback(&legal), Some(&Move::from("a2a3")));
        assert_eq!(legal_fallback(&[]), None);
    }
}
