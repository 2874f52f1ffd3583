//! Preambles and input builders for the three agent roles.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever preamble content
//! changes, so logged replies can be traced back to the prompt that
//! produced them.

use std::fmt::Write as _;

use council::{Fraction, ProposalRequest, RoyalRequest, Side, UpdateRequest};

/// Prompt version. Bump on any preamble content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Preamble of one fraction's commander. The directive is the side's
/// current decree for that fraction.
pub fn fraction_preamble(side: Side, fraction: Fraction, directive: &str) -> String {
    format!(
        "You are the Lord-Commander of the {side} {fraction} fraction on an enchanted chessboard. \
You command every {side} {fraction} and no other piece. Never leave the character.

Upper-case letters on the board are white pieces, lower-case letters are black pieces. \
You may only recommend one of the moves listed as available to your fraction.

The court has issued this decree for your fraction. Follow it unless it breaks the rules of chess:
\"{directive}\"

Think through the position silently and address your counsel to the King.
Reply in exactly this format:
MOVE: <one available move in UCI notation, e.g. e2e4>
JUSTIFICATION: <two or three noble-toned sentences>",
        side = side,
        fraction = fraction.title(),
        directive = directive,
    )
}

/// Preamble of the royal arbiter.
pub const KING_PREAMBLE: &str = "\
You are the King in a game of chess where each of your piece types is led by its own commander. \
The commanders have each recommended a move. Choose exactly one of the recommended moves, \
weighing their arguments against the position and the safety of your realm.

Reply in exactly this format:
MOVE: <one of the recommended moves, copied exactly>
REASONING: <one or two sentences>";

/// Preamble of the strategist that may rewrite one directive per turn.
pub const STRATEGIST_PREAMBLE: &str = "\
You are the court strategist of one side in Prompt Chess. Every non-royal piece type of your side \
follows a short natural-language directive. Before each of your turns you may rewrite the \
directive of at most one piece type.

Study the position, your own directives and the opponent's directives. Decide whether one of your \
active piece types needs a new directive to serve a coherent plan (development, king safety, \
attack, defence of threatened pieces).

If a change is warranted, reply with a single JSON object and nothing else:
{\"fraction\": \"<pawn|knight|bishop|rook|queen>\", \"directive\": \"<one or two sentences>\", \"rationale\": \"<short reason>\"}
If no change is needed, reply with the single word NONE.";

/// User message of a proposal call.
pub fn proposal_input(request: &ProposalRequest) -> String {
    let moves: Vec<&str> = request.legal_moves.iter().map(|m| m.as_str()).collect();
    let mut input = format!(
        "Current board ({} to move):\nFEN: {}\n\n{}\n\nAvailable moves for the {}:\n* {}",
        request.side,
        request.snapshot.fen,
        request.snapshot.board,
        request.fraction.title(),
        moves.join("\n* "),
    );
    if !request.transcript.is_empty() {
        let _ = write!(
            input,
            "\n\nEarlier counsel this turn:\n{}",
            serde_json::to_string_pretty(&request.transcript).unwrap_or_default()
        );
    }
    input
}

/// User message of the royal decision call.
pub fn royal_input(request: &RoyalRequest) -> String {
    let mut statements = String::new();
    for proposal in &request.proposals {
        let _ = writeln!(
            statements,
            "- {} recommends {}: {}",
            proposal.fraction.title(),
            proposal.mv,
            proposal.justification.trim()
        );
    }
    format!(
        "Fraction statements:\n{}\nCurrent board ({} to move):\nFEN: {}\n\n{}",
        statements, request.side, request.snapshot.fen, request.snapshot.board,
    )
}

fn directive_list(out: &mut String, directives: &std::collections::BTreeMap<Fraction, String>) {
    for (fraction, text) in directives {
        let _ = writeln!(out, "- {}: {}", fraction.title(), text);
    }
}

/// User message of the strategist call.
pub fn update_input(request: &UpdateRequest) -> String {
    let mut input = format!(
        "Turn {}. You play {}.\n\nCurrent board:\nFEN: {}\n\n{}\n\n",
        request.turn + 1,
        request.side,
        request.snapshot.fen,
        request.snapshot.board,
    );
    let active: Vec<&str> = request.active.iter().map(|f| f.name()).collect();
    let _ = writeln!(input, "Your active piece types: {}\n", active.join(", "));
    input.push_str("Your current directives:\n");
    directive_list(&mut input, &request.own);
    input.push_str("\nOpponent's current directives:\n");
    directive_list(&mut input, &request.opponent);
    input.push_str("\nReply with one JSON object or NONE.");
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use council::{Move, PositionSnapshot, Proposal};
    use std::collections::{BTreeMap, BTreeSet};

    fn snapshot() -> PositionSnapshot {
        PositionSnapshot {
            key: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w".to_string(),
            fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string(),
            board: "8 r n b q k b n r".to_string(),
            side_to_move: Side::White,
        }
    }

    #[test]
    fn test_fraction_preamble_embeds_decree() {
        let preamble = fraction_preamble(Side::Black, Fraction::Rook, "Seize the open file.");
        assert!(preamble.contains("black Rook fraction"));
        assert!(preamble.contains("\"Seize the open file.\""));
        assert!(preamble.contains("MOVE:"));
    }

    #[test]
    fn test_proposal_input_lists_only_fraction_moves() {
        let request = ProposalRequest {
            side: Side::White,
            fraction: Fraction::Knight,
            snapshot: snapshot(),
            directive: "Jump.".to_string(),
            legal_moves: vec![Move::from("b1c3"), Move::from("g1f3")],
            transcript: Vec::new(),
            round: 1,
        };
        let input = proposal_input(&request);
        assert!(input.contains("* b1c3\n* g1f3"));
        assert!(!input.contains("Earlier counsel"));
    }

    #[test]
    fn test_royal_input_lists_statements() {
        let request = RoyalRequest {
            side: Side::White,
            snapshot: snapshot(),
            proposals: vec![Proposal {
                fraction: Fraction::Pawn,
                mv: Move::from("e2e4"),
                justification: "Claim the centre.".to_string(),
                round: 1,
            }],
        };
        let input = royal_input(&request);
        assert!(input.contains("- Pawn recommends e2e4: Claim the centre."));
        assert!(input.contains("FEN: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"));
    }

    #[test]
    fn test_update_input_shows_both_sides() {
        let request = UpdateRequest {
            side: Side::Black,
            turn: 1,
            snapshot: snapshot(),
            own: BTreeMap::from([(Fraction::Queen, "Stay home.".to_string())]),
            opponent: BTreeMap::from([(Fraction::Queen, "Raid h5.".to_string())]),
            active: BTreeSet::from([Fraction::Pawn, Fraction::Queen]),
        };
        let input = update_input(&request);
        assert!(input.starts_with("Turn 2. You play black."));
        assert!(input.contains("active piece types: pawn, queen"));
        assert!(input.contains("- Queen: Stay home."));
        assert!(input.contains("- Queen: Raid h5."));
    }
}
