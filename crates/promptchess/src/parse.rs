//! Parsing of free-form model replies into council types.

use std::sync::LazyLock;

use council::{Fraction, Move, PromptUpdate, ProposalReply, RoyalReply};
use regex::Regex;
use serde::Deserialize;

/// First UCI move following a `MOVE:` label.
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bMOVE\s*:\s*\**\s*([a-h][1-8][a-h][1-8][qrbn]?)\b")
        .expect("MOVE_RE regex should compile")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("no MOVE line in reply")]
    MissingMove,

    #[error("strategist reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("strategist named an unknown fraction: {0}")]
    UnknownFraction(String),
}

/// Text after `label:` up to the end of the reply, trimmed.
fn labelled_text(raw: &str, label: &str) -> String {
    let prefix = format!("{}:", label);
    raw.lines()
        .position(|line| line.trim_start().to_ascii_uppercase().starts_with(&prefix))
        .map(|start| {
            let lines: Vec<&str> = raw.lines().skip(start).collect();
            let joined = lines.join("\n");
            let body = joined.trim_start();
            body[prefix.len()..].trim().to_string()
        })
        .unwrap_or_default()
}

fn parse_move(raw: &str) -> Result<Move, ReplyError> {
    MOVE_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| Move::new(m.as_str().to_ascii_lowercase()))
        .ok_or(ReplyError::MissingMove)
}

/// `MOVE: e2e4` followed by `JUSTIFICATION: ...`.
pub fn parse_proposal(raw: &str) -> Result<ProposalReply, ReplyError> {
    Ok(ProposalReply {
        mv: parse_move(raw)?,
        justification: labelled_text(raw, "JUSTIFICATION"),
    })
}

/// `MOVE: e2e4` followed by `REASONING: ...`.
pub fn parse_royal(raw: &str) -> Result<RoyalReply, ReplyError> {
    Ok(RoyalReply {
        mv: parse_move(raw)?,
        reasoning: labelled_text(raw, "REASONING"),
    })
}

#[derive(Debug, Deserialize)]
struct UpdateJson {
    fraction: String,
    directive: String,
    #[serde(default)]
    rationale: String,
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Strategist reply: a JSON object `{"fraction", "directive", "rationale"}`
/// or the bare word `NONE`.
pub fn parse_update(raw: &str) -> Result<Option<PromptUpdate>, ReplyError> {
    let stripped = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if stripped.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let json = extract_json_object(stripped)
        .ok_or_else(|| ReplyError::InvalidJson("no JSON object found".to_string()))?;
    let parsed: UpdateJson =
        serde_json::from_str(json).map_err(|e| ReplyError::InvalidJson(e.to_string()))?;
    let fraction: Fraction = parsed
        .fraction
        .parse()
        .map_err(|_| ReplyError::UnknownFraction(parsed.fraction.clone()))?;
    Ok(Some(PromptUpdate {
        fraction,
        directive: parsed.directive.trim().to_string(),
        rationale: parsed.rationale.trim().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_proposal_with_justification() {
        let raw = "MOVE: e2e4\nJUSTIFICATION: The centre must be ours, my liege.\nIt opens the bishop.";
        let reply = parse_proposal(raw).unwrap();
        assert_eq!(reply.mv, Move::from("e2e4"));
        assert_eq!(
            reply.justification,
            "The centre must be ours, my liege.\nIt opens the bishop."
        );
    }

    #[test]
    fn test_parses_move_case_insensitively_with_markdown() {
        let raw = "Sire, hear me.\n**Move:** E7E8Q\nReasoning: promote";
        let reply = parse_royal(raw).unwrap();
        assert_eq!(reply.mv, Move::from("e7e8q"));
        assert_eq!(reply.reasoning, "promote");
    }

    #[test]
    fn test_missing_move_is_an_error() {
        assert_eq!(
            parse_proposal("I suggest we attack.").unwrap_err(),
            ReplyError::MissingMove
        );
        assert_eq!(
            parse_proposal("MOVE: castle kingside").unwrap_err(),
            ReplyError::MissingMove
        );
    }

    #[test]
    fn test_parses_update_json_inside_fence() {
        let raw = "```json\n{\"fraction\": \"Knights\", \"directive\": \"Hop to d5.\", \"rationale\": \"outpost\"}\n```";
        let update = parse_update(raw).unwrap().unwrap();
        assert_eq!(update.fraction, Fraction::Knight);
        assert_eq!(update.directive, "Hop to d5.");
        assert_eq!(update.rationale, "outpost");
    }

    #[test]
    fn test_none_means_no_update() {
        assert_eq!(parse_update("NONE").unwrap(), None);
        assert_eq!(parse_update("  none \n").unwrap(), None);
    }

    #[test]
    fn test_update_rejects_king_and_garbage() {
        assert!(matches!(
            parse_update("{\"fraction\": \"king\", \"directive\": \"x\"}"),
            Err(ReplyError::UnknownFraction(_))
        ));
        assert!(matches!(
            parse_update("keep everything as is"),
            Err(ReplyError::InvalidJson(_))
        ));
    }
}
