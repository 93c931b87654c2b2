//! Career tiers (RECRUIT → ARCHITECT).
//!
//! The current tier is the highest tier whose requirements hold. Advancement is
//! applied only upward; a tier once reached is kept even if a requirement later
//! stops holding.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::engine::content::Content;
use crate::engine::types::{EngineState, ProgressionTier};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierAdvancement {
    pub from: u8,
    pub tier: u8,
    pub title: String,
    pub unlocked: Vec<String>,
    pub message: String,
}

/// Requirements of `tier` that the state does not satisfy yet, as display lines.
pub fn missing_requirements(state: &EngineState, tier: &ProgressionTier) -> Vec<String> {
    let mut missing = Vec::new();
    for command in &tier.requires.commands {
        if !state.knows_command(command) {
            missing.push(format!("use '{}'", command));
        }
    }
    let have = state.player.discoveries.len();
    if have < tier.requires.min_discoveries {
        missing.push(format!(
            "{} more discoveries",
            tier.requires.min_discoveries - have
        ));
    }
    for flag in &tier.requires.story_flags {
        if !state.story_flags.is_set(flag) {
            missing.push(format!("uncover '{}'", flag.replace('_', " ")));
        }
    }
    missing
}

pub fn requirements_met(state: &EngineState, tier: &ProgressionTier) -> bool {
    missing_requirements(state, tier).is_empty()
}

/// Highest tier whose requirements hold right now (1 if none do).
pub fn evaluate_tier(state: &EngineState, content: &Content) -> u8 {
    content
        .tiers
        .iter()
        .rev()
        .find(|t| requirements_met(state, t))
        .map(|t| t.level)
        .unwrap_or(1)
}

/// Advance the player when the evaluated tier exceeds the recorded one.
pub fn check_progression_advancement(
    state: &mut EngineState,
    content: &Content,
    now: DateTime<Utc>,
) -> Option<TierAdvancement> {
    let candidate = evaluate_tier(state, content);
    let from = state.player.tier;
    if candidate <= from {
        return None;
    }
    let tier = content.tier(candidate)?;

    // Intermediate tiers skipped in one jump still grant their unlocks.
    let mut unlocked = Vec::new();
    for level in (from + 1)..=candidate {
        if let Some(step) = content.tier(level) {
            for command in &step.unlocks {
                if state.discovered_commands.insert(command.clone()) {
                    unlocked.push(command.clone());
                }
            }
        }
    }
    state.player.tier = candidate;
    state.player.title = tier.title.clone();
    state.player.touch(now);

    info!(
        "{} advanced from tier {} to {} ({})",
        state.player.id, from, candidate, tier.title
    );

    let mut message = format!(
        "*** PROMOTION ***\nYou are now {} (tier {}).",
        tier.title, candidate
    );
    if !unlocked.is_empty() {
        message.push_str(&format!("\nNew tools: {}", unlocked.join(", ")));
    }
    Some(TierAdvancement {
        from,
        tier: candidate,
        title: tier.title.clone(),
        unlocked,
        message,
    })
}

/// Text for `nc-tier`.
pub fn format_tier_report(state: &EngineState, content: &Content) -> String {
    let mut out = format!(
        "=== CAREER ===\nTier {}: {}\n",
        state.player.tier, state.player.title
    );
    let next = content
        .tier(state.player.tier)
        .and_then(|t| t.next)
        .and_then(|n| content.tier(n));
    match next {
        Some(next) => {
            out.push_str(&format!("Next: {} (tier {})\n", next.title, next.level));
            let missing = missing_requirements(state, next);
            if missing.is_empty() {
                out.push_str("All requirements met. Promotion pending.");
            } else {
                out.push_str("Still needed:\n");
                for line in missing {
                    out.push_str(&format!("  - {}\n", line));
                }
            }
        }
        None => out.push_str("Top of the ladder. Nobody can promote you now."),
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn analyst_ready() -> EngineState {
        let mut state = EngineState::new("p1", "Pat", now());
        for c in ["pwd", "ls", "cat"] {
            state.learned_commands.insert(c.to_string());
        }
        state.player.discoveries.push("filesystem_explorer".to_string());
        state
    }

    #[test]
    fn fresh_player_stays_recruit() {
        let content = Content::builtin();
        let mut state = EngineState::new("p1", "Pat", now());
        assert_eq!(evaluate_tier(&state, &content), 1);
        assert!(check_progression_advancement(&mut state, &content, now()).is_none());
    }

    #[test]
    fn meeting_requirements_promotes_once() {
        let content = Content::builtin();
        let mut state = analyst_ready();
        let adv = check_progression_advancement(&mut state, &content, now()).expect("promote");
        assert_eq!(adv.tier, 2);
        assert_eq!(state.player.title, "ANALYST");
        assert!(check_progression_advancement(&mut state, &content, now()).is_none());
    }

    #[test]
    fn tier_never_moves_backward() {
        let content = Content::builtin();
        let mut state = analyst_ready();
        state.player.tier = 3;
        state.player.title = "INVESTIGATOR".to_string();
        // Requirements only support tier 2 now.
        assert_eq!(evaluate_tier(&state, &content), 2);
        assert!(check_progression_advancement(&mut state, &content, now()).is_none());
        assert_eq!(state.player.tier, 3);
    }

    #[test]
    fn skipped_tiers_still_grant_unlocks() {
        let content = Content::builtin();
        let mut state = analyst_ready();
        for c in ["ps", "netstat", "nc-clock-in", "nc-discover-services", "nc-map-network"] {
            state.learned_commands.insert(c.to_string());
        }
        for d in ["a", "b", "c"] {
            state.player.discoveries.push(d.to_string());
        }
        state.story_flags.raise("found_admin_note");
        state.story_flags.raise("noticed_network_anomaly");
        let adv = check_progression_advancement(&mut state, &content, now()).expect("promote");
        assert_eq!(adv.tier, 4);
        assert!(state.discovered_commands.contains("nc-investigate"));
    }

    #[test]
    fn tier_report_lists_missing_requirements() {
        let content = Content::builtin();
        let state = EngineState::new("p1", "Pat", now());
        let report = format_tier_report(&state, &content);
        assert!(report.contains("ANALYST"));
        assert!(report.contains("use 'cat'"));
    }
}
