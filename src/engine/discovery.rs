/// Discovery triggers: counted pattern rules that fire exactly once.
///
/// Every trigger that reaches its threshold on a command applies its effects
/// (story flag, XP, unlocked commands, evidence) on that same command. Only one
/// notice is shown per command; the rest wait in `pending_notices` and are
/// shown on the following commands in declaration order.
use chrono::{DateTime, Utc};
use log::info;

use crate::engine::content::Content;
use crate::engine::pattern::CommandLine;
use crate::engine::types::{DiscoveryNotice, DiscoveryTrigger, EngineState};

/// Result of evaluating the trigger table for one command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryOutcome {
    /// Notice to surface on this command (fresh or previously queued).
    pub notice: Option<DiscoveryNotice>,
    /// Ids of triggers that fired on this command.
    pub fired: Vec<String>,
    /// XP awarded by triggers fired on this command.
    pub xp: u32,
}

impl DiscoveryOutcome {
    pub fn discovered(&self) -> bool {
        self.notice.is_some()
    }

    /// The surfaced notice was queued by an earlier command.
    pub fn replayed(&self) -> bool {
        self.notice
            .as_ref()
            .map(|n| !self.fired.contains(&n.trigger_id))
            .unwrap_or(false)
    }
}

fn qualifies(trigger: &DiscoveryTrigger, line: &CommandLine) -> bool {
    trigger.relevant_commands.contains(&line.command)
        || trigger
            .pattern
            .as_ref()
            .map(|p| p.matches(line))
            .unwrap_or(false)
}

fn fire(
    state: &mut EngineState,
    trigger: &DiscoveryTrigger,
    now: DateTime<Utc>,
) -> DiscoveryNotice {
    state.story_flags.raise(&trigger.story_flag);
    if !state.player.discoveries.contains(&trigger.id) {
        state.player.discoveries.push(trigger.id.clone());
    }
    state.player.add_xp(trigger.xp_reward);
    for command in &trigger.unlocks {
        state.discovered_commands.insert(command.clone());
    }
    state.add_evidence(
        &format!("discovery:{}", trigger.id),
        &trigger.title,
        &trigger.description,
        now,
    );
    info!(
        "discovery '{}' fired for {} (flag {})",
        trigger.id, state.player.id, trigger.story_flag
    );

    DiscoveryNotice {
        trigger_id: trigger.id.clone(),
        title: trigger.title.clone(),
        message: format!("[DISCOVERY] {}\n{}", trigger.title, trigger.description),
        story_flag: trigger.story_flag.clone(),
        xp: trigger.xp_reward,
    }
}

/// Count the command against every armed trigger and fire those that reach threshold.
pub fn check_discovery_patterns(
    state: &mut EngineState,
    content: &Content,
    line: &CommandLine,
    now: DateTime<Utc>,
) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();
    let mut fresh = Vec::new();

    for trigger in &content.triggers {
        let progress = state.trigger_progress.entry(trigger.id.clone()).or_default();
        if progress.fired || !qualifies(trigger, line) {
            continue;
        }
        progress.count += 1;
        if progress.count < trigger.threshold {
            continue;
        }
        progress.fired = true;
        let notice = fire(state, trigger, now);
        outcome.xp += notice.xp;
        outcome.fired.push(trigger.id.clone());
        fresh.push(notice);
    }

    // Older queued notices go first so nothing leapfrogs.
    state.pending_notices.extend(fresh);
    outcome.notice = state.pending_notices.pop_front();
    outcome
}

pub fn format_discovery_progress(state: &EngineState, content: &Content) -> String {
    let fired = content
        .triggers
        .iter()
        .filter(|t| {
            state
                .trigger_progress
                .get(&t.id)
                .map(|p| p.fired)
                .unwrap_or(false)
        })
        .count();
    format!("Discoveries: {}/{}", fired, content.triggers.len())
}
